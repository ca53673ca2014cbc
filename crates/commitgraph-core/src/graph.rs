//! Graph: the aggregate owning rows, nodes, edges and branches.
//!
//! [`Graph`] is the single owner of the commit DAG. Nodes and edges live in
//! a petgraph `StableGraph` arena and are addressed by [`NodeId`] /
//! [`EdgeId`]; rows are a dense vector indexed by row number. Nothing holds
//! a pointer back into the graph: the read-side views in [`crate::view`]
//! borrow the graph and carry an id.
//!
//! # Layout
//!
//! Rows are laid out parents-first. Every row holds exactly one primary
//! node (a commit or an unknown-ancestor placeholder), and the primary node
//! of row `i` is `NodeId(i)`. Collapsed-branch nodes are appended after the
//! primaries, each in the row where its collapsed run is last entered.
//! Every edge points from a lower row (up, parent side) to a higher row
//! (down, child side).
//!
//! # Visibility
//!
//! The topology is immutable after [`GraphBuilder::build`]. The only mutable
//! state is the [`VisibilityController`], which `hide`/`show` through a
//! shared reference, so a built graph can be read from many threads while
//! one thread toggles branches. Whole-graph queries read a single
//! [`VisibilityState`] snapshot.
//!
//! [`GraphBuilder::build`]: crate::build::GraphBuilder::build

use std::collections::{HashMap, HashSet};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::NodeIndexable;
use petgraph::Directed;
use smallvec::SmallVec;

use crate::branch::{Branch, BranchTable, BranchWiring, Wiring};
use crate::build::{BuildOptions, GraphBuilder};
use crate::commit::{Commit, CommitHash, Refs};
use crate::edge::GraphEdge;
use crate::edge_controller::EdgeController;
use crate::error::CoreError;
use crate::id::{BranchId, EdgeId, NodeId};
use crate::node::GraphNode;
use crate::view::{EdgeView, NodeView, RowView};
use crate::visibility::{BranchLinks, VisibilityController, VisibilityState};

/// The physical arena: every node and edge, hidden or not.
pub type CommitDag = StableGraph<GraphNode, GraphEdge, Directed, u32>;

/// The currently visible sub-graph, detached from the arena. Weights point
/// back to the ids in the full graph.
pub type VisibleDag = petgraph::Graph<NodeId, EdgeId, Directed, u32>;

/// Nodes physically placed in one row, in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct RowData {
    pub(crate) nodes: SmallVec<[NodeId; 2]>,
}

/// The commit graph.
#[derive(Debug)]
pub struct Graph {
    dag: CommitDag,
    rows: Vec<RowData>,
    branches: BranchTable,
    wiring: Wiring,
    by_hash: HashMap<CommitHash, NodeId>,
    refs: HashMap<NodeId, Vec<String>>,
    visibility: VisibilityController,
}

impl Graph {
    /// Builds a graph from commits ordered oldest-first (every parent before
    /// its children), with refs naming branch heads in priority order.
    pub fn build(commits: Vec<Commit>, refs: Refs) -> Result<Graph, CoreError> {
        GraphBuilder::new(BuildOptions::default())
            .with_refs(refs)
            .build(commits)
    }

    /// Assembles a graph from parts produced by the builder.
    pub(crate) fn from_parts(
        dag: CommitDag,
        rows: Vec<RowData>,
        branches: BranchTable,
        wiring: Wiring,
        by_hash: HashMap<CommitHash, NodeId>,
        refs: HashMap<NodeId, Vec<String>>,
    ) -> Self {
        let link = |node: Option<NodeId>| {
            node.and_then(|n| dag.node_weight(n.into()).map(|data| (n, data.branch)))
        };
        let links = branches
            .iter()
            .map(|b| BranchLinks {
                fork: link(b.fork_point),
                merge: link(b.merge_target),
            })
            .collect();
        let visibility = VisibilityController::with_links(links);
        Graph {
            dag,
            rows,
            branches,
            wiring,
            by_hash,
            refs,
            visibility,
        }
    }

    // -----------------------------------------------------------------------
    // Shared services
    // -----------------------------------------------------------------------

    pub fn visibility(&self) -> &VisibilityController {
        &self.visibility
    }

    /// An endpoint resolver pinned to the current visibility state.
    pub fn edge_controller(&self) -> EdgeController<'_> {
        EdgeController::new(self, self.visibility.snapshot())
    }

    pub fn is_node_visible(&self, node: NodeId) -> bool {
        self.visibility.is_node_visible(self, node)
    }

    pub fn is_edge_visible(&self, edge: EdgeId) -> bool {
        self.visibility.is_edge_visible(self, edge)
    }

    // -----------------------------------------------------------------------
    // Rows
    // -----------------------------------------------------------------------

    /// Physical row count, independent of visibility.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// # Panics
    ///
    /// Panics if `index >= row_count()`.
    pub fn row(&self, index: usize) -> RowView<'_> {
        match self.get_row(index) {
            Some(row) => row,
            None => panic!(
                "row index {index} out of range (row count {})",
                self.rows.len()
            ),
        }
    }

    pub fn get_row(&self, index: usize) -> Option<RowView<'_>> {
        (index < self.rows.len()).then(|| RowView::new(self, index))
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        (0..self.rows.len()).map(move |index| RowView::new(self, index))
    }

    pub(crate) fn row_nodes(&self, index: usize) -> &[NodeId] {
        &self.rows[index].nodes
    }

    // -----------------------------------------------------------------------
    // Nodes and edges
    // -----------------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.dag.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.dag.edge_count()
    }

    /// # Panics
    ///
    /// Panics if the node is unknown to this graph.
    pub fn node(&self, id: NodeId) -> NodeView<'_> {
        let _ = self.node_data(id);
        NodeView::new(self, id)
    }

    /// # Panics
    ///
    /// Panics if the edge is unknown to this graph.
    pub fn edge(&self, id: EdgeId) -> EdgeView<'_> {
        let _ = self.edge_data(id);
        EdgeView::new(self, id)
    }

    /// Every node, hidden or not, by ascending id.
    pub fn nodes(&self) -> impl Iterator<Item = NodeView<'_>> + '_ {
        self.dag
            .node_indices()
            .map(move |idx| NodeView::new(self, idx.into()))
    }

    /// Every edge, hidden or not, by ascending id.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> + '_ {
        self.dag
            .edge_indices()
            .map(move |idx| EdgeView::new(self, idx.into()))
    }

    /// The node bound to a commit or placeholder hash.
    pub fn node_by_hash(&self, hash: &CommitHash) -> Option<NodeId> {
        self.by_hash.get(hash).copied()
    }

    pub(crate) fn node_data(&self, id: NodeId) -> &GraphNode {
        let idx: NodeIndex<u32> = id.into();
        match self.dag.node_weight(idx) {
            Some(node) => node,
            None => panic!("node {id} does not belong to this graph"),
        }
    }

    pub(crate) fn edge_data(&self, id: EdgeId) -> &GraphEdge {
        let idx: EdgeIndex<u32> = id.into();
        match self.dag.edge_weight(idx) {
            Some(edge) => edge,
            None => panic!("edge {id} does not belong to this graph"),
        }
    }

    /// The endpoints the edge was created with, `(up, down)`.
    pub(crate) fn physical_endpoints(&self, id: EdgeId) -> (NodeId, NodeId) {
        let idx: EdgeIndex<u32> = id.into();
        match self.dag.edge_endpoints(idx) {
            Some((up, down)) => (up.into(), down.into()),
            None => panic!("edge {id} does not belong to this graph"),
        }
    }

    pub(crate) fn node_refs(&self, id: NodeId) -> &[String] {
        self.refs.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The physical arena.
    pub fn dag(&self) -> &CommitDag {
        &self.dag
    }

    // -----------------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------------

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// # Panics
    ///
    /// Panics if the branch is unknown to this graph.
    pub fn branch(&self, id: BranchId) -> &Branch {
        match self.branches.get(id) {
            Some(branch) => branch,
            None => panic!("branch {id} does not belong to this graph"),
        }
    }

    pub fn branches(&self) -> &[Branch] {
        self.branches.as_slice()
    }

    pub fn branch_by_name(&self, name: &str) -> Option<BranchId> {
        self.branches.by_name(name)
    }

    pub(crate) fn wiring(&self, id: BranchId) -> &BranchWiring {
        &self.wiring.branches[id.index()]
    }

    /// Branches forking off at `node`.
    pub(crate) fn forks_at(&self, node: NodeId) -> &[BranchId] {
        self.wiring.forks_at.get(&node).map(|b| b.as_slice()).unwrap_or(&[])
    }

    /// Branches merging into `node`.
    pub(crate) fn merges_at(&self, node: NodeId) -> &[BranchId] {
        self.wiring.merges_at.get(&node).map(|b| b.as_slice()).unwrap_or(&[])
    }

    // -----------------------------------------------------------------------
    // Whole-graph queries
    // -----------------------------------------------------------------------

    /// Materialises the visible sub-graph with resolved endpoints.
    pub fn visible_dag(&self) -> VisibleDag {
        let state = self.visibility.snapshot();
        let mut out = VisibleDag::default();
        let mut index_of = HashMap::new();
        for node in self.dag.node_indices().map(NodeId::from) {
            if state.is_node_visible(self, node) {
                index_of.insert(node, out.add_node(node));
            }
        }
        for edge in self.dag.edge_indices().map(EdgeId::from) {
            if let Some((up, down)) = state.visible_endpoints(self, edge) {
                if let (Some(&from), Some(&to)) = (index_of.get(&up), index_of.get(&down)) {
                    out.add_edge(from, to, edge);
                }
            }
        }
        out
    }

    /// Checks the structural invariants: every node sits in exactly one row
    /// matching its recorded row, every edge points to a strictly later row,
    /// every visible edge resolves onto visible nodes, and no two visible
    /// edges join the same pair of nodes.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.validate_in(&self.visibility.snapshot())
    }

    fn validate_in(&self, state: &VisibilityState) -> Result<(), CoreError> {
        let mut seen = vec![0usize; self.dag.node_bound()];
        for (index, row) in self.rows.iter().enumerate() {
            for &node in &row.nodes {
                let data = self.dag.node_weight(node.into()).ok_or_else(|| {
                    inconsistency(format!("row {index} lists unknown node {node}"))
                })?;
                if data.row != index {
                    return Err(inconsistency(format!(
                        "node {node} is listed in row {index} but records row {}",
                        data.row
                    )));
                }
                seen[node.index()] += 1;
            }
        }
        for idx in self.dag.node_indices() {
            let count = seen[idx.index()];
            if count != 1 {
                return Err(inconsistency(format!(
                    "node {} appears in {count} rows",
                    NodeId::from(idx)
                )));
            }
        }

        let mut pairs = HashSet::new();
        for edge in self.dag.edge_indices().map(EdgeId::from) {
            let (up, down) = self.physical_endpoints(edge);
            if self.node_data(up).row >= self.node_data(down).row {
                return Err(inconsistency(format!(
                    "edge {edge} does not point to a later row"
                )));
            }
            let Some((up, down)) = state.visible_endpoints(self, edge) else {
                continue;
            };
            if !pairs.insert((up, down)) {
                return Err(inconsistency(format!(
                    "visible edge {edge} duplicates another edge from {up} to {down}"
                )));
            }
            if !state.is_node_visible(self, up) || !state.is_node_visible(self, down) {
                return Err(inconsistency(format!(
                    "visible edge {edge} resolves onto a hidden node"
                )));
            }
            if self.node_data(up).row >= self.node_data(down).row {
                return Err(inconsistency(format!(
                    "visible edge {edge} does not point to a later row"
                )));
            }
        }
        Ok(())
    }
}

fn inconsistency(reason: String) -> CoreError {
    CoreError::GraphInconsistency { reason }
}
