//! Read-side views over a [`Graph`].
//!
//! Views are `Copy` handles pairing a graph borrow with an id. Every
//! filtered accessor (`RowView::nodes`, `NodeView::up_edges`,
//! `NodeView::down_edges`) is recomputed on each call from the stored
//! collections and one visibility snapshot taken for that call; nothing is
//! cached, so `hide`/`show` never have to invalidate anything. Callers that
//! want to memoise can key on [`VisibilityController::generation`].
//!
//! Edge views returned by `up_edges`/`down_edges` keep the endpoints they
//! were listed with, so they agree with the list they came from even if a
//! branch is toggled meanwhile.
//!
//! [`VisibilityController::generation`]: crate::visibility::VisibilityController::generation

use std::fmt;

use crate::branch::Branch;
use crate::commit::{Commit, CommitHash};
use crate::edge::EdgeType;
use crate::edge_controller::ResolvedEdge;
use crate::graph::Graph;
use crate::id::{BranchId, EdgeId, NodeId};
use crate::node::NodeType;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub struct RowView<'g> {
    graph: &'g Graph,
    index: usize,
}

impl<'g> RowView<'g> {
    pub(crate) fn new(graph: &'g Graph, index: usize) -> Self {
        RowView { graph, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Visible nodes in insertion order.
    pub fn nodes(&self) -> Vec<NodeView<'g>> {
        let state = self.graph.visibility().snapshot();
        self.all_nodes()
            .filter(|node| state.is_node_visible(self.graph, node.id))
            .collect()
    }

    /// Every node placed in this row, including hidden ones.
    pub fn all_nodes(&self) -> impl Iterator<Item = NodeView<'g>> + 'g {
        let graph = self.graph;
        graph
            .row_nodes(self.index)
            .iter()
            .map(move |&id| NodeView::new(graph, id))
    }
}

impl PartialEq for RowView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.index == other.index
    }
}

impl Eq for RowView<'_> {}

impl fmt::Debug for RowView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RowView").field(&self.index).finish()
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub struct NodeView<'g> {
    graph: &'g Graph,
    id: NodeId,
}

impl<'g> NodeView<'g> {
    pub(crate) fn new(graph: &'g Graph, id: NodeId) -> Self {
        NodeView { graph, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.graph.node_data(self.id).node_type()
    }

    /// The bound commit; `None` for placeholder and collapsed-branch nodes.
    pub fn commit(&self) -> Option<&'g Commit> {
        self.graph.node_data(self.id).commit()
    }

    pub fn hash(&self) -> Option<&'g CommitHash> {
        self.graph.node_data(self.id).hash()
    }

    pub fn branch_id(&self) -> BranchId {
        self.graph.node_data(self.id).branch
    }

    pub fn branch(&self) -> &'g Branch {
        self.graph.branch(self.branch_id())
    }

    pub fn row_index(&self) -> usize {
        self.graph.node_data(self.id).row
    }

    pub fn row(&self) -> RowView<'g> {
        RowView::new(self.graph, self.row_index())
    }

    /// Ref names pointing at this commit.
    pub fn refs(&self) -> &'g [String] {
        self.graph.node_refs(self.id)
    }

    pub fn is_visible(&self) -> bool {
        self.graph.is_node_visible(self.id)
    }

    /// Visible edges whose down endpoint currently resolves to this node,
    /// including edges re-anchored onto it.
    pub fn up_edges(&self) -> Vec<EdgeView<'g>> {
        self.graph
            .edge_controller()
            .edges_into(self.id)
            .into_iter()
            .map(|edge| EdgeView::pinned(self.graph, edge))
            .collect()
    }

    /// Visible edges whose up endpoint currently resolves to this node,
    /// including edges re-anchored onto it.
    pub fn down_edges(&self) -> Vec<EdgeView<'g>> {
        self.graph
            .edge_controller()
            .edges_out_of(self.id)
            .into_iter()
            .map(|edge| EdgeView::pinned(self.graph, edge))
            .collect()
    }
}

impl PartialEq for NodeView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.id == other.id
    }
}

impl Eq for NodeView<'_> {}

impl fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeView")
            .field("id", &self.id)
            .field("type", &self.node_type())
            .field("row", &self.row_index())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub struct EdgeView<'g> {
    graph: &'g Graph,
    id: EdgeId,
    /// Resolved `(up, down)` captured when the view was listed.
    ends: Option<(NodeId, NodeId)>,
}

impl<'g> EdgeView<'g> {
    pub(crate) fn new(graph: &'g Graph, id: EdgeId) -> Self {
        EdgeView {
            graph,
            id,
            ends: None,
        }
    }

    fn pinned(graph: &'g Graph, edge: ResolvedEdge) -> Self {
        EdgeView {
            graph,
            id: edge.id,
            ends: Some((edge.up, edge.down)),
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn edge_type(&self) -> EdgeType {
        self.graph.edge_data(self.id).edge_type
    }

    pub fn is_synthetic(&self) -> bool {
        self.graph.edge_data(self.id).is_synthetic()
    }

    pub fn branch(&self) -> &'g Branch {
        self.graph.branch(self.graph.edge_data(self.id).branch)
    }

    pub fn up_node(&self) -> NodeView<'g> {
        let up = match self.ends {
            Some((up, _)) => up,
            None => self.graph.edge_controller().up_node(self.id),
        };
        NodeView::new(self.graph, up)
    }

    pub fn down_node(&self) -> NodeView<'g> {
        let down = match self.ends {
            Some((_, down)) => down,
            None => self.graph.edge_controller().down_node(self.id),
        };
        NodeView::new(self.graph, down)
    }

    pub fn is_visible(&self) -> bool {
        self.graph.is_edge_visible(self.id)
    }
}

impl PartialEq for EdgeView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.id == other.id
    }
}

impl Eq for EdgeView<'_> {}

impl fmt::Debug for EdgeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeView")
            .field("id", &self.id)
            .field("type", &self.edge_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::commit::{Commit, CommitHash, Refs};
    use crate::graph::Graph;

    fn hash(s: &str) -> CommitHash {
        CommitHash::parse(s).unwrap()
    }

    fn linear_with_topic() -> Graph {
        // main: r - s - t, topic: u (from s), merged by t.
        let commits = vec![
            Commit::new(hash("r"), [], "dev", 1, "root"),
            Commit::new(hash("s"), [hash("r")], "dev", 2, "second"),
            Commit::new(hash("u"), [hash("s")], "dev", 3, "topic work"),
            Commit::new(hash("t"), [hash("s"), hash("u")], "dev", 4, "merge topic"),
        ];
        let mut refs = Refs::new();
        refs.insert(hash("t"), vec!["main".into(), "HEAD".into()]);
        refs.insert(hash("u"), vec!["topic".into()]);
        Graph::build(commits, refs).unwrap()
    }

    #[test]
    fn reads_are_pure() {
        let graph = linear_with_topic();
        let topic = graph.branch_by_name("topic").unwrap();
        graph.visibility().hide(topic);

        for row in graph.rows() {
            assert_eq!(row.nodes(), row.nodes());
            for node in row.nodes() {
                assert_eq!(node.up_edges(), node.up_edges());
                assert_eq!(node.down_edges(), node.down_edges());
            }
        }
    }

    #[test]
    fn all_nodes_keeps_hidden_entries_in_order() {
        let graph = linear_with_topic();
        let topic = graph.branch_by_name("topic").unwrap();
        let row = graph.row(2);
        assert_eq!(row.nodes().len(), 1);

        graph.visibility().hide(topic);
        let all: Vec<_> = row.all_nodes().collect();
        assert_eq!(all.len(), 2);
        assert!(!all[0].is_visible());
        assert!(all[1].is_visible());
        assert_eq!(row.nodes(), vec![all[1]]);
    }

    #[test]
    fn node_accessors() {
        let graph = linear_with_topic();
        let t = graph.node(graph.node_by_hash(&hash("t")).unwrap());
        assert_eq!(t.row_index(), 3);
        assert_eq!(t.row().index(), 3);
        assert_eq!(t.commit().unwrap().message, "merge topic");
        assert_eq!(t.refs(), ["main".to_string(), "HEAD".to_string()]);
        assert_eq!(t.branch().name.as_deref(), Some("main"));
        assert_eq!(t.up_edges().len(), 2);
        assert!(t.down_edges().is_empty());

        let s = graph.node(graph.node_by_hash(&hash("s")).unwrap());
        let downs: Vec<usize> = s.down_edges().iter().map(|e| e.down_node().row_index()).collect();
        assert_eq!(downs, vec![2, 3]);
    }
}
