//! The visibility layer.
//!
//! [`VisibilityController`] is the single source of truth for whether a node
//! or edge is observable, and the only component that mutates visibility
//! state. The state is one flag per branch; `hide`/`show` never touch the
//! graph topology.
//!
//! State is published as immutable [`VisibilityState`] snapshots behind an
//! `RwLock` (single writer, many readers, copy-on-write). A reader takes one
//! snapshot per query and answers the whole query from it, so a concurrent
//! `hide`/`show` is observed either entirely or not at all.
//!
//! Each snapshot also carries the re-anchoring targets of every hidden
//! branch, computed when the snapshot is published:
//!
//! - the up anchor is the nearest visible node reached through fork points;
//! - the down anchor is the nearest visible node reached through merge
//!   targets.
//!
//! Rows strictly decrease along fork points and strictly increase along
//! merge targets, so both walks terminate. Publishing is linear in the
//! number of branches and every read-side lookup is constant time.

use std::sync::{Arc, PoisonError, RwLock};

use crate::edge::EdgeType;
use crate::graph::Graph;
use crate::id::{BranchId, EdgeId, NodeId};
use crate::node::NodeType;

/// Where a branch attaches to the rest of the graph: `(node, owner)` pairs
/// for its fork point and merge target.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BranchLinks {
    pub(crate) fork: Option<(NodeId, BranchId)>,
    pub(crate) merge: Option<(NodeId, BranchId)>,
}

/// One published visibility state.
#[derive(Debug, Clone)]
pub struct VisibilityState {
    hidden: Vec<bool>,
    up_anchor: Vec<Option<NodeId>>,
    down_anchor: Vec<Option<NodeId>>,
    generation: u64,
}

impl VisibilityState {
    fn publish(hidden: Vec<bool>, links: &[BranchLinks], generation: u64) -> Self {
        let up_anchor = resolve_anchors(&hidden, |b| links.get(b).and_then(|l| l.fork));
        let down_anchor = resolve_anchors(&hidden, |b| links.get(b).and_then(|l| l.merge));
        VisibilityState {
            hidden,
            up_anchor,
            down_anchor,
            generation,
        }
    }

    pub fn is_hidden(&self, branch: BranchId) -> bool {
        self.hidden.get(branch.index()).copied().unwrap_or(false)
    }

    /// Bumped on every hide/show that changes state. Lets callers cache
    /// filtered views and invalidate them by comparing generations.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Commit and placeholder nodes are visible while their branch is shown;
    /// a collapsed-branch node is visible exactly while its branch is hidden.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not belong to `graph`.
    pub fn is_node_visible(&self, graph: &Graph, node: NodeId) -> bool {
        let data = graph.node_data(node);
        let hidden = self.is_hidden(data.branch);
        match data.node_type() {
            NodeType::Commit | NodeType::UnknownAncestor => !hidden,
            NodeType::CollapsedBranch => hidden,
        }
    }

    /// Nearest visible node reached from `node` through fork points.
    pub fn anchor_up(&self, graph: &Graph, node: NodeId) -> Option<NodeId> {
        self.anchor(graph, node, &self.up_anchor)
    }

    /// Nearest visible node reached from `node` through merge targets.
    pub fn anchor_down(&self, graph: &Graph, node: NodeId) -> Option<NodeId> {
        self.anchor(graph, node, &self.down_anchor)
    }

    fn anchor(&self, graph: &Graph, node: NodeId, anchors: &[Option<NodeId>]) -> Option<NodeId> {
        if self.is_node_visible(graph, node) {
            return Some(node);
        }
        let data = graph.node_data(node);
        match data.node_type() {
            NodeType::CollapsedBranch => None,
            NodeType::Commit | NodeType::UnknownAncestor => {
                anchors.get(data.branch.index()).copied().flatten()
            }
        }
    }

    /// Current `(up, down)` endpoints, or `None` when a hide-branch edge
    /// cannot be anchored on visible nodes.
    pub fn resolve(&self, graph: &Graph, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        let (up, down) = graph.physical_endpoints(edge);
        match graph.edge_data(edge).edge_type {
            EdgeType::Parent => Some((up, down)),
            EdgeType::HideBranch => Some((self.anchor_up(graph, up)?, self.anchor_down(graph, down)?)),
        }
    }

    /// Parent edges are visible while both endpoints are. Hide-branch edges
    /// are visible while their branch is hidden, both ends can be anchored,
    /// and no other edge already stands for the same pair of anchors.
    ///
    /// # Panics
    ///
    /// Panics if `edge` does not belong to `graph`.
    pub fn is_edge_visible(&self, graph: &Graph, edge: EdgeId) -> bool {
        self.visible_endpoints(graph, edge).is_some()
    }

    /// Resolved endpoints of a visible edge; `None` for invisible ones.
    pub fn visible_endpoints(&self, graph: &Graph, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        let data = graph.edge_data(edge);
        let physical = graph.physical_endpoints(edge);
        match data.edge_type {
            EdgeType::Parent => (self.is_node_visible(graph, physical.0)
                && self.is_node_visible(graph, physical.1))
            .then_some(physical),
            EdgeType::HideBranch => {
                if !self.is_hidden(data.branch) {
                    return None;
                }
                let resolved = self.resolve(graph, edge)?;
                (!self.is_shadowed(graph, edge, physical, resolved)).then_some(resolved)
            }
        }
    }

    /// Every hide-branch edge has a collapsed-branch node of its own branch
    /// at one end, and that end never moves. Edges re-anchored onto the same
    /// pair are folded into one: an edge still on its own endpoints wins,
    /// otherwise the lowest id does.
    fn is_shadowed(
        &self,
        graph: &Graph,
        edge: EdgeId,
        physical: (NodeId, NodeId),
        resolved: (NodeId, NodeId),
    ) -> bool {
        if physical == resolved {
            return false;
        }
        let moved_up = physical.1 == resolved.1;
        let hub = graph.node_data(if moved_up { resolved.1 } else { resolved.0 });
        let siblings = if moved_up { &hub.up } else { &hub.down };
        siblings.iter().any(|&other| {
            other != edge
                && graph.edge_data(other).edge_type == EdgeType::HideBranch
                && self.resolve(graph, other) == Some(resolved)
                && (graph.physical_endpoints(other) == resolved || other < edge)
        })
    }
}

/// Per-branch anchor for every hidden branch, following `link` until it
/// lands on a node of a shown branch. Branches on one walk share the same
/// anchor, so each branch is visited once.
fn resolve_anchors(
    hidden: &[bool],
    link: impl Fn(usize) -> Option<(NodeId, BranchId)>,
) -> Vec<Option<NodeId>> {
    let mut resolved: Vec<Option<Option<NodeId>>> = vec![None; hidden.len()];
    let mut path = Vec::new();
    for start in 0..hidden.len() {
        if !hidden[start] || resolved[start].is_some() {
            continue;
        }
        let mut current = start;
        let anchor = loop {
            path.push(current);
            let Some((node, owner)) = link(current) else {
                break None;
            };
            let owner = owner.index();
            if !hidden.get(owner).copied().unwrap_or(false) {
                break Some(node);
            }
            if let Some(known) = resolved[owner] {
                break known;
            }
            current = owner;
        };
        for branch in path.drain(..) {
            resolved[branch] = Some(anchor);
        }
    }
    resolved.into_iter().map(Option::flatten).collect()
}

#[derive(Debug)]
pub struct VisibilityController {
    links: Vec<BranchLinks>,
    state: RwLock<Arc<VisibilityState>>,
}

impl VisibilityController {
    /// Creates a controller for `branch_count` unlinked branches, all shown.
    pub fn new(branch_count: usize) -> Self {
        Self::with_links(vec![BranchLinks::default(); branch_count])
    }

    pub(crate) fn with_links(links: Vec<BranchLinks>) -> Self {
        let state = VisibilityState::publish(vec![false; links.len()], &links, 0);
        VisibilityController {
            links,
            state: RwLock::new(Arc::new(state)),
        }
    }

    /// The current state. Holding the snapshot does not block writers.
    pub fn snapshot(&self) -> Arc<VisibilityState> {
        // Snapshots are swapped whole, so a poisoned lock still guards a
        // complete state.
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Hides a branch. Returns `true` if the branch was visible before.
    ///
    /// Unknown branches are ignored.
    pub fn hide(&self, branch: BranchId) -> bool {
        self.set_hidden(branch, true)
    }

    /// Shows a branch. Returns `true` if the branch was hidden before.
    ///
    /// Unknown branches are ignored.
    pub fn show(&self, branch: BranchId) -> bool {
        self.set_hidden(branch, false)
    }

    /// Shows every branch.
    pub fn show_all(&self) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.hidden.iter().any(|&hidden| hidden) {
            return;
        }
        let next = VisibilityState::publish(
            vec![false; self.links.len()],
            &self.links,
            guard.generation + 1,
        );
        *guard = Arc::new(next);
        tracing::trace!("all branches shown");
    }

    fn set_hidden(&self, branch: BranchId, hidden: bool) -> bool {
        if branch.index() >= self.links.len() {
            tracing::debug!(%branch, hidden, "ignoring visibility change for unknown branch");
            return false;
        }
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if guard.hidden[branch.index()] == hidden {
            return false;
        }
        let mut flags = guard.hidden.clone();
        flags[branch.index()] = hidden;
        *guard = Arc::new(VisibilityState::publish(flags, &self.links, guard.generation + 1));
        tracing::trace!(%branch, hidden, "branch visibility changed");
        true
    }

    pub fn is_hidden(&self, branch: BranchId) -> bool {
        self.snapshot().is_hidden(branch)
    }

    /// Currently hidden branches, ascending by id.
    pub fn hidden_branches(&self) -> Vec<BranchId> {
        self.snapshot()
            .hidden
            .iter()
            .enumerate()
            .filter(|(_, hidden)| **hidden)
            .map(|(index, _)| BranchId(index as u32))
            .collect()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    /// See [`VisibilityState::is_node_visible`].
    pub fn is_node_visible(&self, graph: &Graph, node: NodeId) -> bool {
        self.snapshot().is_node_visible(graph, node)
    }

    /// See [`VisibilityState::is_edge_visible`].
    pub fn is_edge_visible(&self, graph: &Graph, edge: EdgeId) -> bool {
        self.snapshot().is_edge_visible(graph, edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hide_and_show_are_idempotent() {
        let vis = VisibilityController::new(3);
        assert!(vis.hide(BranchId(1)));
        assert!(!vis.hide(BranchId(1)));
        assert!(vis.is_hidden(BranchId(1)));
        assert_eq!(vis.generation(), 1);

        assert!(vis.show(BranchId(1)));
        assert!(!vis.show(BranchId(1)));
        assert!(!vis.is_hidden(BranchId(1)));
        assert_eq!(vis.generation(), 2);
    }

    #[test]
    fn unknown_branch_is_a_no_op() {
        let vis = VisibilityController::new(1);
        assert!(!vis.hide(BranchId(7)));
        assert!(!vis.is_hidden(BranchId(7)));
        assert_eq!(vis.generation(), 0);
    }

    #[test]
    fn hidden_branches_and_show_all() {
        let vis = VisibilityController::new(4);
        vis.hide(BranchId(3));
        vis.hide(BranchId(0));
        assert_eq!(vis.hidden_branches(), vec![BranchId(0), BranchId(3)]);

        vis.show_all();
        assert!(vis.hidden_branches().is_empty());
        assert_eq!(vis.generation(), 3);

        vis.show_all();
        assert_eq!(vis.generation(), 3);
    }

    #[test]
    fn snapshots_are_isolated_from_later_toggles() {
        let vis = VisibilityController::new(2);
        let before = vis.snapshot();
        vis.hide(BranchId(1));
        let after = vis.snapshot();

        assert!(!before.is_hidden(BranchId(1)));
        assert!(after.is_hidden(BranchId(1)));
        assert_eq!(before.generation() + 1, after.generation());
    }

    #[test]
    fn anchors_follow_hidden_chains() {
        // 0 <- 1 <- 2 by fork points; 2 -> 1 -> 0 by merge targets.
        let links = vec![
            BranchLinks::default(),
            BranchLinks {
                fork: Some((NodeId(10), BranchId(0))),
                merge: Some((NodeId(11), BranchId(0))),
            },
            BranchLinks {
                fork: Some((NodeId(20), BranchId(1))),
                merge: Some((NodeId(21), BranchId(1))),
            },
        ];
        let hidden = vec![false, true, true];
        let ups = resolve_anchors(&hidden, |b| links[b].fork);
        let downs = resolve_anchors(&hidden, |b| links[b].merge);
        assert_eq!(ups, vec![None, Some(NodeId(10)), Some(NodeId(10))]);
        assert_eq!(downs, vec![None, Some(NodeId(11)), Some(NodeId(11))]);

        let all_hidden = vec![true, true, true];
        let ups = resolve_anchors(&all_hidden, |b| links[b].fork);
        assert_eq!(ups, vec![None, None, None]);
    }
}
