//! Endpoint resolution for edges.
//!
//! Edges do not store their endpoints. The arena keeps each edge's physical
//! endpoints, and [`EdgeController`] turns those into the endpoints a reader
//! should see under one visibility snapshot.
//!
//! Parent edges always resolve to their physical endpoints. Every
//! hide-branch edge has a collapsed-branch node of its own branch at one
//! end; the other end is re-anchored when it sits inside another hidden
//! branch (chained collapses):
//!
//! - a hidden up endpoint moves to its branch's fork point, repeatedly,
//!   until a visible node is reached (nearest visible ancestor);
//! - a hidden down endpoint moves to its branch's merge target, repeatedly
//!   (nearest visible descendant).
//!
//! Rows strictly decrease along the first walk and strictly increase along
//! the second, so the resolved edge still points from a lower row to a
//! higher one. If a walk runs off the graph the edge cannot be anchored and
//! is not visible. Anchors are computed once per snapshot, so resolving an
//! edge is constant time.

use std::sync::Arc;

use crate::graph::Graph;
use crate::id::{BranchId, EdgeId, NodeId};
use crate::visibility::VisibilityState;

/// A visible edge with its resolved endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEdge {
    pub id: EdgeId,
    pub up: NodeId,
    pub down: NodeId,
}

/// Read-only endpoint resolver borrowed from a [`Graph`] and pinned to one
/// visibility snapshot. Toggles made after it was created are not observed.
#[derive(Clone)]
pub struct EdgeController<'g> {
    graph: &'g Graph,
    state: Arc<VisibilityState>,
}

impl<'g> EdgeController<'g> {
    pub(crate) fn new(graph: &'g Graph, state: Arc<VisibilityState>) -> Self {
        EdgeController { graph, state }
    }

    /// The snapshot every answer is computed from.
    pub fn state(&self) -> &VisibilityState {
        &self.state
    }

    /// The endpoints the edge was created with, `(up, down)`.
    ///
    /// # Panics
    ///
    /// Panics if the edge is unknown to this graph.
    pub fn physical_endpoints(&self, edge: EdgeId) -> (NodeId, NodeId) {
        self.graph.physical_endpoints(edge)
    }

    /// Current `(up, down)` endpoints, or `None` when a hide-branch edge
    /// cannot be anchored on visible nodes.
    pub fn resolve(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.state.resolve(self.graph, edge)
    }

    /// The up (parent side) endpoint. Falls back to the physical endpoint
    /// when the edge cannot be anchored.
    pub fn up_node(&self, edge: EdgeId) -> NodeId {
        match self.resolve(edge) {
            Some((up, _)) => up,
            None => self.physical_endpoints(edge).0,
        }
    }

    /// The down (child side) endpoint. Falls back to the physical endpoint
    /// when the edge cannot be anchored.
    pub fn down_node(&self, edge: EdgeId) -> NodeId {
        match self.resolve(edge) {
            Some((_, down)) => down,
            None => self.physical_endpoints(edge).1,
        }
    }

    /// Nearest visible node reached from `node` through fork points.
    pub fn anchor_up(&self, node: NodeId) -> Option<NodeId> {
        self.state.anchor_up(self.graph, node)
    }

    /// Nearest visible node reached from `node` through merge targets.
    pub fn anchor_down(&self, node: NodeId) -> Option<NodeId> {
        self.state.anchor_down(self.graph, node)
    }

    pub fn is_node_visible(&self, node: NodeId) -> bool {
        self.state.is_node_visible(self.graph, node)
    }

    /// The edge with its resolved endpoints, if it is visible.
    pub fn visible(&self, edge: EdgeId) -> Option<ResolvedEdge> {
        let (up, down) = self.state.visible_endpoints(self.graph, edge)?;
        Some(ResolvedEdge { id: edge, up, down })
    }

    /// Visible edges whose down endpoint resolves to `node`: the node's own
    /// incoming edges first, then edges re-anchored onto it through the
    /// hidden branches merging into it.
    pub fn edges_into(&self, node: NodeId) -> Vec<ResolvedEdge> {
        self.incident(node, Side::Down)
    }

    /// Visible edges whose up endpoint resolves to `node`: the node's own
    /// outgoing edges first, then edges re-anchored onto it through the
    /// hidden branches forking off it.
    pub fn edges_out_of(&self, node: NodeId) -> Vec<ResolvedEdge> {
        self.incident(node, Side::Up)
    }

    fn incident(&self, node: NodeId, side: Side) -> Vec<ResolvedEdge> {
        if !self.is_node_visible(node) {
            return Vec::new();
        }
        let lands = |edge: &ResolvedEdge| match side {
            Side::Up => edge.up == node,
            Side::Down => edge.down == node,
        };
        let data = self.graph.node_data(node);
        let own = match side {
            Side::Up => &data.down,
            Side::Down => &data.up,
        };
        let mut out: Vec<ResolvedEdge> = own
            .iter()
            .filter_map(|&edge| self.visible(edge))
            .filter(lands)
            .collect();

        // Hidden branches attached at `node`, then the hidden branches
        // attached to those.
        let attached = match side {
            Side::Up => self.graph.forks_at(node),
            Side::Down => self.graph.merges_at(node),
        };
        let mut stack: Vec<BranchId> = attached.iter().rev().copied().collect();
        while let Some(branch) = stack.pop() {
            if !self.state.is_hidden(branch) {
                continue;
            }
            let wiring = self.graph.wiring(branch);
            let (edges, next) = match side {
                Side::Up => (&wiring.outbound, &wiring.forked),
                Side::Down => (&wiring.inbound, &wiring.merged),
            };
            out.extend(edges.iter().filter_map(|&edge| self.visible(edge)).filter(lands));
            stack.extend(next.iter().rev().copied());
        }
        out
    }
}

/// Which end of an edge a node sits on.
#[derive(Clone, Copy)]
enum Side {
    Up,
    Down,
}
