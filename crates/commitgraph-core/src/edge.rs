//! Graph arcs.
//!
//! Edges carry only their type and branch. Endpoints live in the arena
//! (petgraph keeps the physical source/target) and are resolved on demand
//! by the [`EdgeController`](crate::edge_controller::EdgeController), which
//! may re-anchor a hide-branch edge onto other nodes while branches are
//! collapsed.

use serde::{Deserialize, Serialize};

use crate::id::BranchId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// Ordinary parent (up) to child (down) ancestry.
    Parent,
    /// Synthetic edge standing in for a path through a hidden branch. It is
    /// only visible while its branch is hidden.
    HideBranch,
}

/// Edge weight stored in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub edge_type: EdgeType,
    /// For parent edges: the child's branch on a first-parent link, the
    /// parent's branch on a merge link. For hide-branch edges: the branch
    /// they replace.
    pub branch: BranchId,
}

impl GraphEdge {
    pub fn parent(branch: BranchId) -> Self {
        GraphEdge {
            edge_type: EdgeType::Parent,
            branch,
        }
    }

    pub fn hide_branch(branch: BranchId) -> Self {
        GraphEdge {
            edge_type: EdgeType::HideBranch,
            branch,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.edge_type == EdgeType::HideBranch
    }
}
