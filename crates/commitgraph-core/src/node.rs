//! Graph vertices.
//!
//! Every row holds one primary node, either a [`NodeKind::Commit`] or an
//! [`NodeKind::UnknownAncestor`] placeholder for a parent missing from the
//! input window. Each branch additionally owns one
//! [`NodeKind::CollapsedBranch`] node per collapsed run (see
//! [`crate::build`]); together they stand in for the branch while it is
//! hidden.
//!
//! Visibility is never stored here. It is derived on every read by the
//! [`VisibilityController`](crate::visibility::VisibilityController).

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::commit::{Commit, CommitHash};
use crate::id::{BranchId, EdgeId};

/// Discriminant of [`NodeKind`], for callers that only need the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// A real commit from the log.
    Commit,
    /// The edge node drawn in place of a hidden branch.
    CollapsedBranch,
    /// Boundary node for a parent hash that never appeared in the input.
    UnknownAncestor,
}

/// What a node stands for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Commit(Commit),
    CollapsedBranch,
    UnknownAncestor(CommitHash),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Commit(_) => NodeType::Commit,
            NodeKind::CollapsedBranch => NodeType::CollapsedBranch,
            NodeKind::UnknownAncestor(_) => NodeType::UnknownAncestor,
        }
    }
}

/// Node weight stored in the graph arena.
///
/// `up` and `down` are the node's own incident edges in insertion order.
/// Edges re-anchored onto the node are found through the branch wiring, not
/// stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub kind: NodeKind,
    /// Physical row index.
    pub row: usize,
    pub branch: BranchId,
    pub(crate) up: SmallVec<[EdgeId; 2]>,
    pub(crate) down: SmallVec<[EdgeId; 2]>,
}

impl GraphNode {
    pub(crate) fn new(kind: NodeKind, row: usize, branch: BranchId) -> Self {
        GraphNode {
            kind,
            row,
            branch,
            up: SmallVec::new(),
            down: SmallVec::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// The commit this node is bound to, if it is a commit node.
    pub fn commit(&self) -> Option<&Commit> {
        match &self.kind {
            NodeKind::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    /// The hash this node represents. Collapsed-branch nodes have none.
    pub fn hash(&self) -> Option<&CommitHash> {
        match &self.kind {
            NodeKind::Commit(commit) => Some(&commit.hash),
            NodeKind::UnknownAncestor(hash) => Some(hash),
            NodeKind::CollapsedBranch => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_type() {
        let hash = CommitHash::parse("f00d").unwrap();
        let commit = Commit::new(hash.clone(), [], "ann", 0, "root");

        let node = GraphNode::new(NodeKind::Commit(commit), 0, BranchId(0));
        assert_eq!(node.node_type(), NodeType::Commit);
        assert_eq!(node.hash(), Some(&hash));
        assert!(node.commit().is_some());

        let missing = GraphNode::new(NodeKind::UnknownAncestor(hash.clone()), 1, BranchId(0));
        assert_eq!(missing.node_type(), NodeType::UnknownAncestor);
        assert_eq!(missing.hash(), Some(&hash));
        assert!(missing.commit().is_none());

        let marker = GraphNode::new(NodeKind::CollapsedBranch, 1, BranchId(1));
        assert_eq!(marker.node_type(), NodeType::CollapsedBranch);
        assert_eq!(marker.hash(), None);
    }
}
