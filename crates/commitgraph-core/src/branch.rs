//! Branches: maximal first-parent chains of nodes.
//!
//! [`Branch`] records the chain and its boundary (where it forks off and
//! where it merges back), and [`BranchTable`] owns all branches of a graph.
//! Nodes and edges refer to branches by [`BranchId`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{BranchId, EdgeId, NodeId};

/// One line of development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    /// Ref name the branch was created from. Anonymous branches (reachable
    /// from no ref, or only through another branch) have none.
    pub name: Option<String>,
    /// Member nodes, ascending by row: `nodes[0]` is the tail.
    pub nodes: Vec<NodeId>,
    /// First parent of the tail, when the branch forks off another one.
    pub fork_point: Option<NodeId>,
    /// Lowest-row child of the head, when the branch is merged or built on.
    pub merge_target: Option<NodeId>,
    /// Collapsed-branch nodes shown while this branch is hidden, one per
    /// collapsed run, ascending by row.
    pub markers: Vec<NodeId>,
}

impl Branch {
    /// Lowest-row (oldest) member.
    pub fn tail(&self) -> NodeId {
        self.nodes[0]
    }

    /// Highest-row (newest) member.
    pub fn head(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Display label: the ref name, or `#<id>` for anonymous branches.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", self.id),
        }
    }
}

/// All branches of a graph, indexed by id and by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchTable {
    branches: Vec<Branch>,
    by_name: HashMap<String, BranchId>,
}

impl BranchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a branch. Ids must be handed out densely in order; the first
    /// branch to claim a name keeps it for lookups.
    pub(crate) fn push(&mut self, branch: Branch) -> BranchId {
        debug_assert_eq!(branch.id.index(), self.branches.len());
        let id = branch.id;
        if let Some(name) = &branch.name {
            self.by_name.entry(name.clone()).or_insert(id);
        }
        self.branches.push(branch);
        id
    }

    pub fn get(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.index())
    }

    pub fn by_name(&self, name: &str) -> Option<BranchId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn as_slice(&self) -> &[Branch] {
        &self.branches
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }
}

/// How one branch is tied to the others, from its side.
#[derive(Debug, Clone, Default)]
pub(crate) struct BranchWiring {
    /// Branches whose fork point lies on this branch.
    pub(crate) forked: SmallVec<[BranchId; 2]>,
    /// Branches whose merge target lies on this branch.
    pub(crate) merged: SmallVec<[BranchId; 2]>,
    /// Hide-branch edges of other branches leaving one of this branch's nodes.
    pub(crate) outbound: SmallVec<[EdgeId; 2]>,
    /// Hide-branch edges of other branches arriving at one of this branch's
    /// nodes.
    pub(crate) inbound: SmallVec<[EdgeId; 2]>,
}

/// Branch wiring for a whole graph, filled in by the builder.
#[derive(Debug, Clone, Default)]
pub(crate) struct Wiring {
    pub(crate) branches: Vec<BranchWiring>,
    pub(crate) forks_at: HashMap<NodeId, SmallVec<[BranchId; 2]>>,
    pub(crate) merges_at: HashMap<NodeId, SmallVec<[BranchId; 2]>>,
}

impl Wiring {
    pub(crate) fn new(branch_count: usize) -> Self {
        Wiring {
            branches: vec![BranchWiring::default(); branch_count],
            forks_at: HashMap::new(),
            merges_at: HashMap::new(),
        }
    }

    pub(crate) fn add_fork(&mut self, branch: BranchId, fork: NodeId, owner: BranchId) {
        self.branches[owner.index()].forked.push(branch);
        self.forks_at.entry(fork).or_default().push(branch);
    }

    pub(crate) fn add_merge(&mut self, branch: BranchId, target: NodeId, owner: BranchId) {
        self.branches[owner.index()].merged.push(branch);
        self.merges_at.entry(target).or_default().push(branch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(id: u32, name: Option<&str>, nodes: &[u32]) -> Branch {
        Branch {
            id: BranchId(id),
            name: name.map(str::to_string),
            nodes: nodes.iter().map(|&n| NodeId(n)).collect(),
            fork_point: None,
            merge_target: None,
            markers: vec![NodeId(100 + id)],
        }
    }

    #[test]
    fn head_and_tail_follow_row_order() {
        let b = branch(0, Some("main"), &[0, 1, 3]);
        assert_eq!(b.tail(), NodeId(0));
        assert_eq!(b.head(), NodeId(3));
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn labels() {
        assert_eq!(branch(0, Some("main"), &[0]).label(), "main");
        assert_eq!(branch(4, None, &[2]).label(), "#4");
    }

    #[test]
    fn first_name_wins_lookup() {
        let mut table = BranchTable::new();
        table.push(branch(0, Some("main"), &[0]));
        table.push(branch(1, None, &[1]));
        table.push(branch(2, Some("main"), &[2]));

        assert_eq!(table.len(), 3);
        assert_eq!(table.by_name("main"), Some(BranchId(0)));
        assert_eq!(table.by_name("nope"), None);
        assert!(table.get(BranchId(1)).unwrap().name.is_none());
        assert!(table.get(BranchId(3)).is_none());
    }
}
