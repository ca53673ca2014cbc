//! One-shot construction of a [`Graph`] from log output.
//!
//! The builder trusts the input order and never sorts. In layout order every
//! parent must precede its children; a parent that shows up later is
//! reported as [`CoreError::ParentOutOfOrder`]. A parent that never shows
//! up (a log window cut by `--since` or `-n`) is not an error: it becomes an
//! unknown-ancestor node in its own row, slotted right before the first
//! child that references it.
//!
//! Construction runs in four passes, all linear in commits plus parent
//! edges:
//!
//! 1. lay out rows and resolve parent hashes to node ids;
//! 2. assign branches along first-parent chains, refs first;
//! 3. create nodes and parent edges in the arena;
//! 4. split every branch into collapsed runs and create one
//!    collapsed-branch node per run, plus its hide-branch edges.
//!
//! # Collapsed runs
//!
//! Walking a branch tail to head, an edge from an outside parent enters the
//! branch and an edge to an outside child leaves it. A run is a stretch of
//! the chain in which every entry comes before every exit, so each entry
//! reaches each exit of its own run and of every later run. A run gets one
//! collapsed-branch node `h`, with `u -> h` per entry parent `u`, `h -> w`
//! per exit child `w`, and `h -> h'` to the next run's node. That keeps
//! exactly the outside pairs connected through the branch, with at most
//! three hide-branch edges per parent edge plus one per branch.

use std::collections::HashMap;
use std::mem;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::branch::{Branch, BranchTable, Wiring};
use crate::commit::{Commit, CommitHash, Refs};
use crate::edge::GraphEdge;
use crate::error::CoreError;
use crate::graph::{CommitDag, Graph, RowData};
use crate::id::{BranchId, EdgeId, NodeId};
use crate::node::{GraphNode, NodeKind};

/// Order of the commits handed to the builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitOrder {
    /// Parents before children. Rows follow input order.
    #[default]
    OldestFirst,
    /// Children before parents, as `git log` prints by default. The input
    /// is reversed before layout.
    NewestFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub order: CommitOrder,
}

/// Builds a [`Graph`] from commits and refs.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    options: BuildOptions,
    refs: Refs,
}

/// A laid-out row before it becomes an arena node.
enum Slot {
    Commit(Commit),
    Missing(CommitHash),
}

/// A first-parent chain claimed during branch assignment, head first.
struct BranchSeed {
    name: Option<String>,
    chain: Vec<NodeId>,
}

impl GraphBuilder {
    pub fn new(options: BuildOptions) -> Self {
        GraphBuilder {
            options,
            refs: Refs::new(),
        }
    }

    /// Refs naming branch heads, in priority order.
    pub fn with_refs(mut self, refs: Refs) -> Self {
        self.refs = refs;
        self
    }

    pub fn build(self, mut commits: Vec<Commit>) -> Result<Graph, CoreError> {
        if self.options.order == CommitOrder::NewestFirst {
            commits.reverse();
        }

        // Pass 1: rows and parent resolution.
        let (slots, parents) = lay_out(commits)?;
        let row_count = slots.len();
        let mut children: Vec<SmallVec<[NodeId; 2]>> = vec![SmallVec::new(); row_count];
        for (child, list) in parents.iter().enumerate() {
            for &parent in list {
                children[parent.index()].push(NodeId(child as u32));
            }
        }

        let mut by_hash = HashMap::with_capacity(row_count);
        for (row, slot) in slots.iter().enumerate() {
            let hash = match slot {
                Slot::Commit(commit) => commit.hash.clone(),
                Slot::Missing(hash) => hash.clone(),
            };
            by_hash.insert(hash, NodeId(row as u32));
        }

        // Pass 2: branches.
        let mut node_refs: HashMap<NodeId, Vec<String>> = HashMap::new();
        let mut branch_of: Vec<Option<BranchId>> = vec![None; row_count];
        let mut seeds: Vec<BranchSeed> = Vec::new();
        for (hash, names) in &self.refs {
            let Some(&node) = by_hash.get(hash) else {
                tracing::warn!(%hash, ?names, "skipping refs to a commit outside the graph");
                continue;
            };
            node_refs.entry(node).or_default().extend(names.iter().cloned());
            if branch_of[node.index()].is_none() {
                claim_chain(node, names.first().cloned(), &parents, &mut branch_of, &mut seeds);
            }
        }
        for row in (0..row_count).rev() {
            if branch_of[row].is_none() {
                claim_chain(NodeId(row as u32), None, &parents, &mut branch_of, &mut seeds);
            }
        }
        let branch_of: Vec<BranchId> = branch_of
            .into_iter()
            .enumerate()
            .map(|(row, branch)| {
                branch.ok_or_else(|| CoreError::GraphInconsistency {
                    reason: format!("row {row} was not assigned a branch"),
                })
            })
            .collect::<Result<_, _>>()?;

        // Pass 3: arena nodes and parent edges.
        let mut dag = CommitDag::with_capacity(row_count + seeds.len(), row_count);
        let mut rows: Vec<RowData> = Vec::with_capacity(row_count);
        for (row, slot) in slots.into_iter().enumerate() {
            let kind = match slot {
                Slot::Commit(commit) => NodeKind::Commit(commit),
                Slot::Missing(hash) => NodeKind::UnknownAncestor(hash),
            };
            let id = NodeId::from(dag.add_node(GraphNode::new(kind, row, branch_of[row])));
            let mut data = RowData::default();
            data.nodes.push(id);
            rows.push(data);
        }
        for (child, list) in parents.iter().enumerate() {
            let child = NodeId(child as u32);
            for (position, &parent) in list.iter().enumerate() {
                let branch = if position == 0 {
                    branch_of[child.index()]
                } else {
                    branch_of[parent.index()]
                };
                connect(&mut dag, parent, child, GraphEdge::parent(branch));
            }
        }

        // Pass 4: branches, collapsed-branch nodes and hide-branch edges.
        let mut branches = BranchTable::new();
        let mut wiring = Wiring::new(seeds.len());
        for (index, seed) in seeds.into_iter().enumerate() {
            let id = BranchId(index as u32);
            let mut nodes = seed.chain;
            nodes.reverse();
            let tail = nodes[0];
            let head = nodes[nodes.len() - 1];

            let fork_point = parents[tail.index()].first().copied();
            let merge_target = children[head.index()].first().copied();
            if let Some(fork) = fork_point {
                wiring.add_fork(id, fork, branch_of[fork.index()]);
            }
            if let Some(target) = merge_target {
                wiring.add_merge(id, target, branch_of[target.index()]);
            }

            let mut markers = Vec::new();
            for run in collapsed_runs(id, &nodes, &parents, &children, &branch_of) {
                let hub = NodeId::from(dag.add_node(GraphNode::new(
                    NodeKind::CollapsedBranch,
                    run.row,
                    id,
                )));
                rows[run.row].nodes.push(hub);
                for up in run.entries {
                    let edge = connect(&mut dag, up, hub, GraphEdge::hide_branch(id));
                    wiring.branches[branch_of[up.index()].index()].outbound.push(edge);
                }
                if let Some(&previous) = markers.last() {
                    connect(&mut dag, previous, hub, GraphEdge::hide_branch(id));
                }
                for down in run.exits {
                    let edge = connect(&mut dag, hub, down, GraphEdge::hide_branch(id));
                    wiring.branches[branch_of[down.index()].index()].inbound.push(edge);
                }
                markers.push(hub);
            }

            branches.push(Branch {
                id,
                name: seed.name,
                nodes,
                fork_point,
                merge_target,
                markers,
            });
        }

        let graph = Graph::from_parts(dag, rows, branches, wiring, by_hash, node_refs);
        tracing::debug!(
            rows = graph.row_count(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            branches = graph.branch_count(),
            "built commit graph"
        );

        #[cfg(debug_assertions)]
        if let Err(err) = graph.validate() {
            panic!("builder produced an inconsistent graph: {err}");
        }

        Ok(graph)
    }
}

/// Resolves parent hashes to row ids, inserting unknown-ancestor rows for
/// parents absent from the input.
#[allow(clippy::type_complexity)]
fn lay_out(commits: Vec<Commit>) -> Result<(Vec<Slot>, Vec<SmallVec<[NodeId; 2]>>), CoreError> {
    let mut position: HashMap<CommitHash, usize> = HashMap::with_capacity(commits.len());
    for (index, commit) in commits.iter().enumerate() {
        if position.insert(commit.hash.clone(), index).is_some() {
            return Err(CoreError::DuplicateCommit {
                hash: commit.hash.clone(),
            });
        }
    }

    let mut slots: Vec<Slot> = Vec::with_capacity(commits.len());
    let mut parents: Vec<SmallVec<[NodeId; 2]>> = Vec::with_capacity(commits.len());
    let mut placed: HashMap<CommitHash, NodeId> = HashMap::with_capacity(commits.len());

    for commit in commits {
        let mut resolved: SmallVec<[NodeId; 2]> = SmallVec::new();
        for parent in &commit.parents {
            let id = match placed.get(parent) {
                Some(&id) => id,
                None if position.contains_key(parent) => {
                    return Err(CoreError::ParentOutOfOrder {
                        child: commit.hash.clone(),
                        parent: parent.clone(),
                    });
                }
                None => {
                    let id = NodeId(slots.len() as u32);
                    slots.push(Slot::Missing(parent.clone()));
                    parents.push(SmallVec::new());
                    placed.insert(parent.clone(), id);
                    id
                }
            };
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }
        let id = NodeId(slots.len() as u32);
        placed.insert(commit.hash.clone(), id);
        slots.push(Slot::Commit(commit));
        parents.push(resolved);
    }

    Ok((slots, parents))
}

/// Claims the first-parent chain starting at `start` for a new branch,
/// stopping at the first node that already belongs to one.
fn claim_chain(
    start: NodeId,
    name: Option<String>,
    parents: &[SmallVec<[NodeId; 2]>],
    branch_of: &mut [Option<BranchId>],
    seeds: &mut Vec<BranchSeed>,
) {
    let id = BranchId(seeds.len() as u32);
    let mut chain = Vec::new();
    let mut cursor = Some(start);
    while let Some(node) = cursor {
        if branch_of[node.index()].is_some() {
            break;
        }
        branch_of[node.index()] = Some(id);
        chain.push(node);
        cursor = parents[node.index()].first().copied();
    }
    seeds.push(BranchSeed { name, chain });
}

/// A stretch of a branch whose entries all precede its exits.
struct CollapsedRun {
    /// Row of the last entering node, or of the tail for a run nothing
    /// enters.
    row: usize,
    /// Outside parents entering the run.
    entries: IndexSet<NodeId>,
    /// Outside children leaving the run.
    exits: IndexSet<NodeId>,
}

impl CollapsedRun {
    fn at(row: usize) -> Self {
        CollapsedRun {
            row,
            entries: IndexSet::new(),
            exits: IndexSet::new(),
        }
    }
}

/// Splits `nodes` (tail first) into collapsed runs. An entry arriving after
/// the current run already has an exit starts the next run. There is always
/// at least one run and run rows strictly increase.
fn collapsed_runs(
    branch: BranchId,
    nodes: &[NodeId],
    parents: &[SmallVec<[NodeId; 2]>],
    children: &[SmallVec<[NodeId; 2]>],
    branch_of: &[BranchId],
) -> Vec<CollapsedRun> {
    let outside = |node: &&NodeId| branch_of[node.index()] != branch;
    let mut runs = Vec::new();
    // Primary node ids equal their rows.
    let mut current = CollapsedRun::at(nodes.first().map_or(0, |n| n.index()));
    for &node in nodes {
        let mut entering = parents[node.index()].iter().filter(outside).peekable();
        if entering.peek().is_some() {
            if !current.exits.is_empty() {
                runs.push(mem::replace(&mut current, CollapsedRun::at(node.index())));
            }
            current.row = node.index();
            current.entries.extend(entering.copied());
        }
        current
            .exits
            .extend(children[node.index()].iter().filter(outside).copied());
    }
    runs.push(current);
    runs
}

/// Adds an arena edge and records it on both endpoints.
fn connect(dag: &mut CommitDag, up: NodeId, down: NodeId, edge: GraphEdge) -> EdgeId {
    let id = EdgeId::from(dag.add_edge(up.into(), down.into(), edge));
    if let Some(data) = dag.node_weight_mut(up.into()) {
        data.down.push(id);
    }
    if let Some(data) = dag.node_weight_mut(down.into()) {
        data.up.push(id);
    }
    id
}
