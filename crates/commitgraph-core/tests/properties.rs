//! Property tests over randomly generated histories.
//!
//! Histories mix roots, linear commits, merges and parents missing from
//! the window; refs name a few random commits so both named and anonymous
//! branches show up.

use std::collections::{HashMap, HashSet};

use commitgraph_core::{BranchId, Commit, CommitHash, EdgeView, Graph, NodeId, Refs};
use petgraph::visit::Dfs;
use proptest::prelude::*;
use proptest::sample::Index;

fn hash(s: String) -> CommitHash {
    CommitHash::parse(s).unwrap()
}

fn assemble(specs: Vec<(u8, Index, Index)>, heads: Vec<Index>) -> (Vec<Commit>, Refs) {
    let n = specs.len();
    let mut commits = Vec::with_capacity(n);
    for (i, (kind, a, b)) in specs.into_iter().enumerate() {
        let parents: Vec<CommitHash> = match kind {
            _ if i == 0 && kind < 3 => vec![hash(format!("gone{}", kind))],
            _ if i == 0 => vec![],
            0 => vec![],
            1 => vec![hash(format!("gone{}", i % 3))],
            2..=6 => vec![hash(format!("c{}", a.index(i)))],
            _ => {
                let (first, second) = (a.index(i), b.index(i));
                if first == second {
                    vec![hash(format!("c{first}"))]
                } else {
                    vec![hash(format!("c{first}")), hash(format!("c{second}"))]
                }
            }
        };
        commits.push(Commit::new(
            hash(format!("c{i}")),
            parents,
            "prop",
            i as i64,
            format!("commit {i}"),
        ));
    }

    let mut refs = Refs::new();
    for (j, head) in heads.into_iter().enumerate() {
        refs.entry(hash(format!("c{}", head.index(n))))
            .or_default()
            .push(format!("h{j}"));
    }
    (commits, refs)
}

fn history() -> impl Strategy<Value = (Vec<Commit>, Refs)> {
    (1usize..18)
        .prop_flat_map(|n| {
            (
                prop::collection::vec((0u8..10, any::<Index>(), any::<Index>()), n),
                prop::collection::vec(any::<Index>(), 0..4),
            )
        })
        .prop_map(|(specs, heads)| assemble(specs, heads))
}

type Snapshot = (Vec<Vec<NodeId>>, Vec<(u32, NodeId, NodeId)>);

fn snapshot(graph: &Graph) -> Snapshot {
    let rows = graph
        .rows()
        .map(|row| row.nodes().iter().map(|n| n.id()).collect())
        .collect();
    let edges = graph
        .edges()
        .filter(EdgeView::is_visible)
        .map(|e| (e.id().0, e.up_node().id(), e.down_node().id()))
        .collect();
    (rows, edges)
}

fn reachability(graph: &Graph) -> HashMap<NodeId, HashSet<NodeId>> {
    let dag = graph.visible_dag();
    let mut out = HashMap::new();
    for start in dag.node_indices() {
        let mut dfs = Dfs::new(&dag, start);
        let mut seen = HashSet::new();
        while let Some(idx) = dfs.next(&dag) {
            seen.insert(dag[idx]);
        }
        out.insert(dag[start], seen);
    }
    out
}

fn branch_ids(graph: &Graph) -> Vec<BranchId> {
    graph.branches().iter().map(|b| b.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn built_graphs_are_consistent((commits, refs) in history()) {
        let graph = Graph::build(commits, refs).unwrap();
        prop_assert!(graph.validate().is_ok());
    }

    #[test]
    fn every_node_sits_in_exactly_one_row((commits, refs) in history()) {
        let graph = Graph::build(commits, refs).unwrap();
        let mut seen = HashSet::new();
        for row in graph.rows() {
            for node in row.all_nodes() {
                prop_assert_eq!(node.row_index(), row.index());
                prop_assert!(seen.insert(node.id()), "node {} listed twice", node.id());
            }
        }
        prop_assert_eq!(seen.len(), graph.node_count());
    }

    #[test]
    fn visible_edges_point_down((commits, refs) in history()) {
        let graph = Graph::build(commits, refs).unwrap();
        for edge in graph.edges().filter(EdgeView::is_visible) {
            prop_assert!(edge.up_node().row_index() < edge.down_node().row_index());
            prop_assert!(!edge.is_synthetic());
        }
    }

    #[test]
    fn hide_is_idempotent_and_show_restores((commits, refs) in history()) {
        let graph = Graph::build(commits, refs).unwrap();
        let before = snapshot(&graph);
        for branch in branch_ids(&graph) {
            graph.visibility().hide(branch);
            let once = snapshot(&graph);
            graph.visibility().hide(branch);
            prop_assert_eq!(&snapshot(&graph), &once);
            graph.visibility().show(branch);
            prop_assert_eq!(&snapshot(&graph), &before);
        }
    }

    #[test]
    fn hiding_a_branch_preserves_connectivity((commits, refs) in history()) {
        let graph = Graph::build(commits, refs).unwrap();
        let before = reachability(&graph);
        for branch in branch_ids(&graph) {
            graph.visibility().hide(branch);
            let after = reachability(&graph);
            for (from, reached) in &before {
                let Some(now) = after.get(from) else { continue };
                for to in reached {
                    if to != from && after.contains_key(to) {
                        prop_assert!(
                            now.contains(to),
                            "hiding {} disconnected {} from {}", branch, from, to
                        );
                    }
                }
            }
            graph.visibility().show(branch);
        }
    }

    #[test]
    fn any_hidden_subset_keeps_a_valid_dag(
        (commits, refs) in history(),
        mask in any::<u32>(),
    ) {
        let graph = Graph::build(commits, refs).unwrap();
        for branch in branch_ids(&graph) {
            if mask & (1 << (branch.0 % 32)) != 0 {
                graph.visibility().hide(branch);
            }
        }
        prop_assert!(graph.validate().is_ok());
        prop_assert!(!petgraph::algo::is_cyclic_directed(&graph.visible_dag()));
    }

    #[test]
    fn visible_edges_join_distinct_pairs(
        (commits, refs) in history(),
        mask in any::<u32>(),
    ) {
        let graph = Graph::build(commits, refs).unwrap();
        for branch in branch_ids(&graph) {
            if mask & (1 << (branch.0 % 32)) != 0 {
                graph.visibility().hide(branch);
            }
        }
        let mut pairs = HashSet::new();
        for edge in graph.edges().filter(EdgeView::is_visible) {
            let pair = (edge.up_node().id(), edge.down_node().id());
            prop_assert!(pairs.insert(pair), "edge {} repeats {:?}", edge.id(), pair);
        }
        for row in graph.rows() {
            for node in row.nodes() {
                let ups: HashSet<NodeId> = node.up_edges().iter().map(|e| e.up_node().id()).collect();
                prop_assert_eq!(ups.len(), node.up_edges().len());
            }
        }
    }

    #[test]
    fn hide_branch_edges_stay_linear((commits, refs) in history()) {
        let graph = Graph::build(commits, refs).unwrap();
        let parent_edges = graph.edges().filter(|e| !e.is_synthetic()).count();
        prop_assert!(graph.edge_count() <= 4 * parent_edges + graph.branch_count());
    }

    #[test]
    fn node_edge_lists_match_the_visible_edges(
        (commits, refs) in history(),
        mask in any::<u32>(),
    ) {
        let graph = Graph::build(commits, refs).unwrap();
        for branch in branch_ids(&graph) {
            if mask & (1 << (branch.0 % 32)) != 0 {
                graph.visibility().hide(branch);
            }
        }
        let mut listed: Vec<u32> = graph
            .rows()
            .flat_map(|row| row.nodes())
            .flat_map(|node| node.up_edges())
            .map(|e| e.id().0)
            .collect();
        listed.sort_unstable();
        let visible: Vec<u32> = graph.edges().filter(EdgeView::is_visible).map(|e| e.id().0).collect();
        prop_assert_eq!(listed, visible);
    }

    #[test]
    fn reads_are_pure((commits, refs) in history(), mask in any::<u32>()) {
        let graph = Graph::build(commits, refs).unwrap();
        for branch in branch_ids(&graph) {
            if mask & (1 << (branch.0 % 32)) != 0 {
                graph.visibility().hide(branch);
            }
        }
        for row in graph.rows() {
            prop_assert_eq!(row.nodes(), row.nodes());
            for node in row.nodes() {
                prop_assert_eq!(node.up_edges(), node.up_edges());
                prop_assert_eq!(node.down_edges(), node.down_edges());
            }
        }
    }
}
