//! Text and JSON listings of a built graph.
//!
//! Summaries are plain serializable snapshots taken under the current
//! visibility state; both output formats are produced from them.

use std::fmt::Write;

use commitgraph_core::{BranchId, Graph, NodeId, NodeType, NodeView};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RowSummary {
    pub row: usize,
    pub nodes: Vec<NodeSummary>,
}

#[derive(Debug, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub kind: NodeType,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Branch size, for collapsed-branch nodes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<usize>,
    /// Row indices of the nodes on the up side of this node's visible edges.
    pub parents: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct BranchSummary {
    pub id: BranchId,
    pub name: String,
    pub hidden: bool,
    pub commits: usize,
    pub head: Option<String>,
    pub fork_row: Option<usize>,
    pub merge_row: Option<usize>,
}

/// Rows holding at least one visible node.
pub fn row_summaries(graph: &Graph) -> Vec<RowSummary> {
    graph
        .rows()
        .filter_map(|row| {
            let nodes: Vec<NodeSummary> = row.nodes().iter().map(node_summary).collect();
            (!nodes.is_empty()).then(|| RowSummary {
                row: row.index(),
                nodes,
            })
        })
        .collect()
}

fn node_summary(node: &NodeView<'_>) -> NodeSummary {
    let kind = node.node_type();
    NodeSummary {
        id: node.id(),
        kind,
        branch: node.branch().label(),
        hash: node.hash().map(|h| h.short().to_string()),
        refs: node.refs().to_vec(),
        subject: node.commit().map(|c| c.message.clone()),
        collapsed: (kind == NodeType::CollapsedBranch).then(|| node.branch().len()),
        parents: node
            .up_edges()
            .iter()
            .map(|edge| edge.up_node().row_index())
            .collect(),
    }
}

pub fn branch_summaries(graph: &Graph) -> Vec<BranchSummary> {
    let visibility = graph.visibility();
    graph
        .branches()
        .iter()
        .map(|branch| BranchSummary {
            id: branch.id,
            name: branch.label(),
            hidden: visibility.is_hidden(branch.id),
            commits: branch.len(),
            head: graph
                .node(branch.head())
                .hash()
                .map(|h| h.short().to_string()),
            fork_row: branch.fork_point.map(|n| graph.node(n).row_index()),
            merge_row: branch.merge_target.map(|n| graph.node(n).row_index()),
        })
        .collect()
}

pub fn format_rows(rows: &[RowSummary]) -> String {
    let mut out = String::new();
    for row in rows {
        let nodes: Vec<String> = row.nodes.iter().map(format_node).collect();
        let _ = writeln!(out, "{}: {}", row.row, nodes.join("  |  "));
    }
    out
}

fn format_node(node: &NodeSummary) -> String {
    let mut text = match node.kind {
        NodeType::Commit => {
            let mut text = node.hash.clone().unwrap_or_default();
            if !node.refs.is_empty() {
                let _ = write!(text, " ({})", node.refs.join(", "));
            }
            if let Some(subject) = &node.subject {
                let _ = write!(text, " {subject}");
            }
            text
        }
        NodeType::UnknownAncestor => {
            format!("{} (not in log)", node.hash.as_deref().unwrap_or("?"))
        }
        NodeType::CollapsedBranch => {
            let count = node.collapsed.unwrap_or_default();
            let plural = if count == 1 { "" } else { "s" };
            format!("[{}: {count} commit{plural}]", node.branch)
        }
    };
    if !node.parents.is_empty() {
        let parents: Vec<String> = node.parents.iter().map(usize::to_string).collect();
        let _ = write!(text, " <- {}", parents.join(","));
    }
    text
}

pub fn format_branches(branches: &[BranchSummary]) -> String {
    let mut out = String::new();
    for branch in branches {
        let plural = if branch.commits == 1 { "" } else { "s" };
        let _ = write!(
            out,
            "#{} {}: {} commit{plural}",
            branch.id, branch.name, branch.commits
        );
        if let Some(head) = &branch.head {
            let _ = write!(out, ", head {head}");
        }
        if let Some(row) = branch.fork_row {
            let _ = write!(out, ", forks at row {row}");
        }
        if let Some(row) = branch.merge_row {
            let _ = write!(out, ", merges at row {row}");
        }
        let state = if branch.hidden { "hidden" } else { "visible" };
        let _ = writeln!(out, ", {state}");
    }
    out
}
