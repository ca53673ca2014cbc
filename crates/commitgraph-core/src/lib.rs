//! Commit-graph model and visibility engine.
//!
//! Turns an ordered list of commits into rows of nodes joined by edges,
//! assigns every node and edge to a branch, and lets whole branches be
//! collapsed and expanded without rebuilding the graph.

pub mod branch;
pub mod build;
pub mod commit;
pub mod edge;
pub mod edge_controller;
pub mod error;
pub mod graph;
pub mod id;
pub mod log;
pub mod node;
pub mod view;
pub mod visibility;

// Re-export commonly used types
pub use branch::{Branch, BranchTable};
pub use build::{BuildOptions, CommitOrder, GraphBuilder};
pub use commit::{Commit, CommitHash, Refs};
pub use edge::{EdgeType, GraphEdge};
pub use edge_controller::{EdgeController, ResolvedEdge};
pub use error::CoreError;
pub use graph::{CommitDag, Graph, VisibleDag};
pub use id::{BranchId, EdgeId, NodeId};
pub use node::{GraphNode, NodeKind, NodeType};
pub use view::{EdgeView, NodeView, RowView};
pub use visibility::{VisibilityController, VisibilityState};
