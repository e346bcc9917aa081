// crates/judgnode-graph/src/lib.rs
// ============================================================================
// Module: Judgment Node Graph
// Description: Typed-node / typed-edge relationship graph overlay.
// Purpose: Persist the graph store and answer structural queries over it.
// Dependencies: judgnode-core
// ============================================================================

//! ## Overview
//! The relationship graph overlay: a [`store::GraphStore`] of typed nodes and
//! directed typed edges, [`traversal`] algorithms that read it through
//! borrowed snapshots, and a [`query::Query`] builder composing both.

pub mod query;
pub mod store;
pub mod traversal;
pub mod types;

pub use query::Operator;
pub use query::Query;
pub use query::SortOrder;
pub use store::GraphError;
pub use store::GraphStats;
pub use store::GraphStore;
pub use traversal::TraversalStep;
pub use traversal::WeightedPath;
pub use traversal::all_paths;
pub use traversal::bfs;
pub use traversal::connected_components;
pub use traversal::degree_centrality;
pub use traversal::dfs;
pub use traversal::pagerank;
pub use traversal::shortest_path;
pub use traversal::subgraph;
pub use traversal::triangles;
pub use traversal::weighted_path;
pub use types::Direction;
pub use types::EdgeType;
pub use types::GraphEdge;
pub use types::GraphNode;
pub use types::NodeType;
