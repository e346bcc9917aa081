// crates/judgnode-graph/src/store.rs
// ============================================================================
// Module: Graph Store
// Description: Persistent map of typed nodes and directed typed edges.
// Purpose: Maintain primary, canonical-key, type-bucket, and adjacency
// indices in lockstep with every write.
// Dependencies: judgnode-core, std collections
// ============================================================================

//! ## Overview
//! [`GraphStore`] is the sole owner of nodes and edges (spec.md §3 ownership
//! rule: "Graph Nodes/Edges are exclusively owned by the Graph Store; callers
//! receive read-only snapshots"). Every mutation updates four indices
//! together: primary (`id -> value`), canonical key (`type:identifier ->
//! id`), type buckets (`type -> ids`), and adjacency (`node -> out/in edge
//! ids`).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use judgnode_core::EdgeId;
use judgnode_core::Clock;
use judgnode_core::NodeId;

use crate::types::Direction;
use crate::types::EdgeType;
use crate::types::GraphEdge;
use crate::types::GraphNode;
use crate::types::NodeType;

/// Errors raised while mutating a [`GraphStore`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GraphError {
    /// A node is missing required attributes for its type.
    #[error("node {identifier} of type {node_type} is missing attributes: {missing:?}")]
    InvalidNode {
        /// The node's canonical identifier.
        identifier: String,
        /// The node's declared type.
        node_type: NodeType,
        /// The attributes the schema requires but the node lacks.
        missing: Vec<&'static str>,
    },
    /// An edge's endpoints do not satisfy its edge type's constraint.
    #[error("edge {edge_type} rejects endpoint types source={source:?} target={target:?}")]
    IllegalEndpoints {
        /// The edge's declared type.
        edge_type: EdgeType,
        /// The source node's actual type.
        source: NodeType,
        /// The target node's actual type.
        target: NodeType,
    },
    /// An edge referenced a node id that does not exist.
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
}

/// Summary counts returned by [`GraphStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphStats {
    /// Total nodes.
    pub node_count: usize,
    /// Total edges.
    pub edge_count: usize,
}

/// Persistent map of typed nodes and directed typed edges.
///
/// # Invariants
/// - All four indices (primary, canonical key, type bucket, adjacency) are
///   updated together on every `add_node`/`add_edge`; no public method leaves
///   them observably inconsistent.
pub struct GraphStore {
    clock: std::sync::Arc<dyn Clock>,
    nodes: BTreeMap<NodeId, GraphNode>,
    edges: BTreeMap<EdgeId, GraphEdge>,
    node_key_index: BTreeMap<String, NodeId>,
    edge_key_index: BTreeMap<String, EdgeId>,
    type_buckets: BTreeMap<NodeType, BTreeSet<NodeId>>,
    out_adjacency: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    in_adjacency: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    next_node_id: u64,
    next_edge_id: u64,
}

impl GraphStore {
    /// Creates an empty graph store.
    #[must_use]
    pub fn new(clock: std::sync::Arc<dyn Clock>) -> Self {
        Self {
            clock,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            node_key_index: BTreeMap::new(),
            edge_key_index: BTreeMap::new(),
            type_buckets: BTreeMap::new(),
            out_adjacency: BTreeMap::new(),
            in_adjacency: BTreeMap::new(),
            next_node_id: 0,
            next_edge_id: 0,
        }
    }

    /// Inserts a node, or upserts (merging attributes) if its canonical key
    /// already exists.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidNode`] if the node is missing required
    /// attributes for its type.
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        identifier: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Result<NodeId, GraphError> {
        let identifier = identifier.into();
        let now = self.clock.now();
        let key = GraphNode::canonical_key(node_type, &identifier);

        if let Some(&existing_id) = self.node_key_index.get(&key) {
            if let Some(node) = self.nodes.get_mut(&existing_id) {
                node.attributes.extend(attributes);
                node.updated_at = now;
                let missing = node.missing_attributes();
                if !missing.is_empty() {
                    return Err(GraphError::InvalidNode { identifier, node_type, missing });
                }
            }
            return Ok(existing_id);
        }

        let id = NodeId::new(self.next_node_id);
        let node = GraphNode {
            id,
            node_type,
            identifier: identifier.clone(),
            attributes,
            created_at: now,
            updated_at: now,
        };
        let missing = node.missing_attributes();
        if !missing.is_empty() {
            return Err(GraphError::InvalidNode { identifier, node_type, missing });
        }
        self.next_node_id += 1;
        self.node_key_index.insert(key, id);
        self.type_buckets.entry(node_type).or_default().insert(id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Inserts an edge, or upserts (merging attributes, replacing weight) if
    /// its canonical key already exists.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if either endpoint does not exist,
    /// or [`GraphError::IllegalEndpoints`] if the endpoint types violate the
    /// edge type's constraint.
    pub fn add_edge(
        &mut self,
        edge_type: EdgeType,
        source: NodeId,
        target: NodeId,
        weight: Option<f64>,
        attributes: BTreeMap<String, String>,
    ) -> Result<EdgeId, GraphError> {
        let source_node = self.nodes.get(&source).ok_or(GraphError::UnknownNode(source))?;
        let target_node = self.nodes.get(&target).ok_or(GraphError::UnknownNode(target))?;
        let (allowed_sources, allowed_targets) = edge_type.endpoint_constraint();
        if !allowed_sources.is_empty() && !allowed_sources.contains(&source_node.node_type) {
            return Err(GraphError::IllegalEndpoints {
                edge_type,
                source: source_node.node_type,
                target: target_node.node_type,
            });
        }
        if !allowed_targets.is_empty() && !allowed_targets.contains(&target_node.node_type) {
            return Err(GraphError::IllegalEndpoints {
                edge_type,
                source: source_node.node_type,
                target: target_node.node_type,
            });
        }

        let now = self.clock.now();
        let weight = weight.unwrap_or_else(|| edge_type.default_weight());
        let key = GraphEdge::canonical_key(edge_type, source, target);

        if let Some(&existing_id) = self.edge_key_index.get(&key) {
            if let Some(edge) = self.edges.get_mut(&existing_id) {
                edge.attributes.extend(attributes);
                edge.weight = weight;
            }
            return Ok(existing_id);
        }

        let id = EdgeId::new(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.insert(
            id,
            GraphEdge { id, edge_type, source, target, weight, attributes, created_at: now },
        );
        self.edge_key_index.insert(key, id);
        self.out_adjacency.entry(source).or_default().insert(id);
        self.in_adjacency.entry(target).or_default().insert(id);
        Ok(id)
    }

    /// Looks up a node by id. Returns `None` rather than erroring on an
    /// absent id (spec.md §4.2: "reads of absent ids return a sentinel").
    #[must_use]
    pub fn get_node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// Looks up a node by its canonical `type:identifier` key.
    #[must_use]
    pub fn get_node_by_key(&self, node_type: NodeType, identifier: &str) -> Option<&GraphNode> {
        let key = GraphNode::canonical_key(node_type, identifier);
        self.node_key_index.get(&key).and_then(|id| self.nodes.get(id))
    }

    /// Returns every node of the given type.
    pub fn get_nodes_by_type(&self, node_type: NodeType) -> impl Iterator<Item = &GraphNode> {
        self.type_buckets
            .get(&node_type)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
    }

    /// Looks up an edge by id.
    #[must_use]
    pub fn get_edge(&self, id: EdgeId) -> Option<&GraphEdge> {
        self.edges.get(&id)
    }

    /// Returns edges incident to `node_id` in `direction`, optionally
    /// filtered by `edge_type`.
    pub fn get_edges(
        &self,
        node_id: NodeId,
        direction: Direction,
        edge_type: Option<EdgeType>,
    ) -> Vec<&GraphEdge> {
        let mut ids: BTreeSet<EdgeId> = BTreeSet::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            ids.extend(self.out_adjacency.get(&node_id).into_iter().flatten());
        }
        if matches!(direction, Direction::In | Direction::Both) {
            ids.extend(self.in_adjacency.get(&node_id).into_iter().flatten());
        }
        ids.iter()
            .filter_map(|id| self.edges.get(id))
            .filter(|edge| edge_type.is_none_or(|t| edge.edge_type == t))
            .collect()
    }

    /// Out-edges of `node_id`.
    #[must_use]
    pub fn out_edges(&self, node_id: NodeId) -> Vec<&GraphEdge> {
        self.get_edges(node_id, Direction::Out, None)
    }

    /// In-edges of `node_id`.
    #[must_use]
    pub fn in_edges(&self, node_id: NodeId) -> Vec<&GraphEdge> {
        self.get_edges(node_id, Direction::In, None)
    }

    /// Returns the distinct neighbor node ids of `node_id`.
    pub fn neighbors(
        &self,
        node_id: NodeId,
        direction: Direction,
        edge_type: Option<EdgeType>,
    ) -> BTreeSet<NodeId> {
        self.get_edges(node_id, direction, edge_type)
            .into_iter()
            .map(|edge| if edge.source == node_id { edge.target } else { edge.source })
            .collect()
    }

    /// Degree of `node_id` in `direction`.
    #[must_use]
    pub fn degree(&self, node_id: NodeId, direction: Direction) -> usize {
        self.get_edges(node_id, direction, None).len()
    }

    /// All node ids currently in the store.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// All edges currently in the store.
    pub fn all_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }

    /// All nodes currently in the store.
    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Summary counts.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats { node_count: self.nodes.len(), edge_count: self.edges.len() }
    }
}
