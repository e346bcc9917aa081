// crates/judgnode-graph/src/types.rs
// ============================================================================
// Module: Graph Types
// Description: Typed nodes and typed edges of the relationship graph overlay.
// Purpose: Give every node/edge a schema-checked shape and a canonical key.
// Dependencies: judgnode-core, serde
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use judgnode_core::EdgeId;
use judgnode_core::NodeId;
use judgnode_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

/// The node types recognized by the graph schema.
///
/// # Invariants
/// - A node's canonical key is `type:identifier`; two nodes of different
///   types may share the same `identifier` without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// A fungible or non-fungible token.
    Token,
    /// A custodial or self-custodied wallet.
    Wallet,
    /// A project grouping repos, users, and tooling.
    Project,
    /// A source repository.
    Repo,
    /// A human or service account.
    User,
    /// An on-chain or off-chain contract.
    Contract,
    /// A generic, otherwise-untyped node.
    Node,
    /// A companion/pet entity tracked alongside its owner.
    Dog,
    /// A registered skill or tool.
    Tool,
}

impl NodeType {
    /// Attribute keys required on a node of this type.
    #[must_use]
    pub fn required_attributes(self) -> &'static [&'static str] {
        match self {
            Self::Token => &["symbol"],
            Self::Wallet => &["address"],
            Self::Project => &["name"],
            Self::Repo => &["name"],
            Self::User => &[],
            Self::Contract => &["address"],
            Self::Node => &[],
            Self::Dog => &["name"],
            Self::Tool => &["name"],
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Token => "token",
            Self::Wallet => "wallet",
            Self::Project => "project",
            Self::Repo => "repo",
            Self::User => "user",
            Self::Contract => "contract",
            Self::Node => "node",
            Self::Dog => "dog",
            Self::Tool => "tool",
        };
        f.write_str(label)
    }
}

/// The twelve edge-type labels recognized by the graph schema, each with an
/// endpoint-type constraint enforced by [`crate::GraphStore::add_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// A judgment was recorded against the target by the source.
    Judged,
    /// Source owns target.
    Owns,
    /// Source uses target.
    Uses,
    /// Source trusts target.
    Trusts,
    /// Source collaborates with target.
    CollaboratesWith,
    /// Source depends on target.
    DependsOn,
    /// Source audits target.
    Audits,
    /// Source mints target.
    Mints,
    /// Source holds target.
    Holds,
    /// Source reports to target.
    ReportsTo,
    /// Source supervises target.
    Supervises,
    /// A generic, otherwise-untyped relation.
    LinkedTo,
}

impl EdgeType {
    /// `(allowed source node types, allowed target node types)`. An empty
    /// slice means "any type".
    #[must_use]
    pub fn endpoint_constraint(self) -> (&'static [NodeType], &'static [NodeType]) {
        use NodeType::{Contract, Dog, Project, Repo, Token, Tool, User, Wallet};
        match self {
            Self::Judged => (&[], &[]),
            Self::Owns => (&[User, Wallet, Project], &[Wallet, Token, Repo, Dog, Contract]),
            Self::Uses => (&[User, Project], &[Tool, Contract]),
            Self::Trusts => (&[User], &[User]),
            Self::CollaboratesWith => (&[User], &[User]),
            Self::DependsOn => (&[Project, Repo], &[Project, Repo, Contract, Tool]),
            Self::Audits => (&[User], &[Contract, Repo, Project]),
            Self::Mints => (&[Wallet, Contract], &[Token]),
            Self::Holds => (&[Wallet], &[Token]),
            Self::ReportsTo => (&[User], &[User]),
            Self::Supervises => (&[User], &[User]),
            Self::LinkedTo => (&[], &[]),
        }
    }

    /// Default weight assigned when an edge is inserted without one
    /// (`φ^k` for `k` in `{0,1,2,3}`; significance rises geometrically with
    /// how relational, as opposed to structural, the edge type is).
    #[must_use]
    pub fn default_weight(self) -> f64 {
        let k = match self {
            Self::Judged | Self::LinkedTo => 0,
            Self::Owns | Self::Holds | Self::Mints => 1,
            Self::Uses | Self::DependsOn | Self::Audits => 2,
            Self::Trusts | Self::CollaboratesWith | Self::ReportsTo | Self::Supervises => 3,
        };
        judgnode_core::PHI.powi(k)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Judged => "judged",
            Self::Owns => "owns",
            Self::Uses => "uses",
            Self::Trusts => "trusts",
            Self::CollaboratesWith => "collaborates_with",
            Self::DependsOn => "depends_on",
            Self::Audits => "audits",
            Self::Mints => "mints",
            Self::Holds => "holds",
            Self::ReportsTo => "reports_to",
            Self::Supervises => "supervises",
            Self::LinkedTo => "linked_to",
        };
        f.write_str(label)
    }
}

/// Direction of traversal or adjacency lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Follow out-edges only.
    #[default]
    Out,
    /// Follow in-edges only.
    In,
    /// Follow both in- and out-edges.
    Both,
}

/// A typed node in the relationship graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Store-assigned identifier.
    pub id: NodeId,
    /// The node's type.
    pub node_type: NodeType,
    /// Type-unique identifier supplied by the caller.
    pub identifier: String,
    /// Free-form attributes.
    pub attributes: BTreeMap<String, String>,
    /// When the node was first inserted.
    pub created_at: Timestamp,
    /// When the node was last upserted.
    pub updated_at: Timestamp,
}

impl GraphNode {
    /// The canonical key `type:identifier` used for upsert deduplication.
    #[must_use]
    pub fn canonical_key(node_type: NodeType, identifier: &str) -> String {
        format!("{node_type}:{identifier}")
    }

    /// Returns the fields this node is missing per its type's schema.
    #[must_use]
    pub fn missing_attributes(&self) -> Vec<&'static str> {
        self.node_type
            .required_attributes()
            .iter()
            .filter(|key| !self.attributes.contains_key(**key))
            .copied()
            .collect()
    }
}

/// A typed, directed, weighted edge in the relationship graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Store-assigned identifier.
    pub id: EdgeId,
    /// The edge's type.
    pub edge_type: EdgeType,
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// Positive edge weight; higher means more significant.
    pub weight: f64,
    /// Free-form attributes.
    pub attributes: BTreeMap<String, String>,
    /// When the edge was first inserted.
    pub created_at: Timestamp,
}

impl GraphEdge {
    /// The canonical key `type:source:target` used for upsert deduplication.
    #[must_use]
    pub fn canonical_key(edge_type: EdgeType, source: NodeId, target: NodeId) -> String {
        format!("{edge_type}:{source}:{target}")
    }
}
