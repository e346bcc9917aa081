// crates/judgnode-graph/src/query.rs
// ============================================================================
// Module: Graph Query Builder
// Description: Composable, side-effect-free query surface over a GraphStore.
// Purpose: Let callers compose node/edge-type/attribute/depth filters
// without hand-rolling traversal each time.
// Dependencies: judgnode-graph::{store, traversal, types}
// ============================================================================

use std::collections::BTreeSet;

use judgnode_core::NodeId;

use crate::store::GraphStore;
use crate::traversal::bfs;
use crate::types::Direction;
use crate::types::EdgeType;
use crate::types::GraphEdge;
use crate::types::GraphNode;
use crate::types::NodeType;

/// A comparison operator usable in [`Query::where_attr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// substring match
    Contains,
    /// prefix match
    StartsWith,
    /// membership in a value set
    In,
}

#[derive(Debug, Clone)]
struct AttributeFilter {
    field: String,
    operator: Operator,
    value: Vec<String>,
}

impl AttributeFilter {
    fn matches(&self, attributes: &std::collections::BTreeMap<String, String>) -> bool {
        let Some(actual) = attributes.get(&self.field) else { return false };
        match self.operator {
            Operator::Eq => self.value.first().is_some_and(|v| v == actual),
            Operator::Ne => self.value.first().is_some_and(|v| v != actual),
            Operator::Lt => self.value.first().is_some_and(|v| actual < v),
            Operator::Le => self.value.first().is_some_and(|v| actual <= v),
            Operator::Gt => self.value.first().is_some_and(|v| actual > v),
            Operator::Ge => self.value.first().is_some_and(|v| actual >= v),
            Operator::Contains => self.value.first().is_some_and(|v| actual.contains(v.as_str())),
            Operator::StartsWith => self.value.first().is_some_and(|v| actual.starts_with(v.as_str())),
            Operator::In => self.value.iter().any(|v| v == actual),
        }
    }
}

/// Sort order for [`Query::sort_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// A composable, pure read-only query over a [`GraphStore`].
///
/// # Invariants
/// - Building and running a query never mutates the store.
#[derive(Debug, Clone, Default)]
pub struct Query {
    from_ids: Vec<NodeId>,
    node_type: Option<NodeType>,
    edge_type: Option<EdgeType>,
    attribute_filters: Vec<AttributeFilter>,
    depth: u32,
    direction: Direction,
    limit: Option<usize>,
    sort_by: Option<(String, SortOrder)>,
}

impl Query {
    /// Starts a query rooted at `ids`. An empty root set matches every node
    /// in the store (subject to the other filters).
    #[must_use]
    pub fn from(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self { from_ids: ids.into_iter().collect(), depth: 0, ..Default::default() }
    }

    /// Restricts results to nodes of `node_type`.
    #[must_use]
    pub fn node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Restricts traversal to edges of `edge_type`.
    #[must_use]
    pub fn edge_type(mut self, edge_type: EdgeType) -> Self {
        self.edge_type = Some(edge_type);
        self
    }

    /// Adds an attribute filter. Multiple calls are ANDed together.
    #[must_use]
    pub fn where_attr(mut self, field: impl Into<String>, operator: Operator, value: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.attribute_filters.push(AttributeFilter {
            field: field.into(),
            operator,
            value: value.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Sets the traversal depth from the root set (0 = roots only).
    #[must_use]
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Sets traversal direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Caps the number of results returned.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sorts results by an attribute field.
    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some((field.into(), order));
        self
    }

    fn candidate_ids(&self, store: &GraphStore) -> BTreeSet<NodeId> {
        if self.from_ids.is_empty() {
            return store.node_ids().collect();
        }
        let mut reached: BTreeSet<NodeId> = BTreeSet::new();
        for &root in &self.from_ids {
            reached.extend(bfs(store, root, self.depth, self.direction, self.edge_type).map(|step| step.node));
        }
        reached
    }

    fn matches(&self, node: &GraphNode) -> bool {
        self.node_type.is_none_or(|t| node.node_type == t)
            && self.attribute_filters.iter().all(|filter| filter.matches(&node.attributes))
    }

    /// Evaluates the query, returning matching nodes.
    #[must_use]
    pub fn nodes<'a>(&self, store: &'a GraphStore) -> Vec<&'a GraphNode> {
        let mut results: Vec<&GraphNode> = self
            .candidate_ids(store)
            .into_iter()
            .filter_map(|id| store.get_node(id))
            .filter(|node| self.matches(node))
            .collect();
        if let Some((field, order)) = &self.sort_by {
            results.sort_by(|a, b| {
                let ordering = a.attributes.get(field).cmp(&b.attributes.get(field));
                if *order == SortOrder::Desc { ordering.reverse() } else { ordering }
            });
        } else {
            results.sort_by_key(|node| node.id);
        }
        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
        results
    }

    /// Evaluates the query, returning edges whose endpoints both satisfy it.
    #[must_use]
    pub fn edges<'a>(&self, store: &'a GraphStore) -> Vec<&'a GraphEdge> {
        let matching_ids: BTreeSet<NodeId> = self.nodes(store).into_iter().map(|node| node.id).collect();
        let mut edges: Vec<&GraphEdge> = store
            .all_edges()
            .filter(|edge| {
                matching_ids.contains(&edge.source)
                    && matching_ids.contains(&edge.target)
                    && self.edge_type.is_none_or(|t| edge.edge_type == t)
            })
            .collect();
        edges.sort_by_key(|edge| edge.id);
        if let Some(limit) = self.limit {
            edges.truncate(limit);
        }
        edges
    }

    /// Evaluates the query, returning the matching node count.
    #[must_use]
    pub fn count(&self, store: &GraphStore) -> usize {
        self.nodes(store).len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use std::sync::Arc;

    use judgnode_core::FixedClock;
    use judgnode_core::Timestamp;

    use super::Operator;
    use super::Query;
    use crate::store::GraphStore;
    use crate::types::Direction;
    use crate::types::EdgeType;
    use crate::types::NodeType;

    #[test]
    fn filters_by_node_type_and_attribute() {
        let mut store = GraphStore::new(Arc::new(FixedClock::new(Timestamp::from_millis(0))));
        let mut attrs = std::collections::BTreeMap::new();
        attrs.insert("name".to_string(), "alpha".to_string());
        store.add_node(NodeType::Repo, "r1", attrs).expect("valid node");
        store.add_node(NodeType::User, "u1", Default::default()).expect("valid node");

        let results = Query::from([])
            .node_type(NodeType::Repo)
            .where_attr("name", Operator::Eq, ["alpha"])
            .nodes(&store);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node_type, NodeType::Repo);
    }

    #[test]
    fn traverses_from_roots_within_depth() {
        let mut store = GraphStore::new(Arc::new(FixedClock::new(Timestamp::from_millis(0))));
        let a = store.add_node(NodeType::User, "a", Default::default()).expect("valid node");
        let b = store.add_node(NodeType::User, "b", Default::default()).expect("valid node");
        let c = store.add_node(NodeType::User, "c", Default::default()).expect("valid node");
        store.add_edge(EdgeType::Trusts, a, b, None, Default::default()).expect("valid edge");
        store.add_edge(EdgeType::Trusts, b, c, None, Default::default()).expect("valid edge");

        let within_one = Query::from([a]).direction(Direction::Out).depth(1).nodes(&store);
        assert_eq!(within_one.len(), 2);

        let within_two = Query::from([a]).direction(Direction::Out).depth(2).nodes(&store);
        assert_eq!(within_two.len(), 3);
    }

    #[test]
    fn limit_truncates_results() {
        let mut store = GraphStore::new(Arc::new(FixedClock::new(Timestamp::from_millis(0))));
        for i in 0..5 {
            store.add_node(NodeType::User, format!("u{i}"), Default::default()).expect("valid node");
        }
        let results = Query::from([]).limit(2).nodes(&store);
        assert_eq!(results.len(), 2);
    }
}
