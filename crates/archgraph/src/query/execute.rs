//! Query execution over a graph

use std::collections::HashSet;

use tracing::{debug, info, span, trace, Level};

use crate::core::{FilterTarget, Graph, Link, Node, QueryError};

use super::expr::{EvalContext, Expr, Subject};
use super::Query;

/// Nodes and links of a graph that satisfy a query
///
/// Borrowed from the source graph. Links keep their position in the source
/// graph's link list.
#[derive(Debug, Clone, Default)]
pub struct Selection<'g> {
    pub nodes: Vec<&'g Node>,
    pub links: Vec<(usize, &'g Link)>,
}

impl<'g> Selection<'g> {
    /// Ids of the selected nodes
    pub fn node_ids(&self) -> impl Iterator<Item = &'g str> + '_ {
        self.nodes.iter().map(|node| node.id.as_str())
    }
}

fn matches_all(
    exprs: &[Expr],
    subject: &impl Subject,
    context: &EvalContext<'_>,
) -> Result<bool, QueryError> {
    for expr in exprs {
        if !expr.evaluate(subject, context)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Select the nodes and links of `graph` that satisfy `query`
///
/// A link is selected only when it passes the link filters and both of its
/// endpoints were selected. Empty filter lists select everything.
pub fn select<'g>(query: &Query, graph: &'g Graph) -> Result<Selection<'g>, QueryError> {
    let node_exprs = query.nodes.compile(FilterTarget::Nodes)?;
    let link_exprs = query.links.compile(FilterTarget::Links)?;
    trace!(
        node_filters = node_exprs.len(),
        link_filters = link_exprs.len(),
        "Compiled query filters"
    );

    let context = EvalContext::new(graph);
    let mut selection = Selection::default();

    for node in graph.nodes() {
        let keep = matches_all(&node_exprs, node, &context).map_err(|e| {
            QueryError::NodeEvaluation {
                id: node.id.clone(),
                cause: Box::new(e),
            }
        })?;
        if keep {
            selection.nodes.push(node);
        }
    }

    let retained: HashSet<&str> = selection.node_ids().collect();
    for (index, link) in graph.links().enumerate() {
        if !retained.contains(link.source.as_str()) || !retained.contains(link.target.as_str()) {
            continue;
        }
        let keep = matches_all(&link_exprs, link, &context).map_err(|e| {
            QueryError::LinkEvaluation {
                index,
                cause: Box::new(e),
            }
        })?;
        if keep {
            selection.links.push((index, link));
        }
    }

    debug!(
        retained_nodes = selection.nodes.len(),
        retained_links = selection.links.len(),
        "Selected graph elements"
    );
    Ok(selection)
}

/// Run `query` against `graph` and return the filtered graph
///
/// Retained nodes whose parent was filtered out become top-level nodes, so
/// the result never references a removed node.
pub fn execute(query: &Query, graph: &Graph) -> Result<Graph, QueryError> {
    let query_span = span!(
        Level::INFO,
        "execute_query",
        node_count = graph.node_count(),
        link_count = graph.link_count()
    );
    let _enter = query_span.enter();

    let selection = select(query, graph)?;
    let retained: HashSet<&str> = selection.node_ids().collect();

    let mut result = Graph::new();
    for node in &selection.nodes {
        let mut node = (*node).clone();
        match node.parent_id() {
            Some(parent) if retained.contains(parent) => {}
            Some(parent) => {
                trace!(node_id = %node.id, parent = %parent, "Pruning parent outside result");
                node.parent = None;
            }
            None => node.parent = None,
        }
        result.add_node(node)?;
    }
    for (_, link) in &selection.links {
        result.add_link((*link).clone());
    }

    info!(
        retained_nodes = result.node_count(),
        retained_links = result.link_count(),
        "Query executed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Condition;

    fn sample_graph() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(Node::new("platform", "System")).unwrap();
        graph
            .add_node(Node::new("api", "Microservice").with_parent("platform"))
            .unwrap();
        graph
            .add_node(Node::new("worker", "Microservice").with_parent("platform"))
            .unwrap();
        graph
            .add_node(Node::new("db", "Infrastructure").with_parent("api"))
            .unwrap();
        graph.add_link(Link::new("api", "db", "reads"));
        graph.add_link(Link::new("api", "worker", "calls"));
        graph.add_link(Link::new("worker", "db", "writes"));
        graph
    }

    fn ids(graph: &Graph) -> Vec<&str> {
        graph.nodes().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let graph = sample_graph();
        let result = execute(&Query::new(), &graph).unwrap();
        assert_eq!(result, graph);
    }

    #[test]
    fn test_type_filter_drops_links_and_prunes_parents() {
        let graph = sample_graph();
        let query = Query::new().with_node_filter(Condition::equals("type", "Microservice"));
        let result = execute(&query, &graph).unwrap();

        assert_eq!(ids(&result), vec!["api", "worker"]);
        assert!(result.nodes().all(|n| n.parent.is_none()));
        assert_eq!(result.link_count(), 1);
        assert_eq!(result.links().next().unwrap().link_type, "calls");
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_parent_kept_when_retained() {
        let graph = sample_graph();
        let query = Query::new().with_node_filter(Condition::or(vec![
            Condition::equals("id", "platform"),
            Condition::descendant_of("platform"),
        ]));
        let result = execute(&query, &graph).unwrap();
        assert_eq!(result.get_node("db").unwrap().parent.as_deref(), Some("api"));
    }

    #[test]
    fn test_link_filters_apply_after_endpoints() {
        let graph = sample_graph();
        let query = Query::new().with_link_filter(Condition::not_equals("type", "reads"));
        let selection = select(&query, &graph).unwrap();
        let positions: Vec<_> = selection.links.iter().map(|(i, _)| *i).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(selection.nodes.len(), 4);
    }

    #[test]
    fn test_all_filters_must_hold() {
        let graph = sample_graph();
        let query = Query::new()
            .with_node_filter(Condition::equals("type", "Microservice"))
            .with_node_filter(Condition::ancestor_of("db"));
        let result = execute(&query, &graph).unwrap();
        assert_eq!(ids(&result), vec!["api"]);
    }

    #[test]
    fn test_evaluation_error_names_node() {
        let graph = sample_graph();
        let query = Query::new().with_node_filter(Condition::ancestor_of("ghost"));
        let err = execute(&query, &graph).unwrap_err();
        assert_eq!(
            err.to_string(),
            "error applying filters to node 'platform': node 'ghost' referenced by query does not exist"
        );
    }

    #[test]
    fn test_invalid_query_fails_before_evaluation() {
        let graph = sample_graph();
        let query = Query::new().with_link_filter(Condition::ancestor_of("api"));
        let err = execute(&query, &graph).unwrap_err();
        assert!(matches!(
            err,
            QueryError::InvalidFilter {
                target: FilterTarget::Links,
                index: 0,
                ..
            }
        ));
    }
}
