//! Archgraph - architecture-as-data graphs, queries and Mermaid diagrams
//!
//! Describe a system as a graph of typed nodes (with an optional parent
//! hierarchy) and typed links, check it for structural problems, filter it
//! with declarative queries, and render it as a Mermaid flowchart.
//!
//! # Quick Start
//!
//! ```rust
//! use archgraph::generate_mermaid;
//!
//! let graph = "
//! nodes:
//!   - id: a
//!     type: System
//!   - id: b
//!     type: Service
//!     parent: a
//! ";
//! let diagram = generate_mermaid(graph, "").unwrap();
//! assert!(diagram.starts_with("flowchart TD\n"));
//! ```
//!
//! # Advanced Usage
//!
//! For more control, use the individual components:
//!
//! ```rust
//! use archgraph::prelude::*;
//!
//! let mut graph = Graph::new();
//! graph.add_node(Node::new("api", "Microservice")).unwrap();
//! graph.add_node(Node::new("vpc", "Infrastructure")).unwrap();
//! graph.validate().unwrap();
//!
//! let query = Query::new().with_node_filter(Condition::equals("type", "Microservice"));
//! let services = execute(&query, &graph).unwrap();
//! assert_eq!(services.node_count(), 1);
//!
//! let diagram = render(&services, &MermaidSettings::default()).unwrap();
//! assert!(diagram.contains("    api\n"));
//! ```

use anyhow::Context;

pub mod core;
pub mod load;
pub mod mermaid;
pub mod query;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Direction, FilterTarget, Graph, GraphError, GraphIndex, Link, Node, QueryError,
        RenderError,
    };
    pub use crate::mermaid::{render, MermaidSettings};
    pub use crate::query::{execute, Condition, Query};
}

/// Parse and validate a graph document
///
/// # Example
/// ```rust
/// use archgraph::validate_graph;
///
/// let err = validate_graph("nodes:\n  - id: a\n    type: T\n    parent: ghost\n").unwrap_err();
/// assert!(format!("{:#}", err).contains("non-existent parent 'ghost'"));
/// ```
pub fn validate_graph(graph_yaml: &str) -> anyhow::Result<Graph> {
    let graph = load::parse_graph(graph_yaml)?;
    graph.validate().context("graph is invalid")?;
    Ok(graph)
}

/// Parse a graph and a query, run the query and return the result as YAML
///
/// The graph must be valid and the query must contain at least one filter.
///
/// # Example
/// ```rust
/// use archgraph::execute_query;
///
/// let graph = "
/// nodes:
///   - id: api
///     type: Microservice
///   - id: vpc
///     type: Infrastructure
/// ";
/// let query = "
/// nodes:
///   filters:
///     - condition:
///         field: type
///         operator: equals
///         value: Microservice
/// ";
/// let result = execute_query(graph, query).unwrap();
/// assert!(result.contains("id: api"));
/// assert!(!result.contains("id: vpc"));
/// ```
pub fn execute_query(graph_yaml: &str, query_yaml: &str) -> anyhow::Result<String> {
    let graph = validate_graph(graph_yaml)?;
    let query = load::parse_query(query_yaml)?;
    query.validate().context("query is invalid")?;
    let result = query::execute(&query, &graph).context("error executing query")?;
    Ok(result.to_yaml()?)
}

/// Parse a graph and diagram settings and render a Mermaid flowchart
///
/// Blank settings select the defaults.
pub fn generate_mermaid(graph_yaml: &str, settings_yaml: &str) -> anyhow::Result<String> {
    let graph = validate_graph(graph_yaml)?;
    let settings = load::parse_settings(settings_yaml)?;
    let diagram = mermaid::render(&graph, &settings).context("error generating diagram")?;
    Ok(diagram)
}
