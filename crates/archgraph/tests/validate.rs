//! Tests for structural graph validation

use archgraph::load::parse_graph;
use archgraph::{Graph, GraphError, Link, Node};

fn error_for(yaml: &str) -> String {
    let graph = parse_graph(yaml).expect("document should parse");
    graph.validate().unwrap_err().to_string()
}

#[test]
fn test_valid_document() {
    let graph = parse_graph(
        r#"
nodes:
  - id: shop
    type: System
  - id: cart
    type: Microservice
    parent: shop
    attributes:
      language: rust
links:
  - source: cart
    target: shop
    type: partOf
    attributes:
      note: implicit
"#,
    )
    .unwrap();
    assert!(graph.validate().is_ok());
}

#[test]
fn test_empty_graph_is_valid() {
    assert!(Graph::new().validate().is_ok());
}

#[test]
fn test_missing_id() {
    assert_eq!(
        error_for("nodes:\n  - type: Service\n"),
        "node '' is invalid: node.id cannot be empty"
    );
}

#[test]
fn test_missing_type() {
    assert_eq!(
        error_for("nodes:\n  - id: cart\n"),
        "node 'cart' is invalid: node.type cannot be empty"
    );
}

#[test]
fn test_blank_parent_reads_as_unset() {
    let graph = parse_graph("nodes:\n  - id: cart\n    type: T\n    parent: \"\"\n").unwrap();
    assert!(graph.get_node("cart").unwrap().parent.is_none());
    assert!(graph.validate().is_ok());
}

#[test]
fn test_missing_parent() {
    assert_eq!(
        error_for("nodes:\n  - id: cart\n    type: T\n    parent: shop\n"),
        "node 'cart' has non-existent parent 'shop'"
    );
}

#[test]
fn test_parent_cycle() {
    let mut graph = Graph::new();
    graph
        .add_node(Node::new("a", "T").with_parent("b"))
        .unwrap();
    graph
        .add_node(Node::new("b", "T").with_parent("a"))
        .unwrap();
    assert!(matches!(
        graph.validate(),
        Err(GraphError::ParentCycle { .. })
    ));
}

#[test]
fn test_long_cycle() {
    let mut graph = Graph::new();
    for i in 0..50 {
        graph
            .add_node(Node::new(format!("n{}", i), "T").with_parent(format!("n{}", (i + 1) % 50)))
            .unwrap();
    }
    assert!(matches!(
        graph.validate(),
        Err(GraphError::ParentCycle { .. })
    ));
}

#[test]
fn test_deep_hierarchy_is_valid() {
    let mut graph = Graph::new();
    graph.add_node(Node::new("n0", "T")).unwrap();
    for i in 1..5000 {
        graph
            .add_node(Node::new(format!("n{}", i), "T").with_parent(format!("n{}", i - 1)))
            .unwrap();
    }
    assert!(graph.validate().is_ok());
}

#[test]
fn test_link_field_errors() {
    assert_eq!(
        error_for("nodes:\n  - id: a\n    type: T\nlinks:\n  - target: a\n    type: calls\n"),
        "link at index 0 is invalid: link.source cannot be empty"
    );
    assert_eq!(
        error_for(
            "nodes:\n  - id: a\n    type: T\nlinks:\n  - source: a\n    target: a\n    type: calls\n    attributes:\n      \"\": x\n"
        ),
        "link at index 0 is invalid: attribute.key cannot be empty"
    );
}

#[test]
fn test_dangling_link() {
    let mut graph = Graph::new();
    graph.add_node(Node::new("a", "T")).unwrap();
    graph.add_link(Link::new("a", "b", "calls"));
    assert_eq!(
        graph.validate().unwrap_err(),
        GraphError::MissingLinkTarget {
            node: "b".to_string()
        }
    );
}
