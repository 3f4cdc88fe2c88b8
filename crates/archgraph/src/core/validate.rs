//! Structural validation of architecture graphs
//!
//! All checks are plain functions; validation fails fast on the first
//! problem found, in this order: node fields, link fields, parent existence,
//! parent cycles, link endpoints.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, span, trace, warn, Level};

use super::error::{FieldError, GraphError};
use super::graph::{Graph, Link, Node};
use super::types::Attributes;

/// Check that `value` is a valid name (ids, types, attribute keys)
pub fn is_valid_name(value: &str, field: &str) -> Result<(), FieldError> {
    // TODO: restrict the accepted character set once the id grammar is settled
    if value.is_empty() {
        return Err(FieldError::empty(field));
    }
    Ok(())
}

/// Check that `value` is a valid attribute value
pub fn is_valid_value(value: &str, field: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::empty(field));
    }
    Ok(())
}

fn hex_color() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
            .expect("hex color pattern is valid")
    })
}

fn pixel() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+px$").expect("pixel pattern is valid"))
}

/// Check that an optional style property is a hex color
///
/// An unset property is valid.
pub fn is_valid_color(field: &str, value: Option<&str>) -> Result<(), FieldError> {
    match value {
        Some(color) if !hex_color().is_match(color) => Err(FieldError::InvalidColor {
            field: field.to_string(),
            value: color.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Check that an optional style property is a pixel length such as `2px`
///
/// An unset property is valid.
pub fn is_valid_pixel(field: &str, value: Option<&str>) -> Result<(), FieldError> {
    match value {
        Some(length) if !pixel().is_match(length) => Err(FieldError::InvalidPixel {
            field: field.to_string(),
            value: length.to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_attributes(attributes: &Attributes) -> Result<(), FieldError> {
    for (key, value) in attributes {
        is_valid_name(key, "attribute.key")?;
        is_valid_value(value, "attribute.value")?;
    }
    Ok(())
}

fn validate_node(node: &Node) -> Result<(), FieldError> {
    is_valid_name(&node.id, "node.id")?;
    is_valid_name(&node.node_type, "node.type")?;
    validate_attributes(&node.attributes)
}

fn validate_link(link: &Link) -> Result<(), FieldError> {
    is_valid_name(&link.source, "link.source")?;
    is_valid_name(&link.target, "link.target")?;
    is_valid_name(&link.link_type, "link.type")?;
    validate_attributes(&link.attributes)
}

impl Graph {
    /// Validate the graph's structure
    ///
    /// Returns the first problem found: a malformed node or link, a parent
    /// reference to a missing node, a cycle in the parent hierarchy, or a link
    /// endpoint that names a missing node.
    pub fn validate(&self) -> Result<(), GraphError> {
        let validate_span = span!(
            Level::INFO,
            "validate_graph",
            node_count = self.node_count(),
            link_count = self.link_count()
        );
        let _enter = validate_span.enter();

        for node in self.nodes() {
            validate_node(node).map_err(|e| GraphError::invalid_node(&node.id, e))?;
        }
        for (index, link) in self.links().enumerate() {
            validate_link(link).map_err(|e| GraphError::invalid_link(index, e))?;
        }
        trace!("Node and link fields are well-formed");

        for node in self.nodes() {
            if let Some(parent) = node.parent_id() {
                if !self.has_node(parent) {
                    warn!(node_id = %node.id, parent = %parent, "Parent does not exist");
                    return Err(GraphError::MissingParent {
                        id: node.id.clone(),
                        parent: parent.to_string(),
                    });
                }
            }
        }

        self.check_parent_cycles()?;
        debug!("Parent hierarchy is acyclic");

        for link in self.links() {
            if !self.has_node(&link.source) {
                return Err(GraphError::MissingLinkSource {
                    node: link.source.clone(),
                });
            }
            if !self.has_node(&link.target) {
                return Err(GraphError::MissingLinkTarget {
                    node: link.target.clone(),
                });
            }
        }

        info!("Graph is valid");
        Ok(())
    }

    /// Depth-first search over parent links with an explicit recursion stack
    ///
    /// Each node has at most one parent, so the search from a start node is a
    /// single walk up the chain. The walk stops at a node finished by an
    /// earlier search, and reports a cycle when it reaches a node still on its
    /// own stack.
    fn check_parent_cycles(&self) -> Result<(), GraphError> {
        let mut visited: HashSet<&str> = HashSet::new();

        for node in self.nodes() {
            if visited.contains(node.id.as_str()) {
                continue;
            }

            let mut on_stack: HashSet<&str> = HashSet::new();
            let mut current = node;
            loop {
                visited.insert(current.id.as_str());
                on_stack.insert(current.id.as_str());

                let Some(parent) = current.parent_id() else {
                    break;
                };
                if on_stack.contains(parent) {
                    warn!(node_id = %node.id, "Cycle detected in parent links");
                    return Err(GraphError::ParentCycle {
                        id: node.id.clone(),
                    });
                }
                if visited.contains(parent) {
                    break;
                }
                match self.get_node(parent) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }

        Ok(())
    }
}
