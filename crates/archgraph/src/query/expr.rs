//! Compiled filter expressions
//!
//! A [`Condition`] is the loosely-typed record read from YAML. Compiling it
//! checks which properties each operator needs and produces an [`Expr`] tree
//! that can be evaluated against any [`Subject`] without further checks.

use std::fmt;
use std::str::FromStr;

use crate::core::{is_valid_name, is_valid_value, FilterTarget, Graph, GraphIndex, Link, Node};
use crate::core::QueryError;

use super::Condition;

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    Exists,
    AncestorOf,
    DescendantOf,
    And,
    Or,
}

impl Operator {
    /// The operator keyword as written in queries
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Exists => "exists",
            Operator::AncestorOf => "ancestorOf",
            Operator::DescendantOf => "descendantOf",
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Operator::Equals),
            "notEquals" => Ok(Operator::NotEquals),
            "exists" => Ok(Operator::Exists),
            "ancestorOf" => Ok(Operator::AncestorOf),
            "descendantOf" => Ok(Operator::DescendantOf),
            "and" => Ok(Operator::And),
            "or" => Ok(Operator::Or),
            _ => Err(QueryError::UnsupportedOperator {
                operator: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ATTRIBUTE_PREFIX: &str = "attribute.";

/// A resolvable field of a node or link
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Type,
    Parent,
    Source,
    Target,
    Attribute(String),
}

impl Field {
    /// Parse a field name for the given filter target
    ///
    /// Nodes expose `id`, `type` and `parent`; links expose `source`,
    /// `target` and `type`. Both accept `attribute.<key>`.
    pub fn parse(name: &str, target: FilterTarget) -> Result<Self, QueryError> {
        let field = match (name, target) {
            ("type", _) => Field::Type,
            ("id", FilterTarget::Nodes) => Field::Id,
            ("parent", FilterTarget::Nodes) => Field::Parent,
            ("source", FilterTarget::Links) => Field::Source,
            ("target", FilterTarget::Links) => Field::Target,
            _ => match name.strip_prefix(ATTRIBUTE_PREFIX) {
                Some(key) => {
                    is_valid_name(key, "attribute.key")?;
                    Field::Attribute(key.to_string())
                }
                None => {
                    return Err(QueryError::InvalidField {
                        field: name.to_string(),
                    })
                }
            },
        };
        Ok(field)
    }
}

/// Something a filter can be evaluated against
pub trait Subject {
    /// Resolve a field; unset fields and missing attributes are empty
    fn field(&self, field: &Field) -> &str;

    /// The node id for graph-relationship predicates, `None` for links
    fn node_id(&self) -> Option<&str>;
}

impl Subject for Node {
    fn field(&self, field: &Field) -> &str {
        match field {
            Field::Id => &self.id,
            Field::Type => &self.node_type,
            Field::Parent => self.parent_id().unwrap_or(""),
            Field::Source | Field::Target => "",
            Field::Attribute(key) => self.attribute(key).unwrap_or(""),
        }
    }

    fn node_id(&self) -> Option<&str> {
        Some(self.id.as_str())
    }
}

impl Subject for Link {
    fn field(&self, field: &Field) -> &str {
        match field {
            Field::Source => &self.source,
            Field::Target => &self.target,
            Field::Type => &self.link_type,
            Field::Id | Field::Parent => "",
            Field::Attribute(key) => self.attribute(key).unwrap_or(""),
        }
    }

    fn node_id(&self) -> Option<&str> {
        None
    }
}

/// A validated filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Equals(Field, String),
    NotEquals(Field, String),
    Exists(Field),
    AncestorOf(String),
    DescendantOf(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

fn require<'c, T>(
    value: &'c Option<T>,
    operator: Operator,
    property: &'static str,
) -> Result<&'c T, QueryError> {
    value.as_ref().ok_or_else(|| QueryError::MissingProperty {
        operator: operator.to_string(),
        property,
    })
}

fn forbid<T>(
    value: &Option<T>,
    operator: Operator,
    property: &'static str,
) -> Result<(), QueryError> {
    match value {
        Some(_) => Err(QueryError::DisallowedProperty {
            operator: operator.to_string(),
            property,
        }),
        None => Ok(()),
    }
}

impl Expr {
    /// Compile a condition tree for the given filter target
    pub fn compile(condition: &Condition, target: FilterTarget) -> Result<Self, QueryError> {
        is_valid_name(&condition.operator, "operator")?;
        let operator: Operator = condition.operator.parse()?;

        match operator {
            Operator::Equals | Operator::NotEquals => {
                forbid(&condition.conditions, operator, "conditions")?;
                let field = Field::parse(require(&condition.field, operator, "field")?, target)?;
                let value = require(&condition.value, operator, "value")?;
                is_valid_value(value, "value")?;
                Ok(if operator == Operator::Equals {
                    Expr::Equals(field, value.clone())
                } else {
                    Expr::NotEquals(field, value.clone())
                })
            }
            Operator::Exists => {
                forbid(&condition.value, operator, "value")?;
                forbid(&condition.conditions, operator, "conditions")?;
                let field = Field::parse(require(&condition.field, operator, "field")?, target)?;
                Ok(Expr::Exists(field))
            }
            Operator::AncestorOf | Operator::DescendantOf => {
                if target != FilterTarget::Nodes {
                    return Err(QueryError::UnsupportedTarget {
                        operator: operator.to_string(),
                        target,
                    });
                }
                forbid(&condition.field, operator, "field")?;
                forbid(&condition.conditions, operator, "conditions")?;
                let id = require(&condition.value, operator, "value")?;
                is_valid_name(id, "value")?;
                Ok(if operator == Operator::AncestorOf {
                    Expr::AncestorOf(id.clone())
                } else {
                    Expr::DescendantOf(id.clone())
                })
            }
            Operator::And | Operator::Or => {
                forbid(&condition.field, operator, "field")?;
                forbid(&condition.value, operator, "value")?;
                let conditions = require(&condition.conditions, operator, "conditions")?;
                if conditions.is_empty() {
                    return Err(QueryError::EmptyConditions {
                        operator: operator.to_string(),
                    });
                }
                let children = conditions
                    .iter()
                    .enumerate()
                    .map(|(index, child)| {
                        Expr::compile(child, target).map_err(|e| QueryError::InvalidCondition {
                            operator: operator.to_string(),
                            index,
                            cause: Box::new(e),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if operator == Operator::And {
                    Expr::And(children)
                } else {
                    Expr::Or(children)
                })
            }
        }
    }

    /// Evaluate against one subject
    ///
    /// `and` stops at the first false child, `or` at the first true one.
    pub fn evaluate(
        &self,
        subject: &impl Subject,
        context: &EvalContext<'_>,
    ) -> Result<bool, QueryError> {
        match self {
            Expr::Equals(field, value) => Ok(subject.field(field) == value.as_str()),
            Expr::NotEquals(field, value) => Ok(subject.field(field) != value.as_str()),
            Expr::Exists(field) => Ok(!subject.field(field).is_empty()),
            Expr::AncestorOf(target) => {
                context.require_node(target)?;
                Ok(subject
                    .node_id()
                    .is_some_and(|id| context.index.is_ancestor(id, target)))
            }
            Expr::DescendantOf(target) => {
                context.require_node(target)?;
                Ok(subject
                    .node_id()
                    .is_some_and(|id| context.index.is_descendant(id, target)))
            }
            Expr::And(children) => {
                for child in children {
                    if !child.evaluate(subject, context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Or(children) => {
                for child in children {
                    if child.evaluate(subject, context)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

/// Graph state shared by every evaluation within one query run
pub struct EvalContext<'g> {
    graph: &'g Graph,
    index: GraphIndex<'g>,
}

impl<'g> EvalContext<'g> {
    /// Index `graph` for relationship predicates
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            index: graph.index(),
        }
    }

    fn require_node(&self, id: &str) -> Result<(), QueryError> {
        if self.graph.has_node(id) {
            Ok(())
        } else {
            Err(QueryError::NodeNotFound { id: id.to_string() })
        }
    }
}
