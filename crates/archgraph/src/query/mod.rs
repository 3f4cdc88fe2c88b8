//! Query engine
//!
//! A [`Query`] holds independent filter lists for nodes and links. Each
//! filter wraps one [`Condition`] tree; a candidate passes when every filter
//! in its list evaluates true. Conditions are compiled into [`Expr`] trees
//! before any evaluation, so malformed queries fail up front with the path to
//! the offending condition.

mod execute;
mod expr;

pub use execute::{execute, select, Selection};
pub use expr::{EvalContext, Expr, Field, Operator, Subject};

use serde::{Deserialize, Serialize};

use crate::core::{FilterTarget, QueryError};

/// A single condition as written in a query document
///
/// Which properties must be present depends on the operator; see
/// [`Expr::compile`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl Condition {
    fn comparison(operator: Operator, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            operator: operator.to_string(),
            value: Some(value.into()),
            conditions: None,
        }
    }

    fn relation(operator: Operator, id: impl Into<String>) -> Self {
        Self {
            operator: operator.to_string(),
            value: Some(id.into()),
            ..Default::default()
        }
    }

    fn combinator(operator: Operator, conditions: Vec<Condition>) -> Self {
        Self {
            operator: operator.to_string(),
            conditions: Some(conditions),
            ..Default::default()
        }
    }

    /// `field` equals `value`
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::comparison(Operator::Equals, field, value)
    }

    /// `field` differs from `value`
    pub fn not_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::comparison(Operator::NotEquals, field, value)
    }

    /// `field` resolves to a non-empty value
    pub fn exists(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            operator: Operator::Exists.to_string(),
            ..Default::default()
        }
    }

    /// The candidate lies on the parent chain of node `id`
    pub fn ancestor_of(id: impl Into<String>) -> Self {
        Self::relation(Operator::AncestorOf, id)
    }

    /// The candidate is nested, at any depth, under node `id`
    pub fn descendant_of(id: impl Into<String>) -> Self {
        Self::relation(Operator::DescendantOf, id)
    }

    /// Every child condition holds
    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::combinator(Operator::And, conditions)
    }

    /// At least one child condition holds
    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::combinator(Operator::Or, conditions)
    }
}

/// One entry in a filter list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub condition: Condition,
}

impl From<Condition> for Filter {
    fn from(condition: Condition) -> Self {
        Self { condition }
    }
}

/// An ordered list of filters, all of which must hold
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl FilterSet {
    /// Create a new filter set from conditions
    pub fn new(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self {
            filters: conditions.into_iter().map(Filter::from).collect(),
        }
    }

    /// True when the set has no filters and therefore matches everything
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Number of filters in the set
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Compile every filter for `target`
    pub fn compile(&self, target: FilterTarget) -> Result<Vec<Expr>, QueryError> {
        compile_filters(&self.filters, target)
    }
}

/// Compile a filter list for `target`, reporting the first failure with its
/// position
pub fn compile_filters(filters: &[Filter], target: FilterTarget) -> Result<Vec<Expr>, QueryError> {
    filters
        .iter()
        .enumerate()
        .map(|(index, filter)| {
            Expr::compile(&filter.condition, target).map_err(|e| QueryError::InvalidFilter {
                target,
                index,
                cause: Box::new(e),
            })
        })
        .collect()
}

/// Node and link filters applied together to a graph
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(default, skip_serializing_if = "FilterSet::is_empty")]
    pub nodes: FilterSet,
    #[serde(default, skip_serializing_if = "FilterSet::is_empty")]
    pub links: FilterSet,
}

impl Query {
    /// Create a new query that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new query with only node filters
    pub fn for_nodes(filters: impl Into<Vec<Filter>>) -> Self {
        Self {
            nodes: FilterSet {
                filters: filters.into(),
            },
            ..Default::default()
        }
    }

    /// Create a new query with only link filters
    pub fn for_links(filters: impl Into<Vec<Filter>>) -> Self {
        Self {
            links: FilterSet {
                filters: filters.into(),
            },
            ..Default::default()
        }
    }

    /// Add a node filter
    pub fn with_node_filter(mut self, condition: Condition) -> Self {
        self.nodes.filters.push(condition.into());
        self
    }

    /// Add a link filter
    pub fn with_link_filter(mut self, condition: Condition) -> Self {
        self.links.filters.push(condition.into());
        self
    }

    /// Check that the query is well-formed and filters something
    ///
    /// Unlike [`execute`], which treats an empty query as "keep everything",
    /// a query document must contain at least one node or link filter.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.nodes.is_empty() && self.links.is_empty() {
            return Err(QueryError::NoFilters);
        }
        self.nodes.compile(FilterTarget::Nodes)?;
        self.links.compile(FilterTarget::Links)?;
        Ok(())
    }
}
