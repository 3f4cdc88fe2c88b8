//! Error types for graph validation, querying, rendering and loading
//!
//! Every wrapping variant embeds its cause in its `Display` output, so the
//! outermost error reads as the full chain, e.g.
//! `node 'api' is invalid: node.type cannot be empty`.

use std::path::PathBuf;

use thiserror::Error;

use super::types::FilterTarget;

/// Well-formedness failures for a single name, value or style property
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("{field} cannot be empty")]
    Empty { field: String },

    #[error("invalid color for {field}: {value}")]
    InvalidColor { field: String, value: String },

    #[error("invalid pixel for {field}: {value}")]
    InvalidPixel { field: String, value: String },
}

impl FieldError {
    /// Create a new empty-field error
    pub fn empty(field: impl Into<String>) -> Self {
        Self::Empty {
            field: field.into(),
        }
    }
}

/// Structural and referential errors in an architecture graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("node '{id}' is invalid: {cause}")]
    InvalidNode { id: String, cause: Box<GraphError> },

    #[error("link at index {index} is invalid: {cause}")]
    InvalidLink { index: usize, cause: Box<GraphError> },

    #[error("node '{id}' has non-existent parent '{parent}'")]
    MissingParent { id: String, parent: String },

    #[error("cycle detected in parent links involving node '{id}'")]
    ParentCycle { id: String },

    #[error("link has non-existent source node '{node}'")]
    MissingLinkSource { node: String },

    #[error("link has non-existent target node '{node}'")]
    MissingLinkTarget { node: String },

    #[error("duplicate node ID '{id}' found")]
    DuplicateNode { id: String },
}

impl GraphError {
    /// Wrap a node-level failure with the offending node id
    pub fn invalid_node(id: impl Into<String>, cause: impl Into<GraphError>) -> Self {
        Self::InvalidNode {
            id: id.into(),
            cause: Box::new(cause.into()),
        }
    }

    /// Wrap a link-level failure with the link's position
    pub fn invalid_link(index: usize, cause: impl Into<GraphError>) -> Self {
        Self::InvalidLink {
            index,
            cause: Box::new(cause.into()),
        }
    }
}

/// Query definition and evaluation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("no filters found")]
    NoFilters,

    #[error("invalid field: {field}")]
    InvalidField { field: String },

    #[error("unsupported operator '{operator}'")]
    UnsupportedOperator { operator: String },

    #[error("operator '{operator}' requires '{property}'")]
    MissingProperty {
        operator: String,
        property: &'static str,
    },

    #[error("operator '{operator}' does not allow '{property}'")]
    DisallowedProperty {
        operator: String,
        property: &'static str,
    },

    #[error("operator '{operator}' requires at least one condition")]
    EmptyConditions { operator: String },

    #[error("operator '{operator}' is not supported in {target} filters")]
    UnsupportedTarget {
        operator: String,
        target: FilterTarget,
    },

    #[error("{target} filter {index} is invalid: {cause}")]
    InvalidFilter {
        target: FilterTarget,
        index: usize,
        cause: Box<QueryError>,
    },

    #[error("condition {index} of '{operator}' is invalid: {cause}")]
    InvalidCondition {
        operator: String,
        index: usize,
        cause: Box<QueryError>,
    },

    #[error("node '{id}' referenced by query does not exist")]
    NodeNotFound { id: String },

    #[error("error applying filters to node '{id}': {cause}")]
    NodeEvaluation { id: String, cause: Box<QueryError> },

    #[error("error applying filters to link at index {index}: {cause}")]
    LinkEvaluation { index: usize, cause: Box<QueryError> },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Diagram settings and rendering errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("invalid direction: {direction}")]
    InvalidDirection { direction: String },

    #[error("{style} has no format properties")]
    EmptyStyle { style: String },

    #[error("{style} is invalid: {cause}")]
    InvalidStyle { style: String, cause: FieldError },

    #[error("{selector} filters are invalid: {cause}")]
    InvalidSelector { selector: String, cause: QueryError },

    #[error("error executing {selector} query: {cause}")]
    SelectorQuery { selector: String, cause: QueryError },

    #[error("error writing diagram")]
    Write(#[from] std::fmt::Error),
}

/// Errors raised while reading YAML documents into core types
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("error unmarshalling {document} YAML: {cause}")]
    Yaml {
        document: &'static str,
        cause: serde_yaml::Error,
    },

    #[error("error marshalling {document} YAML: {cause}")]
    Serialize {
        document: &'static str,
        cause: serde_yaml::Error,
    },

    #[error("error reading '{}': {cause}", path.display())]
    Io {
        path: PathBuf,
        cause: std::io::Error,
    },

    #[error("'{}' is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("error loading config file '{}': {cause}", path.display())]
    InvalidFile { path: PathBuf, cause: Box<LoadError> },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl LoadError {
    /// Create a new YAML error for the named document kind
    pub fn yaml(document: &'static str, cause: serde_yaml::Error) -> Self {
        Self::Yaml { document, cause }
    }

    /// Create a new IO error for the given path
    pub fn io(path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            cause,
        }
    }
}
