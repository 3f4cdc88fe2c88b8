//! Architecture graph model
//!
//! Stores nodes keyed by id together with their insertion order, plus the
//! ordered list of links between them. Parent/children relations are derived
//! on demand through [`GraphIndex`] and never stored.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, trace};

use super::error::GraphError;
use super::types::Attributes;

/// A named component of the architecture
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    #[serde(default)]
    pub id: String,
    /// Component type, e.g. `Microservice`
    #[serde(rename = "type", default)]
    pub node_type: String,
    /// Id of the enclosing node, if any; a blank parent reads as unset
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

impl Node {
    /// Create a new top-level node without attributes
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    /// Set the parent node id; an empty id leaves the node top-level
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        let parent = parent.into();
        self.parent = (!parent.is_empty()).then_some(parent);
        self
    }

    /// The parent id, treating an empty string as unset
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref().filter(|parent| !parent.is_empty())
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// A typed, directed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    #[serde(rename = "type", default)]
    pub link_type: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Link {
    /// Create a new link without attributes
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        link_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            link_type: link_type.into(),
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Serialized shape of a graph: `{nodes: [...], links: [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    links: Vec<Link>,
}

/// An architecture graph
///
/// Node ids are unique by construction: [`Graph::add_node`] rejects
/// duplicates. Nodes and links iterate in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GraphDocument", into = "GraphDocument")]
pub struct Graph {
    /// Nodes indexed by id
    nodes: HashMap<String, Node>,
    /// Node ids in insertion order
    node_order: Vec<String>,
    /// Links in insertion order
    links: Vec<Link>,
}

impl TryFrom<GraphDocument> for Graph {
    type Error = GraphError;

    fn try_from(document: GraphDocument) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for node in document.nodes {
            graph.add_node(node)?;
        }
        for link in document.links {
            graph.add_link(link);
        }
        Ok(graph)
    }
}

impl From<Graph> for GraphDocument {
    fn from(mut graph: Graph) -> Self {
        let nodes = graph
            .node_order
            .iter()
            .filter_map(|id| graph.nodes.remove(id))
            .collect();
        Self {
            nodes,
            links: graph.links,
        }
    }
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, failing if its id is already present
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        trace!(node_id = %node.id, node_type = %node.node_type, "Adding node to graph");
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { id: node.id });
        }
        self.node_order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Append a link
    ///
    /// Endpoints are not checked here; that is [`Graph::validate`]'s job.
    pub fn add_link(&mut self, link: Link) {
        trace!(
            link_source = %link.source,
            link_target = %link.target,
            link_type = %link.link_type,
            "Adding link to graph"
        );
        self.links.push(link);
    }

    /// Get a node by id
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Check if a node exists
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate over nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Iterate over links in insertion order
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Build the parent/children index for this graph
    pub fn index(&self) -> GraphIndex<'_> {
        GraphIndex::new(self)
    }

    /// Combine several graphs into one
    ///
    /// Nodes and links are concatenated in argument order. A node id that
    /// appears in more than one input is an error.
    pub fn merge<'a>(graphs: impl IntoIterator<Item = &'a Graph>) -> Result<Graph, GraphError> {
        let mut merged = Graph::new();
        for graph in graphs {
            for node in graph.nodes() {
                merged.add_node(node.clone())?;
            }
            for link in graph.links() {
                merged.add_link(link.clone());
            }
        }
        debug!(
            node_count = merged.node_count(),
            link_count = merged.link_count(),
            "Merged graphs"
        );
        Ok(merged)
    }
}

/// Derived parent and children relations of a graph
///
/// Built fresh per operation. Only parent references that name an existing
/// node are indexed.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex<'a> {
    parent_of: HashMap<&'a str, &'a str>,
    children_of: HashMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> GraphIndex<'a> {
    /// Index the parent relations of `graph`
    pub fn new(graph: &'a Graph) -> Self {
        let mut index = Self::default();
        for node in graph.nodes() {
            let Some(parent) = node.parent_id() else {
                continue;
            };
            if !graph.has_node(parent) {
                continue;
            }
            index.parent_of.insert(node.id.as_str(), parent);
            index
                .children_of
                .entry(parent)
                .or_default()
                .insert(node.id.as_str());
        }
        trace!(parent_links = index.parent_of.len(), "Built graph index");
        index
    }

    /// Get the parent of a node
    pub fn parent(&self, id: &str) -> Option<&'a str> {
        self.parent_of.get(id).copied()
    }

    /// Get the direct children of a node, ordered by id
    pub fn children(&self, id: &str) -> impl Iterator<Item = &'a str> + '_ {
        self.children_of
            .get(id)
            .into_iter()
            .flat_map(|children| children.iter().copied())
    }

    /// Walk the parent chain of `id`, nearest first
    ///
    /// Stops if the chain revisits a node, so malformed cyclic input still
    /// terminates.
    pub fn ancestors(&self, id: &str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent);
            current = self.parent(parent);
        }
        chain
    }

    /// True if `candidate` lies on `target`'s parent chain
    pub fn is_ancestor(&self, candidate: &str, target: &str) -> bool {
        candidate != target && self.ancestors(target).iter().any(|id| *id == candidate)
    }

    /// True if `candidate` is in the children-transitive closure of `target`
    pub fn is_descendant(&self, candidate: &str, target: &str) -> bool {
        if candidate == target {
            return false;
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = self.children(target).collect();
        while let Some(child) = queue.pop_front() {
            if child == candidate {
                return true;
            }
            if seen.insert(child) {
                queue.extend(self.children(child));
            }
        }
        false
    }
}
