//! Subgraph layout
//!
//! Arranges nodes into a forest of explicit containers (the nodes selected as
//! subgraphs) plus a list of top-level leaves. Every other node is placed in
//! its nearest explicit ancestor, skipping any non-explicit nodes in between.

use std::collections::{HashMap, HashSet};

use tracing::{debug, span, trace, Level};

use crate::core::{Graph, GraphIndex, Node};

/// An explicit container and everything placed inside it
#[derive(Debug, Clone)]
pub struct Container<'g> {
    pub node: &'g Node,
    /// Non-explicit nodes directly inside this container, sorted by id
    pub leaves: Vec<&'g Node>,
    /// Nested containers, sorted by id
    pub subgraphs: Vec<Container<'g>>,
}

impl<'g> Container<'g> {
    pub fn id(&self) -> &'g str {
        &self.node.id
    }
}

/// Layout output: top-level containers and top-level leaves
#[derive(Debug, Clone, Default)]
pub struct SubgraphLayout<'g> {
    pub containers: Vec<Container<'g>>,
    pub leaves: Vec<&'g Node>,
}

#[derive(Default)]
struct Members<'g> {
    leaves: Vec<&'g Node>,
    subgraphs: Vec<&'g str>,
}

fn nearest_explicit<'g>(
    id: &str,
    index: &GraphIndex<'g>,
    explicit: &HashSet<&str>,
) -> Option<&'g str> {
    index
        .ancestors(id)
        .into_iter()
        .find(|ancestor| explicit.contains(ancestor))
}

impl<'g> SubgraphLayout<'g> {
    /// Lay out `graph` with the nodes in `explicit` rendered as subgraphs
    ///
    /// Ids in `explicit` that do not name a node are ignored.
    pub fn new(graph: &'g Graph, explicit: &HashSet<&str>) -> Self {
        let layout_span = span!(
            Level::DEBUG,
            "subgraph_layout",
            node_count = graph.node_count(),
            explicit_count = explicit.len()
        );
        let _enter = layout_span.enter();

        let index = graph.index();
        let mut members: HashMap<&'g str, Members<'g>> = HashMap::new();
        let mut top_containers: Vec<&'g Node> = Vec::new();
        let mut top_leaves: Vec<&'g Node> = Vec::new();

        for node in graph.nodes() {
            let is_explicit = explicit.contains(node.id.as_str());
            if is_explicit {
                members.entry(node.id.as_str()).or_default();
            }
            match nearest_explicit(&node.id, &index, explicit) {
                Some(ancestor) => {
                    trace!(node_id = %node.id, container = ancestor, "Placing node in container");
                    let entry = members.entry(ancestor).or_default();
                    if is_explicit {
                        entry.subgraphs.push(node.id.as_str());
                    } else {
                        entry.leaves.push(node);
                    }
                }
                None if is_explicit => top_containers.push(node),
                None => top_leaves.push(node),
            }
        }

        top_containers.sort_by(|a, b| a.id.cmp(&b.id));
        top_leaves.sort_by(|a, b| a.id.cmp(&b.id));

        let containers = top_containers
            .into_iter()
            .map(|node| Self::assemble(graph, node, &mut members))
            .collect::<Vec<_>>();

        debug!(
            top_level_containers = containers.len(),
            top_level_leaves = top_leaves.len(),
            "Subgraph layout complete"
        );
        Self {
            containers,
            leaves: top_leaves,
        }
    }

    /// Build the container for `node`, consuming its member lists
    ///
    /// Members are removed as they are used, so each container is built at
    /// most once.
    fn assemble(
        graph: &'g Graph,
        node: &'g Node,
        members: &mut HashMap<&'g str, Members<'g>>,
    ) -> Container<'g> {
        let Members {
            mut leaves,
            subgraphs,
        } = members.remove(node.id.as_str()).unwrap_or_default();
        leaves.sort_by(|a, b| a.id.cmp(&b.id));

        let mut nested: Vec<&'g Node> = subgraphs
            .into_iter()
            .filter_map(|id| graph.get_node(id))
            .collect();
        nested.sort_by(|a, b| a.id.cmp(&b.id));

        let subgraphs = nested
            .into_iter()
            .map(|child| Self::assemble(graph, child, members))
            .collect();

        Container {
            node,
            leaves,
            subgraphs,
        }
    }
}
