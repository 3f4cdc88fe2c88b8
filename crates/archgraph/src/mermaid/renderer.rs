//! Mermaid flowchart serialization

use std::collections::HashSet;
use std::fmt::{self, Write};

use tracing::{debug, info, span, trace, Level};

use super::layout::{Container, SubgraphLayout};
use super::sanitize_label;
use super::settings::MermaidSettings;
use crate::core::{Graph, Link, Node, QueryError, RenderError};
use crate::query::{self, Query};

const INDENT: &str = "    ";

/// Nodes assigned to one style class
struct ClassAssignment<'g> {
    class: String,
    members: Vec<&'g str>,
}

fn selector_error(selector: String, cause: QueryError) -> RenderError {
    RenderError::SelectorQuery { selector, cause }
}

/// Render `graph` as a Mermaid flowchart
///
/// Output is deterministic: containers, leaves and style members are sorted
/// by id, and links by source then target.
pub fn render(graph: &Graph, settings: &MermaidSettings) -> Result<String, RenderError> {
    let render_span = span!(
        Level::INFO,
        "render_mermaid",
        node_count = graph.node_count(),
        link_count = graph.link_count()
    );
    let _enter = render_span.enter();

    settings.validate()?;
    let direction = settings.direction()?;
    let renderer = MermaidRenderer { graph, settings };

    let classes = renderer.resolve_node_styles()?;
    let explicit = renderer.explicit_containers()?;
    let layout = SubgraphLayout::new(graph, &explicit);
    let links = renderer.sorted_links();
    let link_styles = renderer.resolve_link_styles(&links)?;

    let mut out = String::new();
    writeln!(out, "flowchart {}", direction)?;
    renderer.write_class_defs(&mut out)?;
    renderer.write_nodes(&mut out, &layout)?;
    renderer.write_class_assignments(&mut out, &classes)?;
    renderer.write_links(&mut out, &links)?;
    renderer.write_link_styles(&mut out, &link_styles)?;

    info!(
        containers = layout.containers.len(),
        links = links.len(),
        bytes = out.len(),
        "Rendered Mermaid flowchart"
    );
    Ok(out)
}

fn format_properties(properties: Vec<(&'static str, &str)>) -> String {
    properties
        .into_iter()
        .map(|(name, value)| format!("{}:{}", name, value))
        .collect::<Vec<_>>()
        .join(",")
}

struct MermaidRenderer<'a> {
    graph: &'a Graph,
    settings: &'a MermaidSettings,
}

impl<'a> MermaidRenderer<'a> {
    /// Run each node style's filters and collect the sorted member ids
    fn resolve_node_styles(&self) -> Result<Vec<ClassAssignment<'a>>, RenderError> {
        self.settings
            .node_styles
            .iter()
            .enumerate()
            .map(|(index, style)| {
                let query = Query::for_nodes(style.filters.clone());
                let selection = query::select(&query, self.graph)
                    .map_err(|e| selector_error(format!("node style {}", index), e))?;
                let mut members: Vec<&'a str> = selection.node_ids().collect();
                members.sort_unstable();
                trace!(style = index, members = members.len(), "Resolved node style");
                Ok(ClassAssignment {
                    class: format!("style{}", index),
                    members,
                })
            })
            .collect()
    }

    /// Ids of nodes rendered as subgraphs
    fn explicit_containers(&self) -> Result<HashSet<&'a str>, RenderError> {
        if self.settings.subgraph_nodes.is_empty() {
            return Ok(HashSet::new());
        }
        let query = Query {
            nodes: self.settings.subgraph_nodes.clone(),
            ..Default::default()
        };
        let selection = query::select(&query, self.graph)
            .map_err(|e| selector_error("subgraph".to_string(), e))?;
        let explicit: HashSet<&'a str> = selection.node_ids().collect();
        debug!(explicit_containers = explicit.len(), "Resolved subgraph nodes");
        Ok(explicit)
    }

    /// Links with their original positions, stably sorted by (source, target)
    fn sorted_links(&self) -> Vec<(usize, &'a Link)> {
        let mut links: Vec<(usize, &'a Link)> = self.graph.links().enumerate().collect();
        links.sort_by(|(_, a), (_, b)| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        links
    }

    /// For each link style, the positions of its matches in `sorted`
    fn resolve_link_styles(
        &self,
        sorted: &[(usize, &'a Link)],
    ) -> Result<Vec<Vec<usize>>, RenderError> {
        self.settings
            .link_styles
            .iter()
            .enumerate()
            .map(|(index, style)| {
                let query = Query::for_links(style.filters.clone());
                let selection = query::select(&query, self.graph)
                    .map_err(|e| selector_error(format!("link style {}", index), e))?;
                let matched: HashSet<usize> = selection.links.iter().map(|(i, _)| *i).collect();
                let positions: Vec<usize> = sorted
                    .iter()
                    .enumerate()
                    .filter(|(_, (original, _))| matched.contains(original))
                    .map(|(position, _)| position)
                    .collect();
                trace!(style = index, links = positions.len(), "Resolved link style");
                Ok(positions)
            })
            .collect()
    }

    /// The node's label attribute after sanitizing, if anything remains
    fn label(&self, node: &Node) -> Option<String> {
        let key = self.settings.node_label.as_deref()?;
        node.attribute(key)
            .map(sanitize_label)
            .filter(|label| !label.trim().is_empty())
    }

    fn write_class_defs(&self, out: &mut impl Write) -> fmt::Result {
        if self.settings.node_styles.is_empty() {
            return Ok(());
        }
        writeln!(out, "{}%% Node Styles", INDENT)?;
        for (index, style) in self.settings.node_styles.iter().enumerate() {
            writeln!(
                out,
                "{}classDef style{} {};",
                INDENT,
                index,
                format_properties(style.format.properties())
            )?;
        }
        writeln!(out)
    }

    fn write_nodes(&self, out: &mut impl Write, layout: &SubgraphLayout<'_>) -> fmt::Result {
        writeln!(out, "{}%% Nodes", INDENT)?;
        for container in &layout.containers {
            self.write_container(out, container, 1)?;
        }
        for leaf in &layout.leaves {
            self.write_leaf(out, leaf, 1)?;
        }
        Ok(())
    }

    fn write_class_assignments(
        &self,
        out: &mut impl Write,
        classes: &[ClassAssignment<'_>],
    ) -> fmt::Result {
        let assigned: Vec<&ClassAssignment<'_>> =
            classes.iter().filter(|a| !a.members.is_empty()).collect();
        if assigned.is_empty() {
            return Ok(());
        }
        writeln!(out)?;
        writeln!(out, "{}%% Node Styles", INDENT)?;
        for assignment in assigned {
            writeln!(
                out,
                "{}class {} {}",
                INDENT,
                assignment.members.join(","),
                assignment.class
            )?;
        }
        Ok(())
    }

    fn write_links(&self, out: &mut impl Write, links: &[(usize, &Link)]) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "{}%% Links", INDENT)?;
        for (_, link) in links {
            writeln!(
                out,
                "{}{} -->|{}| {}",
                INDENT, link.source, link.link_type, link.target
            )?;
        }
        Ok(())
    }

    fn write_link_styles(&self, out: &mut impl Write, link_styles: &[Vec<usize>]) -> fmt::Result {
        if self.settings.link_styles.is_empty() {
            return Ok(());
        }
        writeln!(out)?;
        writeln!(out, "{}%% Link Styles", INDENT)?;
        for (style, positions) in self.settings.link_styles.iter().zip(link_styles) {
            if positions.is_empty() {
                continue;
            }
            let positions: Vec<String> = positions.iter().map(usize::to_string).collect();
            writeln!(
                out,
                "{}linkStyle {} {}",
                INDENT,
                positions.join(","),
                format_properties(style.format.properties())
            )?;
        }
        Ok(())
    }

    fn write_leaf(&self, out: &mut impl Write, node: &Node, depth: usize) -> fmt::Result {
        let indent = INDENT.repeat(depth);
        match self.label(node) {
            Some(label) => writeln!(out, "{}{}[{}]", indent, node.id, label),
            None => writeln!(out, "{}{}", indent, node.id),
        }
    }

    fn write_container(
        &self,
        out: &mut impl Write,
        container: &Container<'_>,
        depth: usize,
    ) -> fmt::Result {
        let indent = INDENT.repeat(depth);
        writeln!(out, "{}subgraph {}", indent, container.id())?;
        if let Some(label) = self.label(container.node) {
            writeln!(out, "{}{}{}", indent, INDENT, label)?;
        }
        for leaf in &container.leaves {
            self.write_leaf(out, leaf, depth + 1)?;
        }
        for nested in &container.subgraphs {
            self.write_container(out, nested, depth + 1)?;
        }
        writeln!(out, "{}end", indent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mermaid::{LinkStyle, LinkStyleFormat, NodeStyle, NodeStyleFormat};
    use crate::query::{Condition, FilterSet};

    fn parent_child() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(Node::new("a", "System")).unwrap();
        graph
            .add_node(Node::new("b", "Service").with_parent("a"))
            .unwrap();
        graph
    }

    #[test]
    fn test_minimal_flowchart() {
        let output = render(&parent_child(), &MermaidSettings::default()).unwrap();
        assert_eq!(
            output,
            "flowchart TD\n    %% Nodes\n    a\n    b\n\n    %% Links\n"
        );
    }

    #[test]
    fn test_direction_and_labels() {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("api", "Service").with_attribute("name", "Public API (v2)"))
            .unwrap();
        graph.add_node(Node::new("db", "Database")).unwrap();
        graph.add_link(Link::new("api", "db", "reads"));

        let settings = MermaidSettings {
            direction: "LR".to_string(),
            node_label: Some("name".to_string()),
            ..Default::default()
        };
        let output = render(&graph, &settings).unwrap();
        assert_eq!(
            output,
            "flowchart LR\n    %% Nodes\n    api[Public API v2]\n    db\n\n    %% Links\n    api -->|reads| db\n"
        );
    }

    #[test]
    fn test_subgraph_with_label_line() {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("a", "System").with_attribute("name", "Platform"))
            .unwrap();
        graph
            .add_node(Node::new("b", "Service").with_parent("a"))
            .unwrap();
        graph
            .add_node(Node::new("c", "Service").with_parent("b"))
            .unwrap();

        let settings = MermaidSettings {
            node_label: Some("name".to_string()),
            subgraph_nodes: FilterSet::new([Condition::equals("type", "System")]),
            ..Default::default()
        };
        let output = render(&graph, &settings).unwrap();
        assert_eq!(
            output,
            concat!(
                "flowchart TD\n",
                "    %% Nodes\n",
                "    subgraph a\n",
                "        Platform\n",
                "        b\n",
                "        c\n",
                "    end\n",
                "\n",
                "    %% Links\n",
            )
        );
    }

    #[test]
    fn test_node_styles() {
        let mut graph = parent_child();
        graph.add_node(Node::new("c", "Service")).unwrap();
        let settings = MermaidSettings {
            node_styles: vec![
                NodeStyle {
                    filters: vec![Condition::equals("type", "Service").into()],
                    format: NodeStyleFormat {
                        fill: Some("#f00".to_string()),
                        stroke_width: Some("2px".to_string()),
                        ..Default::default()
                    },
                },
                NodeStyle {
                    filters: vec![Condition::equals("type", "Queue").into()],
                    format: NodeStyleFormat {
                        color: Some("#00f".to_string()),
                        ..Default::default()
                    },
                },
            ],
            ..Default::default()
        };
        let output = render(&graph, &settings).unwrap();
        assert_eq!(
            output,
            concat!(
                "flowchart TD\n",
                "    %% Node Styles\n",
                "    classDef style0 fill:#f00,stroke-width:2px;\n",
                "    classDef style1 color:#00f;\n",
                "\n",
                "    %% Nodes\n",
                "    a\n",
                "    b\n",
                "    c\n",
                "\n",
                "    %% Node Styles\n",
                "    class b,c style0\n",
                "\n",
                "    %% Links\n",
            )
        );
    }

    #[test]
    fn test_link_styles_use_sorted_positions() {
        let mut graph = Graph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(Node::new(id, "Service")).unwrap();
        }
        graph.add_link(Link::new("c", "a", "calls"));
        graph.add_link(Link::new("a", "c", "reads"));
        graph.add_link(Link::new("a", "b", "calls"));

        let settings = MermaidSettings {
            link_styles: vec![
                LinkStyle {
                    filters: vec![Condition::equals("type", "calls").into()],
                    format: LinkStyleFormat {
                        stroke: Some("#f00".to_string()),
                        stroke_width: Some("2px".to_string()),
                    },
                },
                LinkStyle {
                    filters: vec![Condition::equals("type", "writes").into()],
                    format: LinkStyleFormat {
                        stroke: Some("#0f0".to_string()),
                        stroke_width: None,
                    },
                },
            ],
            ..Default::default()
        };
        let output = render(&graph, &settings).unwrap();
        assert_eq!(
            output,
            concat!(
                "flowchart TD\n",
                "    %% Nodes\n",
                "    a\n",
                "    b\n",
                "    c\n",
                "\n",
                "    %% Links\n",
                "    a -->|calls| b\n",
                "    a -->|reads| c\n",
                "    c -->|calls| a\n",
                "\n",
                "    %% Link Styles\n",
                "    linkStyle 0,2 stroke:#f00,stroke-width:2px\n",
            )
        );
    }

    #[test]
    fn test_tied_links_keep_declaration_order() {
        let mut graph = Graph::new();
        graph.add_node(Node::new("b", "Service")).unwrap();
        graph.add_node(Node::new("a", "Service")).unwrap();
        graph.add_link(Link::new("b", "a", "replies"));
        graph.add_link(Link::new("a", "b", "writes"));
        graph.add_link(Link::new("a", "b", "reads"));

        let settings = MermaidSettings {
            link_styles: vec![LinkStyle {
                filters: vec![Condition::equals("type", "reads").into()],
                format: LinkStyleFormat {
                    stroke: Some("#333".to_string()),
                    stroke_width: None,
                },
            }],
            ..Default::default()
        };
        let output = render(&graph, &settings).unwrap();
        assert!(output.ends_with(concat!(
            "    %% Links\n",
            "    a -->|writes| b\n",
            "    a -->|reads| b\n",
            "    b -->|replies| a\n",
            "\n",
            "    %% Link Styles\n",
            "    linkStyle 1 stroke:#333\n",
        )));
    }

    #[test]
    fn test_label_empty_after_sanitizing_is_dropped() {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("a", "System").with_attribute("name", "()"))
            .unwrap();
        graph
            .add_node(
                Node::new("b", "Service")
                    .with_parent("a")
                    .with_attribute("name", "[<>]"),
            )
            .unwrap();

        let settings = MermaidSettings {
            node_label: Some("name".to_string()),
            subgraph_nodes: FilterSet::new([Condition::equals("id", "a")]),
            ..Default::default()
        };
        let output = render(&graph, &settings).unwrap();
        assert!(output.contains("    subgraph a\n        b\n    end\n"));
    }

    #[test]
    fn test_render_is_independent_of_input_order() {
        let mut forward = Graph::new();
        forward.add_node(Node::new("x", "T")).unwrap();
        forward.add_node(Node::new("y", "T")).unwrap();
        forward.add_link(Link::new("x", "y", "calls"));
        forward.add_link(Link::new("y", "x", "calls"));

        let mut backward = Graph::new();
        backward.add_node(Node::new("y", "T")).unwrap();
        backward.add_node(Node::new("x", "T")).unwrap();
        backward.add_link(Link::new("y", "x", "calls"));
        backward.add_link(Link::new("x", "y", "calls"));

        let settings = MermaidSettings::default();
        assert_eq!(
            render(&forward, &settings).unwrap(),
            render(&backward, &settings).unwrap()
        );
    }

    #[test]
    fn test_style_query_error_is_wrapped() {
        let settings = MermaidSettings {
            node_styles: vec![NodeStyle {
                filters: vec![Condition::descendant_of("ghost").into()],
                format: NodeStyleFormat {
                    fill: Some("#fff".to_string()),
                    ..Default::default()
                },
            }],
            ..Default::default()
        };
        let err = render(&parent_child(), &settings).unwrap_err();
        assert_eq!(
            err.to_string(),
            "error executing node style 0 query: error applying filters to node 'a': node 'ghost' referenced by query does not exist"
        );
    }

    #[test]
    fn test_invalid_settings_rejected_before_rendering() {
        let settings = MermaidSettings {
            direction: "up".to_string(),
            ..Default::default()
        };
        let err = render(&parent_child(), &settings).unwrap_err();
        assert_eq!(err, RenderError::InvalidDirection { direction: "up".to_string() });
    }
}
