//! Diagram settings

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{
    is_valid_color, is_valid_pixel, Direction, FieldError, FilterTarget, RenderError,
};
use crate::query::{compile_filters, Filter, FilterSet};

fn default_direction() -> String {
    Direction::default().to_string()
}

/// Settings that control how a graph is rendered as a Mermaid flowchart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MermaidSettings {
    /// Flowchart direction, one of TB, TD, BT, RL, LR
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Attribute whose value labels each node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_label: Option<String>,
    /// Nodes rendered as subgraphs; none when empty
    #[serde(default, skip_serializing_if = "FilterSet::is_empty")]
    pub subgraph_nodes: FilterSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_styles: Vec<NodeStyle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_styles: Vec<LinkStyle>,
}

impl Default for MermaidSettings {
    fn default() -> Self {
        Self {
            direction: default_direction(),
            node_label: None,
            subgraph_nodes: FilterSet::default(),
            node_styles: Vec::new(),
            link_styles: Vec::new(),
        }
    }
}

/// A class applied to every node matching `filters`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub format: NodeStyleFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeStyleFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ry: Option<String>,
}

impl NodeStyleFormat {
    /// Set properties as `(name, value)` pairs, in output order
    pub fn properties(&self) -> Vec<(&'static str, &str)> {
        [
            ("fill", &self.fill),
            ("color", &self.color),
            ("stroke-width", &self.stroke_width),
            ("font-size", &self.font_size),
            ("padding", &self.padding),
            ("rx", &self.rx),
            ("ry", &self.ry),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    fn validate(&self) -> Result<(), FieldError> {
        is_valid_color("fill", self.fill.as_deref())?;
        is_valid_color("color", self.color.as_deref())?;
        is_valid_pixel("stroke-width", self.stroke_width.as_deref())?;
        is_valid_pixel("font-size", self.font_size.as_deref())?;
        is_valid_pixel("padding", self.padding.as_deref())?;
        is_valid_pixel("rx", self.rx.as_deref())?;
        is_valid_pixel("ry", self.ry.as_deref())
    }
}

/// A line style applied to every link matching `filters`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkStyle {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub format: LinkStyleFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinkStyleFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<String>,
}

impl LinkStyleFormat {
    /// Set properties as `(name, value)` pairs, in output order
    pub fn properties(&self) -> Vec<(&'static str, &str)> {
        [("stroke", &self.stroke), ("stroke-width", &self.stroke_width)]
            .into_iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
            .collect()
    }

    fn validate(&self) -> Result<(), FieldError> {
        is_valid_color("stroke", self.stroke.as_deref())?;
        is_valid_pixel("stroke-width", self.stroke_width.as_deref())
    }
}

fn check_style(
    style: String,
    has_properties: bool,
    format: Result<(), FieldError>,
    filters: &[Filter],
    target: FilterTarget,
) -> Result<(), RenderError> {
    if !has_properties {
        return Err(RenderError::EmptyStyle { style });
    }
    if let Err(cause) = format {
        return Err(RenderError::InvalidStyle { style, cause });
    }
    compile_filters(filters, target).map_err(|cause| RenderError::InvalidSelector {
        selector: style,
        cause,
    })?;
    Ok(())
}

impl MermaidSettings {
    /// Parse the configured direction
    pub fn direction(&self) -> Result<Direction, RenderError> {
        self.direction
            .parse()
            .map_err(|_| RenderError::InvalidDirection {
                direction: self.direction.clone(),
            })
    }

    /// Check direction, style formats and every embedded filter
    pub fn validate(&self) -> Result<(), RenderError> {
        self.direction()?;

        self.subgraph_nodes
            .compile(FilterTarget::Nodes)
            .map_err(|cause| RenderError::InvalidSelector {
                selector: "subgraph".to_string(),
                cause,
            })?;

        for (index, style) in self.node_styles.iter().enumerate() {
            check_style(
                format!("node style {}", index),
                !style.format.properties().is_empty(),
                style.format.validate(),
                &style.filters,
                FilterTarget::Nodes,
            )?;
        }
        for (index, style) in self.link_styles.iter().enumerate() {
            check_style(
                format!("link style {}", index),
                !style.format.properties().is_empty(),
                style.format.validate(),
                &style.filters,
                FilterTarget::Links,
            )?;
        }

        trace!(
            node_styles = self.node_styles.len(),
            link_styles = self.link_styles.len(),
            "Diagram settings are valid"
        );
        Ok(())
    }
}
