//! Core type definitions shared by the query engine and the renderer

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// String attributes attached to nodes and links
///
/// A `BTreeMap` keeps serialized output and iteration deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Flow direction of the rendered Mermaid flowchart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Direction {
    /// Top to bottom (TB)
    TopBottom,
    /// Top down (TD), Mermaid's alias for TB
    #[default]
    TopDown,
    /// Bottom to top (BT)
    BottomTop,
    /// Right to left (RL)
    RightLeft,
    /// Left to right (LR)
    LeftRight,
}

impl FromStr for Direction {
    type Err = String;

    /// Directions are matched exactly; Mermaid keywords are upper case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TB" => Ok(Direction::TopBottom),
            "TD" => Ok(Direction::TopDown),
            "BT" => Ok(Direction::BottomTop),
            "RL" => Ok(Direction::RightLeft),
            "LR" => Ok(Direction::LeftRight),
            _ => Err(format!("invalid direction: {}", s)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TopBottom => write!(f, "TB"),
            Direction::TopDown => write!(f, "TD"),
            Direction::BottomTop => write!(f, "BT"),
            Direction::RightLeft => write!(f, "RL"),
            Direction::LeftRight => write!(f, "LR"),
        }
    }
}

/// Which half of the graph a filter list applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterTarget {
    Nodes,
    Links,
}

impl fmt::Display for FilterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterTarget::Nodes => write!(f, "node"),
            FilterTarget::Links => write!(f, "link"),
        }
    }
}
