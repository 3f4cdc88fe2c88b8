//! Mermaid flowchart generation
//!
//! Turns an architecture graph into Mermaid flowchart text. Nodes selected by
//! the `subgraphNodes` filters become subgraphs; every other node is drawn
//! inside its nearest selected ancestor. Node and link styles are resolved
//! with the query engine and emitted as `classDef`/`class` and `linkStyle`
//! statements.

mod layout;
mod renderer;
mod sanitize;
mod settings;

pub use layout::{Container, SubgraphLayout};
pub use renderer::render;
pub use sanitize::sanitize_label;
pub use settings::{LinkStyle, LinkStyleFormat, MermaidSettings, NodeStyle, NodeStyleFormat};
