//! Core data model, validation and shared infrastructure
//!
//! The graph model and its structural validator live here, together with the
//! error types and logging setup used by the query engine and the renderer.

mod error;
mod graph;
pub mod logging;
mod types;
mod validate;

pub use error::*;
pub use graph::*;
pub use logging::*;
pub use types::*;
pub use validate::*;
