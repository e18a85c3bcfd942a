//! doctree-core - Core types and traits for the doctree document store
//!
//! Domain types and the storage trait shared by the doctree crates, plus the
//! pure tree assembly and breadcrumb resolution over document rows.

pub mod config;
pub mod error;
pub mod path;
pub mod traits;
pub mod tree;
pub mod types;

pub use config::*;
pub use error::{DoctreeError, Result};
pub use path::{resolve_path, PathStep};
pub use traits::*;
pub use tree::assemble_tree;
pub use types::*;
