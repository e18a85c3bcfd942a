//! doctree-store - SQLite storage layer
//!
//! Persists the document hierarchy and its content blocks in SQLite. Deleting a
//! document cascades to its subtree through foreign keys.

mod queries;
mod schema;
mod seed;
mod sqlite;
mod transaction;

pub use seed::{default_seed, load_seed_file, seed_documentation, SeedEntry, SeedReport};
pub use sqlite::SqliteStore;
pub use transaction::DocumentTx;

// Re-export schema for testing/migrations
pub use schema::{SCHEMA, SCHEMA_VERSION};
