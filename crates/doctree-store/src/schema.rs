//! Database schema definitions.

/// Main schema SQL for initializing the database.
///
/// Both foreign keys cascade, so deleting a document removes its whole
/// subtree and every block owned by it. Requires `PRAGMA foreign_keys = ON`.
pub const SCHEMA: &str = r#"
-- Documents table (the hierarchy)
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    parent_id INTEGER REFERENCES documents(id) ON DELETE CASCADE,
    order_index INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(parent_id, order_index);

-- Content blocks owned by a document
CREATE TABLE IF NOT EXISTS document_blocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    content TEXT NOT NULL,
    order_index INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_document_blocks_document ON document_blocks(document_id, order_index);
"#;

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;
