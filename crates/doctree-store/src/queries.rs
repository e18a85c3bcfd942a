//! Single-statement document and block queries.
//!
//! Every function takes a plain `Connection` so the same SQL serves both the
//! auto-commit store methods and explicit transactions.

use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use tracing::debug;

use doctree_core::{
    now_millis, resolve_path, BlockId, Document, DocumentBlock, DocumentId, DoctreeError,
    NewBlock, NewDocument, PathStep, Result, MAX_DEPTH,
};

const DOCUMENT_COLUMNS: &str = "id, title, parent_id, order_index, created_at, updated_at";

const BLOCK_COLUMNS: &str =
    "id, document_id, type, content, order_index, created_at, updated_at";

/// Translate a rusqlite error, singling out foreign key failures.
pub(crate) fn map_sqlite_err(e: rusqlite::Error, context: &str) -> DoctreeError {
    let fk_failure = match &e {
        rusqlite::Error::SqliteFailure(err, msg) => {
            err.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                || msg
                    .as_deref()
                    .is_some_and(|m| m.contains("FOREIGN KEY constraint"))
        }
        _ => false,
    };

    if fk_failure {
        DoctreeError::referential(format!("{}: referenced document does not exist", context))
    } else {
        DoctreeError::storage(format!("{}: {}", context, e))
    }
}

// Documents

pub(crate) fn insert_document(conn: &Connection, doc: &NewDocument) -> Result<Document> {
    if let Some(parent_id) = doc.parent_id {
        ensure_depth(depth_of(conn, parent_id)? + 1)?;
    }

    let now = now_millis() as i64;
    let sql = format!(
        "INSERT INTO documents (title, parent_id, order_index, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         RETURNING {}",
        DOCUMENT_COLUMNS
    );

    let created = conn
        .query_row(
            &sql,
            params![doc.title, doc.parent_id, doc.order_index, now],
            row_to_document,
        )
        .map_err(|e| map_sqlite_err(e, "Failed to create document"))?;

    debug!("Created document {} ({:?})", created.id, created.title);
    Ok(created)
}

pub(crate) fn update_document(
    conn: &Connection,
    id: DocumentId,
    title: &str,
    order_index: i64,
) -> Result<Option<Document>> {
    let sql = format!(
        "UPDATE documents SET title = ?1, order_index = ?2, updated_at = ?3
         WHERE id = ?4
         RETURNING {}",
        DOCUMENT_COLUMNS
    );

    let updated = conn
        .query_row(
            &sql,
            params![title, order_index, now_millis() as i64, id],
            row_to_document,
        )
        .optional()
        .map_err(|e| map_sqlite_err(e, "Failed to update document"))?;

    debug!("Updated document {}: found={}", id, updated.is_some());
    Ok(updated)
}

pub(crate) fn move_document(
    conn: &Connection,
    id: DocumentId,
    new_parent_id: Option<DocumentId>,
    order_index: i64,
) -> Result<Option<Document>> {
    if let Some(parent_id) = new_parent_id {
        let parent_depth = ensure_not_descendant(conn, id, parent_id)?;
        ensure_depth(parent_depth + subtree_height(conn, id)?)?;
    }

    let sql = format!(
        "UPDATE documents SET parent_id = ?1, order_index = ?2, updated_at = ?3
         WHERE id = ?4
         RETURNING {}",
        DOCUMENT_COLUMNS
    );

    let moved = conn
        .query_row(
            &sql,
            params![new_parent_id, order_index, now_millis() as i64, id],
            row_to_document,
        )
        .optional()
        .map_err(|e| map_sqlite_err(e, "Failed to move document"))?;

    debug!(
        "Moved document {} under {:?}: found={}",
        id,
        new_parent_id,
        moved.is_some()
    );
    Ok(moved)
}

/// Reject a move that would place `id` under itself or one of its descendants.
///
/// Returns the depth of `parent_id`.
fn ensure_not_descendant(
    conn: &Connection,
    id: DocumentId,
    parent_id: DocumentId,
) -> Result<usize> {
    let rejected = DoctreeError::CycleRejected { id, parent_id };
    if parent_id == id {
        return Err(rejected);
    }

    let ancestors = resolve_path(parent_id, |current| path_step(conn, current))?;
    if ancestors.iter().any(|entry| entry.id == id) {
        return Err(rejected);
    }
    Ok(ancestors.len())
}

fn ensure_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(DoctreeError::DepthExceeded { max: MAX_DEPTH });
    }
    Ok(())
}

/// Levels from the root down to `id` inclusive; 0 when `id` is unknown.
fn depth_of(conn: &Connection, id: DocumentId) -> Result<usize> {
    Ok(resolve_path(id, |current| path_step(conn, current))?.len())
}

/// Levels in the subtree rooted at `id` (1 for a leaf, 0 when unknown).
///
/// The walk stops one level past `MAX_DEPTH`.
fn subtree_height(conn: &Connection, id: DocumentId) -> Result<usize> {
    conn.query_row(
        "WITH RECURSIVE subtree(id, level) AS (
             SELECT id, 1 FROM documents WHERE id = ?1
             UNION ALL
             SELECT d.id, s.level + 1 FROM documents d
             JOIN subtree s ON d.parent_id = s.id
             WHERE s.level <= ?2
         )
         SELECT COALESCE(MAX(level), 0) FROM subtree",
        params![id, MAX_DEPTH as i64],
        |row| row.get::<_, i64>(0),
    )
    .map(|level| level as usize)
    .map_err(|e| map_sqlite_err(e, "Failed to measure subtree"))
}

pub(crate) fn delete_document(conn: &Connection, id: DocumentId) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM documents WHERE id = ?1", params![id])
        .map_err(|e| map_sqlite_err(e, "Failed to delete document"))?;

    debug!("Deleted document {}: rows={}", id, deleted);
    Ok(())
}

pub(crate) fn get_document(conn: &Connection, id: DocumentId) -> Result<Option<Document>> {
    let sql = format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS);
    conn.query_row(&sql, params![id], row_to_document)
        .optional()
        .map_err(|e| map_sqlite_err(e, "Failed to get document"))
}

pub(crate) fn list_root_documents(conn: &Connection) -> Result<Vec<Document>> {
    let sql = format!(
        "SELECT {} FROM documents WHERE parent_id IS NULL ORDER BY order_index ASC, id ASC",
        DOCUMENT_COLUMNS
    );
    query_documents(conn, &sql, params![])
}

pub(crate) fn list_child_documents(
    conn: &Connection,
    parent_id: DocumentId,
) -> Result<Vec<Document>> {
    let sql = format!(
        "SELECT {} FROM documents WHERE parent_id = ?1 ORDER BY order_index ASC, id ASC",
        DOCUMENT_COLUMNS
    );
    query_documents(conn, &sql, params![parent_id])
}

/// All documents, ordered so that tree assembly can append siblings in place.
pub(crate) fn list_all_documents(conn: &Connection) -> Result<Vec<Document>> {
    let sql = format!(
        "SELECT {} FROM documents ORDER BY parent_id NULLS FIRST, order_index ASC, id ASC",
        DOCUMENT_COLUMNS
    );
    query_documents(conn, &sql, params![])
}

pub(crate) fn count_documents(conn: &Connection) -> Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM documents", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|n| n as u64)
    .map_err(|e| map_sqlite_err(e, "Failed to count documents"))
}

pub(crate) fn path_step(conn: &Connection, id: DocumentId) -> Result<Option<PathStep>> {
    conn.query_row(
        "SELECT id, title, parent_id FROM documents WHERE id = ?1",
        params![id],
        |row| {
            Ok(PathStep {
                id: row.get(0)?,
                title: row.get(1)?,
                parent_id: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(|e| map_sqlite_err(e, "Failed to walk document path"))
}

fn query_documents(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Document>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| map_sqlite_err(e, "Failed to prepare document query"))?;

    let documents = stmt
        .query_map(params, row_to_document)
        .map_err(|e| map_sqlite_err(e, "Failed to query documents"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| map_sqlite_err(e, "Failed to read documents"))?;

    Ok(documents)
}

// Blocks

pub(crate) fn insert_block(
    conn: &Connection,
    document_id: DocumentId,
    block: &NewBlock,
) -> Result<DocumentBlock> {
    let content = serde_json::to_string(&block.content)?;
    let now = now_millis() as i64;
    let sql = format!(
        "INSERT INTO document_blocks (document_id, type, content, order_index, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         RETURNING {}",
        BLOCK_COLUMNS
    );

    let created = conn
        .query_row(
            &sql,
            params![document_id, block.kind, content, block.order_index, now],
            row_to_block,
        )
        .map_err(|e| map_sqlite_err(e, "Failed to create block"))?;

    debug!("Created block {} on document {}", created.id, document_id);
    Ok(created)
}

pub(crate) fn update_block(
    conn: &Connection,
    id: BlockId,
    block: &NewBlock,
) -> Result<Option<DocumentBlock>> {
    let content = serde_json::to_string(&block.content)?;
    let sql = format!(
        "UPDATE document_blocks SET type = ?1, content = ?2, order_index = ?3, updated_at = ?4
         WHERE id = ?5
         RETURNING {}",
        BLOCK_COLUMNS
    );

    let updated = conn
        .query_row(
            &sql,
            params![block.kind, content, block.order_index, now_millis() as i64, id],
            row_to_block,
        )
        .optional()
        .map_err(|e| map_sqlite_err(e, "Failed to update block"))?;

    debug!("Updated block {}: found={}", id, updated.is_some());
    Ok(updated)
}

pub(crate) fn delete_block(conn: &Connection, id: BlockId) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM document_blocks WHERE id = ?1", params![id])
        .map_err(|e| map_sqlite_err(e, "Failed to delete block"))?;

    debug!("Deleted block {}: rows={}", id, deleted);
    Ok(())
}

pub(crate) fn list_blocks(conn: &Connection, document_id: DocumentId) -> Result<Vec<DocumentBlock>> {
    let sql = format!(
        "SELECT {} FROM document_blocks WHERE document_id = ?1 ORDER BY order_index ASC, id ASC",
        BLOCK_COLUMNS
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| map_sqlite_err(e, "Failed to prepare block query"))?;

    let blocks = stmt
        .query_map(params![document_id], row_to_block)
        .map_err(|e| map_sqlite_err(e, "Failed to query blocks"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| map_sqlite_err(e, "Failed to read blocks"))?;

    Ok(blocks)
}

// Row mapping

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        parent_id: row.get(2)?,
        order_index: row.get(3)?,
        created_at: row.get::<_, i64>(4)? as u64,
        updated_at: row.get::<_, i64>(5)? as u64,
    })
}

fn row_to_block(row: &Row<'_>) -> rusqlite::Result<DocumentBlock> {
    let content_str: String = row.get(3)?;
    let content = serde_json::from_str(&content_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(DocumentBlock {
        id: row.get(0)?,
        document_id: row.get(1)?,
        kind: row.get(2)?,
        content,
        order_index: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
        updated_at: row.get::<_, i64>(6)? as u64,
    })
}
