//! SQLite-based storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use doctree_core::{
    assemble_tree, resolve_path, BlockId, DatabaseConfig, Document, DocumentBlock, DocumentId,
    DocumentNode, DocumentStore, DocumentWithBlocks, DoctreeError, NewBlock, NewDocument,
    PathEntry, Result,
};

use crate::queries;
use crate::schema::{SCHEMA, SCHEMA_VERSION};
use crate::transaction::DocumentTx;

/// SQLite-based store implementation.
///
/// All calls share one connection behind a blocking Mutex, so concurrent
/// callers are serialized. Each trait method is a single statement in
/// auto-commit mode except `get_document_by_id`, which reads the document and
/// then its blocks. Use [`SqliteStore::with_transaction`] for atomic
/// multi-statement work.
#[derive(Clone)]
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database at the given path with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = DatabaseConfig {
            path: path.as_ref().to_path_buf(),
            ..DatabaseConfig::default()
        };
        Self::open_with_config(&config)
    }

    /// Open or create the database described by `config`.
    pub fn open_with_config(config: &DatabaseConfig) -> Result<Self> {
        let path = config.path.as_path();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DoctreeError::storage(format!("Failed to open database: {}", e)))?;

        Self::init(conn, config, path)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DoctreeError::storage(format!("Failed to open in-memory database: {}", e))
        })?;

        Self::init(conn, &DatabaseConfig::default(), Path::new(":memory:"))
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, config: &DatabaseConfig, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn, config)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| DoctreeError::storage(format!("Failed to initialize schema: {}", e)))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| DoctreeError::storage(format!("Failed to set schema version: {}", e)))?;

        info!("Database opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Configure the SQLite connection. Foreign keys are always enforced.
    fn configure_connection(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
        let journal_mode = if config.wal_mode { "WAL" } else { "DELETE" };
        conn.execute_batch(&format!(
            r#"
            PRAGMA journal_mode = {};
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = {};
            PRAGMA busy_timeout = {};
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
            journal_mode, config.cache_size, config.busy_timeout_ms
        ))
        .map_err(|e| DoctreeError::storage(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Run `f` inside a single transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls back every write made
    /// through the transaction handle.
    pub fn with_transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&DocumentTx<'_>) -> Result<R>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| DoctreeError::storage(format!("Failed to begin transaction: {}", e)))?;
            let doc_tx = DocumentTx::new(tx);

            let result = f(&doc_tx);
            match result {
                Ok(value) => {
                    doc_tx.commit()?;
                    debug!("Committed transaction");
                    Ok(value)
                }
                Err(e) => {
                    debug!("Rolling back transaction: {}", e);
                    Err(e)
                }
            }
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DoctreeError::internal(format!("Connection lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a mutable blocking operation on the connection.
    fn with_conn_mut<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DoctreeError::internal(format!("Connection lock poisoned: {}", e)))?;
        f(&mut conn)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    // Document operations

    async fn create_document(&self, doc: NewDocument) -> Result<Document> {
        self.with_conn(|conn| queries::insert_document(conn, &doc))
    }

    async fn update_document(
        &self,
        id: DocumentId,
        title: &str,
        order_index: i64,
    ) -> Result<Option<Document>> {
        self.with_conn(|conn| queries::update_document(conn, id, title, order_index))
    }

    async fn move_document(
        &self,
        id: DocumentId,
        new_parent_id: Option<DocumentId>,
        order_index: i64,
    ) -> Result<Option<Document>> {
        self.with_conn(|conn| queries::move_document(conn, id, new_parent_id, order_index))
    }

    async fn delete_document(&self, id: DocumentId) -> Result<()> {
        // Descendants and blocks are removed by CASCADE
        self.with_conn(|conn| queries::delete_document(conn, id))
    }

    // Reads

    async fn get_document_by_id(&self, id: DocumentId) -> Result<Option<DocumentWithBlocks>> {
        self.with_conn(|conn| {
            let Some(document) = queries::get_document(conn, id)? else {
                return Ok(None);
            };
            let blocks = queries::list_blocks(conn, id)?;
            Ok(Some(DocumentWithBlocks { document, blocks }))
        })
    }

    async fn get_root_documents(&self) -> Result<Vec<Document>> {
        self.with_conn(queries::list_root_documents)
    }

    async fn get_child_documents(&self, parent_id: DocumentId) -> Result<Vec<Document>> {
        self.with_conn(|conn| queries::list_child_documents(conn, parent_id))
    }

    async fn get_document_tree(&self) -> Result<Vec<DocumentNode>> {
        let rows = self.with_conn(queries::list_all_documents)?;
        Ok(assemble_tree(rows))
    }

    async fn get_document_path(&self, id: DocumentId) -> Result<Vec<PathEntry>> {
        self.with_conn(|conn| resolve_path(id, |current| queries::path_step(conn, current)))
    }

    async fn count_documents(&self) -> Result<u64> {
        self.with_conn(queries::count_documents)
    }

    // Block operations

    async fn create_document_block(
        &self,
        document_id: DocumentId,
        block: NewBlock,
    ) -> Result<DocumentBlock> {
        self.with_conn(|conn| queries::insert_block(conn, document_id, &block))
    }

    async fn update_document_block(
        &self,
        id: BlockId,
        block: NewBlock,
    ) -> Result<Option<DocumentBlock>> {
        self.with_conn(|conn| queries::update_block(conn, id, &block))
    }

    async fn delete_document_block(&self, id: BlockId) -> Result<()> {
        self.with_conn(|conn| queries::delete_block(conn, id))
    }
}
