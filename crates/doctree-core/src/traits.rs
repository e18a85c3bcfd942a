//! Core traits defining the interfaces between components.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    BlockId, Document, DocumentBlock, DocumentId, DocumentNode, DocumentWithBlocks, NewBlock,
    NewDocument, PathEntry,
};

/// Document repository over the persistent store.
///
/// Operations addressed by id report a missing row as `Ok(None)`. Deletes are
/// idempotent. Store failures are returned unchanged, with no retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // Document operations
    async fn create_document(&self, doc: NewDocument) -> Result<Document>;
    async fn update_document(
        &self,
        id: DocumentId,
        title: &str,
        order_index: i64,
    ) -> Result<Option<Document>>;
    async fn move_document(
        &self,
        id: DocumentId,
        new_parent_id: Option<DocumentId>,
        order_index: i64,
    ) -> Result<Option<Document>>;
    async fn delete_document(&self, id: DocumentId) -> Result<()>;

    // Reads
    async fn get_document_by_id(&self, id: DocumentId) -> Result<Option<DocumentWithBlocks>>;
    async fn get_root_documents(&self) -> Result<Vec<Document>>;
    async fn get_child_documents(&self, parent_id: DocumentId) -> Result<Vec<Document>>;
    async fn get_document_tree(&self) -> Result<Vec<DocumentNode>>;
    async fn get_document_path(&self, id: DocumentId) -> Result<Vec<PathEntry>>;
    async fn count_documents(&self) -> Result<u64>;

    // Block operations
    async fn create_document_block(
        &self,
        document_id: DocumentId,
        block: NewBlock,
    ) -> Result<DocumentBlock>;
    async fn update_document_block(
        &self,
        id: BlockId,
        block: NewBlock,
    ) -> Result<Option<DocumentBlock>>;
    async fn delete_document_block(&self, id: BlockId) -> Result<()>;
}
