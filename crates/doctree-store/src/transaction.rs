//! Scoped transactions over the document tables.

use rusqlite::Transaction;

use doctree_core::{
    BlockId, Document, DocumentBlock, DocumentId, DoctreeError, NewBlock, NewDocument, Result,
};

use crate::queries;

/// Handle passed to [`SqliteStore::with_transaction`](crate::SqliteStore::with_transaction).
///
/// Offers the same single-row operations as the store, executed synchronously
/// inside one SQLite transaction.
pub struct DocumentTx<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> DocumentTx<'conn> {
    pub(crate) fn new(tx: Transaction<'conn>) -> Self {
        Self { tx }
    }

    pub(crate) fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .map_err(|e| DoctreeError::storage(format!("Failed to commit transaction: {}", e)))
    }

    pub fn create_document(&self, doc: &NewDocument) -> Result<Document> {
        queries::insert_document(&self.tx, doc)
    }

    pub fn update_document(
        &self,
        id: DocumentId,
        title: &str,
        order_index: i64,
    ) -> Result<Option<Document>> {
        queries::update_document(&self.tx, id, title, order_index)
    }

    pub fn move_document(
        &self,
        id: DocumentId,
        new_parent_id: Option<DocumentId>,
        order_index: i64,
    ) -> Result<Option<Document>> {
        queries::move_document(&self.tx, id, new_parent_id, order_index)
    }

    pub fn delete_document(&self, id: DocumentId) -> Result<()> {
        queries::delete_document(&self.tx, id)
    }

    pub fn create_document_block(
        &self,
        document_id: DocumentId,
        block: &NewBlock,
    ) -> Result<DocumentBlock> {
        queries::insert_block(&self.tx, document_id, block)
    }

    pub fn update_document_block(
        &self,
        id: BlockId,
        block: &NewBlock,
    ) -> Result<Option<DocumentBlock>> {
        queries::update_block(&self.tx, id, block)
    }

    pub fn delete_document_block(&self, id: BlockId) -> Result<()> {
        queries::delete_block(&self.tx, id)
    }

    pub fn count_documents(&self) -> Result<u64> {
        queries::count_documents(&self.tx)
    }
}

#[cfg(test)]
mod tests {
    use crate::SqliteStore;
    use doctree_core::{DocumentStore, DoctreeError, NewBlock, NewDocument};

    #[tokio::test]
    async fn test_commit_keeps_all_writes() {
        let store = SqliteStore::open_memory().unwrap();

        let (root_id, child_id) = store
            .with_transaction(|tx| {
                let root = tx.create_document(&NewDocument::root("Guide"))?;
                let child = tx.create_document(&NewDocument::child("Chapter", root.id))?;
                tx.create_document_block(child.id, &NewBlock::rich_text("<p>1</p>"))?;
                Ok((root.id, child.id))
            })
            .unwrap();

        assert_eq!(store.count_documents().await.unwrap(), 2);
        let child = store.get_document_by_id(child_id).await.unwrap().unwrap();
        assert_eq!(child.document.parent_id, Some(root_id));
        assert_eq!(child.blocks.len(), 1);
    }

    #[tokio::test]
    async fn test_error_rolls_back_everything() {
        let store = SqliteStore::open_memory().unwrap();

        let err = store
            .with_transaction(|tx| {
                let root = tx.create_document(&NewDocument::root("Guide"))?;
                tx.create_document_block(root.id, &NewBlock::rich_text("<p>1</p>"))?;
                // Missing parent fails the whole batch
                tx.create_document(&NewDocument::child("Broken", 999))?;
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, DoctreeError::ReferentialViolation { .. }));
        assert_eq!(store.count_documents().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutations_inside_transaction() {
        let store = SqliteStore::open_memory().unwrap();
        let root = store
            .create_document(NewDocument::root("Root"))
            .await
            .unwrap();
        let other = store
            .create_document(NewDocument::root("Other").at(1))
            .await
            .unwrap();

        store
            .with_transaction(|tx| {
                assert_eq!(tx.count_documents()?, 2);
                let renamed = tx.update_document(other.id, "Appendix", 2)?;
                assert!(renamed.is_some());
                let moved = tx.move_document(other.id, Some(root.id), 0)?;
                assert_eq!(moved.map(|d| d.parent_id), Some(Some(root.id)));
                let block = tx.create_document_block(root.id, &NewBlock::rich_text("a"))?;
                tx.update_document_block(block.id, &NewBlock::rich_text("b"))?;
                tx.delete_document_block(block.id)?;
                Ok(())
            })
            .unwrap();

        let children = store.get_child_documents(root.id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].title, "Appendix");
        let fetched = store.get_document_by_id(root.id).await.unwrap().unwrap();
        assert!(fetched.blocks.is_empty());

        store
            .with_transaction(|tx| tx.delete_document(root.id))
            .unwrap();
        assert_eq!(store.count_documents().await.unwrap(), 0);
    }
}
