//! Core domain types for the doctree system.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned document identifier.
pub type DocumentId = i64;

/// Store-assigned block identifier.
pub type BlockId = i64;

/// Block type tag used for rich-text content.
pub const RICH_TEXT: &str = "rich-text";

/// Deepest nesting level the store accepts, counting a root as level 1.
///
/// Serializing, cloning and comparing a [`DocumentNode`] recurse once per
/// level, so writes that would nest documents deeper than this are refused.
/// Trees built by [`assemble_tree`](crate::assemble_tree) and dropped here
/// are handled iteratively at any depth.
pub const MAX_DEPTH: usize = 32;

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A page in the documentation hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, assigned by the store.
    pub id: DocumentId,

    /// Page title.
    pub title: String,

    /// Parent document, `None` for a root.
    pub parent_id: Option<DocumentId>,

    /// Position among siblings sharing the same parent.
    pub order_index: i64,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,

    /// Last update timestamp (Unix millis).
    pub updated_at: u64,
}

impl Document {
    /// Check if this is a root document.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A content block owned by one document.
///
/// `kind` and `content` are opaque to the store: they are written and read
/// back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBlock {
    /// Unique identifier, assigned by the store.
    pub id: BlockId,

    /// Owning document.
    pub document_id: DocumentId,

    /// Block kind tag, e.g. `rich-text`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Schema-less block payload.
    pub content: serde_json::Value,

    /// Display position within the document.
    pub order_index: i64,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,

    /// Last update timestamp (Unix millis).
    pub updated_at: u64,
}

/// A document together with its ordered blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWithBlocks {
    #[serde(flatten)]
    pub document: Document,

    pub blocks: Vec<DocumentBlock>,
}

/// One node of the assembled document forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    #[serde(flatten)]
    pub document: Document,

    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    /// Create a leaf node.
    pub fn leaf(document: Document) -> Self {
        Self {
            document,
            children: Vec::new(),
        }
    }

    /// Count this node and all of its descendants.
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Number of levels in this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|child| (child, level + 1)));
        }
        deepest
    }

    /// Iterate over this node and its descendants in depth-first pre-order.
    pub fn walk(&self) -> Vec<&DocumentNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

// Unlink children onto a heap stack so deep chains do not drop recursively.
impl Drop for DocumentNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// One breadcrumb step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub id: DocumentId,
    pub title: String,
}

/// Insert payload for a document.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub title: String,
    pub parent_id: Option<DocumentId>,
    pub order_index: i64,
}

impl NewDocument {
    /// Create a root document payload at order 0.
    pub fn root(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parent_id: None,
            order_index: 0,
        }
    }

    /// Create a child document payload at order 0.
    pub fn child(title: impl Into<String>, parent_id: DocumentId) -> Self {
        Self {
            title: title.into(),
            parent_id: Some(parent_id),
            order_index: 0,
        }
    }

    /// Set the sibling position.
    pub fn at(mut self, order_index: i64) -> Self {
        self.order_index = order_index;
        self
    }
}

/// Insert or replace payload for a block.
#[derive(Debug, Clone)]
pub struct NewBlock {
    pub kind: String,
    pub content: serde_json::Value,
    pub order_index: i64,
}

impl NewBlock {
    /// Create a block payload at order 0.
    pub fn new(kind: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            content,
            order_index: 0,
        }
    }

    /// Create a `rich-text` block holding an html fragment.
    pub fn rich_text(html: impl Into<String>) -> Self {
        Self::new(RICH_TEXT, serde_json::json!({ "html": html.into() }))
    }

    /// Set the display position.
    pub fn at(mut self, order_index: i64) -> Self {
        self.order_index = order_index;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: DocumentId, parent_id: Option<DocumentId>) -> Document {
        Document {
            id,
            title: format!("doc {}", id),
            parent_id,
            order_index: 0,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_document_json_shape() {
        let value = serde_json::to_value(doc(2, Some(1))).unwrap();
        assert_eq!(value["parent_id"], json!(1));
        assert_eq!(value["order_index"], json!(0));
        assert!(value.get("updated_at").is_some());

        let root = serde_json::to_value(doc(1, None)).unwrap();
        assert!(root["parent_id"].is_null());
    }

    #[test]
    fn test_block_kind_serializes_as_type() {
        let block = DocumentBlock {
            id: 1,
            document_id: 1,
            kind: RICH_TEXT.to_string(),
            content: json!({ "html": "<p>x</p>" }),
            order_index: 0,
            created_at: 1,
            updated_at: 1,
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], json!("rich-text"));
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_node_flattens_document_and_keeps_empty_children() {
        let node = DocumentNode::leaf(doc(1, None));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], json!(1));
        assert_eq!(value["children"], json!([]));
    }

    #[test]
    fn test_node_walk_is_preorder() {
        let mut root = DocumentNode::leaf(doc(1, None));
        let mut a = DocumentNode::leaf(doc(2, Some(1)));
        a.children.push(DocumentNode::leaf(doc(4, Some(2))));
        root.children.push(a);
        root.children.push(DocumentNode::leaf(doc(3, Some(1))));

        let ids: Vec<_> = root.walk().iter().map(|n| n.document.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
        assert_eq!(root.subtree_size(), 4);
        assert_eq!(root.depth(), 3);
    }

    #[test]
    fn test_deep_chain_counts_and_drops_without_recursion() {
        let mut node = DocumentNode::leaf(doc(50_000, Some(49_999)));
        for id in (1..50_000).rev() {
            let mut parent = DocumentNode::leaf(doc(id, (id > 1).then(|| id - 1)));
            parent.children.push(node);
            node = parent;
        }

        assert_eq!(node.subtree_size(), 50_000);
        assert_eq!(node.depth(), 50_000);
        assert_eq!(node.walk().len(), 50_000);
        drop(node);
    }

    #[test]
    fn test_max_depth_tree_serializes_and_parses_back() {
        let mut node = DocumentNode::leaf(doc(MAX_DEPTH as i64, Some(MAX_DEPTH as i64 - 1)));
        for id in (1..MAX_DEPTH as i64).rev() {
            let mut parent = DocumentNode::leaf(doc(id, (id > 1).then(|| id - 1)));
            parent.children.push(node);
            node = parent;
        }

        let json = serde_json::to_string(&vec![node]).unwrap();
        let parsed: Vec<DocumentNode> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].depth(), MAX_DEPTH);
    }

    #[test]
    fn test_rich_text_block() {
        let block = NewBlock::rich_text("<p>x</p>").at(2);
        assert_eq!(block.kind, "rich-text");
        assert_eq!(block.content, json!({ "html": "<p>x</p>" }));
        assert_eq!(block.order_index, 2);
    }
}
