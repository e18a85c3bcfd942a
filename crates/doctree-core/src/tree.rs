//! Assembly of flat document rows into a nested forest.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::types::{Document, DocumentId, DocumentNode};

/// Build the document forest from a flat list of rows.
///
/// Siblings keep the relative order they have in `rows`, so callers pass rows
/// sorted by `(parent_id NULLS FIRST, order_index, id)`. Rows whose parent is
/// missing from the input, and rows that only hang off a parent cycle, are not
/// reachable from any root and are dropped.
pub fn assemble_tree(rows: Vec<Document>) -> Vec<DocumentNode> {
    let total = rows.len();
    let known: HashSet<DocumentId> = rows.iter().map(|doc| doc.id).collect();

    let mut roots = Vec::new();
    let mut children: HashMap<DocumentId, Vec<Document>> = HashMap::new();

    for doc in rows {
        match doc.parent_id {
            None => roots.push(doc),
            Some(parent_id) if known.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(doc);
            }
            Some(parent_id) => {
                debug!("Dropping document {}: parent {} not found", doc.id, parent_id);
            }
        }
    }

    // Breadth-first from the roots, so every parent precedes its children.
    let root_ids: Vec<DocumentId> = roots.iter().map(|doc| doc.id).collect();
    let mut queue = VecDeque::from(roots);
    let mut reachable: Vec<(Document, Vec<DocumentId>)> = Vec::with_capacity(total);
    while let Some(doc) = queue.pop_front() {
        let kids = children.remove(&doc.id).unwrap_or_default();
        let kid_ids = kids.iter().map(|kid| kid.id).collect();
        queue.extend(kids);
        reachable.push((doc, kid_ids));
    }

    let placed = reachable.len();
    if placed < total {
        debug!(
            "Assembled {} of {} documents; {} unreachable from any root",
            placed,
            total,
            total - placed
        );
    }

    // Build bottom-up: children are finished before their parent is visited.
    let mut built: HashMap<DocumentId, DocumentNode> = HashMap::with_capacity(placed);
    for (doc, kid_ids) in reachable.into_iter().rev() {
        let node = DocumentNode {
            children: kid_ids.iter().filter_map(|id| built.remove(id)).collect(),
            document: doc,
        };
        built.insert(node.document.id, node);
    }

    root_ids
        .iter()
        .filter_map(|id| built.remove(id))
        .collect()
}
