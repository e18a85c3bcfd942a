//! Breadcrumb resolution by walking the parent chain.

use std::collections::HashSet;

use crate::error::{DoctreeError, Result};
use crate::types::{DocumentId, PathEntry};

/// The fields of one document the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub id: DocumentId,
    pub title: String,
    pub parent_id: Option<DocumentId>,
}

/// Resolve the root-to-target breadcrumb for `start`.
///
/// `lookup` fetches a single document by id. The path is empty unless the walk
/// reaches a root, so an unknown `start` or a missing ancestor both yield `[]`.
/// A parent chain that revisits a document fails with
/// [`DoctreeError::CycleDetected`].
pub fn resolve_path<F>(start: DocumentId, mut lookup: F) -> Result<Vec<PathEntry>>
where
    F: FnMut(DocumentId) -> Result<Option<PathStep>>,
{
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    let mut next = Some(start);

    while let Some(id) = next {
        if !visited.insert(id) {
            return Err(DoctreeError::CycleDetected { id });
        }

        let Some(step) = lookup(id)? else {
            return Ok(Vec::new());
        };

        next = step.parent_id;
        path.push(PathEntry {
            id: step.id,
            title: step.title,
        });
    }

    path.reverse();
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn table(rows: &[(DocumentId, &str, Option<DocumentId>)]) -> HashMap<DocumentId, PathStep> {
        rows.iter()
            .map(|(id, title, parent_id)| {
                (
                    *id,
                    PathStep {
                        id: *id,
                        title: title.to_string(),
                        parent_id: *parent_id,
                    },
                )
            })
            .collect()
    }

    fn resolve(rows: &HashMap<DocumentId, PathStep>, start: DocumentId) -> Result<Vec<PathEntry>> {
        resolve_path(start, |id| Ok(rows.get(&id).cloned()))
    }

    #[test]
    fn test_root_to_target_order() {
        let rows = table(&[
            (1, "Root", None),
            (2, "A", Some(1)),
            (3, "B", Some(2)),
            (4, "Target", Some(3)),
        ]);
        let path = resolve(&rows, 4).unwrap();

        let titles: Vec<_> = path.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Root", "A", "B", "Target"]);
        let ids: Vec<_> = path.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_root_path_is_itself() {
        let rows = table(&[(1, "Root", None)]);
        let path = resolve(&rows, 1).unwrap();
        assert_eq!(
            path,
            vec![PathEntry {
                id: 1,
                title: "Root".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_start_is_empty() {
        let rows = table(&[(1, "Root", None)]);
        assert!(resolve(&rows, 999).unwrap().is_empty());
    }

    #[test]
    fn test_chain_without_root_is_empty() {
        let rows = table(&[(2, "A", Some(1)), (3, "B", Some(2))]);
        assert!(resolve(&rows, 3).unwrap().is_empty());
        assert!(resolve(&rows, 2).unwrap().is_empty());
    }

    #[test]
    fn test_cycle_fails_fast() {
        let rows = table(&[(1, "A", Some(3)), (2, "B", Some(1)), (3, "C", Some(2))]);
        let err = resolve(&rows, 2).unwrap_err();
        assert!(matches!(err, DoctreeError::CycleDetected { id: 2 }));
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let err = resolve_path(1, |_| Err(DoctreeError::storage("gone"))).unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }
}
