//! Initial documentation outline loading.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use doctree_core::{DocumentId, NewBlock, NewDocument, Result};

use crate::SqliteStore;

/// One page of a seed outline.
///
/// Pages reference each other through `key`, which is local to the outline
/// and unrelated to the ids the store assigns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedEntry {
    #[serde(rename = "id")]
    pub key: String,

    pub title: String,

    #[serde(default, rename = "parentId")]
    pub parent_key: Option<String>,

    #[serde(default)]
    pub order_index: i64,

    /// Page body, stored as a single `rich-text` block.
    #[serde(default, rename = "content")]
    pub html: Option<String>,
}

/// Outcome of a seeding run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    /// True when the store already held documents and nothing was written.
    pub skipped: bool,

    /// Documents present before seeding.
    pub existing: u64,

    pub documents_created: usize,

    pub blocks_created: usize,

    /// Keys of entries whose parent never resolved.
    pub unresolved: Vec<String>,
}

/// Read a seed outline from a JSON array file.
pub fn load_seed_file(path: &Path) -> Result<Vec<SeedEntry>> {
    let content = std::fs::read_to_string(path)?;
    let entries = serde_json::from_str(&content)?;
    Ok(entries)
}

/// Populate an empty store with `entries`.
///
/// Roots are created first, then children in repeated passes until no further
/// parent resolves. The whole run is one transaction; a store that already
/// holds documents is left untouched.
pub fn seed_documentation(store: &SqliteStore, entries: &[SeedEntry]) -> Result<SeedReport> {
    let report = store.with_transaction(|tx| {
        let existing = tx.count_documents()?;
        if existing > 0 {
            return Ok(SeedReport {
                skipped: true,
                existing,
                ..SeedReport::default()
            });
        }

        let mut ids: HashMap<&str, DocumentId> = HashMap::new();
        let mut report = SeedReport::default();

        let (roots, mut pending): (Vec<&SeedEntry>, Vec<&SeedEntry>) =
            entries.iter().partition(|e| e.parent_key.is_none());

        for entry in roots {
            let doc = tx.create_document(&NewDocument::root(&entry.title).at(entry.order_index))?;
            ids.insert(entry.key.as_str(), doc.id);
            report.documents_created += 1;
        }

        while !pending.is_empty() {
            let before = pending.len();
            let mut next = Vec::new();

            for entry in pending {
                let parent = entry
                    .parent_key
                    .as_deref()
                    .and_then(|key| ids.get(key).copied());
                match parent {
                    Some(parent_id) => {
                        let doc = tx.create_document(
                            &NewDocument::child(&entry.title, parent_id).at(entry.order_index),
                        )?;
                        ids.insert(entry.key.as_str(), doc.id);
                        report.documents_created += 1;
                    }
                    None => next.push(entry),
                }
            }

            pending = next;
            if pending.len() == before {
                break;
            }
        }

        report.unresolved = pending.iter().map(|e| e.key.clone()).collect();

        for entry in entries {
            let (Some(id), Some(html)) = (ids.get(entry.key.as_str()), entry.html.as_deref())
            else {
                continue;
            };
            if html.is_empty() {
                continue;
            }
            tx.create_document_block(*id, &NewBlock::rich_text(html))?;
            report.blocks_created += 1;
        }

        Ok(report)
    })?;

    if report.skipped {
        info!(
            "Store already holds {} documents, skipping seed",
            report.existing
        );
    } else {
        info!(
            "Seeded {} documents and {} blocks",
            report.documents_created, report.blocks_created
        );
    }
    if !report.unresolved.is_empty() {
        warn!(
            "Seed entries with unresolved parents: {:?}",
            report.unresolved
        );
    }

    Ok(report)
}

/// The default documentation outline for a fresh install.
pub fn default_seed() -> Vec<SeedEntry> {
    fn entry(key: &str, title: &str, parent: Option<&str>, order: i64, html: &str) -> SeedEntry {
        SeedEntry {
            key: key.to_string(),
            title: title.to_string(),
            parent_key: parent.map(String::from),
            order_index: order,
            html: Some(html.to_string()),
        }
    }

    vec![
        entry(
            "1",
            "Getting Started",
            None,
            0,
            "<h1>Getting Started with ClouSec</h1><p>Welcome to ClouSec! This documentation will help you get started with our platform.</p><p>ClouSec is a comprehensive cloud security solution designed to protect your cloud infrastructure and applications.</p>",
        ),
        entry(
            "2",
            "Introduction",
            Some("1"),
            0,
            "<h1>Introduction to ClouSec</h1><p>ClouSec provides a suite of tools and services to secure your cloud environment.</p><p>Our platform offers:</p><ul><li>Continuous security monitoring</li><li>Threat detection and response</li><li>Compliance management</li><li>Security posture assessment</li></ul>",
        ),
        entry(
            "3",
            "Installation",
            Some("1"),
            1,
            "<h1>Installing ClouSec</h1><p>Follow these steps to install and configure ClouSec in your environment.</p><p>ClouSec can be deployed in various cloud environments including AWS, Azure, and Google Cloud Platform.</p>",
        ),
        entry(
            "4",
            "Linux Setup",
            Some("3"),
            0,
            "<h1>Linux Setup Guide</h1><p>This guide covers the installation of ClouSec on Linux-based systems.</p><p>ClouSec supports most major Linux distributions including Ubuntu, CentOS, and Debian.</p><pre><code>sudo apt update\nsudo apt install clousec</code></pre>",
        ),
        entry(
            "5",
            "Ubuntu",
            Some("4"),
            0,
            "<h1>Ubuntu-specific Installation</h1><p>Follow these Ubuntu-specific instructions to install ClouSec.</p><p>These instructions are tested on Ubuntu 20.04 LTS and newer versions.</p><pre><code>sudo add-apt-repository ppa:clousec/stable\nsudo apt update\nsudo apt install clousec-agent</code></pre>",
        ),
        entry(
            "6",
            "API Reference",
            None,
            1,
            "<h1>API Reference</h1><p>This section provides detailed information about the ClouSec API.</p><p>The ClouSec API allows you to programmatically interact with our platform, enabling automation and integration with your existing tools and workflows.</p>",
        ),
        entry(
            "7",
            "Authentication",
            Some("6"),
            0,
            "<h1>Authentication</h1><p>Learn how to authenticate with the ClouSec API.</p><p>ClouSec uses API keys for authentication. You can generate API keys from the ClouSec dashboard.</p><pre><code>curl -X POST https://api.clousec.com/v1/auth \\\n  -H \"Content-Type: application/json\" \\\n  -d '{\"apiKey\": \"your-api-key\"}'\n</code></pre>",
        ),
        entry(
            "8",
            "Users API",
            Some("6"),
            1,
            "<h1>Users API</h1><p>The Users API allows you to manage users in your ClouSec account.</p><p>You can create, update, and delete users, as well as manage their permissions and roles.</p><h2>Endpoints</h2><ul><li><code>GET /users</code> - List all users</li><li><code>POST /users</code> - Create a new user</li><li><code>GET /users/{id}</code> - Get a specific user</li><li><code>PUT /users/{id}</code> - Update a user</li><li><code>DELETE /users/{id}</code> - Delete a user</li></ul>",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree_core::DocumentStore;
    use std::io::Write;

    #[tokio::test]
    async fn test_seed_default_outline() {
        let store = SqliteStore::open_memory().unwrap();
        let report = seed_documentation(&store, &default_seed()).unwrap();

        assert!(!report.skipped);
        assert_eq!(report.documents_created, 8);
        assert_eq!(report.blocks_created, 8);
        assert!(report.unresolved.is_empty());

        let tree = store.get_document_tree().await.unwrap();
        let titles: Vec<_> = tree.iter().map(|n| n.document.title.as_str()).collect();
        assert_eq!(titles, vec!["Getting Started", "API Reference"]);

        let ubuntu = tree[0].children[1].children[0].children[0].document.id;
        let path: Vec<_> = store
            .get_document_path(ubuntu)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(
            path,
            vec!["Getting Started", "Installation", "Linux Setup", "Ubuntu"]
        );

        let page = store.get_document_by_id(ubuntu).await.unwrap().unwrap();
        assert_eq!(page.blocks.len(), 1);
        assert_eq!(page.blocks[0].kind, "rich-text");
        assert!(page.blocks[0].content["html"]
            .as_str()
            .unwrap()
            .contains("Ubuntu"));
    }

    #[test]
    fn test_default_outline_pages() {
        let outline = default_seed();
        let keys: Vec<_> = outline.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "2", "3", "4", "5", "6", "7", "8"]);

        let ubuntu = &outline[4];
        assert_eq!(ubuntu.title, "Ubuntu");
        assert_eq!(ubuntu.parent_key.as_deref(), Some("4"));
        let html = ubuntu.html.as_deref().unwrap();
        assert!(html.starts_with("<h1>Ubuntu-specific Installation</h1>"));
        assert!(html.contains("ppa:clousec/stable\nsudo apt update\nsudo apt install clousec-agent"));

        let auth = outline[6].html.as_deref().unwrap();
        assert!(auth.contains("-d '{\"apiKey\": \"your-api-key\"}'"));
    }

    #[tokio::test]
    async fn test_seed_skips_non_empty_store() {
        let store = SqliteStore::open_memory().unwrap();
        seed_documentation(&store, &default_seed()).unwrap();

        let report = seed_documentation(&store, &default_seed()).unwrap();
        assert!(report.skipped);
        assert_eq!(report.existing, 8);
        assert_eq!(report.documents_created, 0);
        assert_eq!(store.count_documents().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_seed_resolves_out_of_order_parents() {
        let store = SqliteStore::open_memory().unwrap();
        let entries = vec![
            SeedEntry {
                key: "c".into(),
                title: "Grandchild".into(),
                parent_key: Some("b".into()),
                order_index: 0,
                html: None,
            },
            SeedEntry {
                key: "b".into(),
                title: "Child".into(),
                parent_key: Some("a".into()),
                order_index: 0,
                html: Some(String::new()),
            },
            SeedEntry {
                key: "a".into(),
                title: "Root".into(),
                parent_key: None,
                order_index: 0,
                html: Some("<p>root</p>".into()),
            },
            SeedEntry {
                key: "x".into(),
                title: "Lost".into(),
                parent_key: Some("missing".into()),
                order_index: 0,
                html: Some("<p>lost</p>".into()),
            },
        ];

        let report = seed_documentation(&store, &entries).unwrap();
        assert_eq!(report.documents_created, 3);
        assert_eq!(report.blocks_created, 1);
        assert_eq!(report.unresolved, vec!["x".to_string()]);

        let tree = store.get_document_tree().await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].subtree_size(), 3);
    }

    #[test]
    fn test_load_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "1", "title": "Getting Started", "slug": "getting-started", "content": "<p>hi</p>", "parentId": null, "orderIndex": 0}},
                {{"id": "2", "title": "Introduction", "parentId": "1", "orderIndex": 1}}
            ]"#
        )
        .unwrap();

        let entries = load_seed_file(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].html.as_deref(), Some("<p>hi</p>"));
        assert_eq!(entries[1].parent_key.as_deref(), Some("1"));
        assert_eq!(entries[1].order_index, 1);
        assert!(entries[1].html.is_none());
    }
}
