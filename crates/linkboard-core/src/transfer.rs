//! JSON export and import of the whole dashboard.
//!
//! The document is the four tables plus an `exported_at` timestamp:
//!
//! ```json
//! { "sections": [...], "folders": [...], "cards": [...],
//!   "card_folders": [...], "exported_at": "2024-05-01T12:00:00Z" }
//! ```
//!
//! Import replaces everything. The document is checked for referential
//! integrity before the backend is touched, so a rejected document leaves
//! existing data in place.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::store::{Backend, Snapshot};

/// Export document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardExport {
    #[serde(flatten)]
    pub tables: Snapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
}

/// Row counts of an import document, shown before confirming.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ImportPreview {
    pub sections: usize,
    pub folders: usize,
    pub cards: usize,
    pub card_folders: usize,
    pub exported_at: Option<DateTime<Utc>>,
}

impl DashboardExport {
    pub fn preview(&self) -> ImportPreview {
        ImportPreview {
            sections: self.tables.sections.len(),
            folders: self.tables.folders.len(),
            cards: self.tables.cards.len(),
            card_folders: self.tables.card_folders.len(),
            exported_at: self.exported_at,
        }
    }
}

/// Default file name for an export taken on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("dashboard-export-{}.json", date.format("%Y-%m-%d"))
}

/// Dumps every table into an export document stamped with the current time.
pub async fn export_data(backend: &dyn Backend) -> Result<DashboardExport> {
    let tables = backend.dump().await?;
    tracing::info!(
        sections = tables.sections.len(),
        folders = tables.folders.len(),
        cards = tables.cards.len(),
        "exported dashboard"
    );
    Ok(DashboardExport {
        tables,
        exported_at: Some(Utc::now()),
    })
}

/// Parses an export document. Missing tables count as empty; a table of
/// the wrong shape is an error.
pub fn parse_export(json: &str) -> Result<DashboardExport, DashboardError> {
    serde_json::from_str(json).map_err(|e| DashboardError::Import(e.to_string()))
}

/// Checks that every reference in `tables` resolves inside the document.
pub fn validate(tables: &Snapshot) -> Result<(), DashboardError> {
    let sections = unique_ids("section", tables.sections.iter().map(|s| s.id))?;
    let folder_ids = unique_ids("folder", tables.folders.iter().map(|f| f.id))?;
    let cards = unique_ids("card", tables.cards.iter().map(|c| c.id))?;

    let folders: HashMap<Uuid, (Option<Uuid>, Uuid)> = tables
        .folders
        .iter()
        .map(|f| (f.id, (f.parent_id, f.section_id)))
        .collect();

    for f in &tables.folders {
        if !sections.contains(&f.section_id) {
            return Err(DashboardError::Import(format!(
                "folder {} references missing section {}",
                f.id, f.section_id
            )));
        }
        if let Some(parent) = f.parent_id {
            match folders.get(&parent) {
                None => {
                    return Err(DashboardError::Import(format!(
                        "folder {} references missing parent {}",
                        f.id, parent
                    )))
                }
                Some((_, section)) if *section != f.section_id => {
                    return Err(DashboardError::Import(format!(
                        "folder {} and its parent {} are in different sections",
                        f.id, parent
                    )))
                }
                Some(_) => {}
            }
        }
    }

    for f in &tables.folders {
        let mut seen = HashSet::new();
        let mut current = Some(f.id);
        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(DashboardError::Import(format!(
                    "folder {} is part of a parent cycle",
                    f.id
                )));
            }
            current = folders.get(&id).and_then(|(parent, _)| *parent);
        }
    }

    for c in &tables.cards {
        if !sections.contains(&c.section_id) {
            return Err(DashboardError::Import(format!(
                "card {} references missing section {}",
                c.id, c.section_id
            )));
        }
    }

    let mut links = HashSet::new();
    for l in &tables.card_folders {
        if !cards.contains(&l.card_id) {
            return Err(DashboardError::Import(format!(
                "link references missing card {}",
                l.card_id
            )));
        }
        if !folder_ids.contains(&l.folder_id) {
            return Err(DashboardError::Import(format!(
                "link references missing folder {}",
                l.folder_id
            )));
        }
        if !links.insert((l.card_id, l.folder_id)) {
            return Err(DashboardError::Import(format!(
                "duplicate link {} -> {}",
                l.card_id, l.folder_id
            )));
        }
    }
    Ok(())
}

fn unique_ids(
    kind: &str,
    ids: impl Iterator<Item = Uuid>,
) -> Result<HashSet<Uuid>, DashboardError> {
    let mut set = HashSet::new();
    for id in ids {
        if !set.insert(id) {
            return Err(DashboardError::Import(format!("duplicate {} id {}", kind, id)));
        }
    }
    Ok(set)
}

/// Validates `doc`, then replaces all backend data with it.
pub async fn import_data(backend: &dyn Backend, doc: &DashboardExport) -> Result<ImportPreview> {
    validate(&doc.tables)?;
    backend.replace_all(&doc.tables).await?;
    let preview = doc.preview();
    tracing::info!(
        sections = preview.sections,
        folders = preview.folders,
        cards = preview.cards,
        links = preview.card_folders,
        "imported dashboard"
    );
    Ok(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Card, CardFolder, CardType, Folder, Section};
    use crate::store::memory::InMemoryBackend;
    use futures::executor::block_on;

    fn section(n: u128) -> Section {
        Section {
            id: Uuid::from_u128(n),
            name: format!("s{}", n),
            icon: None,
            color: None,
            image_url: None,
            order_index: n as i32,
            created_at: Utc::now(),
        }
    }

    fn folder(n: u128, parent: Option<u128>, section: u128) -> Folder {
        Folder {
            id: Uuid::from_u128(n),
            name: format!("f{}", n),
            parent_id: parent.map(Uuid::from_u128),
            section_id: Uuid::from_u128(section),
            image_url: None,
            order_index: 0,
            created_at: Utc::now(),
        }
    }

    fn card(n: u128, section: u128) -> Card {
        Card {
            id: Uuid::from_u128(n),
            title: format!("c{}", n),
            url: "https://example.com".into(),
            description: None,
            image_url: None,
            card_type: CardType::Link,
            tags: vec![],
            is_favorite: false,
            order_index: 0,
            section_id: Uuid::from_u128(section),
            created_at: Utc::now(),
        }
    }

    fn populated() -> Snapshot {
        Snapshot {
            sections: vec![section(1), section(2)],
            folders: vec![folder(10, None, 1), folder(11, Some(10), 1)],
            cards: vec![card(20, 1), card(21, 2)],
            card_folders: vec![CardFolder {
                card_id: Uuid::from_u128(20),
                folder_id: Uuid::from_u128(11),
            }],
        }
    }

    #[test]
    fn test_empty_roundtrip() {
        block_on(async {
            let source = InMemoryBackend::new();
            let doc = export_data(&source).await.unwrap();
            assert!(doc.exported_at.is_some());
            let json = serde_json::to_string_pretty(&doc).unwrap();

            let target = InMemoryBackend::with_snapshot(populated());
            import_data(&target, &parse_export(&json).unwrap()).await.unwrap();
            assert!(target.dump().await.unwrap().is_empty());
        });
    }

    #[test]
    fn test_populated_roundtrip_keeps_counts() {
        block_on(async {
            let source = InMemoryBackend::with_snapshot(populated());
            let doc = export_data(&source).await.unwrap();
            let json = serde_json::to_string(&doc).unwrap();

            let target = InMemoryBackend::new();
            let preview = import_data(&target, &parse_export(&json).unwrap())
                .await
                .unwrap();
            assert_eq!(preview.sections, 2);
            assert_eq!(preview.card_folders, 1);

            let dumped = target.dump().await.unwrap();
            assert_eq!(dumped.sections.len(), 2);
            assert_eq!(dumped.folders.len(), 2);
            assert_eq!(dumped.cards.len(), 2);
            assert_eq!(dumped.card_folders.len(), 1);
        });
    }

    #[test]
    fn test_document_shape() {
        let doc = DashboardExport {
            tables: populated(),
            exported_at: Some(Utc::now()),
        };
        let v = serde_json::to_value(&doc).unwrap();
        for key in ["sections", "folders", "cards", "card_folders", "exported_at"] {
            assert!(v.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(v["cards"][0]["type"], "link");
    }

    #[test]
    fn test_parse_tolerates_missing_tables() {
        let doc = parse_export(r#"{"sections": []}"#).unwrap();
        assert!(doc.tables.is_empty());
        assert!(doc.exported_at.is_none());
        assert!(parse_export("[]").is_err());
        assert!(parse_export(r#"{"cards": {"not": "a list"}}"#).is_err());
    }

    #[test]
    fn test_validate_rejects_dangling_refs() {
        let mut bad = populated();
        bad.cards.push(card(22, 99));
        assert!(validate(&bad).is_err());

        let mut bad = populated();
        bad.folders.push(folder(12, Some(404), 1));
        assert!(validate(&bad).is_err());

        let mut bad = populated();
        bad.card_folders.push(CardFolder {
            card_id: Uuid::from_u128(21),
            folder_id: Uuid::from_u128(404),
        });
        assert!(validate(&bad).is_err());

        let mut bad = populated();
        bad.folders.push(folder(12, Some(10), 2));
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn test_validate_rejects_cycles_and_duplicates() {
        let mut bad = populated();
        bad.folders = vec![folder(10, Some(11), 1), folder(11, Some(10), 1)];
        bad.card_folders.clear();
        assert!(validate(&bad).is_err());

        let mut bad = populated();
        bad.sections.push(section(1));
        assert!(validate(&bad).is_err());

        let mut bad = populated();
        let link = bad.card_folders[0];
        bad.card_folders.push(link);
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn test_invalid_import_leaves_data_untouched() {
        block_on(async {
            let target = InMemoryBackend::with_snapshot(populated());
            let mut tables = populated();
            tables.cards.push(card(30, 77));
            let doc = DashboardExport {
                tables,
                exported_at: None,
            };
            let err = import_data(&target, &doc).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<DashboardError>(),
                Some(DashboardError::Import(_))
            ));
            assert_eq!(target.dump().await.unwrap().cards.len(), 2);
        });
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name(date), "dashboard-export-2024-03-09.json");
    }
}
