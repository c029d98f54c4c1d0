//! In-memory [`Backend`] and [`ImageStorage`] for tests and offline use.
//!
//! Tables are plain `Vec`s behind a single `RwLock`, so multi-table
//! operations (cascading deletes, [`replace_all`](Backend::replace_all))
//! are applied atomically. Deletes cascade the way the hosted schema's
//! foreign keys do. `cards_in_tree` is computed with
//! [`descendant_ids`](crate::tree::descendant_ids).

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::{
    Card, CardFolder, CardPatch, Folder, FolderPatch, FolderRef, NewCard, NewFolder, NewSection,
    OrderUpdate, Section, SectionPatch,
};
use crate::tree::descendant_ids;

use super::{Backend, ImageStorage, Snapshot};

#[derive(Default)]
struct Tables {
    sections: Vec<Section>,
    folders: Vec<Folder>,
    cards: Vec<Card>,
    links: Vec<CardFolder>,
}

struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// In-memory backend for tests and offline use.
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
    objects: RwLock<HashMap<String, StoredObject>>,
    failing: RwLock<HashSet<String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            objects: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// A backend pre-populated with `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let backend = Self::new();
        if let Ok(mut t) = backend.tables.write() {
            t.sections = snapshot.sections;
            t.folders = snapshot.folders;
            t.cards = snapshot.cards;
            t.links = snapshot.card_folders;
        }
        backend
    }

    /// Makes every subsequent call of the named operation (e.g.
    /// `"search_folders"`) fail with a backend error until cleared.
    pub fn set_failing(&self, operation: &str, failing: bool) {
        if let Ok(mut f) = self.failing.write() {
            if failing {
                f.insert(operation.to_string());
            } else {
                f.remove(operation);
            }
        }
    }

    /// Bytes and content type of a stored object.
    pub fn object(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.objects
            .read()
            .ok()?
            .get(path)
            .map(|o| (o.bytes.clone(), o.content_type.clone()))
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    fn check(&self, operation: &str) -> Result<()> {
        let failing = self
            .failing
            .read()
            .map_err(|_| anyhow!("in-memory backend lock poisoned"))?;
        if failing.contains(operation) {
            return Err(DashboardError::Backend {
                status: 503,
                message: format!("{} unavailable", operation),
            }
            .into());
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory backend lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory backend lock poisoned"))
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn sort_cards(cards: &mut [Card]) {
    cards.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then(b.created_at.cmp(&a.created_at))
    });
}

trait Ordered {
    fn row_id(&self) -> Uuid;
    fn set_order(&mut self, order_index: i32);
}

impl Ordered for Section {
    fn row_id(&self) -> Uuid {
        self.id
    }
    fn set_order(&mut self, order_index: i32) {
        self.order_index = order_index;
    }
}

impl Ordered for Folder {
    fn row_id(&self) -> Uuid {
        self.id
    }
    fn set_order(&mut self, order_index: i32) {
        self.order_index = order_index;
    }
}

impl Ordered for Card {
    fn row_id(&self) -> Uuid {
        self.id
    }
    fn set_order(&mut self, order_index: i32) {
        self.order_index = order_index;
    }
}

fn apply_order<T: Ordered>(rows: &mut [T], updates: &[OrderUpdate], kind: &'static str) -> Result<()> {
    for update in updates {
        let row = rows
            .iter_mut()
            .find(|r| r.row_id() == update.id)
            .ok_or(DashboardError::not_found(kind, update.id))?;
        row.set_order(update.order_index);
    }
    Ok(())
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn list_sections(&self) -> Result<Vec<Section>> {
        self.check("list_sections")?;
        let mut sections = self.read()?.sections.clone();
        sections.sort_by_key(|s| s.order_index);
        Ok(sections)
    }

    async fn get_section(&self, id: Uuid) -> Result<Option<Section>> {
        self.check("get_section")?;
        Ok(self.read()?.sections.iter().find(|s| s.id == id).cloned())
    }

    async fn create_section(&self, new: &NewSection) -> Result<Section> {
        self.check("create_section")?;
        let section = Section {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            icon: new.icon.clone(),
            color: new.color.clone(),
            image_url: new.image_url.clone(),
            order_index: new.order_index,
            created_at: Utc::now(),
        };
        self.write()?.sections.push(section.clone());
        Ok(section)
    }

    async fn update_section(&self, id: Uuid, patch: &SectionPatch) -> Result<Section> {
        self.check("update_section")?;
        let mut t = self.write()?;
        let section = t
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(DashboardError::not_found("section", id))?;
        section.apply(patch);
        Ok(section.clone())
    }

    async fn delete_section(&self, id: Uuid) -> Result<()> {
        self.check("delete_section")?;
        let mut t = self.write()?;
        t.sections.retain(|s| s.id != id);
        t.folders.retain(|f| f.section_id != id);
        t.cards.retain(|c| c.section_id != id);
        let folders: HashSet<Uuid> = t.folders.iter().map(|f| f.id).collect();
        let cards: HashSet<Uuid> = t.cards.iter().map(|c| c.id).collect();
        t.links
            .retain(|l| folders.contains(&l.folder_id) && cards.contains(&l.card_id));
        Ok(())
    }

    async fn reorder_sections(&self, updates: &[OrderUpdate]) -> Result<()> {
        self.check("reorder_sections")?;
        let mut t = self.write()?;
        apply_order(&mut t.sections, updates, "section")
    }

    async fn list_folders(&self, section_id: Uuid) -> Result<Vec<Folder>> {
        self.check("list_folders")?;
        let mut folders: Vec<Folder> = self
            .read()?
            .folders
            .iter()
            .filter(|f| f.section_id == section_id)
            .cloned()
            .collect();
        folders.sort_by_key(|f| (f.parent_id.is_some(), f.parent_id, f.order_index));
        Ok(folders)
    }

    async fn get_folder(&self, id: Uuid) -> Result<Option<Folder>> {
        self.check("get_folder")?;
        Ok(self.read()?.folders.iter().find(|f| f.id == id).cloned())
    }

    async fn folder_children(
        &self,
        section_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<Folder>> {
        self.check("folder_children")?;
        let mut folders: Vec<Folder> = self
            .read()?
            .folders
            .iter()
            .filter(|f| f.section_id == section_id && f.parent_id == parent_id)
            .cloned()
            .collect();
        folders.sort_by_key(|f| f.order_index);
        Ok(folders)
    }

    async fn create_folder(&self, new: &NewFolder) -> Result<Folder> {
        self.check("create_folder")?;
        let mut t = self.write()?;
        if !t.sections.iter().any(|s| s.id == new.section_id) {
            return Err(DashboardError::not_found("section", new.section_id).into());
        }
        if let Some(parent) = new.parent_id {
            if !t.folders.iter().any(|f| f.id == parent) {
                return Err(DashboardError::not_found("folder", parent).into());
            }
        }
        let folder = Folder {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            parent_id: new.parent_id,
            section_id: new.section_id,
            image_url: new.image_url.clone(),
            order_index: new.order_index,
            created_at: Utc::now(),
        };
        t.folders.push(folder.clone());
        Ok(folder)
    }

    async fn update_folder(&self, id: Uuid, patch: &FolderPatch) -> Result<Folder> {
        self.check("update_folder")?;
        let mut t = self.write()?;
        let folder = t
            .folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(DashboardError::not_found("folder", id))?;
        folder.apply(patch);
        Ok(folder.clone())
    }

    async fn delete_folder(&self, id: Uuid) -> Result<()> {
        self.check("delete_folder")?;
        let mut t = self.write()?;
        let doomed = descendant_ids(&t.folders, id);
        t.folders.retain(|f| !doomed.contains(&f.id));
        t.links.retain(|l| !doomed.contains(&l.folder_id));
        Ok(())
    }

    async fn reorder_folders(&self, updates: &[OrderUpdate]) -> Result<()> {
        self.check("reorder_folders")?;
        let mut t = self.write()?;
        apply_order(&mut t.folders, updates, "folder")
    }

    async fn list_cards(&self, section_id: Uuid) -> Result<Vec<Card>> {
        self.check("list_cards")?;
        let mut cards: Vec<Card> = self
            .read()?
            .cards
            .iter()
            .filter(|c| c.section_id == section_id)
            .cloned()
            .collect();
        sort_cards(&mut cards);
        Ok(cards)
    }

    async fn cards_without_folder(&self, section_id: Uuid) -> Result<Vec<Card>> {
        self.check("cards_without_folder")?;
        let t = self.read()?;
        let linked: HashSet<Uuid> = t.links.iter().map(|l| l.card_id).collect();
        let mut cards: Vec<Card> = t
            .cards
            .iter()
            .filter(|c| c.section_id == section_id && !linked.contains(&c.id))
            .cloned()
            .collect();
        sort_cards(&mut cards);
        Ok(cards)
    }

    async fn cards_in_tree(&self, root: Uuid) -> Result<Vec<Card>> {
        self.check("cards_in_tree")?;
        let t = self.read()?;
        if !t.folders.iter().any(|f| f.id == root) {
            return Ok(Vec::new());
        }
        let folders = descendant_ids(&t.folders, root);
        let card_ids: HashSet<Uuid> = t
            .links
            .iter()
            .filter(|l| folders.contains(&l.folder_id))
            .map(|l| l.card_id)
            .collect();
        let mut cards: Vec<Card> = t
            .cards
            .iter()
            .filter(|c| card_ids.contains(&c.id))
            .cloned()
            .collect();
        sort_cards(&mut cards);
        Ok(cards)
    }

    async fn get_card(&self, id: Uuid) -> Result<Option<Card>> {
        self.check("get_card")?;
        Ok(self.read()?.cards.iter().find(|c| c.id == id).cloned())
    }

    async fn create_card(&self, new: &NewCard) -> Result<Card> {
        self.check("create_card")?;
        let mut t = self.write()?;
        if !t.sections.iter().any(|s| s.id == new.section_id) {
            return Err(DashboardError::not_found("section", new.section_id).into());
        }
        let card = Card {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            url: new.url.clone(),
            description: new.description.clone(),
            image_url: new.image_url.clone(),
            card_type: new.card_type,
            tags: new.tags.clone(),
            is_favorite: new.is_favorite,
            order_index: new.order_index,
            section_id: new.section_id,
            created_at: Utc::now(),
        };
        t.cards.push(card.clone());
        Ok(card)
    }

    async fn update_card(&self, id: Uuid, patch: &CardPatch) -> Result<Card> {
        self.check("update_card")?;
        let mut t = self.write()?;
        let card = t
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(DashboardError::not_found("card", id))?;
        card.apply(patch);
        Ok(card.clone())
    }

    async fn delete_card(&self, id: Uuid) -> Result<()> {
        self.check("delete_card")?;
        let mut t = self.write()?;
        t.cards.retain(|c| c.id != id);
        t.links.retain(|l| l.card_id != id);
        Ok(())
    }

    async fn reorder_cards(&self, updates: &[OrderUpdate]) -> Result<()> {
        self.check("reorder_cards")?;
        let mut t = self.write()?;
        apply_order(&mut t.cards, updates, "card")
    }

    async fn card_folders(&self, card_id: Uuid) -> Result<Vec<FolderRef>> {
        self.check("card_folders")?;
        let t = self.read()?;
        Ok(t.links
            .iter()
            .filter(|l| l.card_id == card_id)
            .filter_map(|l| t.folders.iter().find(|f| f.id == l.folder_id))
            .map(|f| FolderRef {
                id: f.id,
                name: f.name.clone(),
                section_id: f.section_id,
            })
            .collect())
    }

    async fn link_card(&self, card_id: Uuid, folder_id: Uuid) -> Result<()> {
        self.check("link_card")?;
        let mut t = self.write()?;
        if !t.cards.iter().any(|c| c.id == card_id) {
            return Err(DashboardError::not_found("card", card_id).into());
        }
        if !t.folders.iter().any(|f| f.id == folder_id) {
            return Err(DashboardError::not_found("folder", folder_id).into());
        }
        let link = CardFolder { card_id, folder_id };
        if !t.links.contains(&link) {
            t.links.push(link);
        }
        Ok(())
    }

    async fn unlink_card(&self, card_id: Uuid, folder_id: Uuid) -> Result<()> {
        self.check("unlink_card")?;
        self.write()?
            .links
            .retain(|l| !(l.card_id == card_id && l.folder_id == folder_id));
        Ok(())
    }

    async fn set_card_folders(&self, card_id: Uuid, folder_ids: &[Uuid]) -> Result<()> {
        self.check("set_card_folders")?;
        let mut t = self.write()?;
        if let Some(missing) = folder_ids
            .iter()
            .find(|id| !t.folders.iter().any(|f| f.id == **id))
        {
            return Err(DashboardError::not_found("folder", *missing).into());
        }
        t.links.retain(|l| l.card_id != card_id);
        for folder_id in folder_ids {
            let link = CardFolder {
                card_id,
                folder_id: *folder_id,
            };
            if !t.links.contains(&link) {
                t.links.push(link);
            }
        }
        Ok(())
    }

    async fn search_sections(&self, query: &str) -> Result<Vec<Section>> {
        self.check("search_sections")?;
        Ok(self
            .read()?
            .sections
            .iter()
            .filter(|s| contains_ci(&s.name, query))
            .cloned()
            .collect())
    }

    async fn search_folders(&self, query: &str) -> Result<Vec<Folder>> {
        self.check("search_folders")?;
        Ok(self
            .read()?
            .folders
            .iter()
            .filter(|f| contains_ci(&f.name, query))
            .cloned()
            .collect())
    }

    async fn search_cards(&self, query: &str, section_id: Option<Uuid>) -> Result<Vec<Card>> {
        self.check("search_cards")?;
        let mut cards: Vec<Card> = self
            .read()?
            .cards
            .iter()
            .filter(|c| section_id.map_or(true, |s| c.section_id == s))
            .filter(|c| {
                contains_ci(&c.title, query)
                    || c.description
                        .as_deref()
                        .map_or(false, |d| contains_ci(d, query))
                    || c.tags.iter().any(|t| t == query)
            })
            .cloned()
            .collect();
        cards.sort_by(|a, b| {
            b.is_favorite
                .cmp(&a.is_favorite)
                .then(a.order_index.cmp(&b.order_index))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(cards)
    }

    async fn dump(&self) -> Result<Snapshot> {
        self.check("dump")?;
        let t = self.read()?;
        let mut snapshot = Snapshot {
            sections: t.sections.clone(),
            folders: t.folders.clone(),
            cards: t.cards.clone(),
            card_folders: t.links.clone(),
        };
        snapshot.sections.sort_by_key(|s| s.order_index);
        snapshot.folders.sort_by_key(|f| f.created_at);
        snapshot.cards.sort_by_key(|c| c.created_at);
        Ok(snapshot)
    }

    async fn replace_all(&self, snapshot: &Snapshot) -> Result<()> {
        self.check("replace_all")?;
        let mut t = self.write()?;
        *t = Tables {
            sections: snapshot.sections.clone(),
            folders: snapshot.folders.clone(),
            cards: snapshot.cards.clone(),
            links: snapshot.card_folders.clone(),
        };
        Ok(())
    }
}

#[async_trait]
impl ImageStorage for InMemoryBackend {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.check("upload")?;
        self.objects
            .write()
            .map_err(|_| anyhow!("in-memory object store lock poisoned"))?
            .insert(
                path.to_string(),
                StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                },
            );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://images/{}", path)
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        self.check("remove")?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| anyhow!("in-memory object store lock poisoned"))?;
        for p in paths {
            objects.remove(p);
        }
        Ok(())
    }
}
