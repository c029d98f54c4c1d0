//! Backend abstraction for Linkboard.
//!
//! The [`Backend`] trait mirrors the surface of the hosted
//! backend-as-a-service: table CRUD on `sections`, `folders`, `cards` and
//! `card_folders`, the `cards_without_folder` view, the `cards_in_tree`
//! remote procedure, and pattern-match search. [`ImageStorage`] covers the
//! images bucket.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Card, CardFolder, CardPatch, Folder, FolderPatch, FolderRef, NewCard, NewFolder, NewSection,
    OrderUpdate, Section, SectionPatch,
};

/// Full contents of the four tables, as dumped for export or restored on
/// import.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub card_folders: Vec<CardFolder>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
            && self.folders.is_empty()
            && self.cards.is_empty()
            && self.card_folders.is_empty()
    }
}

/// Abstract hosted backend.
///
/// # Operations
///
/// | Group | Methods |
/// |-------|---------|
/// | Sections | [`list_sections`](Backend::list_sections), [`create_section`](Backend::create_section), [`update_section`](Backend::update_section), [`delete_section`](Backend::delete_section), [`reorder_sections`](Backend::reorder_sections) |
/// | Folders | [`list_folders`](Backend::list_folders), [`folder_children`](Backend::folder_children), [`create_folder`](Backend::create_folder), [`update_folder`](Backend::update_folder), [`delete_folder`](Backend::delete_folder), [`reorder_folders`](Backend::reorder_folders) |
/// | Cards | [`list_cards`](Backend::list_cards), [`cards_without_folder`](Backend::cards_without_folder), [`cards_in_tree`](Backend::cards_in_tree), [`get_card`](Backend::get_card), [`create_card`](Backend::create_card), [`update_card`](Backend::update_card), [`delete_card`](Backend::delete_card), [`reorder_cards`](Backend::reorder_cards) |
/// | Links | [`card_folders`](Backend::card_folders), [`link_card`](Backend::link_card), [`unlink_card`](Backend::unlink_card), [`set_card_folders`](Backend::set_card_folders) |
/// | Search | [`search_sections`](Backend::search_sections), [`search_folders`](Backend::search_folders), [`search_cards`](Backend::search_cards) |
/// | Transfer | [`dump`](Backend::dump), [`replace_all`](Backend::replace_all) |
#[async_trait]
pub trait Backend: Send + Sync {
    // ---- sections ----

    /// All sections ordered by `order_index` ascending.
    async fn list_sections(&self) -> Result<Vec<Section>>;

    async fn get_section(&self, id: Uuid) -> Result<Option<Section>>;

    async fn create_section(&self, new: &NewSection) -> Result<Section>;

    async fn update_section(&self, id: Uuid, patch: &SectionPatch) -> Result<Section>;

    /// Deletes a section. The backend cascades to its folders and cards.
    async fn delete_section(&self, id: Uuid) -> Result<()>;

    /// Bulk upsert of `order_index` values.
    async fn reorder_sections(&self, updates: &[OrderUpdate]) -> Result<()>;

    // ---- folders ----

    /// Folders of a section, root folders first, then by `order_index`.
    async fn list_folders(&self, section_id: Uuid) -> Result<Vec<Folder>>;

    async fn get_folder(&self, id: Uuid) -> Result<Option<Folder>>;

    /// Direct children of `parent_id` within a section, ordered by
    /// `order_index`. `None` lists the section's root folders.
    async fn folder_children(&self, section_id: Uuid, parent_id: Option<Uuid>)
        -> Result<Vec<Folder>>;

    async fn create_folder(&self, new: &NewFolder) -> Result<Folder>;

    async fn update_folder(&self, id: Uuid, patch: &FolderPatch) -> Result<Folder>;

    /// Deletes a folder. The backend cascades to nested folders and links.
    async fn delete_folder(&self, id: Uuid) -> Result<()>;

    async fn reorder_folders(&self, updates: &[OrderUpdate]) -> Result<()>;

    // ---- cards ----

    /// Cards of a section by `order_index` ascending, newest first on ties.
    async fn list_cards(&self, section_id: Uuid) -> Result<Vec<Card>>;

    /// Cards of a section that are linked to no folder.
    async fn cards_without_folder(&self, section_id: Uuid) -> Result<Vec<Card>>;

    /// Every card linked to `root` or any folder nested below it.
    async fn cards_in_tree(&self, root: Uuid) -> Result<Vec<Card>>;

    async fn get_card(&self, id: Uuid) -> Result<Option<Card>>;

    async fn create_card(&self, new: &NewCard) -> Result<Card>;

    async fn update_card(&self, id: Uuid, patch: &CardPatch) -> Result<Card>;

    async fn delete_card(&self, id: Uuid) -> Result<()>;

    async fn reorder_cards(&self, updates: &[OrderUpdate]) -> Result<()>;

    // ---- card/folder links ----

    async fn card_folders(&self, card_id: Uuid) -> Result<Vec<FolderRef>>;

    async fn link_card(&self, card_id: Uuid, folder_id: Uuid) -> Result<()>;

    async fn unlink_card(&self, card_id: Uuid, folder_id: Uuid) -> Result<()>;

    /// Replaces all folder links of a card with `folder_ids`.
    async fn set_card_folders(&self, card_id: Uuid, folder_ids: &[Uuid]) -> Result<()>;

    // ---- search ----

    /// Sections whose name contains `query` (case-insensitive).
    async fn search_sections(&self, query: &str) -> Result<Vec<Section>>;

    /// Folders whose name contains `query` (case-insensitive).
    async fn search_folders(&self, query: &str) -> Result<Vec<Folder>>;

    /// Cards whose title or description contains `query`, or whose tags
    /// include it. Favorites first, then `order_index`, then newest.
    async fn search_cards(&self, query: &str, section_id: Option<Uuid>) -> Result<Vec<Card>>;

    // ---- transfer ----

    /// Full scan of all four tables.
    async fn dump(&self) -> Result<Snapshot>;

    /// Replaces the contents of all four tables with `snapshot`.
    async fn replace_all(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Object storage for entity images.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Uploads (or overwrites) the object at `path`.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Public URL for the object at `path`. Does not check existence.
    fn public_url(&self, path: &str) -> String;

    async fn remove(&self, paths: &[String]) -> Result<()>;
}
