//! Core data models used throughout Linkboard.
//!
//! These mirror the rows of the hosted tables (`sections`, `folders`,
//! `cards`, `card_folders`). Read shapes carry the server-assigned `id` and
//! `created_at`; write shapes (`New*`) and update shapes (`*Patch`) only
//! carry the columns a client may set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashboardError;

/// Top-level named collection of folders and cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A folder inside a section. `parent_id = None` means a root folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub section_id: Uuid,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    #[default]
    Link,
    Gpt,
    App,
    Doc,
}

impl CardType {
    pub fn icon(&self) -> &'static str {
        match self {
            CardType::Gpt => "🤖",
            CardType::App => "📱",
            CardType::Doc => "📄",
            CardType::Link => "🔗",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Link => "link",
            CardType::Gpt => "gpt",
            CardType::App => "app",
            CardType::Doc => "doc",
        }
    }
}

impl std::str::FromStr for CardType {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "link" => Ok(CardType::Link),
            "gpt" => Ok(CardType::Gpt),
            "app" => Ok(CardType::App),
            "doc" => Ok(CardType::Doc),
            other => Err(DashboardError::validation(
                "type",
                format!("'{}' is not one of link, gpt, app, doc", other),
            )),
        }
    }
}

/// A bookmarked external resource.
///
/// `cards_in_tree` rows may name the key `card_id`; both decode into `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    #[serde(alias = "card_id")]
    pub id: Uuid,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "type", default)]
    pub card_type: CardType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub order_index: i32,
    pub section_id: Uuid,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Row of the `card_folders` link table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CardFolder {
    pub card_id: Uuid,
    pub folder_id: Uuid,
}

/// Folder summary returned for a card's folder links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderRef {
    pub id: Uuid,
    pub name: String,
    pub section_id: Uuid,
}

/// Bulk-upsert row written by every reorder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: Uuid,
    pub order_index: i32,
}

/// Merged result of a global search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    pub sections: Vec<Section>,
    pub folders: Vec<Folder>,
    pub cards: Vec<Card>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.folders.is_empty() && self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len() + self.folders.len() + self.cards.len()
    }
}

// ============ Write shapes ============

#[derive(Debug, Clone, Serialize, Default)]
pub struct NewSection {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFolder {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub section_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCard {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub order_index: i32,
    pub section_id: Uuid,
}

// Patches: `None` leaves a column untouched. For nullable columns,
// `Some(None)` serializes as JSON `null` and clears it.

#[derive(Debug, Clone, Serialize, Default)]
pub struct SectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct FolderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub card_type: Option<CardType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

impl Section {
    pub fn apply(&mut self, patch: &SectionPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url = image_url.clone();
        }
        if let Some(order_index) = patch.order_index {
            self.order_index = order_index;
        }
    }
}

impl Folder {
    pub fn apply(&mut self, patch: &FolderPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url = image_url.clone();
        }
        if let Some(order_index) = patch.order_index {
            self.order_index = order_index;
        }
    }
}

impl Card {
    pub fn apply(&mut self, patch: &CardPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(url) = &patch.url {
            self.url = url.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(image_url) = &patch.image_url {
            self.image_url = image_url.clone();
        }
        if let Some(card_type) = patch.card_type {
            self.card_type = card_type;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(order_index) = patch.order_index {
            self.order_index = order_index;
        }
    }

    pub fn domain(&self) -> String {
        extract_domain(&self.url)
    }
}

// ============ Helpers ============

/// True when `s` parses as an absolute URL with a host (or a `mailto:`-like
/// scheme that carries no host but is still absolute).
pub fn is_valid_url(s: &str) -> bool {
    match url::Url::parse(s.trim()) {
        Ok(u) => u.has_host() || u.cannot_be_a_base(),
        Err(_) => false,
    }
}

/// Returns the host of `url`, or `url` unchanged when it does not parse.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Appends `tag` unless it is blank or already present. Returns whether the
/// tag list changed.
pub fn add_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let tag = tag.trim();
    if tag.is_empty() || tags.iter().any(|t| t == tag) {
        return false;
    }
    tags.push(tag.to_string());
    true
}

/// Normalizes a user-supplied tag list: trims, drops blanks and duplicates,
/// keeps first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for t in tags {
        add_tag(&mut out, t.as_ref());
    }
    out
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}
