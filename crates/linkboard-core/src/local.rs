//! Device-local caches: favorites and recently opened cards.
//!
//! Both live in a client-local key-value store behind [`LocalStore`], not
//! in the shared backend. They are caches: they may drift from the backend
//! and across devices, and a corrupt entry is logged and treated as empty.
//!
//! | Key | Value |
//! |-----|-------|
//! | `dashboard-favorites` | JSON array of card ids |
//! | `dashboard-recent` | JSON array of card snapshots with `visitedAt` |

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Card;
use crate::store::Backend;

pub const FAVORITES_KEY: &str = "dashboard-favorites";
pub const RECENT_KEY: &str = "dashboard-recent";
pub const MAX_RECENT_ITEMS: usize = 10;

/// String key-value store local to one device.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile [`LocalStore`] for tests.
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("local store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| anyhow!("local store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| anyhow!("local store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

fn load_list<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Result<Vec<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(list) => Ok(list),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unreadable local cache entry");
            Ok(Vec::new())
        }
    }
}

fn save_list<T: Serialize>(store: &dyn LocalStore, key: &str, list: &[T]) -> Result<()> {
    store.set(key, &serde_json::to_string(list)?)
}

// ═══════════════════════════════════════════════════════════════════════
// Favorites
// ═══════════════════════════════════════════════════════════════════════

/// Device-local set of starred card ids, in the order they were starred.
pub struct Favorites {
    store: Arc<dyn LocalStore>,
    ids: Vec<Uuid>,
}

impl Favorites {
    pub fn load(store: Arc<dyn LocalStore>) -> Result<Self> {
        let mut ids: Vec<Uuid> = load_list(store.as_ref(), FAVORITES_KEY)?;
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(*id));
        Ok(Self { store, ids })
    }

    pub fn list(&self) -> &[Uuid] {
        &self.ids
    }

    pub fn is_favorite(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    /// Stars `id`. Starring twice is a no-op.
    pub fn add(&mut self, id: Uuid) -> Result<()> {
        if !self.is_favorite(id) {
            self.ids.push(id);
            self.save()?;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<()> {
        let before = self.ids.len();
        self.ids.retain(|x| *x != id);
        if self.ids.len() != before {
            self.save()?;
        }
        Ok(())
    }

    /// Flips membership of `id` and returns the new state.
    pub fn toggle(&mut self, id: Uuid) -> Result<bool> {
        if self.is_favorite(id) {
            self.remove(id)?;
            Ok(false)
        } else {
            self.add(id)?;
            Ok(true)
        }
    }

    fn save(&self) -> Result<()> {
        save_list(self.store.as_ref(), FAVORITES_KEY, &self.ids)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Recent
// ═══════════════════════════════════════════════════════════════════════

/// A card snapshot taken when it was opened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentEntry {
    #[serde(flatten)]
    pub card: Card,
    #[serde(rename = "visitedAt")]
    pub visited_at: DateTime<Utc>,
}

/// Most-recently opened cards, newest first, capped at
/// [`MAX_RECENT_ITEMS`].
pub struct Recent {
    store: Arc<dyn LocalStore>,
    entries: Vec<RecentEntry>,
}

impl Recent {
    pub fn load(store: Arc<dyn LocalStore>) -> Result<Self> {
        let entries = load_list(store.as_ref(), RECENT_KEY)?;
        Ok(Self { store, entries })
    }

    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    /// Records a visit to `card` now.
    pub fn add(&mut self, card: &Card) -> Result<()> {
        self.add_at(card, Utc::now())
    }

    /// Records a visit at `visited_at`: the card moves to the front, any
    /// older entry for the same id is dropped, and the list is capped.
    pub fn add_at(&mut self, card: &Card, visited_at: DateTime<Utc>) -> Result<()> {
        self.entries.retain(|e| e.card.id != card.id);
        self.entries.insert(
            0,
            RecentEntry {
                card: card.clone(),
                visited_at,
            },
        );
        self.entries.truncate(MAX_RECENT_ITEMS);
        self.save()
    }

    pub fn remove(&mut self, card_id: Uuid) -> Result<()> {
        let before = self.entries.len();
        self.entries.retain(|e| e.card.id != card_id);
        if self.entries.len() != before {
            self.save()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.store.remove(RECENT_KEY)
    }

    /// Drops entries whose card no longer exists in `backend`. Entries
    /// whose lookup fails are kept. Returns how many were dropped.
    pub async fn cleanup_orphans(&mut self, backend: &dyn Backend) -> Result<usize> {
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match backend.get_card(entry.card.id).await {
                Ok(Some(_)) => kept.push(entry.clone()),
                Ok(None) => {
                    tracing::info!(card = %entry.card.id, title = %entry.card.title, "removing orphaned recent item");
                }
                Err(e) => {
                    tracing::warn!(card = %entry.card.id, error = %e, "could not verify recent item; keeping it");
                    kept.push(entry.clone());
                }
            }
        }
        let removed = self.entries.len() - kept.len();
        if removed > 0 {
            self.entries = kept;
            self.save()?;
        }
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        save_list(self.store.as_ref(), RECENT_KEY, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardType, NewCard, NewSection};
    use crate::store::memory::InMemoryBackend;
    use chrono::Duration;
    use futures::executor::block_on;

    fn card(n: u128) -> Card {
        Card {
            id: Uuid::from_u128(n),
            title: format!("card {}", n),
            url: format!("https://example.com/{}", n),
            description: None,
            image_url: None,
            card_type: CardType::Link,
            tags: vec![],
            is_favorite: false,
            order_index: 0,
            section_id: Uuid::from_u128(1000),
            created_at: Utc::now(),
        }
    }

    fn store() -> Arc<dyn LocalStore> {
        Arc::new(MemoryLocalStore::new())
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let store = store();
        let mut favs = Favorites::load(store.clone()).unwrap();
        let id = Uuid::from_u128(5);
        assert!(favs.toggle(id).unwrap());
        assert!(!favs.toggle(id).unwrap());
        assert!(!favs.is_favorite(id));

        favs.add(Uuid::from_u128(6)).unwrap();
        assert!(favs.toggle(id).unwrap());
        assert!(!favs.toggle(id).unwrap());
        assert_eq!(favs.list(), &[Uuid::from_u128(6)]);
    }

    #[test]
    fn test_favorites_persist_across_loads() {
        let store = store();
        let mut favs = Favorites::load(store.clone()).unwrap();
        favs.add(Uuid::from_u128(1)).unwrap();
        favs.add(Uuid::from_u128(1)).unwrap();
        favs.add(Uuid::from_u128(2)).unwrap();

        let reloaded = Favorites::load(store.clone()).unwrap();
        assert_eq!(reloaded.list().len(), 2);
        let raw = store.get(FAVORITES_KEY).unwrap().unwrap();
        assert!(raw.starts_with('['));
    }

    #[test]
    fn test_corrupt_cache_is_treated_as_empty() {
        let store = store();
        store.set(FAVORITES_KEY, "{not json").unwrap();
        store.set(RECENT_KEY, "42").unwrap();
        assert!(Favorites::load(store.clone()).unwrap().list().is_empty());
        assert!(Recent::load(store).unwrap().entries().is_empty());
    }

    #[test]
    fn test_recent_caps_and_dedupes() {
        let mut recent = Recent::load(store()).unwrap();
        let start = Utc::now();
        for n in 0..12u128 {
            recent
                .add_at(&card(n), start + Duration::seconds(n as i64))
                .unwrap();
        }
        assert_eq!(recent.entries().len(), MAX_RECENT_ITEMS);
        assert_eq!(recent.entries()[0].card.id, Uuid::from_u128(11));

        recent
            .add_at(&card(5), start + Duration::seconds(100))
            .unwrap();
        assert_eq!(recent.entries().len(), MAX_RECENT_ITEMS);
        assert_eq!(recent.entries()[0].card.id, Uuid::from_u128(5));
        let fives = recent
            .entries()
            .iter()
            .filter(|e| e.card.id == Uuid::from_u128(5))
            .count();
        assert_eq!(fives, 1);
    }

    #[test]
    fn test_recent_wire_format_uses_visited_at() {
        let store = store();
        let mut recent = Recent::load(store.clone()).unwrap();
        recent.add(&card(1)).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&store.get(RECENT_KEY).unwrap().unwrap()).unwrap();
        assert!(raw[0]["visitedAt"].is_string());
        assert_eq!(raw[0]["title"], "card 1");
    }

    #[test]
    fn test_recent_remove_and_clear() {
        let store = store();
        let mut recent = Recent::load(store.clone()).unwrap();
        recent.add(&card(1)).unwrap();
        recent.add(&card(2)).unwrap();
        recent.remove(Uuid::from_u128(1)).unwrap();
        assert_eq!(recent.entries().len(), 1);
        recent.clear().unwrap();
        assert!(recent.entries().is_empty());
        assert!(store.get(RECENT_KEY).unwrap().is_none());
    }

    #[test]
    fn test_cleanup_orphans() {
        block_on(async {
            let backend = InMemoryBackend::new();
            let s = backend
                .create_section(&NewSection {
                    name: "S".into(),
                    ..Default::default()
                })
                .await
                .unwrap();
            let alive = backend
                .create_card(&NewCard {
                    title: "alive".into(),
                    url: "https://alive.example".into(),
                    description: None,
                    image_url: None,
                    card_type: CardType::Link,
                    tags: vec![],
                    is_favorite: false,
                    order_index: 0,
                    section_id: s.id,
                })
                .await
                .unwrap();

            let mut recent = Recent::load(store()).unwrap();
            recent.add(&card(77)).unwrap();
            recent.add(&alive).unwrap();

            let removed = recent.cleanup_orphans(&backend).await.unwrap();
            assert_eq!(removed, 1);
            assert_eq!(recent.entries().len(), 1);
            assert_eq!(recent.entries()[0].card.id, alive.id);

            backend.set_failing("get_card", true);
            assert_eq!(recent.cleanup_orphans(&backend).await.unwrap(), 0);
            assert_eq!(recent.entries().len(), 1);
        });
    }
}
