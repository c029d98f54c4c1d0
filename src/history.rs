//! `lb fav ...` and `lb recent ...`: the device-local caches.
//!
//! These commands work without a reachable backend, except where noted.

use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use linkboard_core::local::{Favorites, LocalStore, Recent};
use linkboard_core::ops;
use linkboard_core::store::Backend;

/// Lists favorites. With a backend the ids are resolved to cards; without
/// one only the ids are printed.
pub async fn run_fav_list(local: Arc<dyn LocalStore>, backend: Option<&dyn Backend>) -> Result<()> {
    let favorites = Favorites::load(local)?;
    if favorites.list().is_empty() {
        println!("No favorites.");
        return Ok(());
    }
    match backend {
        Some(backend) => {
            for card in ops::favorite_cards(backend, &favorites).await? {
                println!("★ {} {}  {}  ({})", card.card_type.icon(), card.title, card.url, card.id);
            }
        }
        None => {
            for id in favorites.list() {
                println!("★ {}", id);
            }
        }
    }
    Ok(())
}

pub fn run_fav_toggle(local: Arc<dyn LocalStore>, id: Uuid) -> Result<()> {
    let mut favorites = Favorites::load(local)?;
    if favorites.toggle(id)? {
        println!("★ starred {}", id);
    } else {
        println!("☆ unstarred {}", id);
    }
    Ok(())
}

pub fn run_fav_add(local: Arc<dyn LocalStore>, id: Uuid) -> Result<()> {
    Favorites::load(local)?.add(id)?;
    println!("★ starred {}", id);
    Ok(())
}

pub fn run_fav_remove(local: Arc<dyn LocalStore>, id: Uuid) -> Result<()> {
    Favorites::load(local)?.remove(id)?;
    println!("☆ unstarred {}", id);
    Ok(())
}

pub fn run_recent_list(local: Arc<dyn LocalStore>) -> Result<()> {
    let recent = Recent::load(local)?;
    if recent.entries().is_empty() {
        println!("No recently opened cards.");
        return Ok(());
    }
    for e in recent.entries() {
        println!(
            "{}  {} {}  {}  ({})",
            e.visited_at.format("%Y-%m-%d %H:%M"),
            e.card.card_type.icon(),
            e.card.title,
            e.card.url,
            e.card.id
        );
    }
    Ok(())
}

pub fn run_recent_remove(local: Arc<dyn LocalStore>, id: Uuid) -> Result<()> {
    Recent::load(local)?.remove(id)?;
    println!("Removed {} from recent", id);
    Ok(())
}

pub fn run_recent_clear(local: Arc<dyn LocalStore>) -> Result<()> {
    Recent::load(local)?.clear()?;
    println!("Recent list cleared.");
    Ok(())
}

/// Drops recent entries whose card was deleted. Needs the backend.
pub async fn run_recent_cleanup(local: Arc<dyn LocalStore>, backend: &dyn Backend) -> Result<()> {
    let mut recent = Recent::load(local)?;
    let removed = recent.cleanup_orphans(backend).await?;
    println!("Removed {} orphaned entries.", removed);
    Ok(())
}
