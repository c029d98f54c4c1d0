//! Dashboard operations that span several backend calls.
//!
//! Each function validates its input before the first write, then issues
//! the backend calls in order. There is no cross-call transaction: a failure
//! midway leaves the earlier writes in place and is returned to the caller.

use anyhow::Result;
use uuid::Uuid;

use crate::error::DashboardError;
use crate::local::{Favorites, Recent};
use crate::models::{
    is_valid_url, normalize_tags, Card, CardPatch, Folder, FolderPatch, NewCard, NewFolder,
    NewSection, Section,
};
use crate::reorder::{move_item, order_updates, place_at};
use crate::store::Backend;
use crate::tree::descendant_ids;

fn require_text(field: &'static str, value: &str) -> Result<(), DashboardError> {
    if value.trim().is_empty() {
        return Err(DashboardError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn require_url(url: &str) -> Result<(), DashboardError> {
    if !is_valid_url(url) {
        return Err(DashboardError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

// ============ Sections & folders ============

pub async fn create_section(backend: &dyn Backend, mut new: NewSection) -> Result<Section> {
    require_text("name", &new.name)?;
    new.name = new.name.trim().to_string();
    let section = backend.create_section(&new).await?;
    tracing::info!(section = %section.id, name = %section.name, "created section");
    Ok(section)
}

/// Creates a folder after checking that its parent, if any, lives in the
/// same section.
pub async fn create_folder(backend: &dyn Backend, mut new: NewFolder) -> Result<Folder> {
    require_text("name", &new.name)?;
    new.name = new.name.trim().to_string();
    if let Some(parent_id) = new.parent_id {
        let parent = backend
            .get_folder(parent_id)
            .await?
            .ok_or(DashboardError::not_found("folder", parent_id))?;
        if parent.section_id != new.section_id {
            return Err(DashboardError::validation(
                "parent_id",
                "parent folder belongs to another section",
            )
            .into());
        }
    }
    let folder = backend.create_folder(&new).await?;
    tracing::info!(folder = %folder.id, name = %folder.name, "created folder");
    Ok(folder)
}

// ============ Cards ============

async fn check_folders(backend: &dyn Backend, section_id: Uuid, folder_ids: &[Uuid]) -> Result<()> {
    for id in folder_ids {
        let folder = backend
            .get_folder(*id)
            .await?
            .ok_or(DashboardError::not_found("folder", *id))?;
        if folder.section_id != section_id {
            return Err(DashboardError::validation(
                "folders",
                format!("folder '{}' belongs to another section", folder.name),
            )
            .into());
        }
    }
    Ok(())
}

/// Validates and inserts a card, then links it to `folder_ids`.
pub async fn create_card(backend: &dyn Backend, mut new: NewCard, folder_ids: &[Uuid]) -> Result<Card> {
    require_text("title", &new.title)?;
    new.url = new.url.trim().to_string();
    require_url(&new.url)?;
    new.title = new.title.trim().to_string();
    new.tags = normalize_tags(&new.tags);
    check_folders(backend, new.section_id, folder_ids).await?;

    let card = backend.create_card(&new).await?;
    if !folder_ids.is_empty() {
        backend.set_card_folders(card.id, folder_ids).await?;
    }
    tracing::info!(card = %card.id, folders = folder_ids.len(), "created card");
    Ok(card)
}

/// Applies `patch` to a card. When `folder_ids` is `Some`, the card's
/// folder links are replaced with exactly that set.
pub async fn update_card(
    backend: &dyn Backend,
    id: Uuid,
    mut patch: CardPatch,
    folder_ids: Option<&[Uuid]>,
) -> Result<Card> {
    if let Some(title) = &patch.title {
        require_text("title", title)?;
        patch.title = Some(title.trim().to_string());
    }
    if let Some(url) = &patch.url {
        let url = url.trim().to_string();
        require_url(&url)?;
        patch.url = Some(url);
    }
    if let Some(tags) = &patch.tags {
        patch.tags = Some(normalize_tags(tags));
    }

    let existing = backend
        .get_card(id)
        .await?
        .ok_or(DashboardError::not_found("card", id))?;
    if let Some(folder_ids) = folder_ids {
        check_folders(backend, existing.section_id, folder_ids).await?;
    }

    let card = backend.update_card(id, &patch).await?;
    if let Some(folder_ids) = folder_ids {
        backend.set_card_folders(id, folder_ids).await?;
    }
    tracing::info!(card = %id, "updated card");
    Ok(card)
}

/// Deletes a card and drops it from the recent list.
pub async fn delete_card(backend: &dyn Backend, recent: &mut Recent, id: Uuid) -> Result<()> {
    backend.delete_card(id).await?;
    recent.remove(id)?;
    tracing::info!(card = %id, "deleted card");
    Ok(())
}

/// Cards for the starred ids, in starring order. Ids that no longer
/// resolve are skipped.
pub async fn favorite_cards(backend: &dyn Backend, favorites: &Favorites) -> Result<Vec<Card>> {
    let mut cards = Vec::with_capacity(favorites.list().len());
    for id in favorites.list() {
        match backend.get_card(*id).await? {
            Some(card) => cards.push(card),
            None => tracing::debug!(card = %id, "favorite no longer exists"),
        }
    }
    Ok(cards)
}

// ============ Reordering ============

/// Moves the section at `from` to `to` and persists the new order.
pub async fn reorder_sections(backend: &dyn Backend, from: usize, to: usize) -> Result<Vec<Section>> {
    let mut sections = backend.list_sections().await?;
    move_item(&mut sections, from, to)?;
    let updates = order_updates(sections.iter().map(|s| s.id));
    backend.reorder_sections(&updates).await?;
    for (s, u) in sections.iter_mut().zip(&updates) {
        s.order_index = u.order_index;
    }
    Ok(sections)
}

/// The card list a reorder works over: the one a view displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardScope {
    /// Every card of the section.
    Section(Uuid),
    /// Cards of the section linked to no folder.
    Unfiled(Uuid),
    /// Cards in a folder and all of its subfolders.
    Folder(Uuid),
}

impl CardScope {
    pub async fn cards(self, backend: &dyn Backend) -> Result<Vec<Card>> {
        match self {
            CardScope::Section(id) => backend.list_cards(id).await,
            CardScope::Unfiled(id) => backend.cards_without_folder(id).await,
            CardScope::Folder(id) => backend.cards_in_tree(id).await,
        }
    }
}

/// Moves a card within the list `scope` selects and persists 0..n for
/// exactly that list. Cards outside the scope keep their `order_index`.
pub async fn reorder_cards(
    backend: &dyn Backend,
    scope: CardScope,
    from: usize,
    to: usize,
) -> Result<Vec<Card>> {
    let mut cards = scope.cards(backend).await?;
    move_item(&mut cards, from, to)?;
    let updates = order_updates(cards.iter().map(|c| c.id));
    backend.reorder_cards(&updates).await?;
    for (c, u) in cards.iter_mut().zip(&updates) {
        c.order_index = u.order_index;
    }
    tracing::debug!(?scope, from, to, "reordered cards");
    Ok(cards)
}

/// Moves a folder among its siblings under `parent_id` (`None` for the
/// section's root folders) and persists the new sibling order.
pub async fn reorder_folders_in_parent(
    backend: &dyn Backend,
    section_id: Uuid,
    parent_id: Option<Uuid>,
    from: usize,
    to: usize,
) -> Result<Vec<Folder>> {
    let mut siblings = backend.folder_children(section_id, parent_id).await?;
    move_item(&mut siblings, from, to)?;
    let updates = order_updates(siblings.iter().map(|f| f.id));
    backend.reorder_folders(&updates).await?;
    for (f, u) in siblings.iter_mut().zip(&updates) {
        f.order_index = u.order_index;
    }
    Ok(siblings)
}

/// Re-parents a folder and places it at `index` among its new siblings.
///
/// Rejected with [`DashboardError::InvalidMove`] when the target parent is
/// the folder itself, one of its descendants, or a folder in another
/// section.
pub async fn move_folder_to_parent(
    backend: &dyn Backend,
    folder_id: Uuid,
    new_parent: Option<Uuid>,
    index: usize,
) -> Result<Folder> {
    let folder = backend
        .get_folder(folder_id)
        .await?
        .ok_or(DashboardError::not_found("folder", folder_id))?;

    if let Some(parent_id) = new_parent {
        let parent = backend
            .get_folder(parent_id)
            .await?
            .ok_or(DashboardError::not_found("folder", parent_id))?;
        if parent.section_id != folder.section_id {
            return Err(DashboardError::InvalidMove(format!(
                "'{}' cannot move into a folder of another section",
                folder.name
            ))
            .into());
        }
        let all = backend.list_folders(folder.section_id).await?;
        if descendant_ids(&all, folder_id).contains(&parent_id) {
            return Err(DashboardError::InvalidMove(format!(
                "'{}' cannot move into itself or one of its subfolders",
                folder.name
            ))
            .into());
        }
    }

    let patch = FolderPatch {
        parent_id: Some(new_parent),
        order_index: Some(index as i32),
        ..Default::default()
    };
    let mut moved = backend.update_folder(folder_id, &patch).await?;

    let siblings = backend.folder_children(folder.section_id, new_parent).await?;
    let mut ids: Vec<Uuid> = siblings.iter().map(|f| f.id).collect();
    place_at(&mut ids, folder_id, index);
    let updates = order_updates(ids);
    backend.reorder_folders(&updates).await?;

    if let Some(u) = updates.iter().find(|u| u.id == folder_id) {
        moved.order_index = u.order_index;
    }
    tracing::info!(folder = %folder_id, parent = ?new_parent, index, "moved folder");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryLocalStore;
    use crate::models::CardType;
    use crate::store::memory::InMemoryBackend;
    use futures::executor::block_on;
    use std::sync::Arc;

    struct Fixture {
        backend: InMemoryBackend,
        section: Section,
    }

    async fn fixture() -> Fixture {
        let backend = InMemoryBackend::new();
        let section = create_section(
            &backend,
            NewSection {
                name: "Work".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        Fixture { backend, section }
    }

    fn card(section_id: Uuid, title: &str, url: &str) -> NewCard {
        NewCard {
            title: title.into(),
            url: url.into(),
            description: None,
            image_url: None,
            card_type: CardType::Link,
            tags: vec!["a".into(), "a".into()],
            is_favorite: false,
            order_index: 0,
            section_id,
        }
    }

    fn folder(section_id: Uuid, name: &str, parent_id: Option<Uuid>) -> NewFolder {
        NewFolder {
            name: name.into(),
            parent_id,
            section_id,
            image_url: None,
            order_index: 0,
        }
    }

    #[test]
    fn test_create_card_rejects_bad_url() {
        block_on(async {
            let fx = fixture().await;
            let err = create_card(&fx.backend, card(fx.section.id, "x", "example.com"), &[])
                .await
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<DashboardError>(),
                Some(DashboardError::InvalidUrl(_))
            ));
            let err = create_card(&fx.backend, card(fx.section.id, "  ", "https://a.io"), &[])
                .await
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<DashboardError>(),
                Some(DashboardError::Validation { field: "title", .. })
            ));
            assert!(fx.backend.dump().await.unwrap().cards.is_empty());
        });
    }

    #[test]
    fn test_create_card_links_folders() {
        block_on(async {
            let fx = fixture().await;
            let f = create_folder(&fx.backend, folder(fx.section.id, "Docs", None))
                .await
                .unwrap();
            let c = create_card(&fx.backend, card(fx.section.id, "Rust", " https://rust-lang.org "), &[f.id])
                .await
                .unwrap();
            assert_eq!(c.url, "https://rust-lang.org");
            assert_eq!(c.tags, vec!["a"]);
            let refs = fx.backend.card_folders(c.id).await.unwrap();
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].name, "Docs");
        });
    }

    #[test]
    fn test_update_card_replaces_links_only_when_given() {
        block_on(async {
            let fx = fixture().await;
            let f1 = create_folder(&fx.backend, folder(fx.section.id, "One", None)).await.unwrap();
            let f2 = create_folder(&fx.backend, folder(fx.section.id, "Two", None)).await.unwrap();
            let c = create_card(&fx.backend, card(fx.section.id, "c", "https://c.io"), &[f1.id])
                .await
                .unwrap();

            let patch = CardPatch {
                title: Some("renamed".into()),
                ..Default::default()
            };
            update_card(&fx.backend, c.id, patch, None).await.unwrap();
            assert_eq!(fx.backend.card_folders(c.id).await.unwrap()[0].id, f1.id);

            let updated = update_card(&fx.backend, c.id, CardPatch::default(), Some(&[f2.id]))
                .await
                .unwrap();
            assert_eq!(updated.title, "renamed");
            let refs = fx.backend.card_folders(c.id).await.unwrap();
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].id, f2.id);

            let bad = CardPatch {
                url: Some("nope".into()),
                ..Default::default()
            };
            assert!(update_card(&fx.backend, c.id, bad, None).await.is_err());
        });
    }

    #[test]
    fn test_delete_card_clears_recent() {
        block_on(async {
            let fx = fixture().await;
            let c = create_card(&fx.backend, card(fx.section.id, "c", "https://c.io"), &[])
                .await
                .unwrap();
            let mut recent = Recent::load(Arc::new(MemoryLocalStore::new())).unwrap();
            recent.add(&c).unwrap();
            delete_card(&fx.backend, &mut recent, c.id).await.unwrap();
            assert!(recent.entries().is_empty());
            assert!(fx.backend.get_card(c.id).await.unwrap().is_none());
        });
    }

    #[test]
    fn test_reorder_cards_persists_sequence() {
        block_on(async {
            let fx = fixture().await;
            let mut ids = Vec::new();
            for (i, name) in ["A", "B", "C"].iter().enumerate() {
                let mut new = card(fx.section.id, name, "https://x.io");
                new.order_index = i as i32;
                ids.push(create_card(&fx.backend, new, &[]).await.unwrap().id);
            }
            let scope = CardScope::Section(fx.section.id);
            let reordered = reorder_cards(&fx.backend, scope, 0, 2).await.unwrap();
            let titles: Vec<&str> = reordered.iter().map(|c| c.title.as_str()).collect();
            assert_eq!(titles, vec!["B", "C", "A"]);

            let stored = fx.backend.list_cards(fx.section.id).await.unwrap();
            let titles: Vec<&str> = stored.iter().map(|c| c.title.as_str()).collect();
            assert_eq!(titles, vec!["B", "C", "A"]);
            assert!(reorder_cards(&fx.backend, scope, 7, 0).await.is_err());
        });
    }

    #[test]
    fn test_reorder_unfiled_cards_leaves_filed_ones() {
        block_on(async {
            let fx = fixture().await;
            let f = create_folder(&fx.backend, folder(fx.section.id, "Docs", None))
                .await
                .unwrap();
            let mut ids = Vec::new();
            for (i, name) in ["A", "B", "C", "D"].iter().enumerate() {
                let mut new = card(fx.section.id, name, "https://x.io");
                new.order_index = i as i32;
                let links = if *name == "B" { vec![f.id] } else { vec![] };
                ids.push(create_card(&fx.backend, new, &links).await.unwrap().id);
            }

            let scope = CardScope::Unfiled(fx.section.id);
            let reordered = reorder_cards(&fx.backend, scope, 2, 0).await.unwrap();
            let titles: Vec<&str> = reordered.iter().map(|c| c.title.as_str()).collect();
            assert_eq!(titles, vec!["D", "A", "C"]);
            let orders: Vec<i32> = reordered.iter().map(|c| c.order_index).collect();
            assert_eq!(orders, vec![0, 1, 2]);

            let stored = scope.cards(&fx.backend).await.unwrap();
            let titles: Vec<&str> = stored.iter().map(|c| c.title.as_str()).collect();
            assert_eq!(titles, vec!["D", "A", "C"]);
            let filed = fx.backend.get_card(ids[1]).await.unwrap().unwrap();
            assert_eq!(filed.order_index, 1);
        });
    }

    #[test]
    fn test_reorder_folder_cards_covers_subtree() {
        block_on(async {
            let fx = fixture().await;
            let parent = create_folder(&fx.backend, folder(fx.section.id, "Projects", None))
                .await
                .unwrap();
            let child =
                create_folder(&fx.backend, folder(fx.section.id, "Backend", Some(parent.id)))
                    .await
                    .unwrap();
            let placements = [("X", Some(parent.id)), ("Y", Some(child.id)), ("Z", None)];
            let mut ids = Vec::new();
            for (i, (name, home)) in placements.iter().enumerate() {
                let mut new = card(fx.section.id, name, "https://x.io");
                new.order_index = i as i32;
                let links: Vec<Uuid> = home.iter().copied().collect();
                ids.push(create_card(&fx.backend, new, &links).await.unwrap().id);
            }

            let scope = CardScope::Folder(parent.id);
            let reordered = reorder_cards(&fx.backend, scope, 1, 0).await.unwrap();
            let titles: Vec<&str> = reordered.iter().map(|c| c.title.as_str()).collect();
            assert_eq!(titles, vec!["Y", "X"]);

            let stored = fx.backend.cards_in_tree(parent.id).await.unwrap();
            let titles: Vec<&str> = stored.iter().map(|c| c.title.as_str()).collect();
            assert_eq!(titles, vec!["Y", "X"]);
            let outside = fx.backend.get_card(ids[2]).await.unwrap().unwrap();
            assert_eq!(outside.order_index, 2);
            assert!(reorder_cards(&fx.backend, scope, 2, 0).await.is_err());
        });
    }

    #[test]
    fn test_reorder_sections() {
        block_on(async {
            let fx = fixture().await;
            create_section(
                &fx.backend,
                NewSection {
                    name: "Home".into(),
                    order_index: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            let sections = reorder_sections(&fx.backend, 1, 0).await.unwrap();
            assert_eq!(sections[0].name, "Home");
            let stored = fx.backend.list_sections().await.unwrap();
            assert_eq!(stored[0].name, "Home");
            assert_eq!(stored[1].order_index, 1);
        });
    }

    #[test]
    fn test_reorder_root_folders() {
        block_on(async {
            let fx = fixture().await;
            for (i, name) in ["A", "B", "C"].iter().enumerate() {
                let mut new = folder(fx.section.id, name, None);
                new.order_index = i as i32;
                create_folder(&fx.backend, new).await.unwrap();
            }
            let moved = reorder_folders_in_parent(&fx.backend, fx.section.id, None, 2, 0)
                .await
                .unwrap();
            let names: Vec<&str> = moved.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["C", "A", "B"]);
        });
    }

    #[test]
    fn test_move_folder_rejects_own_subtree() {
        block_on(async {
            let fx = fixture().await;
            let root = create_folder(&fx.backend, folder(fx.section.id, "root", None)).await.unwrap();
            let child = create_folder(&fx.backend, folder(fx.section.id, "child", Some(root.id)))
                .await
                .unwrap();

            for target in [root.id, child.id] {
                let err = move_folder_to_parent(&fx.backend, root.id, Some(target), 0)
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err.downcast_ref::<DashboardError>(),
                    Some(DashboardError::InvalidMove(_))
                ));
            }
        });
    }

    #[test]
    fn test_move_folder_rejects_other_section() {
        block_on(async {
            let fx = fixture().await;
            let other = create_section(
                &fx.backend,
                NewSection {
                    name: "Other".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            let a = create_folder(&fx.backend, folder(fx.section.id, "a", None)).await.unwrap();
            let b = create_folder(&fx.backend, folder(other.id, "b", None)).await.unwrap();
            assert!(move_folder_to_parent(&fx.backend, a.id, Some(b.id), 0).await.is_err());
        });
    }

    #[test]
    fn test_move_folder_reindexes_new_siblings() {
        block_on(async {
            let fx = fixture().await;
            let parent = create_folder(&fx.backend, folder(fx.section.id, "parent", None)).await.unwrap();
            let mut kids = Vec::new();
            for (i, name) in ["x", "y"].iter().enumerate() {
                let mut new = folder(fx.section.id, name, Some(parent.id));
                new.order_index = i as i32;
                kids.push(create_folder(&fx.backend, new).await.unwrap());
            }
            let loose = create_folder(&fx.backend, folder(fx.section.id, "loose", None)).await.unwrap();

            let moved = move_folder_to_parent(&fx.backend, loose.id, Some(parent.id), 1)
                .await
                .unwrap();
            assert_eq!(moved.parent_id, Some(parent.id));
            assert_eq!(moved.order_index, 1);

            let children = fx
                .backend
                .folder_children(fx.section.id, Some(parent.id))
                .await
                .unwrap();
            let names: Vec<&str> = children.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["x", "loose", "y"]);

            let back = move_folder_to_parent(&fx.backend, loose.id, None, 0).await.unwrap();
            assert_eq!(back.parent_id, None);
        });
    }

    #[test]
    fn test_favorite_cards_skips_missing() {
        block_on(async {
            let fx = fixture().await;
            let c = create_card(&fx.backend, card(fx.section.id, "c", "https://c.io"), &[])
                .await
                .unwrap();
            let mut favs = Favorites::load(Arc::new(MemoryLocalStore::new())).unwrap();
            favs.add(Uuid::new_v4()).unwrap();
            favs.add(c.id).unwrap();
            let cards = favorite_cards(&fx.backend, &favs).await.unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].id, c.id);
        });
    }
}
