//! Global search across sections, folders and cards.
//!
//! The three lookups are independent: each runs concurrently and a failing
//! one contributes an empty list instead of failing the whole search.

use anyhow::Result;
use uuid::Uuid;

use crate::models::{Card, SearchResults};
use crate::store::Backend;

/// Shortest query (in characters, after trimming) that reaches the backend.
pub const MIN_QUERY_LEN: usize = 3;

pub fn is_searchable(query: &str, min_len: usize) -> bool {
    query.trim().chars().count() >= min_len
}

/// Searches with the default [`MIN_QUERY_LEN`].
pub async fn search_all(backend: &dyn Backend, query: &str) -> SearchResults {
    search_all_with_min(backend, query, MIN_QUERY_LEN).await
}

/// Runs the section, folder and card lookups concurrently and merges them.
///
/// Queries shorter than `min_len` return empty results without touching the
/// backend.
pub async fn search_all_with_min(
    backend: &dyn Backend,
    query: &str,
    min_len: usize,
) -> SearchResults {
    if !is_searchable(query, min_len) {
        return SearchResults::default();
    }
    let q = query.trim();

    let (sections, folders, cards) = futures::join!(
        backend.search_sections(q),
        backend.search_folders(q),
        backend.search_cards(q, None),
    );

    let results = SearchResults {
        sections: settle("sections", sections),
        folders: settle("folders", folders),
        cards: settle("cards", cards),
    };
    tracing::debug!(query = q, hits = results.len(), "search finished");
    results
}

/// Card-only search, optionally scoped to one section. Queries shorter
/// than `min_len` characters return nothing.
pub async fn search_cards(
    backend: &dyn Backend,
    query: &str,
    section_id: Option<Uuid>,
    min_len: usize,
) -> Result<Vec<Card>> {
    if !is_searchable(query, min_len) {
        return Ok(Vec::new());
    }
    backend.search_cards(query.trim(), section_id).await
}

fn settle<T>(what: &str, result: Result<Vec<T>>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(table = what, error = %e, "search query failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardType, NewCard, NewFolder, NewSection};
    use crate::store::memory::InMemoryBackend;
    use futures::executor::block_on;

    async fn seeded() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        let s = backend
            .create_section(&NewSection {
                name: "Rustaceans".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        backend
            .create_folder(&NewFolder {
                name: "Rust crates".into(),
                parent_id: None,
                section_id: s.id,
                image_url: None,
                order_index: 0,
            })
            .await
            .unwrap();
        backend
            .create_card(&NewCard {
                title: "The Rust Book".into(),
                url: "https://doc.rust-lang.org/book".into(),
                description: None,
                image_url: None,
                card_type: CardType::Doc,
                tags: vec!["learning".into()],
                is_favorite: false,
                order_index: 0,
                section_id: s.id,
            })
            .await
            .unwrap();
        backend
    }

    #[test]
    fn test_gating() {
        assert!(!is_searchable("ab", MIN_QUERY_LEN));
        assert!(!is_searchable("  ab  ", MIN_QUERY_LEN));
        assert!(is_searchable("abc", MIN_QUERY_LEN));
        assert!(is_searchable("né€", 3));
    }

    #[test]
    fn test_short_query_skips_backend() {
        block_on(async {
            let backend = seeded().await;
            backend.set_failing("search_sections", true);
            let results = search_all(&backend, "ru").await;
            assert!(results.is_empty());
        });
    }

    #[test]
    fn test_search_hits_every_table() {
        block_on(async {
            let backend = seeded().await;
            let results = search_all(&backend, "rust").await;
            assert_eq!(results.sections.len(), 1);
            assert_eq!(results.folders.len(), 1);
            assert_eq!(results.cards.len(), 1);

            let by_tag = search_all(&backend, "learning").await;
            assert_eq!(by_tag.cards.len(), 1);
        });
    }

    #[test]
    fn test_failed_leg_is_empty_not_fatal() {
        block_on(async {
            let backend = seeded().await;
            backend.set_failing("search_folders", true);
            let results = search_all(&backend, "rust").await;
            assert!(results.folders.is_empty());
            assert_eq!(results.sections.len(), 1);
            assert_eq!(results.cards.len(), 1);
        });
    }

    #[test]
    fn test_search_cards_propagates_errors() {
        block_on(async {
            let backend = seeded().await;
            let hits = search_cards(&backend, "book", None, MIN_QUERY_LEN).await.unwrap();
            assert_eq!(hits.len(), 1);
            backend.set_failing("search_cards", true);
            assert!(search_cards(&backend, "book", None, MIN_QUERY_LEN).await.is_err());
        });
    }

    #[test]
    fn test_search_cards_honours_min_len() {
        block_on(async {
            let backend = seeded().await;
            let section = backend.list_sections().await.unwrap()[0].id;
            let hits = search_cards(&backend, "ru", Some(section), 2).await.unwrap();
            assert_eq!(hits.len(), 1);
            let none = search_cards(&backend, "ru", Some(section), MIN_QUERY_LEN)
                .await
                .unwrap();
            assert!(none.is_empty());
        });
    }
}
