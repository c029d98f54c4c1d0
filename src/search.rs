//! `lb search`: one-shot and interactive search.
//!
//! The interactive prompt feeds every typed query through [`debounce`], so
//! a burst of input inside the debounce window runs only its last query.

use anyhow::Result;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use linkboard_core::models::SearchResults;
use linkboard_core::search::{is_searchable, search_all_with_min, search_cards};

use crate::app::App;
use crate::cards::format_card;
use crate::sections::format_section;

/// Spawns a debouncer. Each value sent on the returned sender supersedes
/// any pending one; a value is emitted once `window` passes with no newer
/// input. Dropping the sender flushes the pending value and closes the
/// output.
pub fn debounce(window: Duration) -> (mpsc::UnboundedSender<String>, mpsc::Receiver<String>) {
    let (in_tx, mut in_rx) = mpsc::unbounded_channel::<String>();
    let (out_tx, out_rx) = mpsc::channel(16);

    tokio::spawn(async move {
        while let Some(mut latest) = in_rx.recv().await {
            loop {
                tokio::select! {
                    next = in_rx.recv() => match next {
                        Some(q) => latest = q,
                        None => {
                            let _ = out_tx.send(latest).await;
                            return;
                        }
                    },
                    _ = tokio::time::sleep(window) => {
                        if out_tx.send(latest).await.is_err() {
                            return;
                        }
                        break;
                    }
                }
            }
        }
    });

    (in_tx, out_rx)
}

fn print_results(app: &App, results: &SearchResults) -> Result<()> {
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    if !results.sections.is_empty() {
        println!("Sections:");
        for s in &results.sections {
            println!("  {}", format_section(s));
        }
    }
    if !results.folders.is_empty() {
        println!("Folders:");
        for f in &results.folders {
            println!("  {}  ({})", f.name, f.id);
        }
    }
    if !results.cards.is_empty() {
        let favorites = app.favorites()?;
        println!("Cards:");
        for c in &results.cards {
            println!("  {}", format_card(c, favorites.is_favorite(c.id)));
        }
    }
    Ok(())
}

pub async fn run_search(app: &App, query: &str, section: Option<Uuid>) -> Result<()> {
    let min_len = app.config.search.min_query_len;
    if !is_searchable(query, min_len) {
        println!("Type at least {} characters to search.", min_len);
        return Ok(());
    }
    match section {
        Some(section_id) => {
            let cards =
                search_cards(app.backend.as_ref(), query, Some(section_id), min_len).await?;
            let results = SearchResults {
                cards,
                ..Default::default()
            };
            print_results(app, &results)
        }
        None => {
            let results = search_all_with_min(app.backend.as_ref(), query, min_len).await;
            print_results(app, &results)
        }
    }
}

/// Reads queries from stdin, one per line, until EOF.
pub async fn run_interactive(app: &App, section: Option<Uuid>) -> Result<()> {
    let window = Duration::from_millis(app.config.search.debounce_ms);
    let (tx, mut rx) = debounce(window);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    eprintln!("Type a query and press Enter (Ctrl-D to quit).");
    while let Some(query) = rx.recv().await {
        println!("─── {} ───", query.trim());
        run_search(app, &query, section).await?;
    }
    Ok(())
}
