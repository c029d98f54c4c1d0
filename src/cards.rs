//! `lb cards ...` commands.

use anyhow::{Context, Result};
use uuid::Uuid;

use linkboard_core::models::{Card, CardPatch, NewCard};
use linkboard_core::ops::{self, CardScope};

use crate::app::App;
use crate::prompt::confirm;

pub fn format_card(card: &Card, starred: bool) -> String {
    let star = if starred { "★" } else { " " };
    format!(
        "{} {} {}  {}  ({})",
        star,
        card.card_type.icon(),
        card.title,
        card.domain(),
        card.id
    )
}

/// Prints one line per card, starring local favorites.
pub fn print_cards(app: &App, cards: &[Card]) -> Result<()> {
    if cards.is_empty() {
        println!("No cards.");
        return Ok(());
    }
    let favorites = app.favorites()?;
    for card in cards {
        println!("{}", format_card(card, favorites.is_favorite(card.id)));
    }
    Ok(())
}

pub async fn run_list(app: &App, section_id: Uuid, unfiled: bool) -> Result<()> {
    let cards = if unfiled {
        app.backend.cards_without_folder(section_id).await?
    } else {
        app.backend.list_cards(section_id).await?
    };
    print_cards(app, &cards)
}

async fn fetch(app: &App, id: Uuid) -> Result<Card> {
    app.backend
        .get_card(id)
        .await?
        .with_context(|| format!("card not found: {}", id))
}

pub async fn run_show(app: &App, id: Uuid) -> Result<()> {
    let card = fetch(app, id).await?;
    let folders = app.backend.card_folders(id).await?;
    let starred = app.favorites()?.is_favorite(id);

    println!("{} {}", card.card_type.icon(), card.title);
    println!("  url:         {}", card.url);
    println!("  domain:      {}", card.domain());
    println!("  type:        {}", card.card_type.as_str());
    if let Some(d) = &card.description {
        println!("  description: {}", d);
    }
    if !card.tags.is_empty() {
        println!("  tags:        {}", card.tags.join(", "));
    }
    if !folders.is_empty() {
        let names: Vec<&str> = folders.iter().map(|f| f.name.as_str()).collect();
        println!("  folders:     {}", names.join(", "));
    }
    if let Some(img) = &card.image_url {
        println!("  image:       {}", img);
    }
    println!("  favorite:    {}", if starred { "yes" } else { "no" });
    println!("  created:     {}", card.created_at.format("%Y-%m-%d %H:%M"));
    println!("  id:          {}", card.id);
    Ok(())
}

pub async fn run_add(app: &App, mut new: NewCard, folders: &[Uuid]) -> Result<()> {
    new.order_index = app.backend.list_cards(new.section_id).await?.len() as i32;
    let card = ops::create_card(app.backend.as_ref(), new, folders).await?;
    println!("Created card {}", format_card(&card, false));
    Ok(())
}

pub async fn run_edit(
    app: &App,
    id: Uuid,
    patch: CardPatch,
    folders: Option<Vec<Uuid>>,
) -> Result<()> {
    let card = ops::update_card(app.backend.as_ref(), id, patch, folders.as_deref()).await?;
    println!("Updated card {}", format_card(&card, app.favorites()?.is_favorite(id)));
    Ok(())
}

pub async fn run_remove(app: &App, id: Uuid, yes: bool) -> Result<()> {
    let card = fetch(app, id).await?;
    if !confirm(&format!("Delete card '{}'?", card.title), yes)? {
        eprintln!("Cancelled.");
        return Ok(());
    }
    let mut recent = app.recent()?;
    ops::delete_card(app.backend.as_ref(), &mut recent, id).await?;
    println!("Deleted card '{}'", card.title);
    Ok(())
}

/// Opens the card's URL in the default browser and records the visit.
pub async fn run_open(app: &App, id: Uuid, launch: bool) -> Result<()> {
    let card = fetch(app, id).await?;
    if launch {
        open::that(&card.url).with_context(|| format!("Failed to open {}", card.url))?;
    }
    app.recent()?.add(&card)?;
    println!("{}", card.url);
    Ok(())
}

pub async fn run_reorder(app: &App, scope: CardScope, from: usize, to: usize) -> Result<()> {
    let cards = ops::reorder_cards(app.backend.as_ref(), scope, from, to).await?;
    print_cards(app, &cards)
}

pub async fn run_link(app: &App, card_id: Uuid, folder_id: Uuid) -> Result<()> {
    app.backend.link_card(card_id, folder_id).await?;
    println!("Linked card {} to folder {}", card_id, folder_id);
    Ok(())
}

pub async fn run_unlink(app: &App, card_id: Uuid, folder_id: Uuid) -> Result<()> {
    app.backend.unlink_card(card_id, folder_id).await?;
    println!("Unlinked card {} from folder {}", card_id, folder_id);
    Ok(())
}
