//! `lb folders ...` commands.

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use linkboard_core::models::{FolderPatch, NewFolder};
use linkboard_core::ops;
use linkboard_core::tree::build_folder_tree;

use crate::app::App;
use crate::cards::print_cards;
use crate::prompt::confirm;

pub async fn run_tree(app: &App, section_id: Uuid) -> Result<()> {
    let folders = app.backend.list_folders(section_id).await?;
    let tree = build_folder_tree(&folders);
    if tree.is_empty() {
        println!("No folders in this section.");
        return Ok(());
    }
    let mut lines = Vec::new();
    for node in &tree {
        node.render(0, &mut lines);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

pub async fn run_add(
    app: &App,
    section_id: Uuid,
    name: &str,
    parent_id: Option<Uuid>,
) -> Result<()> {
    let order_index = app
        .backend
        .folder_children(section_id, parent_id)
        .await?
        .len() as i32;
    let folder = ops::create_folder(
        app.backend.as_ref(),
        NewFolder {
            name: name.to_string(),
            parent_id,
            section_id,
            image_url: None,
            order_index,
        },
    )
    .await?;
    println!("Created folder '{}'  ({})", folder.name, folder.id);
    Ok(())
}

pub async fn run_rename(app: &App, id: Uuid, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("folder name must not be empty");
    }
    let patch = FolderPatch {
        name: Some(name.trim().to_string()),
        ..Default::default()
    };
    let folder = app.backend.update_folder(id, &patch).await?;
    println!("Renamed folder to '{}'", folder.name);
    Ok(())
}

pub async fn run_remove(app: &App, id: Uuid, yes: bool) -> Result<()> {
    let folder = app
        .backend
        .get_folder(id)
        .await?
        .with_context(|| format!("folder not found: {}", id))?;
    let question = format!("Delete folder '{}' and its subfolders?", folder.name);
    if !confirm(&question, yes)? {
        eprintln!("Cancelled.");
        return Ok(());
    }
    app.backend.delete_folder(id).await?;
    println!("Deleted folder '{}'", folder.name);
    Ok(())
}

pub async fn run_reorder(
    app: &App,
    section_id: Uuid,
    parent_id: Option<Uuid>,
    from: usize,
    to: usize,
) -> Result<()> {
    let siblings =
        ops::reorder_folders_in_parent(app.backend.as_ref(), section_id, parent_id, from, to)
            .await?;
    for f in &siblings {
        println!("{:>3}. {}  ({})", f.order_index, f.name, f.id);
    }
    Ok(())
}

pub async fn run_move(app: &App, id: Uuid, parent_id: Option<Uuid>, index: usize) -> Result<()> {
    let folder = ops::move_folder_to_parent(app.backend.as_ref(), id, parent_id, index).await?;
    match folder.parent_id {
        Some(parent) => println!(
            "Moved '{}' under {} at position {}",
            folder.name, parent, folder.order_index
        ),
        None => println!(
            "Moved '{}' to the section root at position {}",
            folder.name, folder.order_index
        ),
    }
    Ok(())
}

/// Cards in a folder and all of its subfolders.
pub async fn run_cards(app: &App, id: Uuid) -> Result<()> {
    let cards = app.backend.cards_in_tree(id).await?;
    print_cards(app, &cards)
}
