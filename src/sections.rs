//! `lb sections ...` commands.

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use linkboard_core::models::{NewSection, Section, SectionPatch};
use linkboard_core::ops;

use crate::app::App;
use crate::prompt::confirm;

pub fn format_section(s: &Section) -> String {
    let icon = s.icon.as_deref().unwrap_or("📁");
    let color = s
        .color
        .as_deref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default();
    format!("{:>3}. {} {}{}  ({})", s.order_index, icon, s.name, color, s.id)
}

pub async fn run_list(app: &App) -> Result<()> {
    let sections = app.backend.list_sections().await?;
    if sections.is_empty() {
        println!("No sections yet. Create one with `lb sections add <name>`.");
        return Ok(());
    }
    for s in &sections {
        println!("{}", format_section(s));
    }
    Ok(())
}

pub async fn run_add(
    app: &App,
    name: &str,
    icon: Option<String>,
    color: Option<String>,
) -> Result<()> {
    let order_index = app.backend.list_sections().await?.len() as i32;
    let section = ops::create_section(
        app.backend.as_ref(),
        NewSection {
            name: name.to_string(),
            icon,
            color,
            image_url: None,
            order_index,
        },
    )
    .await?;
    println!("Created section {}", format_section(&section));
    Ok(())
}

pub async fn run_edit(app: &App, id: Uuid, patch: SectionPatch) -> Result<()> {
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            bail!("section name must not be empty");
        }
    }
    let section = app.backend.update_section(id, &patch).await?;
    println!("Updated section {}", format_section(&section));
    Ok(())
}

pub async fn run_remove(app: &App, id: Uuid, yes: bool) -> Result<()> {
    let section = app
        .backend
        .get_section(id)
        .await?
        .with_context(|| format!("section not found: {}", id))?;
    let question = format!(
        "Delete section '{}' with all of its folders and cards?",
        section.name
    );
    if !confirm(&question, yes)? {
        eprintln!("Cancelled.");
        return Ok(());
    }
    app.backend.delete_section(id).await?;
    println!("Deleted section '{}'", section.name);
    Ok(())
}

pub async fn run_reorder(app: &App, from: usize, to: usize) -> Result<()> {
    let sections = ops::reorder_sections(app.backend.as_ref(), from, to).await?;
    for s in &sections {
        println!("{}", format_section(s));
    }
    Ok(())
}
