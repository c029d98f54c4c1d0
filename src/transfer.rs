//! `lb export` and `lb import`.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

use linkboard_core::transfer::{self, DashboardExport, ImportPreview};

use crate::app::App;
use crate::prompt::confirm;

/// Exports every table as pretty JSON.
///
/// `output` of `-` writes to stdout. Without `output` the file is
/// `dashboard-export-YYYY-MM-DD.json` in the current directory.
pub async fn run_export(app: &App, output: Option<&Path>) -> Result<()> {
    let doc = transfer::export_data(app.backend.as_ref()).await?;
    let json = serde_json::to_string_pretty(&doc)?;

    let path = match output {
        Some(p) if p == Path::new("-") => {
            println!("{}", json);
            return Ok(());
        }
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(transfer::export_file_name(Local::now().date_naive())),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&path, &json)
        .with_context(|| format!("Failed to write export: {}", path.display()))?;
    let preview = doc.preview();
    eprintln!(
        "Exported {} sections, {} folders, {} cards, {} links to {}",
        preview.sections,
        preview.folders,
        preview.cards,
        preview.card_folders,
        path.display()
    );
    println!("{}", path.display());
    Ok(())
}

fn print_preview(preview: &ImportPreview) {
    println!("Sections:  {}", preview.sections);
    println!("Folders:   {}", preview.folders);
    println!("Cards:     {}", preview.cards);
    println!("Links:     {}", preview.card_folders);
    if let Some(at) = preview.exported_at {
        println!("Exported:  {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
}

fn read_export(file: &Path) -> Result<DashboardExport> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file: {}", file.display()))?;
    let doc = transfer::parse_export(&content)?;
    transfer::validate(&doc.tables)?;
    Ok(doc)
}

/// Checks an export file and prints its counts. Needs no backend.
pub fn run_import_preview(file: &Path) -> Result<()> {
    let doc = read_export(file)?;
    print_preview(&doc.preview());
    Ok(())
}

/// Imports an export file, replacing all existing data.
///
/// The document is parsed and checked before anything is deleted. The
/// replacement needs confirmation unless `yes` is set.
pub async fn run_import(app: &App, file: &Path, yes: bool) -> Result<()> {
    let doc = read_export(file)?;
    print_preview(&doc.preview());

    if !confirm("Replace ALL dashboard data with this file?", yes)? {
        eprintln!("Import cancelled.");
        return Ok(());
    }
    transfer::import_data(app.backend.as_ref(), &doc).await?;
    eprintln!("Import complete.");
    Ok(())
}
