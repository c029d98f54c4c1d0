//! # Linkboard CLI (`lb`)
//!
//! Manage a bookmark dashboard stored in Supabase: sections, nested
//! folders and link cards, plus device-local favorites and recently opened
//! cards.
//!
//! ## Usage
//!
//! ```bash
//! lb --config ./config/linkboard.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lb sections ...` | List, add, edit, remove and reorder sections |
//! | `lb folders ...` | Folder tree, nesting and moves |
//! | `lb cards ...` | Link cards, folder membership, open in browser |
//! | `lb search "<query>"` | Search sections, folders and cards |
//! | `lb fav ...` | Local favorites |
//! | `lb recent ...` | Recently opened cards |
//! | `lb export` / `lb import <file>` | JSON backup and restore |
//! | `lb serve` | JSON API over HTTP |
//!
//! ## Examples
//!
//! ```bash
//! lb sections add Work --icon 💼
//! lb cards add --section <id> --title Docs --url https://docs.rs --tag rust
//! lb search "rust"
//! lb cards open <id>
//! lb export -o backup.json
//! ```
//!
//! Set `LINKBOARD_LOG=debug` to see backend requests on stderr.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use linkboard::app::{open_local_store, App};
use linkboard::config::{self, Config};
use linkboard::{cards, folders, history, images, search, sections, server, transfer};
use linkboard_core::images::ImageTarget;
use linkboard_core::models::{CardPatch, CardType, NewCard, SectionPatch};
use linkboard_core::ops::CardScope;
use linkboard_core::store::Backend;

/// Linkboard: a personal bookmark dashboard backed by Supabase.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/linkboard.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lb",
    about = "Linkboard: a personal bookmark dashboard backed by Supabase",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/linkboard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sections (top-level tabs).
    Sections {
        #[command(subcommand)]
        action: SectionAction,
    },

    /// Manage folders inside a section.
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },

    /// Manage link cards.
    Cards {
        #[command(subcommand)]
        action: CardAction,
    },

    /// Search sections, folders and cards.
    ///
    /// Queries shorter than `[search].min_query_len` characters are not sent.
    Search {
        /// The search query. Omit with `--interactive`.
        query: Option<String>,

        /// Restrict to cards of one section.
        #[arg(long)]
        section: Option<Uuid>,

        /// Read queries from stdin, one per line, debounced.
        #[arg(short, long)]
        interactive: bool,
    },

    /// Local favorites (stored on this device only).
    Fav {
        #[command(subcommand)]
        action: FavAction,
    },

    /// Recently opened cards (stored on this device only).
    Recent {
        #[command(subcommand)]
        action: RecentAction,
    },

    /// Export all data to a JSON file.
    Export {
        /// Output file, or `-` for stdout.
        /// Defaults to `dashboard-export-YYYY-MM-DD.json`.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with the contents of an export file.
    Import {
        file: PathBuf,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,

        /// Only check the file and print what it contains.
        #[arg(long)]
        preview: bool,
    },

    /// Start the JSON API server on `[server].bind`.
    Serve,

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Image arguments shared by the `image` subcommands.
#[derive(clap::Args)]
struct ImageArgs {
    id: Uuid,

    /// Image to upload (.jpg, .jpeg, .png or .webp, at most 5 MiB).
    file: Option<PathBuf>,

    /// Remove the current image instead.
    #[arg(long)]
    clear: bool,
}

#[derive(Subcommand)]
enum SectionAction {
    /// List sections in display order.
    List,
    /// Create a section at the end of the list.
    Add {
        name: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Change a section's name, icon or color. An empty value clears
    /// icon or color.
    Edit {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a section with all of its folders and cards.
    Rm {
        id: Uuid,
        #[arg(long)]
        yes: bool,
    },
    /// Move the section at position FROM to position TO (0-based).
    Reorder { from: usize, to: usize },
    /// Set or clear a section image.
    Image(ImageArgs),
}

#[derive(Subcommand)]
enum FolderAction {
    /// Print a section's folder tree.
    Tree { section: Uuid },
    /// Create a folder, optionally nested under PARENT.
    Add {
        section: Uuid,
        name: String,
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// Rename a folder.
    Edit {
        id: Uuid,
        #[arg(long)]
        name: String,
    },
    /// Delete a folder and its subfolders. Cards stay in the section.
    Rm {
        id: Uuid,
        #[arg(long)]
        yes: bool,
    },
    /// Reorder folders sharing one parent.
    Reorder {
        section: Uuid,
        from: usize,
        to: usize,
        /// Parent folder; omit for the section root.
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// Move a folder under a new parent at INDEX.
    Move {
        id: Uuid,
        /// New parent; omit to move to the section root.
        #[arg(long)]
        parent: Option<Uuid>,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// List cards in a folder and all of its subfolders.
    Cards { id: Uuid },
    /// Set or clear a folder image.
    Image(ImageArgs),
}

#[derive(Subcommand)]
enum CardAction {
    /// List cards of a section.
    List {
        section: Uuid,
        /// Only cards that belong to no folder.
        #[arg(long)]
        unfiled: bool,
    },
    /// Show one card with its folders.
    Show { id: Uuid },
    /// Create a card.
    Add {
        #[arg(long)]
        section: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        description: Option<String>,
        /// One of link, gpt, app, doc.
        #[arg(long = "type", default_value = "link")]
        card_type: CardType,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long = "folder")]
        folders: Vec<Uuid>,
    },
    /// Change a card. `--folder` replaces its folder set; `--no-folders`
    /// removes it from every folder.
    Edit {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type")]
        card_type: Option<CardType>,
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
        #[arg(long = "folder")]
        folders: Option<Vec<Uuid>>,
        #[arg(long, conflicts_with = "folders")]
        no_folders: bool,
    },
    /// Delete a card.
    Rm {
        id: Uuid,
        #[arg(long)]
        yes: bool,
    },
    /// Open a card in the browser and record it as recently opened.
    Open {
        id: Uuid,
        /// Record the visit and print the URL without launching a browser.
        #[arg(long)]
        no_launch: bool,
    },
    /// Move the card at FROM to TO within the list `cards list` or
    /// `folders cards` shows for the same scope.
    Reorder {
        from: usize,
        to: usize,
        #[arg(long, required_unless_present = "folder", conflicts_with = "folder")]
        section: Option<Uuid>,
        /// Only the section's cards that belong to no folder.
        #[arg(long, requires = "section")]
        unfiled: bool,
        /// Cards in this folder and its subfolders.
        #[arg(long)]
        folder: Option<Uuid>,
    },
    /// Add a card to a folder.
    Link { card: Uuid, folder: Uuid },
    /// Remove a card from a folder.
    Unlink { card: Uuid, folder: Uuid },
    /// Set or clear a card image.
    Image(ImageArgs),
}

#[derive(Subcommand)]
enum FavAction {
    /// List favorite cards.
    List,
    /// Star or unstar a card.
    Toggle { id: Uuid },
    Add { id: Uuid },
    Rm { id: Uuid },
}

#[derive(Subcommand)]
enum RecentAction {
    /// List recently opened cards, newest first.
    List,
    Rm { id: Uuid },
    Clear,
    /// Drop entries whose card no longer exists.
    Cleanup,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LINKBOARD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `--flag ""` clears a nullable column; an absent flag leaves it alone.
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.trim().is_empty() { None } else { Some(v) })
}

/// Loads the config if the file exists; local-only commands fall back to
/// defaults otherwise.
fn load_or_minimal(path: &std::path::Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that work without a backend
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "lb", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Fav { action } => {
            let cfg = load_or_minimal(&cli.config)?;
            let local = open_local_store(&cfg)?;
            match action {
                FavAction::List => {
                    let app = if cfg.backend.is_configured() {
                        Some(App::from_config(&cfg)?)
                    } else {
                        None
                    };
                    let backend: Option<&dyn Backend> = app.as_ref().map(|a| a.backend.as_ref());
                    history::run_fav_list(local, backend).await?;
                }
                FavAction::Toggle { id } => history::run_fav_toggle(local, *id)?,
                FavAction::Add { id } => history::run_fav_add(local, *id)?,
                FavAction::Rm { id } => history::run_fav_remove(local, *id)?,
            }
            return Ok(());
        }
        Commands::Recent { action } if !matches!(action, RecentAction::Cleanup) => {
            let cfg = load_or_minimal(&cli.config)?;
            let local = open_local_store(&cfg)?;
            match action {
                RecentAction::List => history::run_recent_list(local)?,
                RecentAction::Rm { id } => history::run_recent_remove(local, *id)?,
                RecentAction::Clear => history::run_recent_clear(local)?,
                RecentAction::Cleanup => unreachable!(),
            }
            return Ok(());
        }
        Commands::Import {
            file,
            preview: true,
            ..
        } => {
            transfer::run_import_preview(file)?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;
    let app = App::from_config(&cfg)?;

    match cli.command {
        Commands::Sections { action } => match action {
            SectionAction::List => sections::run_list(&app).await?,
            SectionAction::Add { name, icon, color } => {
                sections::run_add(&app, &name, icon, color).await?
            }
            SectionAction::Edit {
                id,
                name,
                icon,
                color,
            } => {
                let patch = SectionPatch {
                    name,
                    icon: clearable(icon),
                    color: clearable(color),
                    ..Default::default()
                };
                sections::run_edit(&app, id, patch).await?
            }
            SectionAction::Rm { id, yes } => sections::run_remove(&app, id, yes).await?,
            SectionAction::Reorder { from, to } => sections::run_reorder(&app, from, to).await?,
            SectionAction::Image(args) => {
                images::run_image(
                    &app,
                    ImageTarget::Section(args.id),
                    args.file.as_deref(),
                    args.clear,
                )
                .await?
            }
        },
        Commands::Folders { action } => match action {
            FolderAction::Tree { section } => folders::run_tree(&app, section).await?,
            FolderAction::Add {
                section,
                name,
                parent,
            } => folders::run_add(&app, section, &name, parent).await?,
            FolderAction::Edit { id, name } => folders::run_rename(&app, id, &name).await?,
            FolderAction::Rm { id, yes } => folders::run_remove(&app, id, yes).await?,
            FolderAction::Reorder {
                section,
                from,
                to,
                parent,
            } => folders::run_reorder(&app, section, parent, from, to).await?,
            FolderAction::Move { id, parent, index } => {
                folders::run_move(&app, id, parent, index).await?
            }
            FolderAction::Cards { id } => folders::run_cards(&app, id).await?,
            FolderAction::Image(args) => {
                images::run_image(
                    &app,
                    ImageTarget::Folder(args.id),
                    args.file.as_deref(),
                    args.clear,
                )
                .await?
            }
        },
        Commands::Cards { action } => match action {
            CardAction::List { section, unfiled } => cards::run_list(&app, section, unfiled).await?,
            CardAction::Show { id } => cards::run_show(&app, id).await?,
            CardAction::Add {
                section,
                title,
                url,
                description,
                card_type,
                tags,
                folders,
            } => {
                let new = NewCard {
                    title,
                    url,
                    description,
                    card_type,
                    tags,
                    section_id: section,
                    image_url: None,
                    is_favorite: false,
                    order_index: 0,
                };
                cards::run_add(&app, new, &folders).await?
            }
            CardAction::Edit {
                id,
                title,
                url,
                description,
                card_type,
                tags,
                folders,
                no_folders,
            } => {
                let patch = CardPatch {
                    title,
                    url,
                    description: clearable(description),
                    card_type,
                    tags,
                    ..Default::default()
                };
                let folders = if no_folders { Some(Vec::new()) } else { folders };
                cards::run_edit(&app, id, patch, folders).await?
            }
            CardAction::Rm { id, yes } => cards::run_remove(&app, id, yes).await?,
            CardAction::Open { id, no_launch } => cards::run_open(&app, id, !no_launch).await?,
            CardAction::Reorder {
                from,
                to,
                section,
                unfiled,
                folder,
            } => {
                let scope = match (folder, section) {
                    (Some(folder), _) => CardScope::Folder(folder),
                    (None, Some(section)) if unfiled => CardScope::Unfiled(section),
                    (None, Some(section)) => CardScope::Section(section),
                    (None, None) => anyhow::bail!("pass --section or --folder"),
                };
                cards::run_reorder(&app, scope, from, to).await?
            }
            CardAction::Link { card, folder } => cards::run_link(&app, card, folder).await?,
            CardAction::Unlink { card, folder } => cards::run_unlink(&app, card, folder).await?,
            CardAction::Image(args) => {
                images::run_image(
                    &app,
                    ImageTarget::Card(args.id),
                    args.file.as_deref(),
                    args.clear,
                )
                .await?
            }
        },
        Commands::Search {
            query,
            section,
            interactive,
        } => match (query, interactive) {
            (_, true) => search::run_interactive(&app, section).await?,
            (Some(q), false) => search::run_search(&app, &q, section).await?,
            (None, false) => anyhow::bail!("pass a query or --interactive"),
        },
        Commands::Recent { .. } => {
            history::run_recent_cleanup(app.local.clone(), app.backend.as_ref()).await?
        }
        Commands::Export { output } => transfer::run_export(&app, output.as_deref()).await?,
        Commands::Import { file, yes, .. } => transfer::run_import(&app, &file, yes).await?,
        Commands::Serve => server::run_server(app).await?,
        Commands::Fav { .. } | Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
