use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::app::ClipboardApp;
use crate::core::clipboard::{HistoryStore, SystemClipboard};
use crate::shared::emit::{ChannelHandler, NoopHandler, SharedHandler};
use crate::shared::events::AppEvent;
use crate::shared::settings::AppSettings;
use crate::shared::types::HistoryEntry;

/// Buffered events between the polling task and the terminal
const EVENT_BUFFER: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "clipboard-keeper")]
#[command(version)]
#[command(about = "Persistent, searchable clipboard history", long_about = None)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// History database file, overriding the settings
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Watch the clipboard and record new text until interrupted
    Watch,
    /// List entries, most recently seen first
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },
    /// Case-sensitive substring search
    Search {
        query: String,
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Print one entry in full
    Show { id: u64 },
    /// Delete an entry
    Delete { id: u64 },
    /// Toggle the favorite flag of an entry
    Favorite { id: u64 },
    /// Put an entry back on the system clipboard
    Restore { id: u64 },
    /// Remove non-favorite entries not seen for the given number of days
    Sweep {
        /// Defaults to database.auto_cleanup_days
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Show history statistics
    Stats,
    /// Write the whole history to a JSON file
    Export { path: PathBuf },
    /// Merge a JSON export into the history
    Import { path: PathBuf },
    /// Delete every entry, favorites included
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Print the effective settings
    Config {
        /// Only print the settings file location
        #[arg(long)]
        path: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Watch => watch(settings).await?,
        Commands::List { limit, offset } => {
            let entries = open_store(&settings)?.list(limit, offset)?;
            print_entries(&entries);
        }
        Commands::Search { query, limit } => {
            let entries = open_store(&settings)?.search(&query, limit)?;
            print_entries(&entries);
        }
        Commands::Show { id } => {
            let entry = open_store(&settings)?
                .get(id)?
                .with_context(|| format!("No entry with id {}", id))?;
            show_entry(&entry);
        }
        Commands::Delete { id } => {
            if !open_store(&settings)?.delete(id)? {
                bail!("No entry with id {}", id);
            }
            println!("Deleted entry {}", id);
        }
        Commands::Favorite { id } => {
            let store = open_store(&settings)?;
            if !store.toggle_favorite(id)? {
                bail!("No entry with id {}", id);
            }
            let favorite = store.get(id)?.map(|entry| entry.is_favorite).unwrap_or(false);
            println!("Entry {} {}", id, if favorite { "marked as favorite" } else { "unmarked" });
        }
        Commands::Restore { id } => {
            let app = ClipboardApp::new(
                settings.clone(),
                open_store(&settings)?,
                Arc::new(SystemClipboard::new()),
                Arc::new(NoopHandler),
            )?;
            if !app.restore(id)? {
                bail!("No entry with id {}", id);
            }
            println!("Restored entry {} to the clipboard", id);
        }
        Commands::Sweep { days } => {
            let days = days.unwrap_or(settings.database.auto_cleanup_days);
            let app = ClipboardApp::new(
                settings.clone(),
                open_store(&settings)?,
                Arc::new(SystemClipboard::new()),
                Arc::new(NoopHandler),
            )?;
            let removed = app.recorder().apply_retention(days)?;
            println!("Removed {} entries older than {} days", removed, days);
        }
        Commands::Stats => {
            let stats = open_store(&settings)?.statistics()?;
            println!("Clipboard History Statistics");
            println!("============================");
            println!("Total entries: {}", stats.total);
            println!("  Favorites: {}", stats.favorite_count);
            println!("  Seen today: {}", stats.today_count);
            println!("Storage: {:.2} MB", stats.storage_mb());
            println!("Database: {}", settings.database_path()?.display());
        }
        Commands::Export { path } => {
            let count = open_store(&settings)?.export(&path)?;
            println!("Exported {} entries to {}", count, path.display());
        }
        Commands::Import { path } => {
            let summary = open_store(&settings)?.import(&path)?;
            println!(
                "Imported {}: {} new, {} already present, {} skipped",
                path.display(),
                summary.inserted,
                summary.touched,
                summary.skipped
            );
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("Refusing to clear the history without --yes");
            }
            let removed = open_store(&settings)?.clear()?;
            println!("Removed {} entries", removed);
        }
        Commands::Config { path } => {
            let location = settings_path(&cli.settings)?;
            if path {
                println!("{}", location.display());
            } else {
                println!("# {}", location.display());
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
        }
    }

    Ok(())
}

fn settings_path(explicit: &Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.clone()),
        None => Ok(AppSettings::get_settings_path()?),
    }
}

fn load_settings(cli: &Cli) -> Result<AppSettings> {
    let path = settings_path(&cli.settings)?;
    let mut settings = AppSettings::load_from(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    if let Some(database) = &cli.database {
        settings.database.path = Some(database.clone());
    }
    Ok(settings)
}

/// Maintenance commands must not silently fall back to an empty in-memory store
fn open_store(settings: &AppSettings) -> Result<HistoryStore> {
    let path = settings.database_path()?;
    HistoryStore::open(&path).with_context(|| format!("Failed to open history database {}", path.display()))
}

async fn watch(settings: AppSettings) -> Result<()> {
    let (events, mut rx) = ChannelHandler::new(EVENT_BUFFER);
    let subscriber: SharedHandler = Arc::new(events);
    let app = ClipboardApp::from_settings(settings, Arc::new(SystemClipboard::new()), subscriber)?;

    app.startup()?;
    if !app.monitor().is_running() {
        app.monitor().start()?;
    }
    println!("Watching the clipboard, press Ctrl+C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl+C")?;
                break;
            }
            Some(event) = rx.recv() => print_event(&event),
        }
    }

    app.shutdown().await?;
    println!("Stopped");
    Ok(())
}

fn print_event(event: &AppEvent) {
    match event {
        AppEvent::HistoryUpdated { entry, is_new } => {
            let marker = if *is_new { "+" } else { "~" };
            println!("{} {}", marker, entry_line(entry));
        }
        AppEvent::OperationFailed { operation, error } => {
            eprintln!("Failed to {}: {}", operation, error);
        }
        AppEvent::ClipboardChanged(_) => {}
    }
}

fn print_entries(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No entries");
        return;
    }
    for entry in entries {
        println!("{}", entry_line(entry));
    }
}

fn show_entry(entry: &HistoryEntry) {
    println!("Id:         {}", entry.id);
    println!("Type:       {}", entry.content_type);
    println!("Characters: {}", entry.size);
    println!("Favorite:   {}", if entry.is_favorite { "yes" } else { "no" });
    println!("Created:    {}", entry.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    println!("Last seen:  {}", entry.last_seen_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    println!("Hash:       {}", entry.content_hash);
    println!();
    println!("{}", entry.content);
}

/// One line per entry: id, favorite star, last seen time, single-line preview
fn entry_line(entry: &HistoryEntry) -> String {
    let star = if entry.is_favorite { "*" } else { " " };
    let preview: String = entry
        .preview()
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    format!(
        "{:>6} {} {}  {}",
        entry.id,
        star,
        entry.last_seen_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        preview
    )
}
