mod config;
mod dashboard;
mod drive;
mod gmail;
mod parser;
mod publish;
mod store;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use config::Config;
use store::{MergeOutcome, Note, NoteStore};

#[derive(Parser)]
#[command(name = "rocketbook_sync", about = "Rocketbook scan sync for the daily-brief dashboard")]
struct Cli {
    /// Dashboard checkout (default: $DASHBOARD_DIR or /tmp/daily-brief-ghpages)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent scan emails and refresh the dashboard
    Sync {
        /// Max messages to process (capped at 10)
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
        /// Commit and push the checkout afterwards
        #[arg(long)]
        publish: bool,
    },
    /// Add one note by hand
    Add {
        /// Note title
        title: String,
        /// Display date (default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// Link to the scanned PDF
        #[arg(short, long)]
        url: Option<String>,
        /// Commit and push the checkout afterwards
        #[arg(long)]
        publish: bool,
    },
    /// Show the notes currently in the snapshot
    List,
    /// Commit and push the dashboard checkout
    Push,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let cfg = Config::new(cli.dir);

    let result = match cli.command {
        Commands::Sync { limit, publish } => {
            let mut store = NoteStore::load(&cfg.data_file)?;
            let batch = fetch_batch(&cfg, limit.min(gmail::MAX_BATCH)).await;

            let mut counts = SyncCounts {
                fetched: batch.len(),
                inserted: 0,
                duplicates: 0,
            };
            // Fold oldest first so the newest scan lands at the head.
            for extraction in batch.into_iter().rev() {
                match store.merge(extraction.note) {
                    MergeOutcome::Inserted => counts.inserted += 1,
                    MergeOutcome::Duplicate => counts.duplicates += 1,
                }
            }
            store.save(&cfg.data_file)?;
            update_dashboard(&cfg, &store)?;
            counts.print(store.len());

            if publish {
                push_dashboard(&cfg)?;
            }
            Ok(())
        }
        Commands::Add { title, date, url, publish } => {
            let mut store = NoteStore::load(&cfg.data_file)?;
            let date = date.unwrap_or_else(|| parser::date::display(Local::now().date_naive()));
            let note = Note {
                title: title.clone(),
                date,
                date_iso: None,
                url,
                source_id: None,
                added_at: Some(Local::now()),
            };
            match store.merge(note) {
                MergeOutcome::Inserted => println!("Added note: {} ({} in store)", title, store.len()),
                MergeOutcome::Duplicate => println!("Note already present: {}", title),
            }
            store.save(&cfg.data_file)?;
            update_dashboard(&cfg, &store)?;
            if publish {
                push_dashboard(&cfg)?;
            }
            Ok(())
        }
        Commands::List => {
            let store = NoteStore::load(&cfg.data_file)?;
            if store.is_empty() {
                println!("No notes in {}", cfg.data_file.display());
                return Ok(());
            }
            println!("{:>3} | {:<40} | {:<12} | {}", "#", "Title", "Date", "Link");
            println!("{}", "-".repeat(80));
            for (i, note) in store.notes().iter().enumerate() {
                println!(
                    "{:>3} | {:<40} | {:<12} | {}",
                    i + 1,
                    truncate(&note.title, 40),
                    note.date,
                    note.url.as_deref().unwrap_or("-"),
                );
            }
            println!("\n{} notes | newest first", store.len());
            Ok(())
        }
        Commands::Push => push_dashboard(&cfg),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct SyncCounts {
    fetched: usize,
    inserted: usize,
    duplicates: usize,
}

impl SyncCounts {
    fn print(&self, stored: usize) {
        println!(
            "Merged {} new notes ({} fetched, {} duplicates), {} in store.",
            self.inserted, self.fetched, self.duplicates, stored
        );
    }
}

/// Pull the recent scan emails and reduce each to a note plus uploaded
/// attachments. Collaborator failures skip the affected item; without a
/// Google token the whole fetch stage is skipped and the cycle continues
/// from the saved snapshot.
async fn fetch_batch(cfg: &Config, limit: usize) -> Vec<parser::Extraction> {
    use indicatif::{ProgressBar, ProgressStyle};

    if limit == 0 {
        return Vec::new();
    }

    let client = match gmail::GmailClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            println!("Skipping Gmail fetch ({e}); rendering from the saved snapshot.");
            return Vec::new();
        }
    };

    let ids = match client.search(&cfg.gmail_query(), limit).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Gmail search failed: {e:#}");
            println!("Gmail unreachable; rendering from the saved snapshot.");
            return Vec::new();
        }
    };
    if ids.is_empty() {
        println!("No recent scan emails.");
        return Vec::new();
    }
    println!("Fetching {} scan emails...", ids.len());

    let uploader = match drive::DriveClient::from_env() {
        Ok(client) => match client.ensure_folder(&cfg.drive_folder).await {
            Ok(folder_id) => Some((client, folder_id)),
            Err(e) => {
                warn!("Drive folder unavailable, notes will have no links: {e:#}");
                None
            }
        },
        Err(e) => {
            warn!("Drive uploads disabled: {e:#}");
            None
        }
    };

    let pb = ProgressBar::new(ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut batch = Vec::new();
    let mut skipped = 0usize;
    let mut uploads = 0usize;
    for id in &ids {
        let msg = match client.message(id).await {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Skipping message {id}: {e:#}");
                skipped += 1;
                pb.inc(1);
                continue;
            }
        };
        let mut extraction = parser::extract(&msg);
        if let Some((drive, folder_id)) = &uploader {
            for att in &extraction.attachments {
                match upload_attachment(&client, drive, folder_id, att).await {
                    Ok(link) => {
                        uploads += 1;
                        if extraction.note.url.is_none() {
                            extraction.note.url = Some(link);
                        }
                    }
                    Err(e) => warn!("Skipping attachment {}: {e:#}", att.filename),
                }
            }
        }
        batch.push(extraction);
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!(
        "Fetched {} messages ({} skipped), uploaded {} attachments.",
        batch.len(),
        skipped,
        uploads
    );
    batch
}

async fn upload_attachment(
    client: &gmail::GmailClient,
    drive: &drive::DriveClient,
    folder_id: &str,
    att: &parser::Attachment,
) -> anyhow::Result<String> {
    debug!("Downloading {} ({} bytes)", att.filename, att.size);
    let bytes = client.attachment(&att.message_id, &att.id).await?;
    drive
        .upload(&drive::sanitize_filename(&att.filename), bytes, folder_id)
        .await
}

/// Patch the dashboard in place. The three owned regions are rewritten
/// together or not at all; on a structural mismatch the file is left
/// untouched.
fn update_dashboard(cfg: &Config, store: &NoteStore) -> anyhow::Result<()> {
    let doc = fs::read_to_string(&cfg.index_file)
        .with_context(|| format!("Dashboard document not found: {}", cfg.index_file.display()))?;
    let patched = dashboard::render(&doc, store.notes(), Local::now().naive_local())
        .with_context(|| format!("Dashboard template drifted: {}", cfg.index_file.display()))?;
    fs::write(&cfg.index_file, patched)
        .with_context(|| format!("Failed to write {}", cfg.index_file.display()))?;
    println!("Dashboard updated: {} notes.", store.len());
    Ok(())
}

fn push_dashboard(cfg: &Config) -> anyhow::Result<()> {
    let token = publish::token_from_env()?;
    let message = format!("Rocketbook update - {}", Local::now().format("%Y-%m-%d %H:%M"));
    publish::publish(&cfg.dashboard_dir, &cfg.branch, &message, &token)?;
    println!("Pushed dashboard to origin/{}.", cfg.branch);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
