//! File browser commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use filedeck_core::ops::files::{self, Listing, NewFile};
use filedeck_core::ops::folders;
use filedeck_core::ops::live::LiveBrowser;
use filedeck_core::{Entry, FileRecord, NoticeLevel, ViewStatus};

use super::{attachment, record_id, record_ids};
use crate::output;
use crate::session::{CliSession, SessionStore};

#[derive(Args, Debug)]
pub struct FilesCommand {
    #[command(subcommand)]
    pub command: FilesSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum FilesSubcommand {
    /// Folders, then files, then the most recently updated files
    List(BrowseArgs),

    /// Files other users shared with you
    Shared(ListArgs),

    /// Show one file
    Get(IdArgs),

    /// Upload a file
    Upload(UploadArgs),

    /// Share a file with a user, or stop sharing if already shared
    Share(ShareArgs),

    /// Users a file can be shared with
    Candidates,

    /// Print a download URL
    Link(IdArgs),

    /// Delete a file
    Delete(IdArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output records as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Output records as JSON lines
    #[arg(long, conflicts_with = "follow")]
    pub json: bool,

    /// Keep the listing current until Ctrl+C
    #[arg(long)]
    pub follow: bool,

    /// With --follow, exit after this many changes
    #[arg(long, requires = "follow")]
    pub changes: Option<usize>,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    pub path: PathBuf,

    /// Display name; defaults to the file name
    #[arg(long)]
    pub name: Option<String>,

    /// Name of a folder to add the file to
    #[arg(long)]
    pub folder: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShareArgs {
    pub id: String,

    /// User to toggle
    #[arg(long, conflicts_with = "set", required_unless_present = "set")]
    pub user: Option<String>,

    /// Replace the whole list of users, comma separated
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub set: Option<Vec<String>>,
}

pub async fn handle(cmd: FilesCommand, store: &SessionStore) -> Result<()> {
    let session = store.require().await?;

    match cmd.command {
        FilesSubcommand::List(args) => {
            if args.follow {
                return follow(session, args.changes).await;
            }

            let listing = files::browse(&session)
                .await
                .context("Failed to load files")?;

            if args.json {
                for entry in listing.entries() {
                    match entry {
                        Entry::Folder(folder) => output::json(&folder)?,
                        Entry::File(file) => output::json(&file)?,
                    }
                }
                return Ok(());
            }
            print_listing(&listing);
        }
        FilesSubcommand::Shared(args) => {
            let shared = files::shared_with_me(&session)
                .await
                .context("Failed to load shared files")?;
            if shared.is_empty() && !args.json {
                output::hint("Nothing has been shared with you.");
            }
            for file in &shared {
                if args.json {
                    output::json(file)?;
                } else {
                    print_file(file);
                }
            }
        }
        FilesSubcommand::Get(args) => {
            let file = files::get(&session, &record_id(&args.id)?)
                .await
                .context("Failed to fetch file")?;
            output::json_pretty(&file)?;
        }
        FilesSubcommand::Upload(args) => {
            let mut upload = NewFile::new(attachment(&args.path)?);
            if let Some(name) = args.name {
                upload = upload.named(name);
            }
            if let Some(folder) = args.folder.as_deref() {
                let folder = folders::find(&session, folder)
                    .await
                    .context("Failed to find folder")?;
                upload = upload.in_folder(folder.id);
            }

            let file = files::upload(&session, upload)
                .await
                .context("Failed to upload file")?;
            output::success(&format!("Uploaded {}", file.display_name()));
            output::field("Id", file.id.as_str());
        }
        FilesSubcommand::Share(args) => {
            let id = record_id(&args.id)?;
            let file = match args.user {
                Some(user) => files::toggle_share(&session, &id, &record_id(&user)?).await,
                None => {
                    let users = record_ids(&args.set.unwrap_or_default())?;
                    files::set_shared(&session, &id, &users).await
                }
            }
            .context("Failed to share file")?;

            let shared: Vec<&str> = file.shared.iter().map(|id| id.as_str()).collect();
            output::success(&format!("Updated sharing for {}", file.display_name()));
            output::field("Shared with", &shared.join(", "));
        }
        FilesSubcommand::Candidates => {
            let users = files::share_candidates(&session)
                .await
                .context("Failed to list users")?;
            for user in &users {
                println!("{}  {}", user.id.as_str().dimmed(), user.display_name());
            }
        }
        FilesSubcommand::Link(args) => {
            let file = files::get(&session, &record_id(&args.id)?)
                .await
                .context("Failed to fetch file")?;
            let url = files::link(&session, &file).context("Failed to build file URL")?;
            println!("{}", url);
        }
        FilesSubcommand::Delete(args) => {
            files::delete(&session, &record_id(&args.id)?)
                .await
                .context("Failed to delete file")?;
            output::success(&format!("Deleted file {}", args.id));
        }
    }

    Ok(())
}

/// Prints the browser, then reprints it after every change.
async fn follow(session: CliSession, limit: Option<usize>) -> Result<()> {
    let mut browser = LiveBrowser::activate(Arc::new(session));
    let listing = browser
        .loaded()
        .await
        .context("File browser stopped before loading")?;

    print_listing(&listing);
    while let Some(notice) = browser.try_notice() {
        output::notice(&notice);
    }
    match browser.status() {
        ViewStatus::Ready => output::hint("Following files and folders. Press Ctrl+C to stop."),
        _ => output::error("The file browser is not live; showing what loaded"),
    }

    let mut seen = 0;
    loop {
        let listing = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            listing = browser.changed() => listing,
        };
        let Some(listing) = listing else {
            break;
        };

        // Notices are queued before the snapshot that carries them is published.
        let mut changes = 0;
        while let Some(notice) = browser.try_notice() {
            output::notice(&notice);
            if notice.level == NoticeLevel::Info {
                changes += 1;
            }
        }
        if changes == 0 {
            continue;
        }

        println!();
        print_listing(&listing);
        seen += changes;
        if limit.is_some_and(|limit| seen >= limit) {
            break;
        }
    }

    browser.deactivate().await;
    Ok(())
}

fn print_listing(listing: &Listing) {
    let entries = listing.entries();
    if entries.is_empty() {
        output::hint("No files yet.");
        return;
    }
    for entry in &entries {
        print_entry(entry);
    }
    if !listing.recent.is_empty() {
        println!();
        output::heading("Recent");
        for file in &listing.recent {
            print_file(file);
        }
    }
}

fn print_entry(entry: &Entry) {
    match entry {
        Entry::Folder(folder) => println!(
            "{}  {} {}",
            folder.id.as_str().dimmed(),
            folder.name.blue().bold(),
            format!("({} files)", folder.files.len()).dimmed()
        ),
        Entry::File(file) => print_file(file),
    }
}

pub(super) fn print_file(file: &FileRecord) {
    let updated = file
        .updated
        .map(|t| t.to_string())
        .unwrap_or_default();
    println!(
        "{}  {}  {}",
        file.id.as_str().dimmed(),
        file.display_name(),
        updated.dimmed()
    );
}
