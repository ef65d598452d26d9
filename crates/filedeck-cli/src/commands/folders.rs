//! Folder commands.
//!
//! Folders are addressed by name, the way the browser opens them.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use filedeck_core::ops::folders;
use filedeck_core::ops::live::LiveFolder;
use filedeck_core::{FileRecord, FolderRecord, NoticeLevel, ViewStatus};

use super::record_id;
use crate::output;
use crate::session::{CliSession, SessionStore};

#[derive(Args, Debug)]
pub struct FoldersCommand {
    #[command(subcommand)]
    pub command: FoldersSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum FoldersSubcommand {
    /// List folders, newest first
    List,

    /// Create an empty folder
    Create(NameArgs),

    /// List the files in a folder
    Open(OpenArgs),

    /// Add a file to a folder
    Add(MemberArgs),

    /// Remove a file from a folder; the file is kept
    Remove(MemberArgs),

    /// Share a folder with a user, or stop sharing if already shared
    Share(ShareArgs),

    /// Delete a folder; its files are kept
    Delete(NameArgs),
}

#[derive(Args, Debug)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    pub name: String,

    /// Keep the folder current until Ctrl+C
    #[arg(long)]
    pub follow: bool,

    /// With --follow, exit after this many changes
    #[arg(long, requires = "follow")]
    pub changes: Option<usize>,
}

#[derive(Args, Debug)]
pub struct MemberArgs {
    /// Folder name
    pub folder: String,

    /// File id
    pub file: String,
}

#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Folder name
    pub folder: String,

    /// User id
    pub user: String,
}

pub async fn handle(cmd: FoldersCommand, store: &SessionStore) -> Result<()> {
    let session = store.require().await?;

    match cmd.command {
        FoldersSubcommand::List => {
            let all = folders::list(&session)
                .await
                .context("Failed to list folders")?;
            if all.is_empty() {
                output::hint("No folders yet.");
            }
            for folder in &all {
                println!(
                    "{}  {} {}",
                    folder.id.as_str().dimmed(),
                    folder.name.blue().bold(),
                    format!("({} files)", folder.files.len()).dimmed()
                );
            }
        }
        FoldersSubcommand::Create(args) => {
            let folder = folders::create(&session, &args.name)
                .await
                .context("Failed to create folder")?;
            output::success(&format!("Created folder {}", folder.name));
            output::field("Id", folder.id.as_str());
        }
        FoldersSubcommand::Open(args) => {
            let folder = folders::find(&session, &args.name)
                .await
                .context("Failed to find folder")?;
            if args.follow {
                return follow(session, folder, args.changes).await;
            }

            let contents = folders::contents(&session, &folder)
                .await
                .context("Failed to load folder contents")?;
            print_contents(&folder, &contents);
        }
        FoldersSubcommand::Add(args) => {
            let folder = folders::find(&session, &args.folder)
                .await
                .context("Failed to find folder")?;
            let folder = folders::add_file(&session, &folder.id, &record_id(&args.file)?)
                .await
                .context("Failed to add file")?;
            output::success(&format!(
                "{} now holds {} files",
                folder.name,
                folder.files.len()
            ));
        }
        FoldersSubcommand::Remove(args) => {
            let folder = folders::find(&session, &args.folder)
                .await
                .context("Failed to find folder")?;
            let folder = folders::remove_file(&session, &folder.id, &record_id(&args.file)?)
                .await
                .context("Failed to remove file")?;
            output::success(&format!(
                "{} now holds {} files",
                folder.name,
                folder.files.len()
            ));
        }
        FoldersSubcommand::Share(args) => {
            let folder = folders::find(&session, &args.folder)
                .await
                .context("Failed to find folder")?;
            let folder = folders::toggle_share(&session, &folder.id, &record_id(&args.user)?)
                .await
                .context("Failed to share folder")?;
            let shared: Vec<&str> = folder.shared.iter().map(|id| id.as_str()).collect();
            output::success(&format!("Updated sharing for {}", folder.name));
            output::field("Shared with", &shared.join(", "));
        }
        FoldersSubcommand::Delete(args) => {
            let folder = folders::find(&session, &args.name)
                .await
                .context("Failed to find folder")?;
            folders::delete(&session, &folder.id)
                .await
                .context("Failed to delete folder")?;
            output::success(&format!("Deleted folder {}", folder.name));
        }
    }

    Ok(())
}

/// Prints the folder, then reprints it after every change to it or its files.
async fn follow(session: CliSession, folder: FolderRecord, limit: Option<usize>) -> Result<()> {
    let mut live = LiveFolder::activate(Arc::new(session), folder.id.clone());
    let contents = live
        .loaded()
        .await
        .context("Folder view stopped before loading")?;

    let mut shown = (live.folder().unwrap_or(folder), contents);
    print_contents(&shown.0, &shown.1);
    print_errors(&mut live);
    match live.status() {
        ViewStatus::Ready => output::hint("Following this folder. Press Ctrl+C to stop."),
        _ => output::error("The folder is not live; showing what loaded"),
    }

    let mut seen = 0;
    loop {
        let contents = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            contents = live.changed() => contents,
        };
        let Some(contents) = contents else {
            break;
        };
        print_errors(&mut live);

        let Some(folder) = live.folder() else {
            output::error("The folder was deleted");
            break;
        };
        // Changes to files outside the folder reach the view too, and a new
        // member shows once both its file and the membership have arrived.
        if folder.name == shown.0.name && contents == shown.1 {
            continue;
        }

        shown = (folder, contents);
        println!();
        print_contents(&shown.0, &shown.1);
        seen += 1;
        if limit.is_some_and(|limit| seen >= limit) {
            break;
        }
    }

    live.deactivate().await;
    Ok(())
}

fn print_errors(live: &mut LiveFolder) {
    while let Some(notice) = live.try_notice() {
        if notice.level == NoticeLevel::Error {
            output::notice(&notice);
        }
    }
}

fn print_contents(folder: &FolderRecord, contents: &[FileRecord]) {
    output::heading(&folder.name);
    if contents.is_empty() {
        output::hint("This folder is empty.");
    }
    for file in contents {
        println!("{}  {}", file.id.as_str().dimmed(), file.display_name());
    }
}
