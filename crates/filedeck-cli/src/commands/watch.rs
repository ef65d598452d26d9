//! Watch command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use filedeck_core::ops::files::RECENT_LIMIT;
use filedeck_core::types::CollectionName;
use filedeck_core::{LiveView, NoticeLevel, Record, ViewOptions, ViewStatus};

use crate::output;
use crate::session::SessionStore;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Collection to follow
    #[arg(default_value = "files")]
    pub collection: String,

    /// Print the initial records as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Exit after this many changes
    #[arg(long)]
    pub changes: Option<usize>,
}

pub async fn run(args: WatchArgs, store: &SessionStore) -> Result<()> {
    let session = Arc::new(store.require().await?);
    let collection = CollectionName::new(&args.collection).context("Invalid collection name")?;

    let mut options = ViewOptions::new();
    if collection == CollectionName::files() {
        options = options.recent(RECENT_LIMIT);
    }

    let mut view: LiveView<Record> = LiveView::activate(session, collection.clone(), options);

    let snapshot = view
        .wait_for(|s| s.status != ViewStatus::Loading)
        .await
        .context("View stopped before loading")?;

    if args.json {
        for record in &snapshot.items {
            output::json(record)?;
        }
    } else if !snapshot.recent.is_empty() {
        output::heading("Recent");
        for record in &snapshot.recent {
            println!("{}  {}", record.id.as_str().dimmed(), record.label());
        }
    }
    match snapshot.status {
        ViewStatus::Ready => eprintln!(
            "{}",
            format!(
                "Watching {} ({} records). Press Ctrl+C to stop.",
                collection,
                snapshot.items.len()
            )
            .dimmed()
        ),
        _ => output::error(&format!("{} is not live; showing what loaded", collection)),
    }

    let mut seen = 0;
    loop {
        let notice = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notice = view.next_notice() => notice,
        };
        let Some(notice) = notice else {
            break;
        };

        output::notice(&notice);
        if notice.level == NoticeLevel::Info {
            seen += 1;
            if args.changes.is_some_and(|limit| seen >= limit) {
                break;
            }
        }
    }

    view.deactivate().await;
    Ok(())
}
