//! Live versions of the file browser and of a folder.
//!
//! Each screen follows two collections at once, so it is built from two
//! [`LiveView`]s on the same session. Tearing one screen down releases only
//! its own views.

use std::sync::Arc;

use tracing::debug;

use super::files::{Listing, RECENT_LIMIT};
use crate::notice::Notice;
use crate::query::ListQuery;
use crate::record::{FileRecord, FolderRecord};
use crate::traits::Session;
use crate::types::{CollectionName, RecordId};
use crate::view::{LiveView, ViewOptions, ViewStatus};

/// The file browser, kept current by realtime changes to folders and files.
#[derive(Debug)]
pub struct LiveBrowser {
    folders: LiveView<FolderRecord>,
    files: LiveView<FileRecord>,
}

impl LiveBrowser {
    /// Starts following `folders` and `files`, newest first.
    ///
    /// Must be called within a Tokio runtime.
    pub fn activate<S: Session + 'static>(session: Arc<S>) -> Self {
        let newest = ListQuery::new().sort("-created");
        let folders = LiveView::activate(
            Arc::clone(&session),
            CollectionName::folders(),
            ViewOptions::new().query(newest.clone()),
        );
        let files = LiveView::activate(
            session,
            CollectionName::files(),
            ViewOptions::new().query(newest).recent(RECENT_LIMIT),
        );
        Self { folders, files }
    }

    /// The current listing.
    pub fn listing(&self) -> Listing {
        let files = self.files.snapshot();
        Listing {
            folders: self.folders.snapshot().items.clone(),
            files: files.items.clone(),
            recent: files.recent.clone(),
        }
    }

    pub fn status(&self) -> ViewStatus {
        self.folders
            .snapshot()
            .status
            .combine(self.files.snapshot().status)
    }

    /// Waits until either collection publishes. `None` once the browser has stopped.
    pub async fn changed(&mut self) -> Option<Listing> {
        tokio::select! {
            folders = self.folders.changed() => folders.map(drop)?,
            files = self.files.changed() => files.map(drop)?,
        };
        Some(self.listing())
    }

    /// Waits until both collections have loaded, returning the first listing.
    pub async fn loaded(&mut self) -> Option<Listing> {
        self.folders.wait_for(|s| s.status != ViewStatus::Loading).await?;
        self.files.wait_for(|s| s.status != ViewStatus::Loading).await?;
        Some(self.listing())
    }

    /// Next notice from either collection.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        tokio::select! {
            notice = self.folders.next_notice() => notice,
            notice = self.files.next_notice() => notice,
        }
    }

    /// Returns a pending notice without waiting.
    pub fn try_notice(&mut self) -> Option<Notice> {
        self.folders.try_notice().or_else(|| self.files.try_notice())
    }

    pub async fn deactivate(self) {
        self.folders.deactivate().await;
        self.files.deactivate().await;
    }
}

/// One folder and its files, kept current by realtime changes.
///
/// The folder view keeps only the followed folder. Files are followed as a
/// whole and picked by the folder's member ids, so a file added to the
/// folder shows up as soon as the folder's membership changes.
#[derive(Debug)]
pub struct LiveFolder {
    id: RecordId,
    folder: LiveView<FolderRecord>,
    files: LiveView<FileRecord>,
}

impl LiveFolder {
    /// Starts following folder `id` and its files.
    ///
    /// Must be called within a Tokio runtime.
    pub fn activate<S: Session + 'static>(session: Arc<S>, id: RecordId) -> Self {
        let followed = id.clone();
        let folder = LiveView::activate(
            Arc::clone(&session),
            CollectionName::folders(),
            ViewOptions::new().retain(move |r| r.id == followed),
        );
        let files = LiveView::activate(session, CollectionName::files(), ViewOptions::new());
        Self { id, folder, files }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// The folder, or `None` before it loads or after it was deleted.
    pub fn folder(&self) -> Option<FolderRecord> {
        self.folder.snapshot().items.first().cloned()
    }

    /// The folder's files in folder order. Members not (yet) visible are skipped.
    pub fn contents(&self) -> Vec<FileRecord> {
        let Some(folder) = self.folder() else {
            return Vec::new();
        };
        let files = self.files.snapshot();
        let contents: Vec<FileRecord> = folder
            .files
            .iter()
            .filter_map(|id| files.items.iter().find(|f| &f.id == id).cloned())
            .collect();
        debug!(folder = %self.id, members = folder.files.len(), shown = contents.len(), "Folder contents");
        contents
    }

    pub fn status(&self) -> ViewStatus {
        self.folder
            .snapshot()
            .status
            .combine(self.files.snapshot().status)
    }

    /// Waits until the folder or any file changes, returning the contents.
    pub async fn changed(&mut self) -> Option<Vec<FileRecord>> {
        tokio::select! {
            folder = self.folder.changed() => folder.map(drop)?,
            files = self.files.changed() => files.map(drop)?,
        };
        Some(self.contents())
    }

    /// Waits until both views have loaded, returning the first contents.
    pub async fn loaded(&mut self) -> Option<Vec<FileRecord>> {
        self.folder.wait_for(|s| s.status != ViewStatus::Loading).await?;
        self.files.wait_for(|s| s.status != ViewStatus::Loading).await?;
        Some(self.contents())
    }

    /// Next notice about the folder or its files.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        tokio::select! {
            notice = self.folder.next_notice() => notice,
            notice = self.files.next_notice() => notice,
        }
    }

    /// Returns a pending notice without waiting.
    pub fn try_notice(&mut self) -> Option<Notice> {
        self.folder.try_notice().or_else(|| self.files.try_notice())
    }

    pub async fn deactivate(self) {
        self.folder.deactivate().await;
        self.files.deactivate().await;
    }
}
