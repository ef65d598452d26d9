//! Filesystem storage for the file-backed backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! collections/<collection>/<id>.json   record JSON
//! storage/<collection>/<id>/<file>     attached files
//! auth/<collection>/<id>.json          password hash of auth records
//! changes.jsonl                        append-only change log
//! changes.lock                         writer lock for the log
//! ```

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use filedeck_core::error::{ProtocolError, TransportError};
use filedeck_core::types::{CollectionName, RecordId};
use filedeck_core::{ChangeAction, RawChange, Record, Result};

fn map_io(context: &Path, err: std::io::Error) -> TransportError {
    TransportError::Io {
        message: format!("{}: {}", context.display(), err),
    }
}

/// Credentials stored for a record of an auth collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthEntry {
    /// Password hash (bcrypt).
    pub password_hash: String,
}

/// Filesystem-backed storage.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a new file store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &CollectionName) -> PathBuf {
        self.root.join("collections").join(collection.as_str())
    }

    fn record_path(&self, collection: &CollectionName, id: &RecordId) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", id))
    }

    fn auth_path(&self, collection: &CollectionName, id: &RecordId) -> PathBuf {
        self.root
            .join("auth")
            .join(collection.as_str())
            .join(format!("{}.json", id))
    }

    /// Directory holding the files attached to one record.
    pub fn storage_dir(&self, collection: &str, id: &RecordId) -> PathBuf {
        self.root.join("storage").join(collection).join(id.as_str())
    }

    /// Get the change log path.
    pub(crate) fn changes_path(&self) -> PathBuf {
        self.root.join("changes.jsonl")
    }

    fn changes_lock_path(&self) -> PathBuf {
        self.root.join("changes.lock")
    }

    /// Generate a record id: 15 lowercase alphanumerics.
    pub(crate) fn generate_id() -> Result<RecordId> {
        let hex = Uuid::new_v4().simple().to_string();
        RecordId::new(&hex[..RecordId::GENERATED_LEN])
    }

    /// Length of the change log, where a new reader starts.
    pub(crate) fn changes_len(&self) -> u64 {
        fs::metadata(self.changes_path()).map_or(0, |m| m.len())
    }

    /// Append a change to the log under the writer lock.
    fn append_change(&self, change: &RawChange) -> Result<()> {
        let changes_path = self.changes_path();
        let lock_path = self.changes_lock_path();

        fs::create_dir_all(&self.root).map_err(|e| map_io(&self.root, e))?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| map_io(&lock_path, e))?;

        lock_file
            .lock_exclusive()
            .map_err(|e| map_io(&lock_path, e))?;

        let line = serde_json::to_string(change)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&changes_path)
            .map_err(|e| map_io(&changes_path, e))?;

        writeln!(file, "{}", line).map_err(|e| map_io(&changes_path, e))?;
        file.sync_data().map_err(|e| map_io(&changes_path, e))?;

        lock_file.unlock().map_err(|e| map_io(&lock_path, e))?;

        Ok(())
    }

    /// Write via a temporary file so readers never see a partial record.
    fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| map_io(parent, e))?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(|e| map_io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| map_io(path, e))?;
        Ok(())
    }

    // ========================================================================
    // Records
    // ========================================================================

    pub fn get(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        let path = self.record_path(collection, id);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ProtocolError::not_found(format!("{} record {}", collection, id)).into());
            }
            Err(e) => return Err(map_io(&path, e).into()),
        };

        Ok(serde_json::from_str(&content)?)
    }

    pub fn exists(&self, collection: &CollectionName, id: &RecordId) -> bool {
        self.record_path(collection, id).exists()
    }

    /// Every record of a collection, in no particular order.
    #[instrument(skip(self))]
    pub fn list(&self, collection: &CollectionName) -> Result<Vec<Record>> {
        let dir = self.collection_dir(collection);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_io(&dir, e).into()),
        };

        let mut records = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| map_io(&path, e))?;
            match serde_json::from_str::<Record>(&content) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable record"),
            }
        }

        debug!(count = records.len(), "Listed records");
        Ok(records)
    }

    /// Writes a record and logs the change.
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub fn put(
        &self,
        collection: &CollectionName,
        record: &Record,
        action: ChangeAction,
    ) -> Result<()> {
        let content = serde_json::to_vec_pretty(record)?;
        Self::write_atomic(&self.record_path(collection, &record.id), &content)?;
        self.append_change(&RawChange::new(action, record.clone()))?;

        debug!(%action, "Stored record");
        Ok(())
    }

    /// Removes a record with its files and credentials, and logs the change.
    #[instrument(skip(self))]
    pub fn remove(&self, collection: &CollectionName, id: &RecordId) -> Result<Record> {
        let record = self.get(collection, id)?;

        let path = self.record_path(collection, id);
        fs::remove_file(&path).map_err(|e| map_io(&path, e))?;

        let storage = self.storage_dir(collection.as_str(), id);
        if storage.exists() {
            fs::remove_dir_all(&storage).map_err(|e| map_io(&storage, e))?;
        }
        let auth = self.auth_path(collection, id);
        if auth.exists() {
            fs::remove_file(&auth).map_err(|e| map_io(&auth, e))?;
        }

        self.append_change(&RawChange::new(ChangeAction::Delete, record.clone()))?;

        debug!("Deleted record");
        Ok(record)
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Stores an attached file and returns its stored name.
    ///
    /// Stored names get a random suffix, `report.pdf` becoming
    /// `report_k3j2h1g0f9.pdf`, so uploads never overwrite each other.
    pub fn write_file(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let stored = stored_name(filename);
        let path = self.storage_dir(collection.as_str(), id).join(&stored);
        Self::write_atomic(&path, bytes)?;
        debug!(file = %stored, size = bytes.len(), "Stored file");
        Ok(stored)
    }

    /// Deletes a stored file; a missing file is not an error.
    pub fn remove_file(&self, collection: &CollectionName, id: &RecordId, stored: &str) {
        let path = self.storage_dir(collection.as_str(), id).join(stored);
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "Failed to remove replaced file");
        }
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    pub(crate) fn auth_entry(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<AuthEntry>> {
        let path = self.auth_path(collection, id);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io(&path, e).into()),
        }
    }

    pub(crate) fn set_auth_entry(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        entry: &AuthEntry,
    ) -> Result<()> {
        let content = serde_json::to_vec_pretty(entry)?;
        Self::write_atomic(&self.auth_path(collection, id), &content)
    }

    /// Returns true if any record of `collection` has credentials.
    pub(crate) fn is_auth_collection(&self, collection: &CollectionName) -> bool {
        self.root.join("auth").join(collection.as_str()).is_dir()
    }
}

/// Makes an uploaded file name safe to store and unique.
fn stored_name(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };

    let stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let suffix = &Uuid::new_v4().simple().to_string()[..10];

    match ext {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_lowercase()),
        None => format!("{}_{}", stem, suffix),
    }
}
