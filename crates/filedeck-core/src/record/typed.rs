//! Typed records for the filedeck collections.

use serde::{Deserialize, Serialize};

use super::generic::{FromRecord, Record, decode};
use super::lenient;
use crate::Result;
use crate::types::{RecordId, Timestamp};

/// An uploaded file (`files` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: RecordId,

    #[serde(default)]
    pub collection_id: String,

    /// Display name chosen by the uploader.
    #[serde(default)]
    pub name: String,

    /// Stored filename of the attachment.
    #[serde(default)]
    pub field: String,

    #[serde(default, deserialize_with = "lenient::optional_id")]
    pub owner: Option<RecordId>,

    /// Users the file is shared with.
    #[serde(default, deserialize_with = "lenient::id_list")]
    pub shared: Vec<RecordId>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created: Option<Timestamp>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated: Option<Timestamp>,
}

impl FileRecord {
    /// The display name, or the stored filename when no name was given.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.field
        } else {
            &self.name
        }
    }
}

impl FromRecord for FileRecord {
    fn from_record(record: Record) -> Result<Self> {
        decode("file", record)
    }
}

/// A folder grouping files (`folders` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: RecordId,

    #[serde(default)]
    pub name: String,

    /// Files in the folder, stored in the `file` relation field.
    #[serde(rename = "file", default, deserialize_with = "lenient::id_list")]
    pub files: Vec<RecordId>,

    #[serde(default, deserialize_with = "lenient::id_list")]
    pub shared: Vec<RecordId>,

    #[serde(default, deserialize_with = "lenient::optional_id")]
    pub owner: Option<RecordId>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created: Option<Timestamp>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated: Option<Timestamp>,
}

impl FromRecord for FolderRecord {
    fn from_record(record: Record) -> Result<Self> {
        decode("folder", record)
    }
}

/// A user account (`users` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: RecordId,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub email_visibility: bool,

    #[serde(default)]
    pub name: String,

    /// Stored filename of the avatar image.
    #[serde(default)]
    pub avatar: String,

    /// Assigned role.
    #[serde(default, deserialize_with = "lenient::optional_id")]
    pub rol: Option<RecordId>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created: Option<Timestamp>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated: Option<Timestamp>,
}

impl UserRecord {
    /// The display name, then the username, then the email.
    pub fn display_name(&self) -> &str {
        [&self.name, &self.username, &self.email]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or(self.id.as_str())
    }
}

impl FromRecord for UserRecord {
    fn from_record(record: Record) -> Result<Self> {
        decode("user", record)
    }
}

/// A role that can be assigned to users (`roles` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RecordId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created: Option<Timestamp>,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub updated: Option<Timestamp>,
}

impl FromRecord for RoleRecord {
    fn from_record(record: Record) -> Result<Self> {
        decode("role", record)
    }
}

/// One row of the file browser: a folder or a file.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Folder(FolderRecord),
    File(FileRecord),
}

impl Entry {
    pub fn id(&self) -> &RecordId {
        match self {
            Entry::Folder(f) => &f.id,
            Entry::File(f) => &f.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Folder(f) => &f.name,
            Entry::File(f) => f.display_name(),
        }
    }

    pub fn updated(&self) -> Option<Timestamp> {
        match self {
            Entry::Folder(f) => f.updated,
            Entry::File(f) => f.updated,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Entry::Folder(_))
    }
}
