//! File operations: browsing, upload, sharing, links and deletion.

use tracing::{debug, instrument};
use url::Url;

use super::{folders, id_list, typed};
use crate::Result;
use crate::query::{ListQuery, eq, has, ne};
use crate::reconcile::{bounded_recent, membership};
use crate::record::{Attachment, Entry, FileRecord, FolderRecord, RecordFields, UserRecord};
use crate::traits::Session;
use crate::types::{CollectionName, RecordId};

/// File field holding the uploaded attachment.
pub const FILE_FIELD: &str = "field";

/// Number of entries in the "recent files" list.
pub const RECENT_LIMIT: usize = 4;

/// A file to upload.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub attachment: Attachment,
    /// Display name; defaults to the attachment's filename.
    pub name: Option<String>,
    /// Folder to add the new file to.
    pub folder: Option<RecordId>,
}

impl NewFile {
    pub fn new(attachment: Attachment) -> Self {
        Self {
            attachment,
            name: None,
            folder: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn in_folder(mut self, folder: RecordId) -> Self {
        self.folder = Some(folder);
        self
    }
}

/// The file browser: folders, files, and the most recently updated files.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub folders: Vec<FolderRecord>,
    pub files: Vec<FileRecord>,
    pub recent: Vec<FileRecord>,
}

impl Listing {
    /// Folders first, then files.
    pub fn entries(&self) -> Vec<Entry> {
        self.folders
            .iter()
            .cloned()
            .map(Entry::Folder)
            .chain(self.files.iter().cloned().map(Entry::File))
            .collect()
    }
}

/// Every file visible to the session, newest first.
pub async fn list<S: Session + ?Sized>(session: &S) -> Result<Vec<FileRecord>> {
    let records = session
        .get_full_list(&CollectionName::files(), &ListQuery::new().sort("-created"))
        .await?;
    typed(records)
}

/// Loads the file browser.
#[instrument(skip(session))]
pub async fn browse<S: Session + ?Sized>(session: &S) -> Result<Listing> {
    let files = list(session).await?;
    let folders = folders::list(session).await?;
    let recent = bounded_recent(&files, RECENT_LIMIT);

    debug!(files = files.len(), folders = folders.len(), "Loaded file browser");
    Ok(Listing {
        folders,
        files,
        recent,
    })
}

/// Files shared with the current user by someone else.
pub async fn shared_with_me<S: Session + ?Sized>(session: &S) -> Result<Vec<FileRecord>> {
    let me = session.user().id;
    let filter = format!("{} && {}", has("shared", me.as_str()), ne("owner", me.as_str()));
    let records = session
        .get_full_list(
            &CollectionName::files(),
            &ListQuery::new().sort("-created").filter(filter),
        )
        .await?;

    // Enforced locally as well, for backends that ignore part of the filter.
    Ok(typed::<FileRecord>(records)?
        .into_iter()
        .filter(|f| f.shared.contains(&me) && f.owner.as_ref() != Some(&me))
        .collect())
}

/// Files owned by the current user.
pub async fn owned<S: Session + ?Sized>(session: &S) -> Result<Vec<FileRecord>> {
    let me = session.user().id;
    let records = session
        .get_full_list(
            &CollectionName::files(),
            &ListQuery::new().sort("-created").filter(eq("owner", me.as_str())),
        )
        .await?;
    typed(records)
}

pub async fn get<S: Session + ?Sized>(session: &S, id: &RecordId) -> Result<FileRecord> {
    session.get_one(&CollectionName::files(), id).await?.into_typed()
}

/// Uploads a file owned by, and shared with, the current user.
///
/// When a folder is given the file is appended to it afterwards.
#[instrument(skip(session, upload), fields(filename = %upload.attachment.filename))]
pub async fn upload<S: Session + ?Sized>(session: &S, upload: NewFile) -> Result<FileRecord> {
    let me = session.user().id;
    let name = upload
        .name
        .unwrap_or_else(|| upload.attachment.filename.clone());

    let fields = RecordFields::new()
        .set("name", name)
        .set("owner", me.as_str())
        .set("shared", id_list(std::slice::from_ref(&me)))
        .attach(FILE_FIELD, upload.attachment);

    let file: FileRecord = session
        .create(&CollectionName::files(), &fields)
        .await?
        .into_typed()?;

    if let Some(folder) = upload.folder {
        folders::add_file(session, &folder, &file.id).await?;
    }

    Ok(file)
}

/// Replaces the users a file is shared with.
pub async fn set_shared<S: Session + ?Sized>(
    session: &S,
    id: &RecordId,
    users: &[RecordId],
) -> Result<FileRecord> {
    let fields = RecordFields::new().set("shared", id_list(users));
    session
        .update(&CollectionName::files(), id, &fields)
        .await?
        .into_typed()
}

/// Shares a file with `user`, or stops sharing it if already shared.
pub async fn toggle_share<S: Session + ?Sized>(
    session: &S,
    id: &RecordId,
    user: &RecordId,
) -> Result<FileRecord> {
    let mut file = get(session, id).await?;
    membership::toggle(&mut file.shared, user.clone());
    set_shared(session, id, &file.shared).await
}

/// Users a file can be shared with, newest first.
pub async fn share_candidates<S: Session + ?Sized>(session: &S) -> Result<Vec<UserRecord>> {
    let records = session
        .get_full_list(&CollectionName::users(), &ListQuery::new().sort("-created"))
        .await?;
    typed(records)
}

/// Download URL of a file, authorized with the session token.
pub fn link<S: Session + ?Sized>(session: &S, file: &FileRecord) -> Result<Url> {
    let collection = if file.collection_id.is_empty() {
        CollectionName::files().to_string()
    } else {
        file.collection_id.clone()
    };
    session.file_url_for(&collection, &file.id, &file.field)
}

pub async fn delete<S: Session + ?Sized>(session: &S, id: &RecordId) -> Result<()> {
    session.delete(&CollectionName::files(), id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::MemorySession;
    use serde_json::json;

    fn id(s: &str) -> RecordId {
        RecordId::new(s).unwrap()
    }

    #[tokio::test]
    async fn upload_sets_owner_and_shares_with_uploader() {
        let session = MemorySession::new("me");
        let file = upload(
            &session,
            NewFile::new(Attachment::new("report.pdf", b"%PDF".to_vec())),
        )
        .await
        .unwrap();

        assert_eq!(file.name, "report.pdf");
        assert_eq!(file.field, "report.pdf");
        assert_eq!(file.owner, Some(id("me")));
        assert_eq!(file.shared, vec![id("me")]);
    }

    #[tokio::test]
    async fn upload_into_folder_appends_membership() {
        let session = MemorySession::new("me");
        session.seed("folders", json!({ "id": "d1", "name": "Docs", "file": ["old"] }));

        let file = upload(
            &session,
            NewFile::new(Attachment::new("a.txt", b"a".to_vec()))
                .named("Notes")
                .in_folder(id("d1")),
        )
        .await
        .unwrap();

        let folder = folders::get(&session, &id("d1")).await.unwrap();
        assert_eq!(file.name, "Notes");
        assert_eq!(folder.files, vec![id("old"), file.id]);
    }

    #[tokio::test]
    async fn browse_lists_recent_by_update_time() {
        let session = MemorySession::new("me");
        for (i, ts) in ["01", "05", "03", "02", "04"].iter().enumerate() {
            session.seed(
                "files",
                json!({ "id": format!("f{}", i), "updated": format!("2024-01-01 00:00:{}.000Z", ts) }),
            );
        }
        session.seed("folders", json!({ "id": "d1", "name": "Docs" }));

        let listing = browse(&session).await.unwrap();
        let recent: Vec<&str> = listing.recent.iter().map(|f| f.id.as_str()).collect();

        assert_eq!(recent, ["f1", "f4", "f2", "f3"]);
        assert_eq!(listing.entries().len(), 6);
        assert!(listing.entries()[0].is_folder());
    }

    #[tokio::test]
    async fn shared_with_me_excludes_own_files() {
        let session = MemorySession::new("me");
        session.seed("files", json!({ "id": "mine", "owner": "me", "shared": ["me"] }));
        session.seed("files", json!({ "id": "theirs", "owner": "ana", "shared": ["ana", "me"] }));
        session.seed("files", json!({ "id": "private", "owner": "ana", "shared": ["ana"] }));

        let files = shared_with_me(&session).await.unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["theirs"]);

        let requests = session.requests.lock().unwrap();
        assert!(requests[0].contains(r#"shared ?= "me" && owner != "me""#));
    }

    #[tokio::test]
    async fn toggle_share_adds_then_removes() {
        let session = MemorySession::new("me");
        session.seed("files", json!({ "id": "f1", "owner": "me", "shared": ["me"] }));

        let file = toggle_share(&session, &id("f1"), &id("ana")).await.unwrap();
        assert_eq!(file.shared, vec![id("me"), id("ana")]);

        let file = toggle_share(&session, &id("f1"), &id("ana")).await.unwrap();
        assert_eq!(file.shared, vec![id("me")]);
    }

    #[tokio::test]
    async fn link_carries_token() {
        let session = MemorySession::new("me");
        session.seed(
            "files",
            json!({ "id": "f1", "collectionId": "pbc_files", "field": "a_x1.txt" }),
        );
        let file = get(&session, &id("f1")).await.unwrap();

        let url = link(&session, &file).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8090/api/files/pbc_files/f1/a_x1.txt?token=memory-token"
        );
    }
}
