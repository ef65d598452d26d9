//! Folder operations.
//!
//! A folder's contents live in its `file` relation; adding and removing
//! files rewrites that list.

use futures_util::future::try_join_all;
use tracing::{debug, instrument};

use super::{files, id_list, typed};
use crate::Result;
use crate::error::InvalidInputError;
use crate::query::ListQuery;
use crate::reconcile::membership;
use crate::record::{FileRecord, FolderRecord, RecordFields};
use crate::traits::Session;
use crate::types::{CollectionName, RecordId};

/// Every folder visible to the session, newest first.
pub async fn list<S: Session + ?Sized>(session: &S) -> Result<Vec<FolderRecord>> {
    let records = session
        .get_full_list(&CollectionName::folders(), &ListQuery::new().sort("-created"))
        .await?;
    typed(records)
}

pub async fn get<S: Session + ?Sized>(session: &S, id: &RecordId) -> Result<FolderRecord> {
    session.get_one(&CollectionName::folders(), id).await?.into_typed()
}

/// Finds a folder by its exact name.
pub async fn find<S: Session + ?Sized>(session: &S, name: &str) -> Result<FolderRecord> {
    session
        .find_by(&CollectionName::folders(), "name", name)
        .await?
        .into_typed()
}

/// Creates an empty, unshared folder owned by the current user.
#[instrument(skip(session))]
pub async fn create<S: Session + ?Sized>(session: &S, name: &str) -> Result<FolderRecord> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InvalidInputError::other("folder name cannot be empty").into());
    }

    let fields = RecordFields::new()
        .set("name", name)
        .set("file", id_list(&[]))
        .set("shared", id_list(&[]))
        .set("owner", session.user().id.as_str());

    session
        .create(&CollectionName::folders(), &fields)
        .await?
        .into_typed()
}

/// Fetches the files of a folder, in folder order.
pub async fn contents<S: Session + ?Sized>(
    session: &S,
    folder: &FolderRecord,
) -> Result<Vec<FileRecord>> {
    debug!(folder = %folder.id, count = folder.files.len(), "Loading folder contents");
    try_join_all(folder.files.iter().map(|id| files::get(session, id))).await
}

/// Adds a file to a folder. A file already in the folder is left alone.
#[instrument(skip(session))]
pub async fn add_file<S: Session + ?Sized>(
    session: &S,
    folder: &RecordId,
    file: &RecordId,
) -> Result<FolderRecord> {
    let mut current = get(session, folder).await?;
    if !membership::add(&mut current.files, file.clone()) {
        return Ok(current);
    }
    set_files(session, folder, &current.files).await
}

/// Removes a file from a folder; the file itself is kept.
#[instrument(skip(session))]
pub async fn remove_file<S: Session + ?Sized>(
    session: &S,
    folder: &RecordId,
    file: &RecordId,
) -> Result<FolderRecord> {
    let mut current = get(session, folder).await?;
    if !membership::remove(&mut current.files, file) {
        return Ok(current);
    }
    set_files(session, folder, &current.files).await
}

/// Shares a folder with `user`, or stops sharing it if already shared.
pub async fn toggle_share<S: Session + ?Sized>(
    session: &S,
    folder: &RecordId,
    user: &RecordId,
) -> Result<FolderRecord> {
    let mut current = get(session, folder).await?;
    membership::toggle(&mut current.shared, user.clone());
    let fields = RecordFields::new().set("shared", id_list(&current.shared));
    session
        .update(&CollectionName::folders(), folder, &fields)
        .await?
        .into_typed()
}

pub async fn delete<S: Session + ?Sized>(session: &S, id: &RecordId) -> Result<()> {
    session.delete(&CollectionName::folders(), id).await
}

async fn set_files<S: Session + ?Sized>(
    session: &S,
    folder: &RecordId,
    files: &[RecordId],
) -> Result<FolderRecord> {
    let fields = RecordFields::new().set("file", id_list(files));
    session
        .update(&CollectionName::folders(), folder, &fields)
        .await?
        .into_typed()
}
