//! Role administration.

use crate::Result;
use crate::error::InvalidInputError;
use crate::query::ListQuery;
use crate::record::{RecordFields, RoleRecord};
use crate::traits::Session;
use crate::types::{CollectionName, RecordId};

use super::typed;

/// Fields of a role form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleInput {
    pub name: String,
    pub description: String,
}

impl RoleInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    fn into_fields(self) -> Result<RecordFields> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(InvalidInputError::other("role name cannot be empty").into());
        }
        Ok(RecordFields::new()
            .set("name", name)
            .set("description", self.description))
    }
}

/// Every role, newest first.
pub async fn list<S: Session + ?Sized>(session: &S) -> Result<Vec<RoleRecord>> {
    let records = session
        .get_full_list(&CollectionName::roles(), &ListQuery::new().sort("-created"))
        .await?;
    typed(records)
}

pub async fn get<S: Session + ?Sized>(session: &S, id: &RecordId) -> Result<RoleRecord> {
    session.get_one(&CollectionName::roles(), id).await?.into_typed()
}

pub async fn create<S: Session + ?Sized>(session: &S, input: RoleInput) -> Result<RoleRecord> {
    session
        .create(&CollectionName::roles(), &input.into_fields()?)
        .await?
        .into_typed()
}

pub async fn update<S: Session + ?Sized>(
    session: &S,
    id: &RecordId,
    input: RoleInput,
) -> Result<RoleRecord> {
    session
        .update(&CollectionName::roles(), id, &input.into_fields()?)
        .await?
        .into_typed()
}

pub async fn delete<S: Session + ?Sized>(session: &S, id: &RecordId) -> Result<()> {
    session.delete(&CollectionName::roles(), id).await
}
