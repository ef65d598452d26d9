//! User administration and sign-up.

use std::collections::HashMap;

use tracing::instrument;

use super::{check_password, typed};
use crate::Result;
use crate::query::ListQuery;
use crate::record::{Attachment, RecordFields, RoleRecord, UserRecord};
use crate::traits::{Backend, Session};
use crate::types::{CollectionName, RecordId};

/// Shown for users without a role, or whose role no longer exists.
pub const NO_ROLE: &str = "no role";

/// A new account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub password_confirm: String,
    pub rol: Option<RecordId>,
    pub avatar: Option<Attachment>,
}

impl NewUser {
    fn into_fields(self) -> Result<RecordFields> {
        check_password(&self.password, &self.password_confirm)?;

        let mut fields = RecordFields::new()
            .set("username", self.username)
            .set("email", self.email)
            .set("emailVisibility", true)
            .set("name", self.name)
            .set("password", self.password)
            .set("passwordConfirm", self.password_confirm);
        if let Some(rol) = self.rol {
            fields.insert("rol", rol.as_str());
        }
        if let Some(avatar) = self.avatar {
            fields = fields.attach("avatar", avatar);
        }
        Ok(fields)
    }
}

/// Changes to an existing user; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    /// `Some(None)` clears the role.
    pub rol: Option<Option<RecordId>>,
    pub avatar: Option<Attachment>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.name.is_none()
            && self.rol.is_none()
            && self.avatar.is_none()
    }

    pub(crate) fn into_fields(self) -> RecordFields {
        let mut fields = RecordFields::new();
        if let Some(username) = self.username {
            fields.insert("username", username);
        }
        if let Some(email) = self.email {
            fields.insert("email", email);
        }
        if let Some(name) = self.name {
            fields.insert("name", name);
        }
        if let Some(rol) = self.rol {
            fields.insert("rol", rol.as_ref().map_or("", RecordId::as_str));
        }
        match self.avatar {
            Some(avatar) => fields.attach("avatar", avatar),
            None => fields,
        }
    }
}

/// A user together with the name of their role.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user: UserRecord,
    pub role: Option<String>,
}

impl UserRow {
    /// The role name, or [`NO_ROLE`].
    pub fn role_label(&self) -> &str {
        self.role.as_deref().unwrap_or(NO_ROLE)
    }
}

/// Joins users with role names.
pub fn with_roles(users: Vec<UserRecord>, roles: &[RoleRecord]) -> Vec<UserRow> {
    let names: HashMap<&RecordId, &str> = roles.iter().map(|r| (&r.id, r.name.as_str())).collect();
    users
        .into_iter()
        .map(|user| {
            let role = user
                .rol
                .as_ref()
                .and_then(|id| names.get(id))
                .map(|name| name.to_string());
            UserRow { user, role }
        })
        .collect()
}

/// Every user with their role name.
pub async fn list<S: Session + ?Sized>(session: &S) -> Result<Vec<UserRow>> {
    let users: Vec<UserRecord> = typed(
        session
            .get_full_list(&CollectionName::users(), &ListQuery::new())
            .await?,
    )?;
    let roles = super::roles::list(session).await?;
    Ok(with_roles(users, &roles))
}

pub async fn get<S: Session + ?Sized>(session: &S, id: &RecordId) -> Result<UserRecord> {
    session.get_one(&CollectionName::users(), id).await?.into_typed()
}

/// Creates a user on behalf of an administrator.
#[instrument(skip(session, user), fields(username = %user.username))]
pub async fn create<S: Session + ?Sized>(session: &S, user: NewUser) -> Result<UserRecord> {
    session
        .create(&CollectionName::users(), &user.into_fields()?)
        .await?
        .into_typed()
}

/// Signs up a new account without a session.
#[instrument(skip(backend, user), fields(username = %user.username))]
pub async fn register<B: Backend + ?Sized>(
    backend: &B,
    collection: &CollectionName,
    user: NewUser,
) -> Result<UserRecord> {
    backend
        .register(collection, &user.into_fields()?)
        .await?
        .into_typed()
}

pub async fn update<S: Session + ?Sized>(
    session: &S,
    id: &RecordId,
    update: UserUpdate,
) -> Result<UserRecord> {
    session
        .update(&CollectionName::users(), id, &update.into_fields())
        .await?
        .into_typed()
}

pub async fn delete<S: Session + ?Sized>(session: &S, id: &RecordId) -> Result<()> {
    session.delete(&CollectionName::users(), id).await
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
    async fn list_joins_role_names() {
        let session = MemorySession::new("me");
        session.seed("roles", json!({ "id": "r1", "name": "Admin" }));
        session.seed("users", json!({ "id": "ana", "username": "ana", "rol": "r1" }));
        session.seed("users", json!({ "id": "bo", "username": "bo", "rol": "gone" }));

        let rows = list(&session).await.unwrap();
        let labels: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.user.id.as_str(), r.role_label()))
            .collect();

        assert_eq!(labels, [("me", NO_ROLE), ("ana", "Admin"), ("bo", NO_ROLE)]);
    }

    #[tokio::test]
    async fn create_checks_password_confirmation() {
        let session = MemorySession::new("me");
        let user = NewUser {
            username: "ana".into(),
            email: "ana@example.com".into(),
            password: "longenough".into(),
            password_confirm: "different1".into(),
            ..Default::default()
        };

        assert!(create(&session, user).await.is_err());
        assert_eq!(session.all("users").len(), 1);
    }

    #[tokio::test]
    async fn create_never_stores_password() {
        let session = MemorySession::new("me");
        let user = NewUser {
            username: "ana".into(),
            password: "longenough".into(),
            password_confirm: "longenough".into(),
            rol: Some(id("r1")),
            ..Default::default()
        };

        let created = create(&session, user).await.unwrap();
        assert_eq!(created.username, "ana");
        assert_eq!(created.rol, Some(id("r1")));
        assert!(session.all("users")[1].get("password").is_none());
    }

    #[test]
    fn update_clears_role_with_empty_string() {
        let fields = UserUpdate {
            rol: Some(None),
            ..Default::default()
        }
        .into_fields();
        assert_eq!(fields.get("rol"), Some(&json!("")));
        assert!(fields.get("username").is_none());
    }
}
