//! The current user's own profile.

use tracing::{info, instrument};

use super::check_password;
use crate::Result;
use crate::error::InvalidInputError;
use crate::record::{Attachment, RecordFields, UserRecord};
use crate::traits::Session;
use crate::types::RecordId;

/// A password change; the current password is required.
#[derive(Clone)]
pub struct PasswordChange {
    pub old: String,
    pub new: String,
    pub confirm: String,
}

impl std::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordChange([REDACTED])")
    }
}

/// Changes to the current user; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email_visibility: Option<bool>,
    pub rol: Option<RecordId>,
    pub avatar: Option<Attachment>,
    pub password: Option<PasswordChange>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.name.is_none()
            && self.email_visibility.is_none()
            && self.rol.is_none()
            && self.avatar.is_none()
            && self.password.is_none()
    }

    fn into_fields(self) -> Result<RecordFields> {
        let mut fields = RecordFields::new();
        if let Some(username) = self.username {
            fields.insert("username", username);
        }
        if let Some(name) = self.name {
            fields.insert("name", name);
        }
        if let Some(visible) = self.email_visibility {
            fields.insert("emailVisibility", visible);
        }
        if let Some(rol) = self.rol {
            fields.insert("rol", rol.as_str());
        }
        if let Some(change) = self.password {
            check_password(&change.new, &change.confirm)?;
            fields.insert("oldPassword", change.old);
            fields.insert("password", change.new);
            fields.insert("passwordConfirm", change.confirm);
        }
        Ok(match self.avatar {
            Some(avatar) => fields.attach("avatar", avatar),
            None => fields,
        })
    }
}

/// Fetches the current user's record.
pub async fn show<S: Session + ?Sized>(session: &S) -> Result<UserRecord> {
    let me = session.user().id;
    session
        .get_one(session.auth_collection(), &me)
        .await?
        .into_typed()
}

/// Updates the current user; the session's user record is refreshed.
#[instrument(skip(session, update))]
pub async fn update<S: Session + ?Sized>(session: &S, update: ProfileUpdate) -> Result<UserRecord> {
    if update.is_empty() {
        return Err(InvalidInputError::other("nothing to update").into());
    }

    let me = session.user().id;
    let fields = update.into_fields()?;
    let user: UserRecord = session
        .update(session.auth_collection(), &me, &fields)
        .await?
        .into_typed()?;

    info!(user = %user.id, "Profile updated");
    Ok(user)
}
