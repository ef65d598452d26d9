//! Profile commands for the logged-in user.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};

use filedeck_core::ops::profile::{self, PasswordChange, ProfileUpdate};

use super::{attachment, record_id};
use crate::output;
use crate::session::SessionStore;

#[derive(Args, Debug)]
pub struct ProfileCommand {
    #[command(subcommand)]
    pub command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ProfileSubcommand {
    /// Show your profile
    Show {
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update your profile
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(long)]
    pub username: Option<String>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Whether other users may see your email
    #[arg(long)]
    pub email_visibility: Option<bool>,

    /// Role id
    #[arg(long)]
    pub rol: Option<String>,

    /// Avatar image
    #[arg(long)]
    pub avatar: Option<PathBuf>,

    /// Current password, required to set a new one
    #[arg(long, requires = "new_password")]
    pub old_password: Option<String>,

    /// New password, at least 8 characters
    #[arg(long, requires_all = ["old_password", "password_confirm"])]
    pub new_password: Option<String>,

    /// Must repeat --new-password
    #[arg(long, requires = "new_password")]
    pub password_confirm: Option<String>,
}

pub async fn handle(cmd: ProfileCommand, store: &SessionStore) -> Result<()> {
    let session = store.require().await?;

    match cmd.command {
        ProfileSubcommand::Show { json } => {
            let me = profile::show(&session)
                .await
                .context("Failed to load profile")?;
            if json {
                return output::json_pretty(&me);
            }
            output::field("Username", &me.username);
            output::field("Name", &me.name);
            output::field("Email", &me.email);
            output::field("Email visible", &me.email_visibility.to_string());
            output::field("Role", me.rol.as_ref().map_or("-", |r| r.as_str()));
            if !me.avatar.is_empty() {
                output::field("Avatar", &me.avatar);
            }
        }
        ProfileSubcommand::Update(args) => {
            let password = match (args.old_password, args.new_password, args.password_confirm) {
                (Some(old), Some(new), Some(confirm)) => Some(PasswordChange { old, new, confirm }),
                (None, None, None) => None,
                _ => bail!("A password change needs --old-password, --new-password and --password-confirm"),
            };
            let changes_password = password.is_some();

            let update = ProfileUpdate {
                username: args.username,
                name: args.name,
                email_visibility: args.email_visibility,
                rol: args.rol.as_deref().map(record_id).transpose()?,
                avatar: args.avatar.as_deref().map(attachment).transpose()?,
                password,
            };
            if update.is_empty() {
                bail!("Nothing to update");
            }

            let me = profile::update(&session, update)
                .await
                .context("Failed to update profile")?;

            // A new password invalidates the stored token.
            if changes_password {
                store.clear()?;
                output::success("Password changed");
                output::hint("Log in again with the new password.");
            } else {
                store.save(&session).context("Failed to save session")?;
                output::success(&format!("Updated profile of {}", me.username));
            }
        }
    }

    Ok(())
}
