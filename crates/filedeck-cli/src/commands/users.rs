//! User administration commands.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;

use filedeck_core::ops::users::{self, NewUser, UserUpdate};

use super::{attachment, record_id};
use crate::output;
use crate::session::SessionStore;

#[derive(Args, Debug)]
pub struct UsersCommand {
    #[command(subcommand)]
    pub command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum UsersSubcommand {
    /// List users with their role
    List {
        /// Output users as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Create a user
    Create(CreateArgs),

    /// Update a user
    Update(UpdateArgs),

    /// Delete a user
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub email: String,

    #[arg(long, default_value = "")]
    pub name: String,

    /// At least 8 characters
    #[arg(long)]
    pub password: String,

    /// Must repeat --password
    #[arg(long)]
    pub password_confirm: String,

    /// Role id
    #[arg(long)]
    pub rol: Option<String>,

    /// Avatar image
    #[arg(long)]
    pub avatar: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    /// Role id
    #[arg(long, conflicts_with = "no_rol")]
    pub rol: Option<String>,

    /// Clear the role
    #[arg(long)]
    pub no_rol: bool,

    /// Avatar image
    #[arg(long)]
    pub avatar: Option<PathBuf>,
}

pub async fn handle(cmd: UsersCommand, store: &SessionStore) -> Result<()> {
    let session = store.require().await?;

    match cmd.command {
        UsersSubcommand::List { json } => {
            let rows = users::list(&session)
                .await
                .context("Failed to list users")?;
            for row in &rows {
                if json {
                    output::json(&row.user)?;
                    continue;
                }
                println!(
                    "{}  {}  {}  {}",
                    row.user.id.as_str().dimmed(),
                    row.user.username,
                    row.user.email.dimmed(),
                    row.role_label()
                );
            }
        }
        UsersSubcommand::Create(args) => {
            let user = NewUser {
                username: args.username,
                email: args.email,
                name: args.name,
                password: args.password,
                password_confirm: args.password_confirm,
                rol: args.rol.as_deref().map(record_id).transpose()?,
                avatar: args.avatar.as_deref().map(attachment).transpose()?,
            };
            let user = users::create(&session, user)
                .await
                .context("Failed to create user")?;
            output::success(&format!("Created user {}", user.username));
            output::field("Id", user.id.as_str());
        }
        UsersSubcommand::Update(args) => {
            let rol = if args.no_rol {
                Some(None)
            } else {
                args.rol.as_deref().map(record_id).transpose()?.map(Some)
            };
            let update = UserUpdate {
                username: args.username,
                email: args.email,
                name: args.name,
                rol,
                avatar: args.avatar.as_deref().map(attachment).transpose()?,
            };
            if update.is_empty() {
                bail!("Nothing to update");
            }

            let user = users::update(&session, &record_id(&args.id)?, update)
                .await
                .context("Failed to update user")?;
            output::success(&format!("Updated user {}", user.username));
        }
        UsersSubcommand::Delete { id } => {
            users::delete(&session, &record_id(&id)?)
                .await
                .context("Failed to delete user")?;
            output::success(&format!("Deleted user {}", id));
        }
    }

    Ok(())
}
