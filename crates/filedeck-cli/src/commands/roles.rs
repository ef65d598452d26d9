//! Role administration commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use filedeck_core::ops::roles::{self, RoleInput};

use super::record_id;
use crate::output;
use crate::session::SessionStore;

#[derive(Args, Debug)]
pub struct RolesCommand {
    #[command(subcommand)]
    pub command: RolesSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RolesSubcommand {
    /// List roles, newest first
    List,

    /// Create a role
    Create(RoleArgs),

    /// Replace a role's name and description
    Update {
        id: String,

        #[command(flatten)]
        role: RoleArgs,
    },

    /// Delete a role
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct RoleArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,
}

impl From<RoleArgs> for RoleInput {
    fn from(args: RoleArgs) -> Self {
        RoleInput::new(args.name, args.description)
    }
}

pub async fn handle(cmd: RolesCommand, store: &SessionStore) -> Result<()> {
    let session = store.require().await?;

    match cmd.command {
        RolesSubcommand::List => {
            let all = roles::list(&session)
                .await
                .context("Failed to list roles")?;
            if all.is_empty() {
                output::hint("No roles yet.");
            }
            for role in &all {
                println!(
                    "{}  {}  {}",
                    role.id.as_str().dimmed(),
                    role.name,
                    role.description.dimmed()
                );
            }
        }
        RolesSubcommand::Create(args) => {
            let role = roles::create(&session, args.into())
                .await
                .context("Failed to create role")?;
            output::success(&format!("Created role {}", role.name));
            output::field("Id", role.id.as_str());
        }
        RolesSubcommand::Update { id, role } => {
            let role = roles::update(&session, &record_id(&id)?, role.into())
                .await
                .context("Failed to update role")?;
            output::success(&format!("Updated role {}", role.name));
        }
        RolesSubcommand::Delete { id } => {
            roles::delete(&session, &record_id(&id)?)
                .await
                .context("Failed to delete role")?;
            output::success(&format!("Deleted role {}", id));
        }
    }

    Ok(())
}
