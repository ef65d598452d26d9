//! Register command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use filedeck_core::ops::users::{self, NewUser};

use super::{BackendArgs, attachment, record_id};
use crate::output;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub email: String,

    /// Display name
    #[arg(long, default_value = "")]
    pub name: String,

    /// At least 8 characters
    #[arg(long, env = "FILEDECK_PASSWORD", hide_env_values = true)]
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

    #[command(flatten)]
    pub backend: BackendArgs,
}

pub async fn run(args: RegisterArgs) -> Result<()> {
    let backend = args.backend.backend()?;
    let collection = args.backend.collection()?;

    let user = NewUser {
        username: args.username,
        email: args.email,
        name: args.name,
        password: args.password,
        password_confirm: args.password_confirm,
        rol: args.rol.as_deref().map(record_id).transpose()?,
        avatar: args.avatar.as_deref().map(attachment).transpose()?,
    };

    let user = users::register(&backend, &collection, user)
        .await
        .context("Failed to register")?;

    output::success(&format!("Account {} created", user.username));
    output::field("Id", user.id.as_str());
    output::hint("Run 'filedeck login' to start a session.");

    Ok(())
}
