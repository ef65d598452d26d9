//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use filedeck_core::traits::{Backend, Session};
use filedeck_core::Credentials;

use super::BackendArgs;
use crate::output;
use crate::session::SessionStore;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Username or email to authenticate with
    #[arg(long)]
    pub identity: String,

    /// Account password
    #[arg(long, env = "FILEDECK_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[command(flatten)]
    pub backend: BackendArgs,
}

pub async fn run(args: LoginArgs, store: &SessionStore) -> Result<()> {
    let backend = args.backend.backend()?;
    let collection = args.backend.collection()?;
    let credentials = Credentials::new(&args.identity, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let session = backend
        .authenticate(&collection, credentials)
        .await
        .context("Failed to login")?;

    store.save(&session).context("Failed to save session")?;

    let user = session.user();
    output::success("Logged in successfully");
    println!();
    output::field("User", user.label());
    output::field("Id", user.id.as_str());
    output::field("Backend", session.backend_url().as_str());

    Ok(())
}
