//! Subcommand implementations.

mod files;
mod folders;
mod login;
mod logout;
mod profile;
mod records;
mod register;
mod roles;
mod users;
mod watch;
mod whoami;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use filedeck_core::types::{BackendUrl, CollectionName, RecordId};
use filedeck_core::Attachment;

use crate::session::{CliBackend, SessionStore};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new session (login)
    Login(login::LoginArgs),

    /// Forget the active session
    Logout(logout::LogoutArgs),

    /// Display the active session
    Whoami(whoami::WhoamiArgs),

    /// Create a new account
    Register(register::RegisterArgs),

    /// Raw record operations on any collection
    Records(records::RecordsCommand),

    /// Browse, upload, share and delete files
    Files(files::FilesCommand),

    /// Create folders and manage their contents
    Folders(folders::FoldersCommand),

    /// Manage user accounts
    Users(users::UsersCommand),

    /// Manage roles
    Roles(roles::RolesCommand),

    /// Show or update your own profile
    Profile(profile::ProfileCommand),

    /// Follow a collection live
    Watch(watch::WatchArgs),
}

pub async fn handle(cmd: Command, store: &SessionStore) -> Result<()> {
    match cmd {
        Command::Login(args) => login::run(args, store).await,
        Command::Logout(args) => logout::run(args, store),
        Command::Whoami(args) => whoami::run(args, store).await,
        Command::Register(args) => register::run(args).await,
        Command::Records(cmd) => records::handle(cmd, store).await,
        Command::Files(cmd) => files::handle(cmd, store).await,
        Command::Folders(cmd) => folders::handle(cmd, store).await,
        Command::Users(cmd) => users::handle(cmd, store).await,
        Command::Roles(cmd) => roles::handle(cmd, store).await,
        Command::Profile(cmd) => profile::handle(cmd, store).await,
        Command::Watch(args) => watch::run(args, store).await,
    }
}

/// Where to find the backend, for commands that run without a session.
#[derive(Args, Debug)]
pub struct BackendArgs {
    /// Backend URL: https://host for a hosted backend, file:///path for a local store
    #[arg(long, env = "FILEDECK_URL")]
    pub url: String,

    /// Auth collection holding the accounts
    #[arg(long, env = "FILEDECK_AUTH_COLLECTION", default_value = "users")]
    pub collection: String,
}

impl BackendArgs {
    pub fn backend(&self) -> Result<CliBackend> {
        let url = BackendUrl::new(&self.url).context("Invalid backend URL")?;
        CliBackend::new(url).context("Unsupported backend URL")
    }

    pub fn collection(&self) -> Result<CollectionName> {
        CollectionName::new(&self.collection).context("Invalid auth collection")
    }
}

pub(crate) fn record_id(s: &str) -> Result<RecordId> {
    RecordId::new(s).with_context(|| format!("Invalid record id '{}'", s))
}

pub(crate) fn record_ids(ids: &[String]) -> Result<Vec<RecordId>> {
    ids.iter().map(|s| record_id(s)).collect()
}

pub(crate) fn attachment(path: &Path) -> Result<Attachment> {
    Attachment::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}
