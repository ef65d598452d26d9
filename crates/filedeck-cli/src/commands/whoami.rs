//! Whoami command implementation.

use anyhow::Result;
use clap::Args;

use filedeck_core::traits::Session;

use crate::output;
use crate::session::SessionStore;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the stored user record as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs, store: &SessionStore) -> Result<()> {
    let session = store.require().await?;
    let user = session.user();

    if args.json {
        return output::json_pretty(&user);
    }

    output::field("User", user.label());
    output::field("Id", user.id.as_str());
    if let Some(email) = user.get_str("email").filter(|e| !e.is_empty()) {
        output::field("Email", email);
    }
    output::field("Collection", session.auth_collection().as_str());
    output::field("Backend", session.backend_url().as_str());

    Ok(())
}
