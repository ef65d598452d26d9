//! filedeck-file - Filesystem backend for filedeck.
//!
//! Stores records as JSON files under a root directory and serves realtime
//! changes by tailing an append-only change log. Selected by `file://`
//! backend URLs; meant for development, tests and offline use.
//!
//! ```no_run
//! use filedeck_core::{Backend, CollectionName, Credentials};
//! use filedeck_file::FileBackend;
//!
//! # async fn example() -> filedeck_core::Result<()> {
//! let backend = FileBackend::open("/tmp/filedeck")?;
//! let session = backend
//!     .authenticate(&CollectionName::users(), Credentials::new("alice", "hunter22"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod backend;
pub mod filter;
mod session;
mod store;
mod tail;
mod writes;

pub use backend::FileBackend;
pub use session::FileSession;
pub use store::FileStore;
