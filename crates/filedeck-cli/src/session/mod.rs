//! Backend selection and session persistence.

mod storage;
mod types;

pub use storage::SessionStore;
pub use types::{CliBackend, CliSession};
