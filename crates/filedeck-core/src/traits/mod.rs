//! Core traits for backend and session behavior.

mod backend;
mod session;
mod stream;

pub use backend::Backend;
pub use session::Session;
pub use stream::ChangeStream;
