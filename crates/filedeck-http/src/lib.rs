//! filedeck-http - HTTP backend for filedeck.
//!
//! Records go through the REST API; realtime changes arrive over
//! server-sent events, one connection per subscription.

mod backend;
mod client;
mod endpoints;
mod realtime;
mod session;
pub mod sse;

pub use backend::HttpBackend;
pub use session::HttpSession;
