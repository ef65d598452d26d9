//! Core filedeck types.
//!
//! These types enforce their invariants at construction time, so an id,
//! collection name or backend URL that exists is a valid one.

mod backend_url;
mod collection;
mod record_id;
mod timestamp;
mod topic;

pub use backend_url::BackendUrl;
pub use collection::CollectionName;
pub use record_id::RecordId;
pub use timestamp::Timestamp;
pub use topic::{Topic, TopicPattern};
