//! filedeck-core - Core types, reconciler and traits for the filedeck file manager.
//!
//! Backends implement [`Backend`] and [`Session`]; everything else in this
//! crate is written against those traits. Realtime changes are folded into
//! [`RecordList`]s, either directly or through a [`LiveView`] task.

pub mod credentials;
pub mod error;
pub mod notice;
pub mod ops;
pub mod query;
pub mod reconcile;
pub mod record;
pub mod subscription;
pub mod tokens;
pub mod traits;
pub mod types;
pub mod view;

pub use credentials::Credentials;
pub use error::{
    AuthError, Error, InvalidInputError, ProtocolError, SubscriptionError, TransportError,
};
pub use notice::{Notice, NoticeLevel};
pub use query::ListQuery;
pub use reconcile::{ApplyOutcome, Keyed, RecordList, bounded_recent};
pub use record::{
    Attachment, ChangeAction, ChangeEvent, Entry, FileRecord, FolderRecord, FromRecord, RawChange,
    Record, RecordFields, RoleRecord, UserRecord,
};
pub use subscription::{ChangeSender, ChangeSubscription, SubscriptionRegistry};
pub use tokens::AuthToken;
pub use traits::{Backend, ChangeStream, Session};
pub use types::{BackendUrl, CollectionName, RecordId, Timestamp, Topic, TopicPattern};
pub use view::{LiveView, ViewOptions, ViewSnapshot, ViewStatus};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
