//! Record model.
//!
//! [`Record`] is the schema-agnostic shape every backend returns. The typed
//! records decode from it for the collections filedeck knows about.

mod change;
mod fields;
mod generic;
mod lenient;
mod typed;

pub use change::{ChangeAction, ChangeEvent, RawChange};
pub use fields::{Attachment, RecordFields};
pub use generic::{FromRecord, Record};
pub use typed::{Entry, FileRecord, FolderRecord, RoleRecord, UserRecord};
