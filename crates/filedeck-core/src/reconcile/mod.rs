//! Reconciling realtime changes into in-memory record lists.
//!
//! A [`RecordList`] is populated once from a snapshot and then mutated only
//! by applying [`ChangeEvent`](crate::record::ChangeEvent)s in arrival order.
//! Whatever the order or repetition of events, the list never holds two
//! entries with the same id.

mod list;
pub mod membership;

pub use list::{ApplyOutcome, RecordList, bounded_recent};

use crate::record::{Entry, FileRecord, FolderRecord, Record, RoleRecord, UserRecord};
use crate::types::{RecordId, Timestamp};

/// Anything that can live in a [`RecordList`].
pub trait Keyed {
    /// Identity within the list.
    fn key(&self) -> &RecordId;

    /// Last update time, used for recency ordering.
    fn updated_at(&self) -> Option<Timestamp>;
}

macro_rules! impl_keyed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Keyed for $ty {
                fn key(&self) -> &RecordId {
                    &self.id
                }

                fn updated_at(&self) -> Option<Timestamp> {
                    self.updated
                }
            }
        )*
    };
}

impl_keyed!(Record, FileRecord, FolderRecord, UserRecord, RoleRecord);

impl Keyed for Entry {
    fn key(&self) -> &RecordId {
        self.id()
    }

    fn updated_at(&self) -> Option<Timestamp> {
        self.updated()
    }
}
