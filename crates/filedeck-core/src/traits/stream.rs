//! Change stream trait.

use futures_core::Stream;

use crate::Result;
use crate::record::RawChange;

/// Stream of realtime changes for one subscription topic.
pub trait ChangeStream: Stream<Item = Result<RawChange>> + Send {}

impl<T> ChangeStream for T where T: Stream<Item = Result<RawChange>> + Send {}
