//! Realtime subscription topic.

use std::fmt;
use std::str::FromStr;

use super::{CollectionName, RecordId};
use crate::error::{Error, InvalidInputError};

/// Which records of a collection a subscription covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TopicPattern {
    /// Every record in the collection (`*`).
    All,
    /// A single record.
    Record(RecordId),
}

/// A realtime subscription topic: `<collection>/*` or `<collection>/<id>`.
///
/// # Example
///
/// ```
/// use filedeck_core::{CollectionName, Topic};
///
/// let topic = Topic::all(CollectionName::files());
/// assert_eq!(topic.to_string(), "files/*");
/// assert_eq!("files/*".parse::<Topic>().unwrap(), topic);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic {
    collection: CollectionName,
    pattern: TopicPattern,
}

impl Topic {
    /// All records of a collection.
    pub fn all(collection: CollectionName) -> Self {
        Self {
            collection,
            pattern: TopicPattern::All,
        }
    }

    /// One record of a collection.
    pub fn record(collection: CollectionName, id: RecordId) -> Self {
        Self {
            collection,
            pattern: TopicPattern::Record(id),
        }
    }

    /// Returns the collection.
    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    /// Returns the pattern.
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }

    /// Returns true if a change to `id` in `collection` belongs to this topic.
    ///
    /// `collection` may be either the collection name or its id.
    pub fn matches(&self, collection: &str, id: &RecordId) -> bool {
        if collection != self.collection.as_str() {
            return false;
        }
        match &self.pattern {
            TopicPattern::All => true,
            TopicPattern::Record(wanted) => wanted == id,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            TopicPattern::All => write!(f, "{}/*", self.collection),
            TopicPattern::Record(id) => write!(f, "{}/{}", self.collection, id),
        }
    }
}

impl FromStr for Topic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (collection, pattern) = s.split_once('/').unwrap_or((s, "*"));

        let collection = CollectionName::new(collection).map_err(|_| InvalidInputError::Topic {
            value: s.to_string(),
            reason: format!("invalid collection: {}", collection),
        })?;

        if pattern == "*" {
            return Ok(Self::all(collection));
        }

        let id = RecordId::new(pattern).map_err(|_| InvalidInputError::Topic {
            value: s.to_string(),
            reason: format!("invalid record id: {}", pattern),
        })?;

        Ok(Self::record(collection, id))
    }
}
