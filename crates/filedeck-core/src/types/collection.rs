//! Collection name type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A validated collection name (or collection id).
///
/// Names start with a letter or `_` and continue with ASCII alphanumerics
/// or `_`, e.g. `files`, `roles`, `_pb_users_auth_`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Create a new collection name from a string, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// The `files` collection.
    pub fn files() -> Self {
        Self("files".to_string())
    }

    /// The `folders` collection.
    pub fn folders() -> Self {
        Self("folders".to_string())
    }

    /// The `users` auth collection.
    pub fn users() -> Self {
        Self("users".to_string())
    }

    /// The `roles` collection.
    pub fn roles() -> Self {
        Self("roles".to_string())
    }

    /// Returns the name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let mut chars = s.chars();

        let Some(first) = chars.next() else {
            return Err(InvalidInputError::Collection {
                value: s.to_string(),
                reason: "cannot be empty".to_string(),
            }
            .into());
        };

        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(InvalidInputError::Collection {
                value: s.to_string(),
                reason: "must start with a letter or '_'".to_string(),
            }
            .into());
        }

        if s.len() > 100 {
            return Err(InvalidInputError::Collection {
                value: s.to_string(),
                reason: "exceeds maximum length of 100 characters".to_string(),
            }
            .into());
        }

        if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
            return Err(InvalidInputError::Collection {
                value: s.to_string(),
                reason: format!("contains invalid character '{}'", c),
            }
            .into());
        }

        Ok(())
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CollectionName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CollectionName> for String {
    fn from(name: CollectionName) -> Self {
        name.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
