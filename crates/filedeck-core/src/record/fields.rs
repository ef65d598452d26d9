//! Field payloads for create and update requests.

use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use crate::Result;
use crate::error::{InvalidInputError, TransportError};

/// Field names whose values are never printed.
const SECRET_FIELDS: &[&str] = &["password", "passwordConfirm", "oldPassword"];

/// A file attached to a create or update request.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Reads an attachment from disk, named after the file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                InvalidInputError::other(format!("not a file path: {}", path.display()))
            })?;

        let bytes = std::fs::read(path).map_err(|e| TransportError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;

        Ok(Self::new(filename, bytes))
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Fields for a create or update request.
///
/// Plain values are sent as JSON; attachments force a multipart request.
#[derive(Clone, Default)]
pub struct RecordFields {
    values: Map<String, Value>,
    files: Vec<(String, Attachment)>,
}

impl RecordFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds fields from a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self {
                values,
                files: Vec::new(),
            }),
            other => Err(InvalidInputError::other(format!(
                "record fields must be a JSON object, got {}",
                other
            ))
            .into()),
        }
    }

    /// Sets a field value.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    /// Attaches a file to a file field.
    pub fn attach(mut self, field: impl Into<String>, attachment: Attachment) -> Self {
        self.files.push((field.into(), attachment));
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn files(&self) -> &[(String, Attachment)] {
        &self.files
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.files.is_empty()
    }
}

impl fmt::Debug for RecordFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| {
                if SECRET_FIELDS.contains(&k.as_str()) {
                    (k.clone(), Value::String("[REDACTED]".to_string()))
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect();

        f.debug_struct("RecordFields")
            .field("values", &values)
            .field("files", &self.files)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn debug_redacts_passwords() {
        let fields = RecordFields::new()
            .set("username", "ana")
            .set("password", "hunter2hunter2")
            .set("passwordConfirm", "hunter2hunter2");

        let debug = format!("{:?}", fields);
        assert!(debug.contains("ana"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn debug_omits_attachment_bytes() {
        let fields = RecordFields::new().attach("field", Attachment::new("a.txt", b"secret".to_vec()));
        let debug = format!("{:?}", fields);
        assert!(debug.contains("a.txt"));
        assert!(!debug.contains("secret"));
        assert!(fields.has_files());
    }

    #[test]
    fn from_value_requires_object() {
        assert!(RecordFields::from_value(json!({"name": "x"})).is_ok());
        assert!(RecordFields::from_value(json!(["x"])).is_err());
    }

    #[test]
    fn attachment_from_path_uses_file_name() {
        let dir = std::env::temp_dir().join(format!("filedeck-att-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.filename, "notes.txt");
        assert_eq!(attachment.bytes, b"hello");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
