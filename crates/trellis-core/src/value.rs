//! Raw request values.
//!
//! Sources hand values to the parser in one of three shapes: plain text
//! (query string, form fields, headers, cookies, path variables), JSON
//! values (JSON body members), or uploaded files.

use bytes::Bytes;

/// An uploaded file attached to a request.
///
/// Trellis does not decode multipart bodies itself; the enclosing server
/// decodes them and attaches the parts to the request snapshot.
///
/// # Example
///
/// ```rust
/// use trellis_core::UploadedFile;
/// use bytes::Bytes;
///
/// let file = UploadedFile::new("report.csv", Some("text/csv"), Bytes::from_static(b"a,b\n1,2\n"));
/// assert_eq!(file.filename(), "report.csv");
/// assert_eq!(file.content_type(), Some("text/csv"));
/// assert_eq!(file.data().len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

impl UploadedFile {
    /// Creates a new uploaded file.
    #[must_use]
    pub fn new(filename: impl Into<String>, content_type: Option<&str>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.map(String::from),
            data,
        }
    }

    /// Returns the client-supplied file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the declared content type, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the file contents.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the size of the file contents in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A single raw value pulled out of a request location.
///
/// Text values come from string-shaped locations (query string, form
/// body, headers, cookies, path variables); JSON values come from the
/// JSON body; files come from decoded multipart parts.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// A plain string value.
    Text(String),
    /// A JSON value (JSON body member). `Value::Null` models an explicit null.
    Json(serde_json::Value),
    /// An uploaded file.
    File(UploadedFile),
}

impl RawValue {
    /// Returns true if this value is an explicit JSON null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(serde_json::Value::Null))
    }

    /// Returns the value as a string slice when it is string-shaped.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns a copy with surrounding whitespace stripped, for values
    /// that support it. Non-string values are returned unchanged.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        match self {
            Self::Text(s) => Self::Text(s.trim().to_string()),
            Self::Json(serde_json::Value::String(s)) => {
                Self::Json(serde_json::Value::String(s.trim().to_string()))
            }
            other => other.clone(),
        }
    }

    /// Returns a lowercased copy, for values that support it. Non-string
    /// values are returned unchanged.
    #[must_use]
    pub fn lowercased(&self) -> Self {
        match self {
            Self::Text(s) => Self::Text(s.to_lowercase()),
            Self::Json(serde_json::Value::String(s)) => {
                Self::Json(serde_json::Value::String(s.to_lowercase()))
            }
            other => other.clone(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<UploadedFile> for RawValue {
    fn from(value: UploadedFile) -> Self {
        Self::File(value)
    }
}
