//! Request payloads.
//!
//! Bodies are plain owned data so the same payload can be sent again on
//! every retry.

use crate::{Error, Result};
use serde::Serialize;

/// The body sent with a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A JSON document, sent with the client's content-type.
    Json(serde_json::Value),
    /// Bytes passed through untouched.
    Raw {
        /// The payload.
        bytes: Vec<u8>,
        /// Content-type to send when the call sets none.
        content_type: Option<String>,
    },
    /// A multipart form; the transport writes the boundary.
    Multipart(MultipartPayload),
}

impl RequestBody {
    /// Serializes `value` as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `value` cannot be represented
    /// as JSON.
    pub fn json<B>(value: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    /// A raw payload with an explicit content-type.
    pub fn raw(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        RequestBody::Raw {
            bytes: bytes.into(),
            content_type: Some(content_type.into()),
        }
    }

    /// Returns `true` for [`RequestBody::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }
}

impl From<MultipartPayload> for RequestBody {
    fn from(payload: MultipartPayload) -> Self {
        RequestBody::Multipart(payload)
    }
}

/// A multipart form made of text fields and file parts.
///
/// # Examples
///
/// ```
/// use steadycall::MultipartPayload;
///
/// let payload = MultipartPayload::new()
///     .text("title", "Quarterly report")
///     .file("file", "report.pdf", b"%PDF-1.7".to_vec(), "application/pdf");
///
/// assert_eq!(payload.parts().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartPayload {
    parts: Vec<MultipartPart>,
}

/// One field of a [`MultipartPayload`].
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartPart {
    /// Form field name.
    pub name: String,
    /// Field content.
    pub data: Vec<u8>,
    /// File name, for file parts.
    pub file_name: Option<String>,
    /// MIME type, for file parts.
    pub mime: Option<String>,
}

impl MultipartPayload {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            data: value.into().into_bytes(),
            file_name: None,
            mime: None,
        });
        self
    }

    /// Adds a file part.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        data: impl Into<Vec<u8>>,
        mime: impl Into<String>,
    ) -> Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            data: data.into(),
            file_name: Some(file_name.into()),
            mime: Some(mime.into()),
        });
        self
    }

    /// The parts in insertion order.
    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub(crate) fn to_form(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            let mut field = reqwest::multipart::Part::bytes(part.data.clone());
            if let Some(file_name) = &part.file_name {
                field = field.file_name(file_name.clone());
            }
            if let Some(mime) = &part.mime {
                field = field.mime_str(mime).map_err(|e| {
                    Error::ConfigurationError(format!("invalid multipart mime type {mime:?}: {e}"))
                })?;
            }
            form = form.part(part.name.clone(), field);
        }
        Ok(form)
    }
}
