//! Multipart form decoding shared by the chat and runner routes.

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{BridgeError, Result};

/// An uploaded file field.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Client-side filename, if sent.
    pub filename: Option<String>,
    pub bytes: Bytes,
}

/// Fields accepted by the form routes. Unknown fields are ignored.
#[derive(Debug, Default)]
pub struct FormFields {
    pub message: Option<String>,
    pub user_id: Option<String>,
    pub is_first: bool,
    pub script: Option<String>,
    pub file: Option<FilePart>,
}

impl FormFields {
    /// Read every field of the multipart body.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut fields = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(ToString::to_string) else {
                continue;
            };

            match name.as_str() {
                "file" => {
                    let filename = field.file_name().map(ToString::to_string);
                    let bytes = field.bytes().await?;
                    fields.file = Some(FilePart { filename, bytes });
                }
                "message" => fields.message = Some(field.text().await?),
                "user_id" => fields.user_id = Some(field.text().await?),
                "script" => fields.script = Some(field.text().await?),
                "is_first" => fields.is_first = parse_flag(&field.text().await?),
                other => {
                    tracing::debug!(field = %other, "Ignoring unknown form field");
                }
            }
        }

        Ok(fields)
    }

    pub fn message(&self) -> Result<&str> {
        self.message
            .as_deref()
            .ok_or(BridgeError::MissingField("message"))
    }

    /// The user id; blank values count as missing.
    pub fn user_id(&self) -> Result<&str> {
        self.user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(BridgeError::MissingField("user_id"))
    }

    pub fn script(&self) -> Result<&str> {
        self.script
            .as_deref()
            .ok_or(BridgeError::MissingField("script"))
    }

    pub fn take_file(&mut self) -> Result<FilePart> {
        self.file.take().ok_or(BridgeError::MissingField("file"))
    }
}

/// Lenient boolean parsing for checkbox-style fields; anything unrecognised
/// is false.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}
