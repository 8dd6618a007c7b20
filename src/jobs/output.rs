//! Classification of returned image units

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(image/[a-zA-Z]+);base64,(.+)$").expect("valid data URI pattern")
});

/// One deliverable image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageUnit {
    /// Decoded inline image data
    Inline { mime: String, bytes: Vec<u8> },
    /// URL or other reference the chat gateway can fetch itself
    Reference(String),
}

/// A returned unit that cannot be delivered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnrecognizedResult {
    #[error("Received a base64 image but its format was not recognized.")]
    BadInlineImage,
    #[error("Image result not recognized.")]
    UnknownShape,
}

impl ImageUnit {
    pub fn classify(unit: &Value) -> Result<Self, UnrecognizedResult> {
        let Value::String(s) = unit else {
            return Err(UnrecognizedResult::UnknownShape);
        };
        if !s.starts_with("data:image") {
            return Ok(ImageUnit::Reference(s.clone()));
        }

        let caps = DATA_URI
            .captures(s)
            .ok_or(UnrecognizedResult::BadInlineImage)?;
        let bytes = STANDARD
            .decode(caps[2].trim())
            .map_err(|_| UnrecognizedResult::BadInlineImage)?;
        Ok(ImageUnit::Inline {
            mime: caps[1].to_string(),
            bytes,
        })
    }

    /// File name to use when uploading inline data
    pub fn file_name(&self) -> String {
        match self {
            ImageUnit::Inline { mime, .. } => {
                let ext = mime.strip_prefix("image/").unwrap_or("png");
                format!("image.{ext}")
            }
            ImageUnit::Reference(_) => "image".to_string(),
        }
    }
}
