//! Inline image encoding for portfolio files.
//!
//! Images are stored inside the portfolio JSON as data URIs
//! (`data:image/jpeg;base64,...`) so one file carries the whole document.
//! The MIME type is sniffed from the leading magic bytes with
//! [`image::guess_format`]; when that fails the file extension decides, and
//! `image/jpeg` is the last resort.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataUriError {
    #[error("not a data URI")]
    NotDataUri,
    #[error("data URI is not base64-encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

const FALLBACK_MIME: &str = "image/jpeg";

const EXTENSION_MIME: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
];

/// File extensions accepted as image sources.
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    EXTENSION_MIME.iter().map(|(ext, _)| *ext)
}

/// A base64 data URI holding one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageData(String);

impl ImageData {
    /// Encode raw image bytes, sniffing the MIME type from content.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::encode(sniff_mime(bytes).unwrap_or(FALLBACK_MIME), bytes)
    }

    /// Encode raw image bytes read from `path`. Content sniffing wins over
    /// the extension.
    pub fn from_file_bytes(path: &Path, bytes: &[u8]) -> Self {
        let mime = sniff_mime(bytes)
            .or_else(|| mime_for_extension(path))
            .unwrap_or(FALLBACK_MIME);
        Self::encode(mime, bytes)
    }

    fn encode(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// Wrap an existing URI string as-is.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The MIME type between `data:` and the first `;` or `,`.
    pub fn mime(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let end = rest.find([';', ','])?;
        Some(&rest[..end])
    }

    /// Decode back to raw bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DataUriError> {
        let rest = self.0.strip_prefix("data:").ok_or(DataUriError::NotDataUri)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotDataUri)?;
        if !header.ends_with(";base64") {
            return Err(DataUriError::NotBase64);
        }
        Ok(STANDARD.decode(payload.trim())?)
    }
}

impl fmt::Display for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

fn mime_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_MIME
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}
