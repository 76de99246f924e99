#![warn(missing_docs)]
//! # indassist-upload
//!
//! ## Purpose
//! Turns one locally selected image file into the encoded image representation
//! shared with camera capture.
//!
//! ## Responsibilities
//! - Hold at most one pending file selection and reset it after every pick.
//! - Read the file and recognise its raster format from content.
//! - Produce a data URL carrying the original bytes unchanged.
//!
//! ## Data flow
//! File picker -> [`UploadHandler::select`] -> [`UploadHandler::take_and_read`]
//! -> [`indassist_core::EncodedImage`] -> analysis client.
//!
//! ## Ownership and lifetimes
//! File bytes are read into an owned buffer and consumed by encoding; nothing
//! borrows from the filesystem after the call returns.
//!
//! ## Error model
//! Unreadable, empty and unrecognised files return [`UploadError`].
//!
//! ## Security and privacy notes
//! Files are read once and never written back or cached.

use std::fs;
use std::path::{Path, PathBuf};

use indassist_core::{CoreError, EncodedImage};
use thiserror::Error;

/// File extensions offered by the file picker filter.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Pending file selection for the upload view.
#[derive(Debug, Default)]
pub struct UploadHandler {
    selection: Option<PathBuf>,
}

impl UploadHandler {
    /// Creates a handler with no selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the picked file, replacing any previous selection.
    pub fn select(&mut self, path: impl Into<PathBuf>) {
        self.selection = Some(path.into());
    }

    /// Currently selected path, if any.
    pub fn selection(&self) -> Option<&Path> {
        self.selection.as_deref()
    }

    /// Display name of the current selection.
    pub fn selected_name(&self) -> Option<String> {
        self.selection.as_deref().map(display_name)
    }

    /// Takes the selection and reads it.
    ///
    /// The selection is cleared before reading, so the same file can be
    /// picked again whether or not decoding succeeds.
    ///
    /// # Returns
    /// `None` when nothing is selected.
    pub fn take_and_read(&mut self) -> Option<Result<EncodedImage, UploadError>> {
        self.selection.take().map(|path| read_image_file(&path))
    }
}

/// Final path component for display, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Returns `true` when the extension passes the picker filter.
pub fn has_accepted_extension(path: &Path) -> bool {
    path.extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|extension| ACCEPTED_EXTENSIONS.contains(&extension.as_str()))
}

/// Reads an image file into a data URL without re-encoding.
///
/// # Errors
/// Returns [`UploadError::Read`] when the file cannot be read and the errors
/// of [`encode_image_bytes`] otherwise.
pub fn read_image_file(path: &Path) -> Result<EncodedImage, UploadError> {
    let bytes = fs::read(path).map_err(|error| UploadError::Read {
        path: path.display().to_string(),
        source: error,
    })?;
    encode_image_bytes(&bytes)
}

/// Encodes raw image file bytes, deriving the MIME type from their content.
///
/// # Errors
/// Returns [`UploadError::Empty`] for empty input and
/// [`UploadError::UnrecognizedFormat`] when the bytes are not a known image.
pub fn encode_image_bytes(bytes: &[u8]) -> Result<EncodedImage, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }

    let format = image::guess_format(bytes)
        .map_err(|error| UploadError::UnrecognizedFormat(error.to_string()))?;
    Ok(EncodedImage::from_bytes(format.to_mime_type(), bytes)?)
}

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// File is empty.
    #[error("selected file is empty")]
    Empty,
    /// Content is not a recognised image format.
    #[error("unrecognized image format: {0}")]
    UnrecognizedFormat(String),
    /// Encoding into a data URL failed.
    #[error("image encoding failure: {0}")]
    Core(#[from] CoreError),
}
