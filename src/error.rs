use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OverlayError>;

/// Failures that abort a page (or a whole document).
#[derive(Error, Debug)]
pub enum OverlayError {
    /// The layout document is malformed or lacks a required bounding box.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("invalid dpi: {0}")]
    InvalidDpi(u32),

    /// The page image could not be decoded.
    #[error("failed to decode page image: {0}")]
    Image(String),

    #[error("failed to build pdf: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl OverlayError {
    pub(crate) fn layout(message: impl Into<String>) -> Self {
        OverlayError::InvalidLayout(message.into())
    }
}

/// A word whose substitute-font width is not positive. Absorbed by the
/// compositor: the word simply gets no overlay text.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("measured text width is not positive")]
pub struct DegenerateMeasurement;
