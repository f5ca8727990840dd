//! Error types for the unmark-core library.

use thiserror::Error;

/// Main error type for the unmark library.
#[derive(Error, Debug)]
pub enum UnmarkError {
    /// PDF structure or serialization error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Embedded image could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Image encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to the PDF object graph.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Page object is missing or not a dictionary.
    #[error("invalid page {0}")]
    InvalidPage(u32),

    /// The page content stream could not be decoded or re-encoded.
    #[error("malformed content stream on page {page}: {reason}")]
    MalformedContent { page: u32, reason: String },

    /// A scanned page carries no image XObject.
    #[error("page {0} has no image fragments")]
    NoImages(u32),

    /// Failed to serialize the output document.
    #[error("failed to write PDF: {0}")]
    Write(String),
}

/// Errors related to decoding embedded images.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Only 8 bits per component are interpreted as raw pixels.
    #[error("unsupported bits per component: {0}")]
    UnsupportedBitDepth(u8),

    /// Payload is shorter than width * height * channels.
    #[error("payload too short: expected {expected} bytes, got {actual}")]
    ShortPayload { expected: usize, actual: usize },

    /// Width or height is zero.
    #[error("invalid dimensions {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// The payload is not a recognizable image container.
    #[error("container decode failed: {0}")]
    Container(String),

    /// The payload is not an ASCII-armored stream.
    #[error("not a text-armored stream")]
    NotTextArmored,

    /// Every strategy in the chain failed.
    #[error("no decode strategy succeeded for {0}")]
    Exhausted(String),
}

/// Result type for the unmark library.
pub type Result<T> = std::result::Result<T, UnmarkError>;
