//! Core library for PDF watermark removal.
//!
//! This crate provides:
//! - Page snapshots of a `lopdf` document (XObjects and content operations)
//! - Image, text and form watermark removal for vector/text PDFs
//! - Scanned page reconstruction with colored-pixel whitening
//! - A document pipeline writing the cleaned output in one pass

pub mod error;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod raster;
pub mod transform;

pub use error::{DecodeError, PdfError, Result, UnmarkError};
pub use models::config::UnmarkConfig;
pub use pdf::{ColorSpace, FormXObject, ImageXObject, PageView, XObject};
pub use pipeline::{DocumentPipeline, Mode, RunSummary};
pub use raster::{PixelClassifier, ScannedPageReconstructor, is_gray};
pub use transform::{
    AlwaysKeep, AlwaysRemove, NormalPageTransformer, RemovalOptions, RemovalReviewer,
    SizeThreshold,
};
