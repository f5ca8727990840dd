//! Raster processing: pixel classification, image decoding and scanned page
//! reconstruction.

mod classifier;
mod decode;
mod reconstruct;

pub use classifier::{PixelClassifier, is_gray};
pub use decode::{DecodeStrategy, decode_with, review_chain, scanned_strategy};
pub use reconstruct::{
    ReconstructedPage, ScannedPageReconstructor, compare_fragment_names, concatenate,
    fragment_index,
};
