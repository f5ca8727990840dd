//! Watermark removal for vector/text pages.

mod normal;
mod review;
mod text;

pub use normal::{NormalPageTransformer, PageOutcome, RemovalOptions};
pub use review::{AlwaysKeep, AlwaysRemove, RemovalReviewer, ReviewCandidate, SizeThreshold};
pub use text::{decode_text_string, erase_text, shown_text};
