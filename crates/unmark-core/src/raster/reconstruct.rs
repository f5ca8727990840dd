//! Scanned page reconstruction from sliced image fragments.

use std::cmp::Ordering;

use image::{RgbImage, imageops};
use tracing::debug;

use super::classifier::PixelClassifier;
use super::decode::scanned_strategy;
use crate::error::{PdfError, Result};
use crate::pdf::PageView;

/// Trailing decimal integer of an XObject name (`Im12` -> 12).
pub fn fragment_index(name: &str) -> Option<u64> {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    name[name.len() - digits..].parse().ok()
}

/// Fragment ordering: numbered names ascending by index, then unnumbered
/// names by name.
pub fn compare_fragment_names(a: &str, b: &str) -> Ordering {
    match (fragment_index(a), fragment_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Stack fragments top-to-bottom into a (max width, total height) canvas.
///
/// Narrower fragments leave the right margin black.
pub fn concatenate(fragments: &[RgbImage]) -> RgbImage {
    let width = fragments.iter().map(RgbImage::width).max().unwrap_or(0);
    let height = fragments.iter().map(RgbImage::height).sum();
    let mut canvas = RgbImage::new(width, height);

    let mut offset = 0i64;
    for fragment in fragments {
        imageops::replace(&mut canvas, fragment, 0, offset);
        offset += fragment.height() as i64;
    }
    canvas
}

/// A reconstructed and whitened scanned page.
#[derive(Debug, Clone)]
pub struct ReconstructedPage {
    /// Final raster.
    pub image: RgbImage,
    /// Number of fragments stacked.
    pub fragments: usize,
    /// Number of pixels replaced with white.
    pub whitened: u64,
}

/// Reassembles scanned pages and whitens colored pixels.
pub struct ScannedPageReconstructor {
    classifier: PixelClassifier,
}

impl ScannedPageReconstructor {
    /// Create a reconstructor using `classifier`.
    pub fn new(classifier: PixelClassifier) -> Self {
        Self { classifier }
    }

    /// Decode, order, stack and whiten the image fragments of `page`.
    pub fn reconstruct(&self, page: &PageView) -> Result<ReconstructedPage> {
        let mut decoded = Vec::new();
        for (name, image) in page.images() {
            let strategy = scanned_strategy(image);
            let fragment = strategy.decode(image)?.to_rgb8();
            debug!(
                "Page {}: fragment {} {}x{} via {}",
                page.number,
                name,
                fragment.width(),
                fragment.height(),
                strategy.name()
            );
            decoded.push((name, fragment));
        }

        if decoded.is_empty() {
            return Err(PdfError::NoImages(page.number).into());
        }
        decoded.sort_by(|(a, _), (b, _)| compare_fragment_names(a, b));

        let fragments: Vec<RgbImage> = decoded.into_iter().map(|(_, image)| image).collect();
        let mut image = concatenate(&fragments);
        let whitened = self.classifier.whiten(&mut image);

        Ok(ReconstructedPage {
            image,
            fragments: fragments.len(),
            whitened,
        })
    }
}

impl Default for ScannedPageReconstructor {
    fn default() -> Self {
        Self::new(PixelClassifier::default())
    }
}
