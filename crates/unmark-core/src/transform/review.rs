//! Decision providers for image removal.

use image::DynamicImage;

use crate::error::Result;

/// An image XObject offered for removal.
#[derive(Debug, Clone, Copy)]
pub struct ReviewCandidate<'a> {
    /// Page number (1-indexed).
    pub page: u32,
    /// XObject name within the page resources.
    pub name: &'a str,
    /// Declared width in pixels.
    pub width: u32,
    /// Declared height in pixels.
    pub height: u32,
    /// Decoded preview, `None` when no decode strategy succeeded.
    pub image: Option<&'a DynamicImage>,
}

impl ReviewCandidate<'_> {
    /// Declared number of pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Decides whether an image XObject is a watermark to remove.
pub trait RemovalReviewer {
    /// Return `true` to remove the candidate.
    fn review(&mut self, candidate: &ReviewCandidate<'_>) -> Result<bool>;
}

/// Removes every image.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRemove;

impl RemovalReviewer for AlwaysRemove {
    fn review(&mut self, _candidate: &ReviewCandidate<'_>) -> Result<bool> {
        Ok(true)
    }
}

/// Keeps every image.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysKeep;

impl RemovalReviewer for AlwaysKeep {
    fn review(&mut self, _candidate: &ReviewCandidate<'_>) -> Result<bool> {
        Ok(false)
    }
}

/// Removes images covering at least `min_area` pixels.
#[derive(Debug, Clone, Copy)]
pub struct SizeThreshold {
    pub min_area: u64,
}

impl RemovalReviewer for SizeThreshold {
    fn review(&mut self, candidate: &ReviewCandidate<'_>) -> Result<bool> {
        Ok(candidate.area() >= self.min_area)
    }
}
