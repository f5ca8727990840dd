//! Near-gray pixel classification.

use image::{Rgb, RgbImage};

use crate::models::config::ScanConfig;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Decides whether a pixel is achromatic (kept) or colored (whitened).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelClassifier {
    dark_sum_threshold: u32,
    channel_tolerance: u8,
}

impl PixelClassifier {
    /// Create a classifier with explicit thresholds.
    pub fn new(dark_sum_threshold: u32, channel_tolerance: u8) -> Self {
        Self {
            dark_sum_threshold,
            channel_tolerance,
        }
    }

    /// Create a classifier from the scan configuration.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.dark_sum_threshold, config.channel_tolerance)
    }

    /// True if the pixel is dark enough or approximately achromatic.
    pub fn is_gray(&self, r: u8, g: u8, b: u8) -> bool {
        if (r as u32 + g as u32 + b as u32) < self.dark_sum_threshold {
            return true;
        }
        let tolerance = self.channel_tolerance;
        r.abs_diff(g) <= tolerance && r.abs_diff(b) <= tolerance && g.abs_diff(b) <= tolerance
    }

    /// Replace every colored pixel with white. Returns the number replaced.
    pub fn whiten(&self, image: &mut RgbImage) -> u64 {
        let mut whitened = 0;
        for pixel in image.pixels_mut() {
            let [r, g, b] = pixel.0;
            if !self.is_gray(r, g, b) {
                *pixel = WHITE;
                whitened += 1;
            }
        }
        whitened
    }
}

impl Default for PixelClassifier {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// [`PixelClassifier::is_gray`] with the default thresholds (350, 40).
pub fn is_gray(r: u8, g: u8, b: u8) -> bool {
    PixelClassifier::default().is_gray(r, g, b)
}
