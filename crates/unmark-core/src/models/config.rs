//! Configuration structures for the removal pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::UnmarkError;

/// Main configuration for the unmark pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnmarkConfig {
    /// Scanned page configuration.
    pub scan: ScanConfig,

    /// Vector/text page configuration.
    pub normal: NormalConfig,
}

/// How reconstructed scanned pages are embedded in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterEncoding {
    /// Lossy JPEG (`DCTDecode`).
    Jpeg,
    /// Lossless deflate (`FlateDecode`).
    Flate,
}

/// Scanned page configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Pixels whose channel sum is below this value are always kept.
    pub dark_sum_threshold: u32,

    /// Maximum pairwise channel difference of an achromatic pixel.
    pub channel_tolerance: u8,

    /// Output image encoding.
    pub encoding: RasterEncoding,

    /// JPEG quality (1 - 100).
    pub jpeg_quality: u8,

    /// Resolution used to size output pages from pixel dimensions.
    pub dpi: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            dark_sum_threshold: 350,
            channel_tolerance: 40,
            encoding: RasterEncoding::Jpeg,
            jpeg_quality: 75,
            dpi: 96.0,
        }
    }
}

/// Vector/text page configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalConfig {
    /// Remove text-capable form XObjects when no text run matched.
    pub form_fallback: bool,

    /// Drop `Do` operators that reference removed XObjects.
    pub strip_dangling_invocations: bool,

    /// Drop objects no longer reachable after removal.
    pub prune_objects: bool,
}

impl Default for NormalConfig {
    fn default() -> Self {
        Self {
            form_fallback: true,
            strip_dangling_invocations: true,
            prune_objects: true,
        }
    }
}

impl UnmarkConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, UnmarkError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| UnmarkError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), UnmarkError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| UnmarkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), UnmarkError> {
        if !(1..=100).contains(&self.scan.jpeg_quality) {
            return Err(UnmarkError::Config(format!(
                "scan.jpeg_quality must be within 1..=100, got {}",
                self.scan.jpeg_quality
            )));
        }
        if !(self.scan.dpi.is_finite() && self.scan.dpi > 0.0) {
            return Err(UnmarkError::Config(format!(
                "scan.dpi must be positive, got {}",
                self.scan.dpi
            )));
        }
        Ok(())
    }
}
