//! Image XObject decoding as an ordered chain of named strategies.

use image::{DynamicImage, GrayImage, RgbImage};
use tracing::trace;

use crate::error::DecodeError;
use crate::pdf::{ColorSpace, ImageXObject};

/// One way of turning an image payload into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Payload holds `width * height` samples at 8 bits per component.
    RawPixels,
    /// Payload is a complete image file (JPEG, PNG, ...).
    Container,
    /// Payload is an ASCII hex armored image file.
    TextArmored,
}

impl DecodeStrategy {
    /// Strategy name for logs.
    pub fn name(self) -> &'static str {
        match self {
            DecodeStrategy::RawPixels => "raw-pixels",
            DecodeStrategy::Container => "container",
            DecodeStrategy::TextArmored => "text-armored",
        }
    }

    /// Apply this strategy.
    pub fn decode(self, image: &ImageXObject) -> Result<DynamicImage, DecodeError> {
        match self {
            DecodeStrategy::RawPixels => decode_raw(image),
            DecodeStrategy::Container => decode_container(&image.payload),
            DecodeStrategy::TextArmored => decode_container(&unhex(&image.payload)?),
        }
    }
}

/// The single strategy used for scanned page fragments, chosen by filter.
pub fn scanned_strategy(image: &ImageXObject) -> DecodeStrategy {
    if image.has_raw_samples() {
        DecodeStrategy::RawPixels
    } else {
        DecodeStrategy::Container
    }
}

const RAW_FIRST: &[DecodeStrategy] = &[
    DecodeStrategy::RawPixels,
    DecodeStrategy::Container,
    DecodeStrategy::TextArmored,
];

const ENCODED: &[DecodeStrategy] = &[DecodeStrategy::Container, DecodeStrategy::TextArmored];

/// Strategies tried when previewing an image for review.
///
/// Streams holding raw samples try them first, then fall back to reading the
/// payload as an image file. Encoded streams never try raw samples.
pub fn review_chain(image: &ImageXObject) -> &'static [DecodeStrategy] {
    if image.has_raw_samples() {
        RAW_FIRST
    } else {
        ENCODED
    }
}

/// Try `chain` in order; the first success wins.
pub fn decode_with(
    chain: &[DecodeStrategy],
    name: &str,
    image: &ImageXObject,
) -> Result<(DecodeStrategy, DynamicImage), DecodeError> {
    for &strategy in chain {
        match strategy.decode(image) {
            Ok(decoded) => {
                trace!("{}: decoded with {}", name, strategy.name());
                return Ok((strategy, decoded));
            }
            Err(e) => trace!("{}: {} failed: {}", name, strategy.name(), e),
        }
    }
    Err(DecodeError::Exhausted(name.to_string()))
}

fn decode_raw(image: &ImageXObject) -> Result<DynamicImage, DecodeError> {
    let (width, height) = (image.width, image.height);
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions(width, height));
    }
    if image.bits_per_component != 8 {
        return Err(DecodeError::UnsupportedBitDepth(image.bits_per_component));
    }

    let pixels = width as usize * height as usize;
    let channels = match image.color_space {
        ColorSpace::Rgb => 3,
        _ => 1,
    };
    let expected = pixels * channels;
    if image.payload.len() < expected {
        return Err(DecodeError::ShortPayload {
            expected,
            actual: image.payload.len(),
        });
    }
    let samples = &image.payload[..expected];

    let decoded = match &image.color_space {
        ColorSpace::Rgb => RgbImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageRgb8),
        ColorSpace::Indexed { palette } => {
            let rgb = samples
                .iter()
                .flat_map(|&index| palette.get(index as usize).copied().unwrap_or([0, 0, 0]))
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        ColorSpace::Gray | ColorSpace::Other(_) => {
            GrayImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageLuma8)
        }
    };
    decoded.ok_or(DecodeError::ShortPayload {
        expected,
        actual: image.payload.len(),
    })
}

fn decode_container(data: &[u8]) -> Result<DynamicImage, DecodeError> {
    image::load_from_memory(data).map_err(|e| DecodeError::Container(e.to_string()))
}

/// Decode ASCII hex text (`ASCIIHexDecode` syntax: whitespace ignored,
/// optional `>` terminator, odd trailing digit padded with 0).
fn unhex(text: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(text.len() / 2);
    let mut high: Option<u8> = None;

    for &c in text {
        let nibble = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            b'>' => break,
            c if c.is_ascii_whitespace() => continue,
            _ => return Err(DecodeError::NotTextArmored),
        };
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    if out.is_empty() {
        return Err(DecodeError::NotTextArmored);
    }
    Ok(out)
}
