//! PDF page model and output writers.

mod page;
mod writer;

pub use page::{PageView, effective_resources, page_id};
pub use writer::RasterPdfWriter;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// An embedded external object of a page.
#[derive(Debug, Clone, PartialEq)]
pub enum XObject {
    /// Raster image.
    Image(ImageXObject),
    /// Reusable content block.
    Form(FormXObject),
    /// Any other subtype (e.g. PostScript).
    Other { subtype: String },
}

/// An image XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageXObject {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color space of the samples.
    pub color_space: ColorSpace,
    /// Bits per color component.
    pub bits_per_component: u8,
    /// First stream filter, if any.
    pub filter: Option<String>,
    /// Inflated pixel bytes for `FlateDecode`/unfiltered streams, the raw
    /// encoded bytes otherwise.
    pub payload: Vec<u8>,
}

impl ImageXObject {
    /// Whether the payload already holds raw pixel samples.
    pub fn has_raw_samples(&self) -> bool {
        matches!(self.filter.as_deref(), None | Some("FlateDecode"))
    }
}

/// A form XObject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormXObject {
    /// `/BBox` of the form, when present and well-formed.
    pub bbox: Option<[f32; 4]>,
    /// Procedure sets declared by the form's own resources.
    pub proc_set: Vec<String>,
}

impl FormXObject {
    /// Bounded form whose resources declare the `/Text` procedure set.
    pub fn renders_text(&self) -> bool {
        self.bbox.is_some() && self.proc_set.iter().any(|p| p == "Text")
    }
}

/// Image color space.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    /// Three components per pixel.
    Rgb,
    /// One component per pixel.
    Gray,
    /// One palette index per pixel.
    Indexed { palette: Vec<[u8; 3]> },
    /// Anything else, read as one component per pixel.
    Other(String),
}

impl ColorSpace {
    /// Map a color space family name.
    pub fn from_name(name: &[u8]) -> Self {
        match name {
            b"DeviceRGB" | b"RGB" | b"CalRGB" => ColorSpace::Rgb,
            b"DeviceGray" | b"G" | b"CalGray" => ColorSpace::Gray,
            other => ColorSpace::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }
}
