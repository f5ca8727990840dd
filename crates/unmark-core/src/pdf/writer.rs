//! One-page-per-image PDF output for scanned documents.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use tracing::debug;

use crate::error::{PdfError, Result};
use crate::models::config::{RasterEncoding, ScanConfig};

/// Collects raster pages and serializes them as a single document.
pub struct RasterPdfWriter {
    encoding: RasterEncoding,
    jpeg_quality: u8,
    dpi: f32,
    pages: Vec<EncodedPage>,
}

struct EncodedPage {
    width: u32,
    height: u32,
    stream: Stream,
}

impl RasterPdfWriter {
    /// Create a writer using the scan output settings.
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            encoding: config.encoding,
            jpeg_quality: config.jpeg_quality,
            dpi: config.dpi,
            pages: Vec::new(),
        }
    }

    /// Encode `image` as the next page.
    pub fn add_page(&mut self, image: &RgbImage) -> Result<()> {
        let (width, height) = image.dimensions();
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };

        let data = match self.encoding {
            RasterEncoding::Jpeg => {
                let mut data = Vec::new();
                let encoder = JpegEncoder::new_with_quality(&mut data, self.jpeg_quality);
                DynamicImage::ImageRgb8(image.clone()).write_with_encoder(encoder)?;
                dict.set("Filter", "DCTDecode");
                data
            }
            // Compressed by `Document::compress` in `finish`.
            RasterEncoding::Flate => image.as_raw().clone(),
        };

        debug!(
            "Encoded {}x{} page image ({:?}, {} bytes)",
            width,
            height,
            self.encoding,
            data.len()
        );
        self.pages.push(EncodedPage {
            width,
            height,
            stream: Stream::new(dict, data),
        });
        Ok(())
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Build the output document.
    pub fn finish(self) -> Result<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let scale = 72.0 / self.dpi;

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in self.pages {
            let width_pt = page.width as f32 * scale;
            let height_pt = page.height as f32 * scale;
            kids.push(add_image_page(&mut doc, pages_id, page.stream, width_pt, height_pt)?);
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if self.encoding == RasterEncoding::Flate {
            doc.compress();
        }
        Ok(doc)
    }
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image: Stream,
    width: f32,
    height: f32,
) -> Result<ObjectId> {
    let image_id = doc.add_object(Object::Stream(image));
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let data = content.encode().map_err(|e| PdfError::Write(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, data));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    }))
}
