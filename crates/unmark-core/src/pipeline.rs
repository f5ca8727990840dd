//! Whole-document processing: load, transform page by page, write once.

use std::fs;
use std::path::Path;

use lopdf::Document;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{PdfError, Result};
use crate::models::config::UnmarkConfig;
use crate::pdf::{PageView, RasterPdfWriter};
use crate::raster::{PixelClassifier, ScannedPageReconstructor};
use crate::transform::{NormalPageTransformer, RemovalOptions, RemovalReviewer};

/// How pages are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Vector/text pages edited in place.
    #[default]
    Normal,
    /// Pages made of image strips, rebuilt as rasters.
    Scanned,
}

/// Counters reported after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub images_removed: usize,
    pub forms_removed: usize,
    pub text_runs_erased: usize,
    pub pixels_whitened: u64,
}

/// Drives a document through the page transformers.
pub struct DocumentPipeline {
    config: UnmarkConfig,
    mode: Mode,
    options: RemovalOptions,
}

impl DocumentPipeline {
    /// Create a pipeline. `options` only apply to [`Mode::Normal`].
    pub fn new(config: UnmarkConfig, mode: Mode, options: RemovalOptions) -> Self {
        Self {
            config,
            mode,
            options,
        }
    }

    /// Read and open `path`, decrypting with the empty user password if needed.
    pub fn load(path: &Path) -> Result<Document> {
        let data = fs::read(path)?;
        let mut doc = Document::load_mem(&data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            doc.decrypt("").map_err(|_| PdfError::Encrypted)?;
            debug!("Decrypted {} with the empty password", path.display());
        }
        if doc.get_pages().is_empty() {
            return Err(PdfError::NoPages.into());
        }
        Ok(doc)
    }

    /// Process every page of `doc` and return the output document.
    pub fn process(
        &self,
        doc: Document,
        reviewer: &mut dyn RemovalReviewer,
    ) -> Result<(Document, RunSummary)> {
        self.config.validate()?;
        match self.mode {
            Mode::Normal => self.process_normal(doc, reviewer),
            Mode::Scanned => self.process_scanned(&doc),
        }
    }

    /// Load `input`, process it and write `output` atomically.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        reviewer: &mut dyn RemovalReviewer,
    ) -> Result<RunSummary> {
        if self.mode == Mode::Normal {
            self.options.validate()?;
        }
        let doc = Self::load(input)?;
        let (mut doc, summary) = self.process(doc, reviewer)?;
        save_atomically(&mut doc, output)?;
        info!("Done");
        Ok(summary)
    }

    fn process_normal(
        &self,
        mut doc: Document,
        reviewer: &mut dyn RemovalReviewer,
    ) -> Result<(Document, RunSummary)> {
        let options = RemovalOptions {
            form_fallback: self.options.form_fallback && self.config.normal.form_fallback,
            ..self.options.clone()
        };
        if options.is_noop() {
            warn!("Nothing to remove: enable image removal or pass a watermark text");
        }
        let transformer = NormalPageTransformer::new(options);
        let strip_dangling = self.config.normal.strip_dangling_invocations;

        let total = doc.get_pages().len();
        let mut summary = RunSummary::default();
        for number in 1..=total as u32 {
            info!("Processing page {}/{}", number, total);
            let original = PageView::load(&doc, number)?;
            let outcome = transformer.transform(original.clone(), &doc, reviewer)?;
            outcome.page.write_back(&mut doc, &original, strip_dangling)?;

            summary.pages += 1;
            summary.images_removed += outcome.images_removed;
            summary.forms_removed += outcome.forms_removed;
            summary.text_runs_erased += outcome.text_runs_erased;
        }

        if self.config.normal.prune_objects {
            let pruned = doc.prune_objects();
            debug!("Pruned {} unreachable objects", pruned.len());
        }
        Ok((doc, summary))
    }

    fn process_scanned(&self, doc: &Document) -> Result<(Document, RunSummary)> {
        let reconstructor =
            ScannedPageReconstructor::new(PixelClassifier::from_config(&self.config.scan));
        let mut writer = RasterPdfWriter::new(&self.config.scan);

        let total = doc.get_pages().len();
        let mut summary = RunSummary::default();
        for number in 1..=total as u32 {
            info!("Processing page {}/{}", number, total);
            let page = PageView::load(doc, number)?;
            let rebuilt = reconstructor.reconstruct(&page)?;
            debug!(
                "Page {}: {} fragment(s), {} pixel(s) whitened",
                number, rebuilt.fragments, rebuilt.whitened
            );
            writer.add_page(&rebuilt.image)?;

            summary.pages += 1;
            summary.pixels_whitened += rebuilt.whitened;
        }

        Ok((writer.finish()?, summary))
    }
}

/// Serialize `doc` next to `output` and rename it into place.
fn save_atomically(doc: &mut Document, output: &Path) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    doc.save_to(&mut file)
        .map_err(|e| PdfError::Write(e.to_string()))?;
    file.persist(output).map_err(|e| e.error)?;
    debug!("Wrote {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnmarkError;
    use crate::models::config::RasterEncoding;
    use crate::pdf::XObject;
    use crate::pdf::test_support::{document, form_stream, one_page_document, rgb_image_stream};
    use crate::transform::{AlwaysKeep, AlwaysRemove};
    use pretty_assertions::assert_eq;

    fn band(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        rgb.repeat((width * height) as usize)
    }

    fn write_input(dir: &Path, mut doc: Document) -> std::path::PathBuf {
        let path = dir.join("in.pdf");
        doc.save(&path).unwrap();
        path
    }

    fn image_count(doc: &Document, number: u32) -> usize {
        PageView::load(doc, number).unwrap().images().count()
    }

    #[test]
    fn test_end_to_end_image_removal() {
        let dir = tempfile::tempdir().unwrap();
        let (doc, _) = one_page_document(
            b"q 100 0 0 100 0 0 cm /Im0 Do Q BT (Body) Tj ET",
            vec![("Im0", rgb_image_stream(2, 2, &band(2, 2, [200, 200, 200])))],
        );
        let input = write_input(dir.path(), doc);
        let output = dir.path().join("out.pdf");
        let options = RemovalOptions {
            remove_images: true,
            ..RemovalOptions::default()
        };

        let summary = DocumentPipeline::new(UnmarkConfig::default(), Mode::Normal, options)
            .run(&input, &output, &mut AlwaysRemove)
            .unwrap();

        assert_eq!(summary.pages, 1);
        assert_eq!(summary.images_removed, 1);
        let result = DocumentPipeline::load(&output).unwrap();
        assert_eq!(image_count(&result, 1), 0);

        let content = result.get_page_content(result.get_pages()[&1]).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(!text.contains("Im0"));
        assert!(text.contains("Body"));
    }

    #[test]
    fn test_text_and_form_fallback_per_page() {
        let (doc, _) = document(vec![
            (b"BT (DRAFT copy) Tj ET".as_slice(), vec![]),
            (
                b"BT (Body) Tj ET /Fm0 Do".as_slice(),
                vec![("Fm0", form_stream(true, &["PDF", "Text"]))],
            ),
        ]);
        let options = RemovalOptions {
            watermark_text: Some("DRAFT".to_string()),
            ..RemovalOptions::default()
        };

        let (doc, summary) = DocumentPipeline::new(UnmarkConfig::default(), Mode::Normal, options)
            .process(doc, &mut AlwaysKeep)
            .unwrap();

        assert_eq!(summary.text_runs_erased, 1);
        assert_eq!(summary.forms_removed, 1);
        assert!(PageView::load(&doc, 2).unwrap().xobjects.is_empty());
    }

    #[test]
    fn test_config_disables_form_fallback() {
        let (doc, _) = one_page_document(
            b"BT (Body) Tj ET",
            vec![("Fm0", form_stream(true, &["Text"]))],
        );
        let mut config = UnmarkConfig::default();
        config.normal.form_fallback = false;
        let options = RemovalOptions {
            watermark_text: Some("DRAFT".to_string()),
            ..RemovalOptions::default()
        };

        let (doc, summary) = DocumentPipeline::new(config, Mode::Normal, options)
            .process(doc, &mut AlwaysKeep)
            .unwrap();

        assert_eq!(summary.forms_removed, 0);
        assert!(matches!(
            PageView::load(&doc, 1).unwrap().xobjects.get("Fm0"),
            Some(XObject::Form(_))
        ));
    }

    #[test]
    fn test_noop_run_preserves_pages() {
        let (doc, _) = one_page_document(
            b"/Im0 Do",
            vec![("Im0", rgb_image_stream(1, 1, &[1, 2, 3]))],
        );

        let (doc, summary) =
            DocumentPipeline::new(UnmarkConfig::default(), Mode::Normal, RemovalOptions::default())
                .process(doc, &mut AlwaysRemove)
                .unwrap();

        assert_eq!(summary, RunSummary { pages: 1, ..RunSummary::default() });
        assert_eq!(image_count(&doc, 1), 1);
    }

    #[test]
    fn test_scanned_pages_are_rebuilt() {
        let (doc, _) = document(vec![
            (
                b"".as_slice(),
                vec![
                    ("Im1", rgb_image_stream(40, 10, &band(40, 10, [90, 90, 90]))),
                    ("Im0", rgb_image_stream(40, 10, &band(40, 10, [250, 100, 100]))),
                ],
            ),
            (
                b"".as_slice(),
                vec![("Im0", rgb_image_stream(20, 20, &band(20, 20, [10, 10, 10])))],
            ),
        ]);
        let mut config = UnmarkConfig::default();
        config.scan.encoding = RasterEncoding::Flate;

        let (doc, summary) = DocumentPipeline::new(config, Mode::Scanned, RemovalOptions::default())
            .process(doc, &mut AlwaysKeep)
            .unwrap();

        assert_eq!(summary.pages, 2);
        assert_eq!(summary.pixels_whitened, 400);
        assert_eq!(doc.get_pages().len(), 2);

        let page = PageView::load(&doc, 1).unwrap();
        let (_, image) = page.images().next().unwrap();
        assert_eq!((image.width, image.height), (40, 20));
        // whitened red strip on top, gray strip below
        assert_eq!(&image.payload[..3], &[255, 255, 255]);
        assert_eq!(&image.payload[40 * 10 * 3..40 * 10 * 3 + 3], &[90, 90, 90]);
    }

    #[test]
    fn test_scanned_page_without_images_fails() {
        let (doc, _) = one_page_document(b"BT (text) Tj ET", vec![]);
        let pipeline = DocumentPipeline::new(
            UnmarkConfig::default(),
            Mode::Scanned,
            RemovalOptions::default(),
        );
        let result = pipeline.process(doc, &mut AlwaysKeep);
        assert!(matches!(result, Err(UnmarkError::Pdf(PdfError::NoImages(1)))));
    }

    #[test]
    fn test_failed_run_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let (doc, _) = one_page_document(b"", vec![]);
        let input = write_input(dir.path(), doc);
        let output = dir.path().join("out.pdf");

        let pipeline = DocumentPipeline::new(
            UnmarkConfig::default(),
            Mode::Scanned,
            RemovalOptions::default(),
        );
        let result = pipeline.run(&input, &output, &mut AlwaysKeep);

        assert!(result.is_err());
        assert!(!output.exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_empty_text_only_rejected_in_normal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let (doc, _) = one_page_document(
            b"",
            vec![("Im0", rgb_image_stream(4, 4, &band(4, 4, [30, 30, 30])))],
        );
        let input = write_input(dir.path(), doc);
        let output = dir.path().join("out.pdf");
        let options = RemovalOptions {
            watermark_text: Some(String::new()),
            ..RemovalOptions::default()
        };

        let normal = DocumentPipeline::new(UnmarkConfig::default(), Mode::Normal, options.clone());
        assert!(matches!(
            normal.run(&input, &output, &mut AlwaysKeep),
            Err(UnmarkError::Config(_))
        ));
        assert!(!output.exists());

        let scanned = DocumentPipeline::new(UnmarkConfig::default(), Mode::Scanned, options);
        let summary = scanned.run(&input, &output, &mut AlwaysKeep).unwrap();
        assert_eq!(summary.pages, 1);
        assert!(output.exists());
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DocumentPipeline::load(&dir.path().join("missing.pdf"));
        assert!(matches!(result, Err(UnmarkError::Io(_))));
    }

    #[test]
    fn test_garbage_input_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        fs::write(&path, b"not a pdf").unwrap();
        assert!(matches!(
            DocumentPipeline::load(&path),
            Err(UnmarkError::Pdf(PdfError::Parse(_)))
        ));
    }
}
