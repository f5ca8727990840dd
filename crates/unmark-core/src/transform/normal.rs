//! Image, text and form watermark removal for vector/text pages.

use lopdf::Document;
use tracing::{debug, info, warn};

use super::review::{RemovalReviewer, ReviewCandidate};
use super::text::erase_text;
use crate::error::{Result, UnmarkError};
use crate::pdf::{PageView, XObject};
use crate::raster::{decode_with, review_chain};

/// What to remove from normal pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOptions {
    /// Offer every image XObject to the reviewer.
    pub remove_images: bool,
    /// Erase text runs starting with this string.
    pub watermark_text: Option<String>,
    /// Remove text-capable forms when no text run matched.
    pub form_fallback: bool,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            remove_images: false,
            watermark_text: None,
            form_fallback: true,
        }
    }
}

impl RemovalOptions {
    /// True when neither images nor text are targeted.
    pub fn is_noop(&self) -> bool {
        !self.remove_images && self.watermark_text.is_none()
    }

    /// Reject an empty watermark text, which would match every text run.
    pub fn validate(&self) -> Result<()> {
        if self.watermark_text.as_deref() == Some("") {
            return Err(UnmarkError::Config("watermark text must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Result of transforming one page.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    /// The transformed page.
    pub page: PageView,
    /// Image XObjects removed after review.
    pub images_removed: usize,
    /// Text-show operations blanked.
    pub text_runs_erased: usize,
    /// Form XObjects removed by the fallback.
    pub forms_removed: usize,
}

/// Applies [`RemovalOptions`] to vector/text pages.
pub struct NormalPageTransformer {
    options: RemovalOptions,
}

impl NormalPageTransformer {
    /// Create a transformer.
    pub fn new(options: RemovalOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &RemovalOptions {
        &self.options
    }

    /// Image removal, then text removal (with the form fallback).
    ///
    /// `doc` is only read, to decode the content stream when text removal is
    /// requested.
    pub fn transform(
        &self,
        page: PageView,
        doc: &Document,
        reviewer: &mut dyn RemovalReviewer,
    ) -> Result<PageOutcome> {
        let mut outcome = PageOutcome {
            page,
            images_removed: 0,
            text_runs_erased: 0,
            forms_removed: 0,
        };

        if self.options.remove_images {
            let (page, removed) = remove_images(outcome.page, reviewer)?;
            outcome.page = page;
            outcome.images_removed = removed;
        }

        if let Some(watermark) = self.options.watermark_text.as_deref() {
            let (page, erased) = remove_text(outcome.page, doc, watermark)?;
            outcome.page = page;
            outcome.text_runs_erased = erased;

            if erased == 0 && self.options.form_fallback {
                let (page, removed) = remove_forms(outcome.page);
                outcome.page = page;
                outcome.forms_removed = removed;
            }
        }

        Ok(outcome)
    }
}

/// Offer each image XObject to `reviewer` and drop the confirmed ones.
pub fn remove_images(
    mut page: PageView,
    reviewer: &mut dyn RemovalReviewer,
) -> Result<(PageView, usize)> {
    let mut doomed = Vec::new();

    for (name, image) in page.images() {
        let preview = match decode_with(review_chain(image), name, image) {
            Ok((_, decoded)) => Some(decoded),
            Err(e) => {
                warn!("Page {}: cannot decode image {}: {}", page.number, name, e);
                None
            }
        };
        let candidate = ReviewCandidate {
            page: page.number,
            name,
            width: image.width,
            height: image.height,
            image: preview.as_ref(),
        };
        if reviewer.review(&candidate)? {
            doomed.push(name.to_string());
        }
    }

    for name in &doomed {
        page.xobjects.remove(name);
        info!("Page {}: removing image {}", page.number, name);
    }
    Ok((page, doomed.len()))
}

/// Blank text runs starting with `watermark`.
pub fn remove_text(
    mut page: PageView,
    doc: &Document,
    watermark: &str,
) -> Result<(PageView, usize)> {
    page.load_content(doc)?;
    let mut operations = page.operations().map(<[_]>::to_vec).unwrap_or_default();

    let erased = erase_text(&mut operations, watermark);
    if erased > 0 {
        info!("Page {}: erased {} text run(s)", page.number, erased);
        page.set_operations(operations);
    } else {
        debug!("Page {}: no text run starts with {:?}", page.number, watermark);
    }
    Ok((page, erased))
}

/// Drop every bounded form declaring the `/Text` procedure set.
pub fn remove_forms(mut page: PageView) -> (PageView, usize) {
    let doomed: Vec<String> = page
        .xobjects
        .iter()
        .filter(|(_, xobject)| matches!(xobject, XObject::Form(form) if form.renders_text()))
        .map(|(name, _)| name.clone())
        .collect();

    for name in &doomed {
        page.xobjects.remove(name);
        info!("Page {}: removing text form {}", page.number, name);
    }
    (page, doomed.len())
}
