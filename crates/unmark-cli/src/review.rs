//! Interactive image review on the terminal.

use std::io::{self, BufRead};

use console::{Term, style};
use image::ImageFormat;
use tracing::debug;

use unmark_core::{Result, UnmarkError};
use unmark_core::transform::{RemovalReviewer, ReviewCandidate};

/// Asks the user about every candidate image.
///
/// The decoded image is written to a temporary PNG whose path is printed so
/// it can be opened in a viewer; the file is deleted once answered. Answers
/// are read line by line from stdin; end of input aborts the run.
pub struct TerminalReviewer {
    term: Term,
}

impl TerminalReviewer {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn ask(&self, question: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        loop {
            self.term
                .write_line(&format!("{} {}", style("?").cyan(), question))?;
            let mut answer = String::new();
            if input.read_line(&mut answer)? == 0 {
                return Err(UnmarkError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "no answer to image review (stdin closed); use --review remove|keep",
                )));
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                other => debug!("Ignoring answer {:?}", other),
            }
        }
    }
}

impl RemovalReviewer for TerminalReviewer {
    fn review(&mut self, candidate: &ReviewCandidate<'_>) -> Result<bool> {
        self.term.write_line(&format!(
            "{} Page {}, image {} ({}x{})",
            style("ℹ").blue(),
            candidate.page,
            candidate.name,
            candidate.width,
            candidate.height
        ))?;

        let Some(image) = candidate.image else {
            return self.ask("Cannot display image... Shall we try to remove it or not? y/n");
        };

        let preview = tempfile::Builder::new()
            .prefix("unmark-preview-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(preview.path(), ImageFormat::Png)?;
        self.term.write_line(&format!(
            "  Preview: {}",
            style(preview.path().display()).underlined()
        ))?;

        self.ask("Should we remove this image? y/n")
    }
}
