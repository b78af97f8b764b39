//! Command-line entry points.

use std::collections::BTreeSet;

use crate::{output::OutputFormat, prelude::*};

pub mod interactive;
pub mod ocr;

/// What to process and what to write, however we found out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// A document or a directory of documents.
    pub input: PathBuf,

    /// Where to write outputs. `None` means next to each document.
    pub output_dir: Option<PathBuf>,

    pub formats: BTreeSet<OutputFormat>,
}

/// Combine `--format` values and the `--pdf` switch. Markdown is the default.
pub fn effective_formats(requested: &[OutputFormat], pdf: bool) -> BTreeSet<OutputFormat> {
    let mut formats = requested.iter().copied().collect::<BTreeSet<_>>();
    if formats.is_empty() {
        formats.insert(OutputFormat::Markdown);
    }
    if pdf {
        formats.insert(OutputFormat::Pdf);
    }
    formats
}
