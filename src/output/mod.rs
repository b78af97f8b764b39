//! Writing OCR results to disk.

use std::{
    collections::{BTreeSet, HashSet},
    fmt, fs,
};

use clap::ValueEnum;

use crate::{fonts::FontLocator, inputs::DocumentRef, ocr::OcrResult, prelude::*};

pub mod markdown;
pub mod pdf;
pub mod text;

/// The files we know how to write.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Markdown, with extracted images saved alongside.
    Markdown,
    /// Plain text with Markdown syntax removed.
    Text,
    /// The complete OCR response.
    Json,
    /// A text-only PDF.
    Pdf,
}

impl OutputFormat {
    /// Appended to the document's base name to get the output file name.
    pub fn suffix(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "_OCR.md",
            OutputFormat::Text => "_OCR.txt",
            OutputFormat::Json => "_OCR.json",
            OutputFormat::Pdf => "_OCR文本版本.pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

/// Writes every requested format for a document.
pub struct OutputWriter<'a> {
    /// Where to write. `None` means next to each source document.
    output_dir: Option<PathBuf>,
    formats: BTreeSet<OutputFormat>,
    fonts: &'a FontLocator,
}

impl<'a> OutputWriter<'a> {
    pub fn new(
        output_dir: Option<PathBuf>,
        formats: BTreeSet<OutputFormat>,
        fonts: &'a FontLocator,
    ) -> Self {
        Self {
            output_dir,
            formats,
            fonts,
        }
    }

    /// The directory outputs for `doc` go in.
    pub fn dir_for(&self, doc: &DocumentRef) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => match doc.path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
                _ => PathBuf::from("."),
            },
        }
    }

    /// Where a given format for `doc` will be written.
    pub fn path_for(&self, doc: &DocumentRef, format: OutputFormat) -> PathBuf {
        self.dir_for(doc)
            .join(format!("{}{}", doc.base_name(), format.suffix()))
    }

    /// Documents whose outputs would overwrite those of an earlier document
    /// in `docs`, like `a.pdf` and `a.png` in the same directory.
    pub fn colliding_documents<'d>(&self, docs: &'d [DocumentRef]) -> Vec<&'d DocumentRef> {
        let mut seen = HashSet::new();
        docs.iter()
            .filter(|doc| !seen.insert((self.dir_for(doc), doc.base_name())))
            .collect()
    }

    /// Write each format. A failure in one format does not stop the others.
    #[instrument(level = "debug", skip_all, fields(doc = %doc))]
    pub fn write_all(
        &self,
        doc: &DocumentRef,
        result: &OcrResult,
    ) -> Vec<(OutputFormat, Result<PathBuf>)> {
        let dir = self.dir_for(doc);
        if let Err(err) = fs::create_dir_all(&dir) {
            return self
                .formats
                .iter()
                .map(|&format| {
                    let err = anyhow!("cannot create output directory {:?}: {err}", dir);
                    (format, Err(err))
                })
                .collect();
        }
        self.formats
            .iter()
            .map(|&format| {
                let path = self.path_for(doc, format);
                let written = self.write_one(doc, result, format, &path).map(|()| path);
                match &written {
                    Ok(path) => info!(%format, path = %path.display(), "Wrote output"),
                    Err(err) => error!(%format, "Cannot write output: {err:#}"),
                }
                (format, written)
            })
            .collect()
    }

    fn write_one(
        &self,
        doc: &DocumentRef,
        result: &OcrResult,
        format: OutputFormat,
        path: &Path,
    ) -> Result<()> {
        match format {
            OutputFormat::Markdown => {
                markdown::write_markdown(path, &doc.base_name(), result)
            }
            OutputFormat::Text => fs::write(path, text::render_text(result))
                .with_context(|| format!("cannot write {:?}", path)),
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(result)
                    .context("cannot serialize OCR result")?;
                json.push('\n');
                fs::write(path, json).with_context(|| format!("cannot write {:?}", path))
            }
            OutputFormat::Pdf => {
                let title = format!("OCR text version - {}", doc.file_name());
                pdf::write_pdf(
                    path,
                    &title,
                    &text::render_text(result),
                    self.fonts.select(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::ocr::OcrPage;

    fn sample_result() -> OcrResult {
        OcrResult {
            pages: vec![
                OcrPage {
                    index: 0,
                    markdown: "# 标题\n\nFirst page".to_owned(),
                    ..OcrPage::default()
                },
                OcrPage {
                    index: 1,
                    markdown: "Second **page**".to_owned(),
                    ..OcrPage::default()
                },
            ],
            ..OcrResult::default()
        }
    }

    fn no_fonts() -> FontLocator {
        FontLocator::new(vec![PathBuf::from("/nonexistent/font.ttc")])
    }

    #[test]
    fn markdown_and_pdf_make_two_distinct_files() {
        let dir = TempDir::new().unwrap();
        let fonts = no_fonts();
        let writer = OutputWriter::new(
            Some(dir.path().join("out")),
            [OutputFormat::Markdown, OutputFormat::Pdf].into(),
            &fonts,
        );
        let doc = DocumentRef::new(PathBuf::from("/somewhere/scan.pdf")).unwrap();

        let written = writer.write_all(&doc, &sample_result());
        let paths = written
            .into_iter()
            .map(|(_, path)| path.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            [
                dir.path().join("out/scan_OCR.md"),
                dir.path().join("out/scan_OCR文本版本.pdf"),
            ]
        );
        let files = fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(files, 2);
        assert!(fs::read(&paths[1]).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn json_round_trips() {
        let dir = TempDir::new().unwrap();
        let fonts = no_fonts();
        let writer = OutputWriter::new(None, [OutputFormat::Json].into(), &fonts);
        let doc = DocumentRef::new(dir.path().join("photo.JPG")).unwrap();
        let result = sample_result();

        let written = writer.write_all(&doc, &result);
        let path = written[0].1.as_ref().unwrap();
        assert_eq!(path, &dir.path().join("photo_OCR.json"));
        let parsed: OcrResult =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn markdown_has_one_marker_per_page_and_text_is_plain() {
        let dir = TempDir::new().unwrap();
        let fonts = no_fonts();
        let writer = OutputWriter::new(
            Some(dir.path().to_owned()),
            [OutputFormat::Text, OutputFormat::Markdown].into(),
            &fonts,
        );
        let doc = DocumentRef::new(PathBuf::from("a.png")).unwrap();
        writer.write_all(&doc, &sample_result());

        let md = fs::read_to_string(dir.path().join("a_OCR.md")).unwrap();
        assert_eq!(md.matches(markdown::PAGE_BREAK_MARKER).count(), 2);
        let txt = fs::read_to_string(dir.path().join("a_OCR.txt")).unwrap();
        assert_eq!(txt, "标题\n\nFirst page\n\nSecond page\n");
    }

    #[test]
    fn unwritable_directory_fails_every_format() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();
        let fonts = no_fonts();
        let writer = OutputWriter::new(
            Some(blocker.join("sub")),
            [OutputFormat::Markdown, OutputFormat::Json].into(),
            &fonts,
        );
        let doc = DocumentRef::new(PathBuf::from("a.pdf")).unwrap();
        let written = writer.write_all(&doc, &sample_result());
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|(_, r)| r.is_err()));
    }

    #[test]
    fn documents_sharing_a_base_name_collide() {
        let fonts = no_fonts();
        let writer = OutputWriter::new(None, [OutputFormat::Markdown].into(), &fonts);
        let docs = ["in/a.pdf", "in/a.png", "in/b.pdf", "other/a.jpg"]
            .into_iter()
            .map(|p| DocumentRef::new(PathBuf::from(p)).unwrap())
            .collect::<Vec<_>>();
        let colliding = writer.colliding_documents(&docs);
        assert_eq!(colliding, [&docs[1]]);

        let shared = OutputWriter::new(
            Some(PathBuf::from("out")),
            [OutputFormat::Markdown].into(),
            &fonts,
        );
        assert_eq!(shared.colliding_documents(&docs), [&docs[1], &docs[3]]);
    }

    #[test]
    fn default_output_dir_is_next_to_the_document() {
        let fonts = no_fonts();
        let writer = OutputWriter::new(None, [OutputFormat::Markdown].into(), &fonts);
        let doc = DocumentRef::new(PathBuf::from("docs/report.pdf")).unwrap();
        assert_eq!(
            writer.path_for(&doc, OutputFormat::Markdown),
            PathBuf::from("docs/report_OCR.md")
        );
        let bare = DocumentRef::new(PathBuf::from("report.pdf")).unwrap();
        assert_eq!(writer.dir_for(&bare), PathBuf::from("."));
    }
}
