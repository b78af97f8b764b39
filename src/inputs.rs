//! Finding the documents we were asked to OCR.

use std::{fmt, fs, io};

use crate::prelude::*;

/// The kinds of document the OCR service accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    /// Classify a path by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// The MIME type we send along with the document.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// A document that has been found on disk and classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub kind: DocumentKind,
}

impl DocumentRef {
    /// Build a reference if `path` has a supported extension.
    pub fn new(path: PathBuf) -> Option<Self> {
        let kind = DocumentKind::from_path(&path)?;
        Some(Self { path, kind })
    }

    /// The file name without its extension, used to name output files.
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_owned())
    }

    /// The file name, for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Reasons we could not build a document list.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{0:?} does not exist or is not a file or directory")]
    NotFound(PathBuf),

    #[error("unsupported file type {0:?} (supported: PDF, PNG, JPG, JPEG)")]
    Unsupported(PathBuf),

    #[error("no supported documents (PDF, PNG, JPG, JPEG) found in {0:?}")]
    EmptyDirectory(PathBuf),

    #[error("cannot read directory {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Remove whitespace and any wrapping quotes from a path typed (or
/// drag-and-dropped) by a user.
pub fn strip_quotes(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '\'' || c == '"')
}

/// Resolve a file or directory into the documents it names.
///
/// Directories are not searched recursively. Results are sorted by file name.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn resolve_documents(path: &Path) -> Result<Vec<DocumentRef>, InputError> {
    if path.is_file() {
        return DocumentRef::new(path.to_owned())
            .map(|doc| vec![doc])
            .ok_or_else(|| InputError::Unsupported(path.to_owned()));
    }
    if !path.is_dir() {
        return Err(InputError::NotFound(path.to_owned()));
    }

    let io_err = |source: io::Error| InputError::Io {
        path: path.to_owned(),
        source,
    };
    let mut docs = vec![];
    for entry in fs::read_dir(path).map_err(io_err)? {
        let entry_path = entry.map_err(io_err)?.path();
        if !entry_path.is_file() {
            continue;
        }
        match DocumentKind::from_path(&entry_path) {
            Some(kind) => docs.push(DocumentRef {
                path: entry_path,
                kind,
            }),
            None => debug!(path = %entry_path.display(), "Skipping unsupported file"),
        }
    }
    if docs.is_empty() {
        return Err(InputError::EmptyDirectory(path.to_owned()));
    }
    docs.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn classifies_extensions_in_any_case() {
        for name in ["a.pdf", "a.PDF", "a.png", "a.Png", "a.jpg", "a.JPEG"] {
            assert!(DocumentKind::from_path(Path::new(name)).is_some(), "{name}");
        }
        for name in ["a.txt", "a.gif", "pdf", "a.pdf.bak", "a"] {
            assert!(DocumentKind::from_path(Path::new(name)).is_none(), "{name}");
        }
        assert_eq!(
            DocumentKind::from_path(Path::new("x.JPG")),
            Some(DocumentKind::Jpeg)
        );
    }

    #[test]
    fn directory_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "c.txt");
        touch(dir.path(), "b.PNG");
        touch(dir.path(), "a.pdf");
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let docs = resolve_documents(dir.path()).unwrap();
        let names = docs.iter().map(|d| d.file_name()).collect::<Vec<_>>();
        assert_eq!(names, ["a.pdf", "b.PNG"]);
        assert_eq!(docs[1].kind, DocumentKind::Png);
    }

    #[test]
    fn single_file_must_be_supported() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "scan.JPG");
        touch(dir.path(), "notes.txt");

        let docs = resolve_documents(&dir.path().join("scan.JPG")).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].base_name(), "scan");

        assert!(matches!(
            resolve_documents(&dir.path().join("notes.txt")),
            Err(InputError::Unsupported(_))
        ));
    }

    #[test]
    fn missing_paths_and_empty_directories_fail() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolve_documents(&dir.path().join("nope.pdf")),
            Err(InputError::NotFound(_))
        ));
        touch(dir.path(), "readme.md");
        assert!(matches!(
            resolve_documents(dir.path()),
            Err(InputError::EmptyDirectory(_))
        ));
    }

    #[test]
    fn strips_wrapping_quotes() {
        assert_eq!(strip_quotes("  '/tmp/a b.pdf' "), "/tmp/a b.pdf");
        assert_eq!(strip_quotes("\"/tmp/x.png\"\n"), "/tmp/x.png");
        assert_eq!(strip_quotes("/tmp/plain.pdf"), "/tmp/plain.pdf");
    }
}
