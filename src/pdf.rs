use crate::error::{Error, Result};
use globset::{Glob, GlobMatcher};
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Default pattern for input documents.
pub const DEFAULT_PDF_PATTERN: &str = "*.pdf";

/// Ordered, random-access source of page text.
///
/// Page indices are 0-based. `extract_text` returns `Ok(None)` when a page
/// exists but carries no text (for example a scanned, image-only page).
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Extracts the text of the page at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be decoded.
    fn extract_text(&self, index: usize) -> Result<Option<String>>;

    /// Where the pages come from, for error messages.
    fn origin(&self) -> &Path {
        Path::new("<memory>")
    }
}

impl PageSource for [Option<String>] {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn extract_text(&self, index: usize) -> Result<Option<String>> {
        self.get(index)
            .cloned()
            .ok_or_else(|| Error::extraction(self.origin(), index + 1, "page out of range"))
    }
}

impl PageSource for [String] {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn extract_text(&self, index: usize) -> Result<Option<String>> {
        self.get(index)
            .map(|text| Some(text.clone()))
            .ok_or_else(|| Error::extraction(self.origin(), index + 1, "page out of range"))
    }
}

/// A PDF loaded from disk.
///
/// The whole document is held in memory and released when the value is
/// dropped.
pub struct PdfDocument {
    path: PathBuf,
    document: Document,
    page_numbers: Vec<u32>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("path", &self.path)
            .field("pages", &self.page_numbers.len())
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Loads and parses the PDF at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid PDF.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "PDF file not found"),
            ));
        }

        let document = Document::load(path).map_err(|e| Error::pdf(path, e))?;
        if document.is_encrypted() {
            warn!("'{}' is encrypted; extracted text may be empty", path.display());
        }

        // BTreeMap keys: page numbers in reading order
        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        debug!("Opened '{}' ({} pages)", path.display(), page_numbers.len());

        Ok(Self {
            path: path.to_path_buf(),
            document,
            page_numbers,
        })
    }

    /// Path the document was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn extract_text(&self, index: usize) -> Result<Option<String>> {
        let page_number = *self
            .page_numbers
            .get(index)
            .ok_or_else(|| Error::extraction(&self.path, index + 1, "page out of range"))?;

        let text = self
            .document
            .extract_text(&[page_number])
            .map_err(|e| Error::extraction(&self.path, index + 1, e.to_string()))?;

        trace!("Extracted {} bytes from page {}", text.len(), page_number);

        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn origin(&self) -> &Path {
        &self.path
    }
}

/// Compiles a file-name pattern such as `*.pdf`.
///
/// # Errors
///
/// Returns an error if the pattern is not a valid glob.
pub(crate) fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| Error::invalid_pattern(pattern, e.kind().to_string()))
}

/// Lists the files directly inside `dir` whose names match `pattern`.
///
/// Symlinks are followed. Hidden entries, directories and broken links are
/// skipped, subdirectories are not searched, and the result is sorted so runs
/// are reproducible.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or the directory cannot be read.
pub fn discover(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = compile_pattern(pattern)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            // Broken links inside the directory
            Err(e) if e.depth() > 0 => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                return Err(match e.into_io_error() {
                    Some(io) => Error::io(path, io),
                    None => Error::io(path, std::io::Error::other("directory walk failed")),
                });
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            trace!("Skipping hidden file: {}", name);
            continue;
        }

        if matcher.is_match(name.as_ref()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!(
        "Found {} file(s) matching '{}' in {}",
        files.len(),
        pattern,
        dir.display()
    );
    Ok(files)
}
