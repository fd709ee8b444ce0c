use crate::{
    config::Config,
    error::{Error, Result},
};
use chrono::{Local, SecondsFormat, Utc};
use quick_xml::escape::escape;
use std::{
    fs,
    io::{Cursor, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use zip::{CompressionMethod, ZipWriter, result::ZipResult, write::SimpleFileOptions};

/// Suffix appended to the input file stem.
pub const SUMMARY_SUFFIX: &str = "_summary.docx";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_FOOTER: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

/// Derives the summary file name for a source document.
///
/// `paper.pdf` becomes `paper_summary.docx`.
///
/// # Errors
///
/// Returns an error if `source` has no file name.
pub fn output_filename(source: &Path) -> Result<String> {
    let stem = source
        .file_stem()
        .ok_or_else(|| Error::document(source, "source path has no file name"))?;
    Ok(format!("{}{SUMMARY_SUFFIX}", stem.to_string_lossy()))
}

/// Writes summaries as single-paragraph `.docx` documents.
#[derive(Debug, Clone)]
pub struct DocxWriter {
    output_dir: PathBuf,
    backup_existing: bool,
}

impl DocxWriter {
    /// Creates a writer targeting `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            backup_existing: false,
        }
    }

    /// Creates a writer from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.output_path).with_backup(config.backup_existing)
    }

    /// Enables or disables backups of existing summaries.
    #[must_use]
    pub const fn with_backup(mut self, enabled: bool) -> Self {
        self.backup_existing = enabled;
        self
    }

    /// Directory summaries are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the summary of `source` is written to.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` has no file name.
    pub fn output_path(&self, source: &Path) -> Result<PathBuf> {
        Ok(self.output_dir.join(output_filename(source)?))
    }

    /// Writes `final_summary` as the summary of `source`, replacing any
    /// existing file of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Output directory cannot be created
    /// - The archive cannot be assembled
    /// - File write operations fail
    pub fn write_summary(&self, final_summary: &str, source: &Path) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;

        let path = self.output_path(source)?;
        let title = source
            .file_stem()
            .map(|stem| format!("{} summary", stem.to_string_lossy()))
            .unwrap_or_default();

        let bytes = render_docx(final_summary, &title).map_err(|e| Error::document(&path, e))?;
        self.write_file_atomic(&path, &bytes)?;

        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Writes a file atomically with optional backup.
    ///
    /// The content goes to a temporary sibling first, is synced to disk and
    /// then renamed over the target.
    fn write_file_atomic(&self, path: &Path, content: &[u8]) -> Result<()> {
        if path.exists() && self.backup_existing {
            backup_file(path)?;
        }

        let temp_path = path.with_extension("docx.tmp");
        let result = write_and_rename(&temp_path, path, content);

        if result.is_err() && temp_path.exists() {
            if let Err(e) = fs::remove_file(&temp_path) {
                warn!("Failed to remove {}: {}", temp_path.display(), e);
            }
        }

        result
    }
}

/// Writes `content` to `temp_path`, syncs it and renames it to `path`.
fn write_and_rename(temp_path: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_file = fs::File::create(temp_path).map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;

    drop(temp_file);

    fs::rename(temp_path, path).map_err(|e| Error::io(path, e))
}

/// Copies an existing file to `<name>.backup.<timestamp>` beside it.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let filename = path
        .file_name()
        .ok_or_else(|| Error::document(path, "invalid file path"))?
        .to_string_lossy();

    let timestamp = Local::now().format("%Y%m%dT%H%M%S%.f");
    let backup_path = path.with_file_name(format!("{filename}.backup.{timestamp}"));

    fs::copy(path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;

    debug!("Created backup: {}", backup_path.display());
    Ok(backup_path)
}

/// Assembles a minimal WordprocessingML package holding `text` as one
/// paragraph.
fn render_docx(text: &str, title: &str) -> ZipResult<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS_XML.as_bytes())?;

    zip.start_file("docProps/core.xml", options)?;
    zip.write_all(core_properties(title).as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(DOCUMENT_HEADER.as_bytes())?;
    zip.write_all(paragraph(text).as_bytes())?;
    zip.write_all(DOCUMENT_FOOTER.as_bytes())?;

    Ok(zip.finish()?.into_inner())
}

fn core_properties(title: &str) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{}</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#,
        escape(sanitize(title).as_str()),
        env!("CARGO_PKG_NAME"),
    )
}

/// Renders `text` as a `<w:p>` element with a single run.
///
/// Newlines become `<w:br/>` and tabs `<w:tab/>`.
fn paragraph(text: &str) -> String {
    let text = sanitize(text);
    let mut xml = String::with_capacity(text.len() + 64);
    xml.push_str("<w:p><w:r>");

    let mut pending = String::new();
    let flush = |xml: &mut String, pending: &mut String| {
        if !pending.is_empty() {
            xml.push_str(r#"<w:t xml:space="preserve">"#);
            xml.push_str(&escape(pending.as_str()));
            xml.push_str("</w:t>");
            pending.clear();
        }
    };

    for ch in text.chars() {
        match ch {
            '\n' => {
                flush(&mut xml, &mut pending);
                xml.push_str("<w:br/>");
            }
            '\t' => {
                flush(&mut xml, &mut pending);
                xml.push_str("<w:tab/>");
            }
            _ => pending.push(ch),
        }
    }
    flush(&mut xml, &mut pending);

    xml.push_str("</w:r></w:p>");
    xml
}

/// Normalizes line endings and drops characters XML 1.0 cannot carry.
fn sanitize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .filter(|&ch| is_xml_char(ch))
        .collect()
}

const fn is_xml_char(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_part(path: &Path, name: &str) -> String {
        let file = fs::File::open(path).unwrap();
        let mut archive = ZipArchive::new(file).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            output_filename(Path::new("pdfs/paper.pdf")).unwrap(),
            "paper_summary.docx"
        );
        assert_eq!(
            output_filename(Path::new("a.b.c.pdf")).unwrap(),
            "a.b.c_summary.docx"
        );
        assert_eq!(output_filename(Path::new("noext")).unwrap(), "noext_summary.docx");
        assert!(output_filename(Path::new("/")).is_err());
    }

    #[test]
    fn test_writer_creates_output_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output_dir = temp.child("nested/summaries");

        let writer = DocxWriter::new(output_dir.path());
        let path = writer.write_summary("text", Path::new("paper.pdf")).unwrap();

        output_dir.assert(predicates::path::is_dir());
        assert_eq!(path, output_dir.path().join("paper_summary.docx"));
        assert!(path.is_file());
    }

    #[test]
    fn test_archive_structure() {
        let temp = assert_fs::TempDir::new().unwrap();
        let writer = DocxWriter::new(temp.path());
        let path = writer.write_summary("hello", Path::new("paper.pdf")).unwrap();

        let file = fs::File::open(&path).unwrap();
        let archive = ZipArchive::new(file).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "word/document.xml"
            ]
        );

        let core = read_part(&path, "docProps/core.xml");
        assert!(core.contains("<dc:title>paper summary</dc:title>"));
    }

    #[test]
    fn test_single_paragraph_with_breaks() {
        let temp = assert_fs::TempDir::new().unwrap();
        let writer = DocxWriter::new(temp.path());
        let path = writer
            .write_summary("- one\n- two\tx\n", Path::new("paper.pdf"))
            .unwrap();

        let document = read_part(&path, "word/document.xml");
        assert_eq!(document.matches("<w:p>").count(), 1);
        assert!(document.contains(
            r#"<w:t xml:space="preserve">- one</w:t><w:br/><w:t xml:space="preserve">- two</w:t><w:tab/><w:t xml:space="preserve">x</w:t><w:br/>"#
        ));
    }

    #[test]
    fn test_text_is_escaped_and_sanitized() {
        let xml = paragraph("a < b & \"c\"\u{0}\u{7}\r\nd");
        assert!(xml.contains("a &lt; b &amp; &quot;c&quot;"));
        assert!(!xml.contains('\u{0}'));
        assert!(!xml.contains('\u{7}'));
        assert!(xml.contains("<w:br/><w:t xml:space=\"preserve\">d</w:t>"));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(paragraph(""), "<w:p><w:r></w:r></w:p>");

        let temp = assert_fs::TempDir::new().unwrap();
        let path = DocxWriter::new(temp.path())
            .write_summary("", Path::new("empty.pdf"))
            .unwrap();
        assert!(read_part(&path, "word/document.xml").contains("<w:p><w:r></w:r></w:p>"));
    }

    #[test]
    fn test_overwrites_without_backup() {
        let temp = assert_fs::TempDir::new().unwrap();
        let writer = DocxWriter::new(temp.path());

        writer.write_summary("first", Path::new("paper.pdf")).unwrap();
        let path = writer.write_summary("second", Path::new("paper.pdf")).unwrap();

        assert!(read_part(&path, "word/document.xml").contains("second"));
        let entries = fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_writer_creates_backup() {
        let temp = assert_fs::TempDir::new().unwrap();
        let writer = DocxWriter::new(temp.path()).with_backup(true);

        writer.write_summary("first", Path::new("paper.pdf")).unwrap();
        writer.write_summary("second", Path::new("paper.pdf")).unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|name| name.starts_with("paper_summary.docx.backup.")));
        assert!(!entries.iter().any(|name| name.ends_with(".tmp")));
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        // A directory in the way makes the final rename fail
        temp.child("paper_summary.docx").create_dir_all().unwrap();
        let writer = DocxWriter::new(temp.path());

        let err = writer.write_summary("text", Path::new("paper.pdf")).unwrap_err();

        assert!(err.is_io());
        temp.child("paper_summary.docx.tmp")
            .assert(predicates::path::missing());
    }
}
