use crate::error::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

/// Maximum prompt template file size (1MB)
const MAX_TEMPLATE_SIZE: u64 = 1024 * 1024;

const TEMPLATE_NAME: &str = "prompt";

/// Variable every prompt template must reference.
const REQUIRED_VARIABLE: &str = "segment";

/// Instruction appended after each segment.
pub const DEFAULT_INSTRUCTION: &str = "Summarize this section of a paper for further analysis and code development. \
Include the key findings, methodology, experimental results, statistical analysis, and any limitations. \
Ensure the summary is clear, concise, and coherent. Provide context about the field of study and research question. \
Format the summary with bullet points for easy reference.";

/// Values available to a prompt template.
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext<'a> {
    /// Segment text to summarize
    pub segment: &'a str,

    /// File name of the source document
    pub source: &'a str,

    /// Position of the segment (1-based)
    pub segment_index: usize,

    /// Number of segments in the document
    pub segment_count: usize,
}

impl<'a> PromptContext<'a> {
    /// Context for a lone segment with no document information.
    #[must_use]
    pub const fn bare(segment: &'a str) -> Self {
        Self {
            segment,
            source: "",
            segment_index: 1,
            segment_count: 1,
        }
    }
}

/// Renders the prompt sent with each segment.
pub struct PromptTemplate {
    tera: Tera,
    origin: String,
}

impl std::fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl PromptTemplate {
    /// The built-in template: the segment, a newline, then the instruction.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in template fails to compile.
    pub fn builtin() -> Result<Self> {
        let source = format!("{{{{ {REQUIRED_VARIABLE} }}}}\n{DEFAULT_INSTRUCTION}");
        Self::from_source("builtin", &source)
    }

    /// Loads and validates a template file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, larger than 1MB, empty,
    /// does not compile, or never references `segment`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let origin = path.to_string_lossy().to_string();

        if !path.is_file() {
            return Err(Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "Template file not found"),
            ));
        }

        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
        if metadata.len() > MAX_TEMPLATE_SIZE {
            return Err(Error::template_validation(
                origin,
                format!(
                    "Template file too large: {} bytes (max: {} bytes)",
                    metadata.len(),
                    MAX_TEMPLATE_SIZE
                ),
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        if content.trim().is_empty() {
            return Err(Error::template_validation(origin, "Template file is empty"));
        }

        Self::from_source(origin, &content)
    }

    /// Compiles a template from its source text.
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not compile or never references
    /// `segment`.
    pub fn from_source(origin: impl Into<String>, source: &str) -> Result<Self> {
        let origin = origin.into();

        if !references_variable(source, REQUIRED_VARIABLE) {
            return Err(Error::template_validation(
                origin,
                format!("Template must reference the '{REQUIRED_VARIABLE}' variable"),
            ));
        }

        let mut tera = Tera::default();
        // No autoescaping: prompts are plain text
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, source)
            .map_err(|e| Error::template(origin.as_str(), &e))?;

        Ok(Self { tera, origin })
    }

    /// Renders the prompt for one segment.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, context: &PromptContext<'_>) -> Result<String> {
        let tera_context =
            Context::from_serialize(context).map_err(|e| Error::template(self.origin.as_str(), &e))?;

        self.tera
            .render(TEMPLATE_NAME, &tera_context)
            .map_err(|e| Error::template(self.origin.as_str(), &e))
    }

    /// Where the template came from (`builtin` or a file path).
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Returns true if `name` appears as a whole identifier inside a `{{ }}` or
/// `{% %}` block.
fn references_variable(source: &str, name: &str) -> bool {
    [("{{", "}}"), ("{%", "%}")].iter().any(|(open, close)| {
        source
            .split(open)
            .skip(1)
            .filter_map(|rest| rest.split_once(close).map(|(expr, _)| expr))
            .any(|expr| {
                expr.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                    .any(|ident| ident == name || ident.split('.').next() == Some(name))
            })
    })
}
