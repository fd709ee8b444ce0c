use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the pdf-summarize library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// Invalid input file pattern.
    #[error("Invalid file pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The invalid pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// The PDF could not be loaded.
    #[error("Failed to open PDF '{path}': {message}")]
    Pdf {
        /// Path to the PDF
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Text could not be extracted from a page.
    #[error("Failed to extract text from page {page} of '{path}': {message}")]
    Extraction {
        /// Path to the PDF
        path: PathBuf,
        /// Page number (1-based)
        page: usize,
        /// Error message
        message: String,
    },

    /// The tokenizer vocabulary for a model could not be resolved.
    #[error("Tokenizer for model '{model}' is unavailable: {message}")]
    Tokenizer {
        /// Model identifier
        model: String,
        /// Error message
        message: String,
    },

    /// Prompt template error.
    #[error("Prompt template '{template}' failed: {message}")]
    Template {
        /// Template name or path
        template: String,
        /// Error message
        message: String,
    },

    /// The completion request failed.
    #[error("Summarization request failed: {message}")]
    Summarization {
        /// Error message
        message: String,
    },

    /// The output document could not be assembled.
    #[error("Failed to build document '{path}': {message}")]
    Document {
        /// Output path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// JSON or YAML serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a PDF load error.
    #[must_use]
    pub fn pdf(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Pdf {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Creates a page extraction error. `page` is 1-based.
    #[must_use]
    pub fn extraction(path: impl Into<PathBuf>, page: usize, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            page,
            message: message.into(),
        }
    }

    /// Creates a tokenizer error.
    #[must_use]
    pub fn tokenizer(model: impl Into<String>, message: impl ToString) -> Self {
        Self::Tokenizer {
            model: model.into(),
            message: message.to_string(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: &tera::Error) -> Self {
        // Tera keeps the useful part of the message in the source chain
        let mut message = source.to_string();
        let mut cause = std::error::Error::source(source);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        Self::Template {
            template: template.into(),
            message,
        }
    }

    /// Creates a template validation error.
    #[must_use]
    pub fn template_validation(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Creates a summarization error.
    #[must_use]
    pub fn summarization(message: impl Into<String>) -> Self {
        Self::Summarization {
            message: message.into(),
        }
    }

    /// Creates a document assembly error.
    #[must_use]
    pub fn document(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Document {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidPattern { .. })
    }

    /// Returns true if page text could not be extracted.
    #[must_use]
    pub const fn is_extraction(&self) -> bool {
        matches!(self, Self::Extraction { .. })
    }

    /// Returns true if the completion endpoint failed.
    #[must_use]
    pub const fn is_summarization(&self) -> bool {
        matches!(self, Self::Summarization { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Summarization {
            message: e.to_string(),
        }
    }
}
