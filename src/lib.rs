//! # pdf-summarize
//!
//! Batch summarization of PDF documents with an LLM completion endpoint.
//!
//! ## Features
//!
//! - Token-budgeted packing of leading pages (BPE token counts via `tiktoken`)
//! - Fixed-width segmentation of the packed text
//! - One completion request per segment, with a customizable prompt template
//! - One `.docx` summary per PDF, written atomically
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_summarize::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .pdfs_path("./pdfs")
//!     .output_path("./summaries")
//!     .api_key(std::env::var("OPENAI_API_KEY")?)
//!     .token_limit(4_000)
//!     .buffer_tokens(500)
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture, run once per PDF:
//! 1. **Accumulator**: packs the longest prefix of pages that fits the budget
//! 2. **Segmenter**: splits the packed text into fixed-width segments
//! 3. **Summarizer**: requests a completion for every segment
//! 4. **Writer**: saves the concatenated summaries as `.docx`

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod accumulator;
mod config;
mod error;
mod pdf;
mod pipeline;
mod prompt;
mod segmenter;
mod summarizer;
mod token;
mod writer;

pub use accumulator::{Accumulation, Budget, MissingTextPolicy, accumulate};
pub use config::{
    CompletionSettings, Config, ConfigBuilder, ConfigFile, DEFAULT_BASE_URL, DEFAULT_ENGINE,
    FileSection, OpenAiSection, StopSequences, TokenizerSection,
};
pub use error::{Error, Result};
pub use pdf::{DEFAULT_PDF_PATTERN, PageSource, PdfDocument, discover};
pub use pipeline::{DocumentReport, DocumentSummary, FailedDocument, Pipeline, PipelineStats};
pub use prompt::{DEFAULT_INSTRUCTION, PromptContext, PromptTemplate};
pub use segmenter::{Segments, segment, segment_count};
pub use summarizer::{Completer, CompletionRequest, OpenAiClient, Summarizer};
pub use token::{BpeTokenizer, DEFAULT_TOKENIZER_MODEL, TokenCounter, TokenizerKind, count_tokens};
pub use writer::{DocxWriter, SUMMARY_SUFFIX, output_filename};

/// Summarizes every matching PDF with the given configuration.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The PDF directory doesn't exist or is inaccessible
/// - A document fails and `continue_on_error` is not set
///
/// # Examples
///
/// ```no_run
/// use pdf_summarize::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .pdfs_path("./pdfs")
///     .dry_run(true)
///     .build()?;
///
/// let stats = run(config)?;
/// println!("{} PDFs found", stats.files_found);
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
