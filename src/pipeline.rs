use crate::{
    accumulator::{Accumulation, accumulate},
    config::Config,
    error::Result,
    pdf::{PageSource, PdfDocument, discover},
    prompt::{PromptContext, PromptTemplate},
    segmenter::segment,
    summarizer::{Completer, OpenAiClient, Summarizer},
    token::TokenCounter,
    writer::DocxWriter,
};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument, warn};

/// Outcome of summarizing one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// Input PDF
    pub source: PathBuf,

    /// Written summary, `None` in dry-run mode
    pub output: Option<PathBuf>,

    /// Pages in the PDF
    pub total_pages: usize,

    /// Leading pages that fit the token budget
    pub pages_used: usize,

    /// Tokens in the accumulated pages
    pub tokens: usize,

    /// Segments summarized (or that would be, in dry-run mode)
    pub segments: usize,

    /// Characters in the final summary
    pub summary_chars: usize,
}

/// A document that failed while `continue_on_error` was set.
#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    /// Input PDF
    pub source: PathBuf,

    /// Error description
    pub error: String,
}

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// PDFs matching the input pattern
    pub files_found: usize,

    /// Summaries written to disk
    pub documents_written: usize,

    /// Per-document results, in processing order
    pub documents: Vec<DocumentReport>,

    /// Documents that failed and were skipped
    pub failures: Vec<FailedDocument>,

    /// Total execution time
    pub duration: Duration,

    /// Time spent loading PDFs and packing pages
    pub extract_duration: Duration,

    /// Time spent waiting for completions
    pub summarize_duration: Duration,

    /// Time spent writing documents
    pub write_duration: Duration,

    /// Output directory path
    pub output_directory: String,

    /// Whether the run was a dry run
    pub dry_run: bool,
}

impl PipelineStats {
    /// Pages summarized across all documents.
    #[must_use]
    pub fn pages_used(&self) -> usize {
        self.documents.iter().map(|d| d.pages_used).sum()
    }

    /// Pages present across all documents.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.documents.iter().map(|d| d.total_pages).sum()
    }

    /// Tokens accumulated across all documents.
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.documents.iter().map(|d| d.tokens).sum()
    }

    /// Segments across all documents.
    #[must_use]
    pub fn total_segments(&self) -> usize {
        self.documents.iter().map(|d| d.segments).sum()
    }

    /// Returns true if no document failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        if self.dry_run {
            println!("║                 Dry Run Summary                       ║");
        } else {
            println!("║            Summarization Summary                      ║");
        }
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ PDFs Found:           {:>8}                        ║",
            self.files_found
        );
        println!(
            "║ Summaries Written:    {:>8}                        ║",
            self.documents_written
        );
        println!(
            "║ Failed:               {:>8}                        ║",
            self.failures.len()
        );
        println!("║                                                       ║");
        println!(
            "║ Pages Summarized:     {:>8} of {:<8}            ║",
            self.pages_used(),
            self.total_pages()
        );
        println!(
            "║ Tokens Accumulated:   {:>8}                        ║",
            self.total_tokens()
        );
        println!(
            "║ Segments:             {:>8}                        ║",
            self.total_segments()
        );
        println!("║                                                       ║");
        println!("║ Output Directory:                                     ║");
        println!("║   {}", self.output_directory);
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!(
            "║   - Extracting:       {:>8.2}s                     ║",
            self.extract_duration.as_secs_f64()
        );
        println!(
            "║   - Summarizing:      {:>8.2}s                     ║",
            self.summarize_duration.as_secs_f64()
        );
        println!(
            "║   - Writing:          {:>8.2}s                     ║",
            self.write_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        if !self.failures.is_empty() {
            println!("║                                                       ║");
            println!("║ Failures:                                             ║");
            for failure in &self.failures {
                println!("║   {}: {}", failure.source.display(), failure.error);
            }
        }
        if self.dry_run {
            println!("║                                                       ║");
            println!("║ ⚠ No requests were sent and no files were written    ║");
        }
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Summary text of one document, before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    /// Packed page text
    pub accumulation: Accumulation,

    /// Number of segments the text was split into
    pub segments: usize,

    /// Concatenated segment summaries, each followed by a newline.
    /// `None` in dry-run mode.
    pub final_summary: Option<String>,
}

/// Main pipeline orchestrator for summarizing a directory of PDFs.
pub struct Pipeline {
    config: Config,
    counter: Arc<dyn TokenCounter>,
    summarizer: Option<Summarizer>,
    writer: DocxWriter,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("summarizer", &self.summarizer)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline that sends completions to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The tokenizer vocabulary cannot be loaded
    /// - The prompt template is invalid
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let completer: Option<Box<dyn Completer>> = if config.dry_run {
            None
        } else {
            Some(Box::new(OpenAiClient::from_settings(&config.completion)?))
        };

        Self::build(config, completer)
    }

    /// Creates a pipeline that sends completions through `completer`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation, the tokenizer or the
    /// prompt template fails.
    pub fn with_completer(config: Config, completer: Box<dyn Completer>) -> Result<Self> {
        config.validate()?;
        let completer = (!config.dry_run).then_some(completer);
        Self::build(config, completer)
    }

    fn build(config: Config, completer: Option<Box<dyn Completer>>) -> Result<Self> {
        let counter = config.tokenizer.create(&config.tokenizer_model)?;

        let prompt = match config.prompt_template {
            Some(ref path) => PromptTemplate::from_file(path)?,
            None => PromptTemplate::builtin()?,
        };
        debug!("Using prompt template: {}", prompt.origin());

        let summarizer =
            completer.map(|completer| Summarizer::new(completer, prompt, &config.completion));
        let writer = DocxWriter::from_config(&config);

        Ok(Self {
            config,
            counter,
            summarizer,
            writer,
        })
    }

    /// Executes the pipeline over every matching PDF and returns statistics.
    ///
    /// # Process
    ///
    /// For each PDF, in sorted order:
    /// 1. **Extract**: packs leading pages into the token budget
    /// 2. **Segment**: splits the packed text into fixed-width segments
    /// 3. **Summarize**: requests one completion per segment
    /// 4. **Write**: saves the concatenated summary as `.docx`
    ///
    /// # Errors
    ///
    /// Returns the first error encountered unless `continue_on_error` is set,
    /// in which case failures are recorded in [`PipelineStats::failures`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pdf_summarize::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .pdfs_path("./pdfs")
    ///     .api_key(std::env::var("OPENAI_API_KEY")?)
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(pdfs_path = %self.config.pdfs_path.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let mut stats = PipelineStats {
            output_directory: self.config.output_path.display().to_string(),
            dry_run: self.config.dry_run,
            ..PipelineStats::default()
        };

        info!("Starting pipeline execution");
        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping completion requests and file writes");
        }

        let files = discover(&self.config.pdfs_path, &self.config.pattern)?;
        stats.files_found = files.len();

        if files.is_empty() {
            warn!(
                "No files matching '{}' in {}",
                self.config.pattern,
                self.config.pdfs_path.display()
            );
        }

        let total = files.len();
        for (index, path) in files.iter().enumerate() {
            info!("[{}/{}] Summarizing {}", index + 1, total, path.display());

            match self.process_file(path, &mut stats) {
                Ok(report) => {
                    if report.output.is_some() {
                        stats.documents_written += 1;
                    }
                    stats.documents.push(report);
                }
                Err(e) if self.config.continue_on_error => {
                    warn!("Skipping {}: {}", path.display(), e);
                    stats.failures.push(FailedDocument {
                        source: path.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        stats.duration = start_time.elapsed();

        if stats.is_success() {
            info!(
                "✓ Pipeline completed successfully in {:.2}s",
                stats.duration.as_secs_f64()
            );
        } else {
            warn!(
                "Pipeline completed with {} failure(s) in {:.2}s",
                stats.failures.len(),
                stats.duration.as_secs_f64()
            );
        }

        Ok(stats)
    }

    /// Summarizes one PDF and writes its summary.
    fn process_file(&self, path: &Path, stats: &mut PipelineStats) -> Result<DocumentReport> {
        let extract_start = Instant::now();
        // Dropped at the end of this call, whatever the outcome
        let document = PdfDocument::open(path)?;
        stats.extract_duration += extract_start.elapsed();

        let summary = self.summarize_pages(&document, stats)?;
        drop(document);

        let output = match summary.final_summary {
            Some(ref text) => {
                let write_start = Instant::now();
                let written = self.writer.write_summary(text, path)?;
                stats.write_duration += write_start.elapsed();
                Some(written)
            }
            None => None,
        };

        Ok(DocumentReport {
            source: path.to_path_buf(),
            output,
            total_pages: summary.accumulation.total_pages,
            pages_used: summary.accumulation.pages_used,
            tokens: summary.accumulation.tokens,
            segments: summary.segments,
            summary_chars: summary
                .final_summary
                .as_deref()
                .map_or(0, |text| text.chars().count()),
        })
    }

    /// Packs, segments and summarizes the pages of one document.
    ///
    /// In dry-run mode no completions are requested and
    /// [`DocumentSummary::final_summary`] is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction, segmentation or a completion fails.
    pub fn summarize_pages<S>(
        &self,
        pages: &S,
        stats: &mut PipelineStats,
    ) -> Result<DocumentSummary>
    where
        S: PageSource + ?Sized,
    {
        let extract_start = Instant::now();
        let accumulation = accumulate(
            pages,
            self.counter.as_ref(),
            self.config.budget,
            self.config.missing_text,
        )?;
        stats.extract_duration += extract_start.elapsed();

        debug!(
            "Accumulated {}/{} pages ({} tokens, {} chars)",
            accumulation.pages_used,
            accumulation.total_pages,
            accumulation.tokens,
            accumulation.text.chars().count()
        );

        let segments = segment(&accumulation.text, self.config.budget)?;
        let segment_count = segments.len();

        let Some(ref summarizer) = self.summarizer else {
            info!("  {} segment(s) (dry run)", segment_count);
            return Ok(DocumentSummary {
                segments: segment_count,
                accumulation,
                final_summary: None,
            });
        };

        let source = pages
            .origin()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let summarize_start = Instant::now();
        let mut final_summary = String::new();
        for (index, text) in segments.enumerate() {
            let context = PromptContext {
                segment: text,
                source: &source,
                segment_index: index + 1,
                segment_count,
            };
            let summary = summarizer.summarize(&context)?;
            final_summary.push_str(&summary);
            final_summary.push('\n');
        }
        stats.summarize_duration += summarize_start.elapsed();

        info!("  Summarized {} segment(s)", segment_count);

        Ok(DocumentSummary {
            accumulation,
            segments: segment_count,
            final_summary: Some(final_summary),
        })
    }
}
