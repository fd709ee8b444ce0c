use anyhow::Context;
use clap::Parser;
use pdf_summarize::{Config, ConfigFile, MissingTextPolicy, Pipeline, TokenizerKind};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_CONFIG_FILE: &str = "config/config.yaml";

#[derive(Parser, Debug)]
#[command(
    name = "pdf-summarize",
    version,
    author,
    about = "Summarize a directory of PDFs into .docx files with an LLM",
    long_about = "Summarize a directory of PDFs into .docx files with an LLM.\n\n\
    Each PDF's leading pages are packed into a token budget, split into \
    fixed-size segments, and every segment is summarized by a completion \
    request. The summaries are written to <name>_summary.docx.\n\n\
    Options are read from config/config.yaml when present; flags override it.\n\n\
    USAGE EXAMPLES:\n  \
      # Summarize ./pdfs into ./summaries\n  \
      OPENAI_API_KEY=sk-... pdf-summarize\n\n  \
      # Use another directory and a smaller budget\n  \
      pdf-summarize --pdfs-path ./papers --token-limit 2000 --buffer-tokens 300\n\n  \
      # See what would be sent without calling the API\n  \
      pdf-summarize --dry-run -v"
)]
struct Cli {
    /// Directory containing the PDFs to summarize [default: pdfs]
    #[arg(short, long, value_name = "PATH")]
    pdfs_path: Option<PathBuf>,

    /// Output directory for the .docx summaries [default: summaries]
    #[arg(short, long, value_name = "PATH")]
    output_path: Option<PathBuf>,

    /// Input file pattern [default: *.pdf]
    #[arg(long)]
    pattern: Option<String>,

    /// API key for the completion endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the completion API [default: https://api.openai.com/v1]
    #[arg(long, env = "OPENAI_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Completion model [default: text-davinci-003]
    #[arg(short, long)]
    engine: Option<String>,

    /// Sampling temperature [default: 0.5]
    #[arg(long)]
    temperature: Option<f32>,

    /// Max tokens generated per segment [default: 500]
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Stop sequence (can be used multiple times)
    #[arg(long, value_name = "SEQUENCE")]
    stop: Vec<String>,

    /// Token budget per document [default: 4000]
    #[arg(long)]
    token_limit: Option<usize>,

    /// Tokens reserved from the budget [default: 500]
    #[arg(long)]
    buffer_tokens: Option<usize>,

    /// Completion request timeout in seconds (waits indefinitely if unset)
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Tokenizer to use [default: bpe]
    #[arg(long, value_enum)]
    tokenizer: Option<CliTokenizer>,

    /// Model whose vocabulary counts tokens [default: text-davinci-002]
    #[arg(long, value_name = "MODEL")]
    tokenizer_model: Option<String>,

    /// Path to custom Tera prompt template
    ///
    /// The template must reference `{{ segment }}`. Also available:
    /// `source`, `segment_index` and `segment_count`.
    #[arg(long, value_name = "FILE")]
    prompt_template: Option<PathBuf>,

    /// What to do with pages without text [default: empty]
    #[arg(long, value_enum)]
    missing_text: Option<CliMissingText>,

    /// Keep going when a PDF fails (exit code is still non-zero)
    #[arg(long)]
    continue_on_error: bool,

    /// Back up existing summaries before overwriting them
    #[arg(long)]
    backup_existing: bool,

    /// Dry run (no completion requests, no files written)
    #[arg(long)]
    dry_run: bool,

    /// YAML config file [default: config/config.yaml if present]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliTokenizer {
    /// Byte-pair encoding of the tokenizer model
    Bpe,
    /// ~4 characters per token
    Simple,
}

impl From<CliTokenizer> for TokenizerKind {
    fn from(t: CliTokenizer) -> Self {
        match t {
            CliTokenizer::Bpe => Self::Bpe,
            CliTokenizer::Simple => Self::Simple,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliMissingText {
    /// Treat the page as empty and warn
    Empty,
    /// Fail the document
    Fail,
}

impl From<CliMissingText> for MissingTextPolicy {
    fn from(m: CliMissingText) -> Self {
        match m {
            CliMissingText::Empty => Self::Empty,
            CliMissingText::Fail => Self::Fail,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let config = build_config(cli, &cwd).context("Failed to build configuration")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Pipeline execution failed")?;

    stats.print_summary();

    if stats.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Layers defaults, the config file and command-line flags, in that order.
fn build_config(cli: Cli, cwd: &Path) -> anyhow::Result<Config> {
    let config_path = match cli.config {
        Some(path) => Some(cwd.join(path)),
        None => Some(cwd.join(DEFAULT_CONFIG_FILE)).filter(|path| path.is_file()),
    };

    let mut builder = Config::builder().base_dir(cwd);

    if let Some(path) = config_path {
        tracing::debug!("Loading config file {}", path.display());
        let file = ConfigFile::load(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        builder = file.apply(builder);
    }

    if let Some(path) = cli.pdfs_path {
        builder = builder.pdfs_path(path);
    }
    if let Some(path) = cli.output_path {
        builder = builder.output_path(path);
    }
    if let Some(pattern) = cli.pattern {
        builder = builder.pattern(pattern);
    }
    if let Some(key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(engine) = cli.engine {
        builder = builder.engine(engine);
    }
    if let Some(temperature) = cli.temperature {
        builder = builder.temperature(temperature);
    }
    if let Some(tokens) = cli.max_tokens {
        builder = builder.max_tokens(tokens);
    }
    if !cli.stop.is_empty() {
        builder = builder.stop(cli.stop);
    }
    if let Some(tokens) = cli.token_limit {
        builder = builder.token_limit(tokens);
    }
    if let Some(tokens) = cli.buffer_tokens {
        builder = builder.buffer_tokens(tokens);
    }
    if let Some(secs) = cli.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(tokenizer) = cli.tokenizer {
        builder = builder.tokenizer(tokenizer.into());
    }
    if let Some(model) = cli.tokenizer_model {
        builder = builder.tokenizer_model(model);
    }
    if let Some(path) = cli.prompt_template {
        builder = builder.prompt_template(path);
    }
    if let Some(policy) = cli.missing_text {
        builder = builder.missing_text(policy.into());
    }
    if cli.continue_on_error {
        builder = builder.continue_on_error(true);
    }
    if cli.backup_existing {
        builder = builder.backup_existing(true);
    }

    Ok(builder.dry_run(cli.dry_run).build()?)
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else {
        match verbosity {
            0 => EnvFilter::new("pdf_summarize=info"),
            1 => EnvFilter::new("pdf_summarize=debug"),
            _ => EnvFilter::new("pdf_summarize=trace"),
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}
