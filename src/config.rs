use crate::accumulator::{Budget, MissingTextPolicy};
use crate::error::{Error, Result};
use crate::pdf::{DEFAULT_PDF_PATTERN, compile_pattern};
use crate::token::{DEFAULT_TOKENIZER_MODEL, TokenizerKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_PDFS_PATH: &str = "pdfs";
const DEFAULT_OUTPUT_PATH: &str = "summaries";
const DEFAULT_TOKEN_LIMIT: usize = 4_000;
const DEFAULT_BUFFER_TOKENS: usize = 500;

/// Default completion endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default completion model.
pub const DEFAULT_ENGINE: &str = "text-davinci-003";

const DEFAULT_TEMPERATURE: f32 = 0.5;
const DEFAULT_MAX_TOKENS: u32 = 500;
const MAX_TEMPERATURE: f32 = 2.0;

/// Parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    /// Base URL of the completion API (without `/completions`)
    pub base_url: String,

    /// Bearer token for the completion API
    pub api_key: Option<String>,

    /// Model identifier
    pub engine: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate per segment
    pub max_tokens: u32,

    /// Stop sequences
    pub stop: Vec<String>,

    /// Request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            engine: DEFAULT_ENGINE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            stop: Vec::new(),
            timeout: None,
        }
    }
}

/// Configuration for a summarization run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Directory containing the input PDFs
    pub pdfs_path: PathBuf,

    /// Directory receiving the `.docx` summaries
    pub output_path: PathBuf,

    /// File-name pattern selecting input documents
    pub pattern: String,

    /// Completion request parameters
    pub completion: CompletionSettings,

    /// Token budget per document
    pub budget: Budget,

    /// Tokenizer implementation to use
    pub tokenizer: TokenizerKind,

    /// Model whose vocabulary the tokenizer uses
    pub tokenizer_model: String,

    /// Custom prompt template file
    pub prompt_template: Option<PathBuf>,

    /// Handling of pages without text
    pub missing_text: MissingTextPolicy,

    /// Record failing documents and keep going instead of aborting
    pub continue_on_error: bool,

    /// Create backups of existing summaries
    pub backup_existing: bool,

    /// Dry run mode (no completion calls, no file writes)
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pdf_summarize::Config;
    ///
    /// let config = Config::builder()
    ///     .pdfs_path("./papers")
    ///     .api_key("sk-...")
    ///     .token_limit(3_000)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input directory doesn't exist or is not a directory
    /// - The token budget is invalid
    /// - The file pattern does not compile
    /// - Completion parameters are out of range
    /// - The API key is missing outside dry-run mode
    /// - The prompt template file doesn't exist
    pub fn validate(&self) -> Result<()> {
        if !self.pdfs_path.exists() {
            return Err(Error::config(format!(
                "PDF directory does not exist: {}",
                self.pdfs_path.display()
            )));
        }

        if !self.pdfs_path.is_dir() {
            return Err(Error::config(format!(
                "PDF path is not a directory: {}",
                self.pdfs_path.display()
            )));
        }

        if self.budget.token_limit == 0 {
            return Err(Error::config("token_limit must be greater than 0"));
        }

        if self.budget.buffer_tokens > self.budget.token_limit {
            return Err(Error::config(format!(
                "buffer_tokens ({}) must not exceed token_limit ({})",
                self.budget.buffer_tokens, self.budget.token_limit
            )));
        }

        compile_pattern(&self.pattern)?;

        let completion = &self.completion;
        if !(0.0..=MAX_TEMPERATURE).contains(&completion.temperature) {
            return Err(Error::config(format!(
                "temperature must be between 0 and {MAX_TEMPERATURE}, got {}",
                completion.temperature
            )));
        }

        if completion.max_tokens == 0 {
            return Err(Error::config("max_tokens must be greater than 0"));
        }

        if !completion.base_url.starts_with("http://") && !completion.base_url.starts_with("https://")
        {
            return Err(Error::config(format!(
                "base_url must be an http(s) URL: {}",
                completion.base_url
            )));
        }

        let has_key = completion
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        if !has_key && !self.dry_run {
            return Err(Error::config(
                "an API key is required (set OPENAI_API_KEY, --api-key or openai.api_key)",
            ));
        }

        if let Some(ref template) = self.prompt_template {
            if !template.is_file() {
                return Err(Error::config(format!(
                    "Prompt template file does not exist: {}",
                    template.display()
                )));
            }
        }

        if self.budget.segment_size() == 0 {
            tracing::warn!(
                "token_limit equals buffer_tokens ({}); documents with text cannot be segmented",
                self.budget.token_limit
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pdfs_path: PathBuf::from(DEFAULT_PDFS_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            pattern: DEFAULT_PDF_PATTERN.to_string(),
            completion: CompletionSettings::default(),
            budget: Budget::new(DEFAULT_TOKEN_LIMIT, DEFAULT_BUFFER_TOKENS),
            tokenizer: TokenizerKind::default(),
            tokenizer_model: DEFAULT_TOKENIZER_MODEL.to_string(),
            prompt_template: None,
            missing_text: MissingTextPolicy::default(),
            continue_on_error: false,
            backup_existing: false,
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    base_dir: Option<PathBuf>,
    pdfs_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    pattern: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    engine: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    stop: Option<Vec<String>>,
    timeout: Option<Duration>,
    token_limit: Option<usize>,
    buffer_tokens: Option<usize>,
    tokenizer: Option<TokenizerKind>,
    tokenizer_model: Option<String>,
    prompt_template: Option<PathBuf>,
    missing_text: Option<MissingTextPolicy>,
    continue_on_error: Option<bool>,
    backup_existing: Option<bool>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the directory relative paths are resolved against.
    ///
    /// Without it, relative paths are left as given.
    #[must_use]
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(path.into());
        self
    }

    /// Sets the directory containing the input PDFs.
    #[must_use]
    pub fn pdfs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdfs_path = Some(path.into());
        self
    }

    /// Sets the output directory for summaries.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the input file pattern (default `*.pdf`).
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the completion API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the completion API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the completion model.
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum tokens generated per segment.
    #[must_use]
    pub const fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Sets the stop sequences.
    #[must_use]
    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Sets the completion request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the token budget per document.
    #[must_use]
    pub const fn token_limit(mut self, tokens: usize) -> Self {
        self.token_limit = Some(tokens);
        self
    }

    /// Sets the headroom subtracted from the budget.
    #[must_use]
    pub const fn buffer_tokens(mut self, tokens: usize) -> Self {
        self.buffer_tokens = Some(tokens);
        self
    }

    /// Sets the tokenizer implementation.
    #[must_use]
    pub const fn tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.tokenizer = Some(kind);
        self
    }

    /// Sets the model whose vocabulary the tokenizer uses.
    #[must_use]
    pub fn tokenizer_model(mut self, model: impl Into<String>) -> Self {
        self.tokenizer_model = Some(model.into());
        self
    }

    /// Sets the path to a custom prompt template.
    ///
    /// The template must contain valid Tera syntax and reference `segment`.
    #[must_use]
    pub fn prompt_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.prompt_template = Some(path.into());
        self
    }

    /// Sets the handling of pages without text.
    #[must_use]
    pub const fn missing_text(mut self, policy: MissingTextPolicy) -> Self {
        self.missing_text = Some(policy);
        self
    }

    /// Keeps going after a document fails.
    #[must_use]
    pub const fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = Some(enabled);
        self
    }

    /// Enables or disables backup creation.
    #[must_use]
    pub const fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = Some(enabled);
        self
    }

    /// Enables dry run mode (no completion calls, no file writes).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();
        let base_dir = self.base_dir;
        let resolve = |path: PathBuf| match base_dir {
            Some(ref base) if path.is_relative() => base.join(path),
            _ => path,
        };

        let config = Config {
            pdfs_path: resolve(self.pdfs_path.unwrap_or(defaults.pdfs_path)),
            output_path: resolve(self.output_path.unwrap_or(defaults.output_path)),
            pattern: self.pattern.unwrap_or(defaults.pattern),
            completion: CompletionSettings {
                base_url: self
                    .base_url
                    .map_or(defaults.completion.base_url, |url| {
                        url.trim_end_matches('/').to_string()
                    }),
                api_key: self.api_key,
                engine: self.engine.unwrap_or(defaults.completion.engine),
                temperature: self.temperature.unwrap_or(defaults.completion.temperature),
                max_tokens: self.max_tokens.unwrap_or(defaults.completion.max_tokens),
                stop: self.stop.unwrap_or_default(),
                timeout: self.timeout,
            },
            budget: Budget::new(
                self.token_limit.unwrap_or(defaults.budget.token_limit),
                self.buffer_tokens.unwrap_or(defaults.budget.buffer_tokens),
            ),
            tokenizer: self.tokenizer.unwrap_or(defaults.tokenizer),
            tokenizer_model: self.tokenizer_model.unwrap_or(defaults.tokenizer_model),
            prompt_template: self.prompt_template.map(resolve),
            missing_text: self.missing_text.unwrap_or(defaults.missing_text),
            continue_on_error: self.continue_on_error.unwrap_or(defaults.continue_on_error),
            backup_existing: self.backup_existing.unwrap_or(defaults.backup_existing),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Stop sequences as written in a config file: one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    /// A single stop sequence
    One(String),
    /// Several stop sequences
    Many(Vec<String>),
}

impl From<StopSequences> for Vec<String> {
    fn from(stop: StopSequences) -> Self {
        match stop {
            StopSequences::One(s) => vec![s],
            StopSequences::Many(list) => list,
        }
    }
}

/// `file` section of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSection {
    /// Input directory
    pub pdfs_path: Option<PathBuf>,
    /// Output directory
    pub output_path: Option<PathBuf>,
    /// Input file pattern
    pub pattern: Option<String>,
}

/// `openai` section of a config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAiSection {
    /// API key
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: Option<String>,
    /// Completion model
    pub engine: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens generated per segment
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop: Option<StopSequences>,
    /// Token budget per document
    pub token_limit: Option<usize>,
    /// Headroom subtracted from the budget
    pub buffer_tokens: Option<usize>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// `tokenizer` section of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenizerSection {
    /// Tokenizer implementation
    pub kind: Option<TokenizerKind>,
    /// Vocabulary model
    pub model: Option<String>,
}

/// YAML configuration file.
///
/// ```yaml
/// file:
///   pdfs_path: pdfs
///   output_path: summaries
/// openai:
///   api_key: sk-...
///   engine: text-davinci-003
///   temperature: 0.5
///   max_tokens: 500
///   stop: null
///   token_limit: 4000
///   buffer_tokens: 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Input and output locations
    pub file: FileSection,
    /// Completion endpoint and budget
    pub openai: OpenAiSection,
    /// Token counting
    pub tokenizer: TokenizerSection,
    /// Custom prompt template path
    pub prompt_template: Option<PathBuf>,
    /// Handling of pages without text
    pub missing_text: Option<MissingTextPolicy>,
    /// Keep going after a document fails
    pub continue_on_error: Option<bool>,
    /// Back up existing summaries
    pub backup_existing: Option<bool>,
}

impl ConfigFile {
    /// Parses a config file from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or has unknown keys.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// Copies the values present in this file onto `builder`.
    #[must_use]
    pub fn apply(self, mut builder: ConfigBuilder) -> ConfigBuilder {
        let Self {
            file,
            openai,
            tokenizer,
            prompt_template,
            missing_text,
            continue_on_error,
            backup_existing,
        } = self;

        if let Some(path) = file.pdfs_path {
            builder = builder.pdfs_path(path);
        }
        if let Some(path) = file.output_path {
            builder = builder.output_path(path);
        }
        if let Some(pattern) = file.pattern {
            builder = builder.pattern(pattern);
        }

        if let Some(key) = openai.api_key {
            builder = builder.api_key(key);
        }
        if let Some(url) = openai.base_url {
            builder = builder.base_url(url);
        }
        if let Some(engine) = openai.engine {
            builder = builder.engine(engine);
        }
        if let Some(temperature) = openai.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(tokens) = openai.max_tokens {
            builder = builder.max_tokens(tokens);
        }
        if let Some(stop) = openai.stop {
            builder = builder.stop(stop.into());
        }
        if let Some(tokens) = openai.token_limit {
            builder = builder.token_limit(tokens);
        }
        if let Some(tokens) = openai.buffer_tokens {
            builder = builder.buffer_tokens(tokens);
        }
        if let Some(secs) = openai.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(kind) = tokenizer.kind {
            builder = builder.tokenizer(kind);
        }
        if let Some(model) = tokenizer.model {
            builder = builder.tokenizer_model(model);
        }

        if let Some(path) = prompt_template {
            builder = builder.prompt_template(path);
        }
        if let Some(policy) = missing_text {
            builder = builder.missing_text(policy);
        }
        if let Some(enabled) = continue_on_error {
            builder = builder.continue_on_error(enabled);
        }
        if let Some(enabled) = backup_existing {
            builder = builder.backup_existing(enabled);
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn builder(temp: &assert_fs::TempDir) -> ConfigBuilder {
        Config::builder().pdfs_path(temp.path()).api_key("test-key")
    }

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = builder(&temp).build().unwrap();

        assert_eq!(config.budget, Budget::new(4_000, 500));
        assert_eq!(config.completion.engine, "text-davinci-003");
        assert!((config.completion.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.completion.max_tokens, 500);
        assert!(config.completion.stop.is_empty());
        assert_eq!(config.completion.timeout, None);
        assert_eq!(config.pattern, "*.pdf");
        assert_eq!(config.tokenizer_model, "text-davinci-002");
        assert_eq!(config.missing_text, MissingTextPolicy::Empty);
        assert!(!config.continue_on_error);
    }

    #[test]
    fn test_invalid_pdfs_path() {
        let result = Config::builder()
            .pdfs_path("/nonexistent/path/that/should/not/exist")
            .api_key("k")
            .build();

        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_pdfs_path_is_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("a.pdf");
        file.touch().unwrap();

        let result = Config::builder().pdfs_path(file.path()).api_key("k").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_token_limits() {
        let temp = assert_fs::TempDir::new().unwrap();

        assert!(builder(&temp).token_limit(0).build().is_err());
        assert!(
            builder(&temp)
                .token_limit(100)
                .buffer_tokens(101)
                .build()
                .is_err()
        );
        // Equal values are allowed: nothing is accumulated
        assert!(
            builder(&temp)
                .token_limit(100)
                .buffer_tokens(100)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = builder(&temp).pattern("[").build().unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_invalid_completion_params() {
        let temp = assert_fs::TempDir::new().unwrap();

        assert!(builder(&temp).temperature(2.5).build().is_err());
        assert!(builder(&temp).temperature(-0.1).build().is_err());
        assert!(builder(&temp).max_tokens(0).build().is_err());
        assert!(builder(&temp).base_url("ftp://example.com").build().is_err());
    }

    #[test]
    fn test_api_key_required_unless_dry_run() {
        let temp = assert_fs::TempDir::new().unwrap();

        let err = Config::builder().pdfs_path(temp.path()).build().unwrap_err();
        assert!(err.is_config());

        assert!(Config::builder().pdfs_path(temp.path()).api_key("  ").build().is_err());

        let config = Config::builder()
            .pdfs_path(temp.path())
            .dry_run(true)
            .build()
            .unwrap();
        assert!(config.dry_run);
    }

    #[test]
    fn test_missing_prompt_template() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = builder(&temp).prompt_template("/nonexistent/prompt.tera").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_paths_resolve_against_base_dir() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("papers").create_dir_all().unwrap();

        let config = Config::builder()
            .base_dir(temp.path())
            .pdfs_path("papers")
            .output_path("out")
            .api_key("k")
            .build()
            .unwrap();

        assert_eq!(config.pdfs_path, temp.path().join("papers"));
        assert_eq!(config.output_path, temp.path().join("out"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = builder(&temp)
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(config.completion.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_config_file_original_layout() {
        let yaml = r"
file:
  pdfs_path: papers
  output_path: out
openai:
  api_key: sk-test
  engine: text-davinci-002
  temperature: 0.2
  max_tokens: 300
  stop: null
  token_limit: 2000
  buffer_tokens: 250
";
        let file = ConfigFile::from_yaml(yaml).unwrap();
        assert_eq!(file.file.pdfs_path, Some(PathBuf::from("papers")));
        assert_eq!(file.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(file.openai.stop, None);
        assert_eq!(file.openai.token_limit, Some(2000));
    }

    #[test]
    fn test_config_file_stop_forms() {
        let one = ConfigFile::from_yaml("openai:\n  stop: \"\\n\\n\"\n").unwrap();
        let stop: Vec<String> = one.openai.stop.unwrap().into();
        assert_eq!(stop, vec!["\n\n".to_string()]);

        let many = ConfigFile::from_yaml("openai:\n  stop: [END, STOP]\n").unwrap();
        let stop: Vec<String> = many.openai.stop.unwrap().into();
        assert_eq!(stop, vec!["END".to_string(), "STOP".to_string()]);
    }

    #[test]
    fn test_config_file_enums() {
        let yaml = "tokenizer:\n  kind: simple\nmissing_text: fail\ncontinue_on_error: true\n";
        let file = ConfigFile::from_yaml(yaml).unwrap();
        assert_eq!(file.tokenizer.kind, Some(TokenizerKind::Simple));
        assert_eq!(file.missing_text, Some(MissingTextPolicy::Fail));
        assert_eq!(file.continue_on_error, Some(true));
    }

    #[test]
    fn test_config_file_unknown_key() {
        let err = ConfigFile::from_yaml("openai:\n  engin: typo\n").unwrap_err();
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_config_file_empty() {
        assert_eq!(ConfigFile::from_yaml("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_config_file_apply_then_override() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("papers").create_dir_all().unwrap();
        let path = temp.child("config.yaml");
        path.write_str(
            "file:\n  pdfs_path: papers\nopenai:\n  api_key: from-file\n  token_limit: 1000\n  timeout_secs: 30\n",
        )
        .unwrap();

        let file = ConfigFile::load(path.path()).unwrap();
        let config = file
            .apply(Config::builder().base_dir(temp.path()))
            .token_limit(1500)
            .build()
            .unwrap();

        assert_eq!(config.pdfs_path, temp.path().join("papers"));
        assert_eq!(config.completion.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.budget.token_limit, 1500);
        assert_eq!(config.completion.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_config_file_missing() {
        let err = ConfigFile::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(err.is_io());
    }
}
