//! Completion client and per-segment summarization.

use crate::config::CompletionSettings;
use crate::error::{Error, Result};
use crate::prompt::{PromptContext, PromptTemplate};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Body of a completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,

    /// Full prompt text
    pub prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Stop sequences, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

/// Produces a completion for a prompt.
pub trait Completer {
    /// Returns the text of the first choice, untrimmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response has no choices.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

impl<F> Completer for F
where
    F: Fn(&CompletionRequest) -> Result<String>,
{
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self(request)
    }
}

/// Blocking client for an OpenAI-compatible `/completions` endpoint.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Creates a client for `base_url`.
    ///
    /// With `timeout` set to `None` a request waits as long as the server
    /// takes to answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::summarization(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    /// Creates a client from completion settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured.
    pub fn from_settings(settings: &CompletionSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::config("an API key is required for completion requests"))?;

        Self::new(api_key, &settings.base_url, settings.timeout)
    }

    /// URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Completer for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        trace!("POST {} ({} prompt bytes)", self.endpoint, request.prompt.len());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::summarization(format!("HTTP {status}: {body}")));
        }

        let body: CompletionResponse = response
            .json()
            .map_err(|e| Error::summarization(format!("invalid completion response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| Error::summarization("completion response contained no choices"))
    }
}

/// Summarizes segments with one completion request each.
pub struct Summarizer {
    completer: Box<dyn Completer>,
    prompt: PromptTemplate,
    engine: String,
    temperature: f32,
    max_tokens: u32,
    stop: Option<Vec<String>>,
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("prompt", &self.prompt)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl Summarizer {
    /// Creates a summarizer sending requests through `completer`.
    #[must_use]
    pub fn new(
        completer: Box<dyn Completer>,
        prompt: PromptTemplate,
        settings: &CompletionSettings,
    ) -> Self {
        Self {
            completer,
            prompt,
            engine: settings.engine.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            stop: (!settings.stop.is_empty()).then(|| settings.stop.clone()),
        }
    }

    /// Builds the request for one segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt template fails to render.
    pub fn request(&self, context: &PromptContext<'_>) -> Result<CompletionRequest> {
        Ok(CompletionRequest {
            model: self.engine.clone(),
            prompt: self.prompt.render(context)?,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: self.stop.clone(),
        })
    }

    /// Summarizes one segment, returning the completion trimmed of
    /// surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or the completion request fails.
    pub fn summarize(&self, context: &PromptContext<'_>) -> Result<String> {
        let request = self.request(context)?;
        let text = self.completer.complete(&request)?;
        let summary = text.trim();

        debug!(
            "Segment {}/{}: {} chars in, {} chars out",
            context.segment_index,
            context.segment_count,
            context.segment.chars().count(),
            summary.chars().count()
        );

        Ok(summary.to_string())
    }
}
