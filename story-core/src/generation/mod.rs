//! Cache-aside generation of story parts.
//!
//! [`GenerationClient::fetch`] is the only path from a [`GenerationRequest`]
//! to content:
//! 1. Look the request up in the shared [`GenerationCache`]
//! 2. On a miss, build the prompt and call the external [`TextGenerator`]
//!    with a per-attempt timeout, retrying transient failures with
//!    exponential backoff
//! 3. Validate every result; unsafe output counts as a transient failure
//! 4. Cache and return the first safe result
//!
//! The client never sees the child's name and keeps no state between calls.

pub mod anthropic;

use crate::cache::{CacheKey, GenerationCache};
use crate::content::{GeneratedContent, GenerationRequest, ParseError};
use crate::prompt::PromptBuilder;
use crate::safety::{ContentSafetyValidator, SafetyReport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The external text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`.
    async fn invoke(
        &self,
        prompt: &str,
        max_length: usize,
        temperature: f32,
    ) -> Result<String, GeneratorError>;

    /// Get the generator name
    fn name(&self) -> &str;
}

/// Failure reported by a [`TextGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// The call did not finish in time.
    #[error("generation timed out")]
    Timeout,

    /// The service asked us to slow down.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Credentials were rejected. Retrying cannot help.
    #[error("authentication failed: {reason}")]
    AuthError { reason: String },

    /// The service failed on its side.
    #[error("server error: {reason}")]
    ServerError { reason: String },

    /// The request never reached the service or the connection dropped.
    #[error("network error: {reason}")]
    Network { reason: String },

    /// The service rejected the request as malformed. Retrying cannot help.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl GeneratorError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            GeneratorError::AuthError { .. } | GeneratorError::InvalidRequest { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            GeneratorError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Coarse category of a [`GenerationFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Exhausted,
    Authentication,
    InvalidRequest,
}

/// Why [`GenerationClient::fetch`] produced no content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    /// Every attempt failed transiently or produced unsafe content.
    #[error("generation failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// The generator rejected our credentials.
    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    /// The generator rejected the request itself.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl GenerationFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            GenerationFailure::Exhausted { .. } => FailureKind::Exhausted,
            GenerationFailure::Authentication { .. } => FailureKind::Authentication,
            GenerationFailure::InvalidRequest { .. } => FailureKind::InvalidRequest,
        }
    }

    /// Fatal failures stop the pipeline; exhaustion degrades to fallback content.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GenerationFailure::Exhausted { .. })
    }
}

/// Retry and timeout policy for calls to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    /// Timeout applied to each individual attempt.
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            backoff_multiplier: 2.0,
            max_backoff_ms: 8_000,
            attempt_timeout_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `failed_attempt`-th failure (1-based), capped at `max_backoff_ms`.
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31) as i32;
        let ms = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let ms = if ms.is_finite() { ms } else { f64::MAX };
        Duration::from_millis(ms.min(self.max_backoff_ms as f64) as u64)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Sampling parameters passed to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub max_length: usize,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 600,
            temperature: 0.7,
        }
    }
}

/// Why a single attempt did not yield servable content.
enum AttemptFailure {
    Generator(GeneratorError),
    Unsafe(SafetyReport),
    Unparseable(ParseError),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Generator(e) => write!(f, "{e}"),
            AttemptFailure::Unsafe(report) => {
                write!(f, "unsafe content: {}", report.reasons.join("; "))
            }
            AttemptFailure::Unparseable(e) => write!(f, "unparseable content: {e}"),
        }
    }
}

/// Cache-aside client around a [`TextGenerator`].
#[derive(Clone)]
pub struct GenerationClient {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<GenerationCache>,
    prompts: PromptBuilder,
    validator: ContentSafetyValidator,
    retry: RetryPolicy,
    params: GenerationParams,
}

impl GenerationClient {
    /// Create a client with default prompts, validation and retry policy.
    pub fn new(generator: Arc<dyn TextGenerator>, cache: Arc<GenerationCache>) -> Self {
        Self {
            generator,
            cache,
            prompts: PromptBuilder::default(),
            validator: ContentSafetyValidator::default(),
            retry: RetryPolicy::default(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_validator(mut self, validator: ContentSafetyValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn cache(&self) -> &Arc<GenerationCache> {
        &self.cache
    }

    pub fn prompt_builder(&self) -> &PromptBuilder {
        &self.prompts
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Cache key for `request` under this client's prompt templates.
    pub fn cache_key(&self, request: &GenerationRequest) -> CacheKey {
        CacheKey::derive(request, &self.prompts.fingerprint())
    }

    /// Fetch content for `request`, from the cache or from the generator.
    ///
    /// The returned content still carries the name placeholder.
    pub async fn fetch(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, GenerationFailure> {
        let key = self.cache_key(request);
        if let Some(entry) = self.cache.lookup(&key) {
            return Ok(entry.payload);
        }

        let prompt = self.prompts.build(request);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_failure = None;

        for attempt in 1..=max_attempts {
            let failure = match self.attempt(&prompt).await {
                Ok(content) => {
                    self.cache.store(key, content.clone());
                    tracing::debug!(
                        generator = self.generator.name(),
                        theme = %request.theme,
                        focus = %request.learning_focus,
                        difficulty = %request.difficulty,
                        part = request.part_index,
                        attempt,
                        "generated new content"
                    );
                    return Ok(content);
                }
                Err(AttemptFailure::Generator(e)) if !e.is_transient() => {
                    tracing::error!(generator = self.generator.name(), error = %e, "fatal generation failure");
                    return Err(match e {
                        GeneratorError::AuthError { reason } => {
                            GenerationFailure::Authentication { reason }
                        }
                        other => GenerationFailure::InvalidRequest {
                            reason: other.to_string(),
                        },
                    });
                }
                Err(failure) => failure,
            };

            if attempt < max_attempts {
                let delay = self.delay_after(attempt, &failure);
                tracing::warn!(
                    generator = self.generator.name(),
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure,
                    "generation attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            } else {
                tracing::warn!(
                    generator = self.generator.name(),
                    attempt,
                    error = %failure,
                    "generation attempt failed"
                );
            }
            last_failure = Some(failure);
        }

        let last_error = last_failure
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        tracing::error!(attempts = max_attempts, %last_error, "generation attempts exhausted");
        Err(GenerationFailure::Exhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    async fn attempt(&self, prompt: &str) -> Result<GeneratedContent, AttemptFailure> {
        let call = self
            .generator
            .invoke(prompt, self.params.max_length, self.params.temperature);

        let text = match tokio::time::timeout(self.retry.attempt_timeout(), call).await {
            Err(_elapsed) => return Err(AttemptFailure::Generator(GeneratorError::Timeout)),
            Ok(result) => result.map_err(AttemptFailure::Generator)?,
        };

        let report = self.validator.validate(&text);
        if !report.safe {
            return Err(AttemptFailure::Unsafe(report));
        }

        GeneratedContent::parse(&text).map_err(AttemptFailure::Unparseable)
    }

    fn delay_after(&self, attempt: u32, failure: &AttemptFailure) -> Duration {
        let backoff = self.retry.backoff(attempt);
        match failure {
            AttemptFailure::Generator(e) => match e.retry_after() {
                Some(hint) => backoff.max(hint).min(self.retry.max_backoff()),
                None => backoff,
            },
            _ => backoff,
        }
    }
}

impl fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationClient")
            .field("generator", &self.generator.name())
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Difficulty, LearningFocus, Theme};
    use crate::testing::{safe_output, ScriptedGenerator};

    fn request() -> GenerationRequest {
        GenerationRequest::new(Theme::Dragons, LearningFocus::Math, Difficulty::Easy, 0)
    }

    fn client(generator: Arc<ScriptedGenerator>) -> GenerationClient {
        GenerationClient::new(generator, Arc::new(GenerationCache::default()))
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff(10), Duration::from_millis(8000));
    }

    #[test]
    fn test_transient_classification() {
        assert!(GeneratorError::Timeout.is_transient());
        assert!(GeneratorError::RateLimited { retry_after: None }.is_transient());
        assert!(GeneratorError::ServerError {
            reason: "overloaded".into()
        }
        .is_transient());
        assert!(!GeneratorError::AuthError {
            reason: "bad key".into()
        }
        .is_transient());
        assert!(!GeneratorError::InvalidRequest {
            reason: "bad".into()
        }
        .is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_generator() {
        let generator = Arc::new(ScriptedGenerator::new().then_text(safe_output("5")));
        let client = client(generator.clone());

        let first = client.fetch(&request()).await.unwrap();
        let second = client.fetch(&request()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.calls(), 1);
        assert_eq!(client.cache().stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_error_is_not_retried() {
        let generator = Arc::new(ScriptedGenerator::new().then_error(GeneratorError::AuthError {
            reason: "invalid x-api-key".into(),
        }));
        let client = client(generator.clone());

        let err = client.fetch(&request()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Authentication);
        assert!(err.is_fatal());
        assert_eq!(generator.calls(), 1);
        assert!(client.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsafe_output_is_retried_and_never_cached() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .then_text(safe_output("5").replace("friendly", "scary"))
                .then_text(safe_output("5")),
        );
        let client = client(generator.clone());

        let content = client.fetch(&request()).await.unwrap();
        assert!(!content.story_text.contains("scary"));
        assert_eq!(generator.calls(), 2);
        assert!(client
            .cache()
            .payloads()
            .iter()
            .all(|p| !p.story_text.contains("scary")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_attempt_times_out() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .then_stall(Duration::from_secs(600))
                .then_text(safe_output("5")),
        );
        let client = client(generator.clone());

        let content = client.fetch(&request()).await.unwrap();
        assert_eq!(content.correct_answer, "5");
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_hint_extends_backoff() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .then_error(GeneratorError::RateLimited {
                    retry_after: Some(Duration::from_secs(4)),
                })
                .then_text(safe_output("5")),
        );
        let client = client(generator.clone());

        let start = tokio::time::Instant::now();
        client.fetch(&request()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
