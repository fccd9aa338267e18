//! Pipeline configuration.
//!
//! Every tunable of the pipeline lives in [`PipelineConfig`]. All sections
//! default sensibly, so a TOML file only needs to name what it overrides:
//!
//! ```toml
//! [cache]
//! ttl_secs = 1800
//!
//! [difficulty]
//! promote_after = 2
//!
//! [session]
//! total_parts = 5
//! ```

use crate::cache::{CacheSettings, GenerationCache};
use crate::difficulty::DifficultyThresholds;
use crate::error::{ConfigError, ConfigResult};
use crate::generation::{GenerationClient, GenerationParams, RetryPolicy, TextGenerator};
use crate::prompt::{PromptBuilder, PromptConfig};
use crate::safety::{ContentSafetyValidator, SafetySettings};
use crate::session::SessionSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Complete configuration of the story pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cache: CacheSettings,
    pub retry: RetryPolicy,
    pub generation: GenerationParams,
    pub difficulty: DifficultyThresholds,
    pub session: SessionSettings,
    pub safety: SafetySettings,
    pub prompts: PromptConfig,
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: PipelineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_difficulty(mut self, difficulty: DifficultyThresholds) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_session(mut self, session: SessionSettings) -> Self {
        self.session = session;
        self
    }

    /// Check every range constraint.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::invalid("cache.ttl_secs", "must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if !(self.retry.backoff_multiplier >= 1.0) {
            return Err(ConfigError::invalid(
                "retry.backoff_multiplier",
                "must be at least 1.0",
            ));
        }
        if self.retry.attempt_timeout_ms == 0 {
            return Err(ConfigError::invalid("retry.attempt_timeout_ms", "must be positive"));
        }
        if self.generation.max_length == 0 {
            return Err(ConfigError::invalid("generation.max_length", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.generation.temperature) {
            return Err(ConfigError::invalid(
                "generation.temperature",
                "must be between 0.0 and 1.0",
            ));
        }
        self.difficulty.validate()?;
        self.session.validate()?;
        if self.safety.min_length > self.safety.max_length {
            return Err(ConfigError::invalid(
                "safety.min_length",
                "must not exceed safety.max_length",
            ));
        }
        Ok(())
    }

    /// Create a cache from the cache section.
    pub fn build_cache(&self) -> GenerationCache {
        GenerationCache::from_settings(&self.cache)
    }

    /// Wire a generation client from this configuration.
    pub fn build_client(
        &self,
        generator: Arc<dyn TextGenerator>,
        cache: Arc<GenerationCache>,
    ) -> GenerationClient {
        GenerationClient::new(generator, cache)
            .with_prompt_builder(PromptBuilder::new(
                self.prompts.clone(),
                self.session.total_parts,
            ))
            .with_validator(ContentSafetyValidator::new(&self.safety))
            .with_retry_policy(self.retry.clone())
            .with_params(self.generation.clone())
    }
}
