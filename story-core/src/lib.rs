//! Adaptive educational story pipeline.
//!
//! This crate provides:
//! - Multi-part story sessions that adapt question difficulty to the child
//! - A process-wide TTL cache of anonymous story templates
//! - Safety validation of every generated part before it is cached or shown
//! - Retrying, timeout-bounded generation through Claude
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use story_core::{
//!     ClaudeGenerator, GenerationCache, LearningFocus, PipelineConfig, StorySession, Theme,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let cache = Arc::new(config.build_cache());
//!     let client = Arc::new(config.build_client(Arc::new(ClaudeGenerator::from_env()?), cache));
//!
//!     let mut session = StorySession::new("Maya", Theme::Dragons, LearningFocus::Math, client)?;
//!     let part = session.start_part(0).await?;
//!     println!("{}\n{}", part.content.story_text, part.content.question);
//!
//!     let outcome = session.submit_answer(0, "5")?;
//!     println!("correct: {} ({})", outcome.is_correct, outcome.explanation);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod content;
pub mod difficulty;
pub mod error;
pub mod fallback;
pub mod generation;
pub mod id;
pub mod prompt;
pub mod safety;
pub mod session;
pub mod testing;

// Primary public API
pub use cache::{CacheKey, CacheStats, Clock, GenerationCache, SystemClock};
pub use config::PipelineConfig;
pub use content::{
    Difficulty, GeneratedContent, GenerationRequest, LearningFocus, Theme, NAME_PLACEHOLDER,
};
pub use difficulty::{AdaptiveDifficultyManager, DifficultyState, DifficultyThresholds, Transition};
pub use error::{ConfigError, SessionError};
pub use fallback::{CannedFallback, FallbackProvider};
pub use generation::anthropic::ClaudeGenerator;
pub use generation::{
    FailureKind, GenerationClient, GenerationFailure, GeneratorError, RetryPolicy, TextGenerator,
};
pub use id::SessionId;
pub use prompt::{PromptBuilder, PromptConfig};
pub use safety::{ContentSafetyValidator, SafetyReport, SafetyRule};
pub use session::{AnswerOutcome, SessionRegistry, SessionSettings, SessionSummary, StoryPart, StorySession};
pub use testing::{ManualClock, ScriptedGenerator};
