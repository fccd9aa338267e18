//! Testing utilities for the story pipeline.
//!
//! This module provides tools for deterministic tests without API calls:
//! - `ScriptedGenerator` replays a queue of outputs, errors and stalls
//! - `ManualClock` drives cache expiry by hand
//! - `safe_output` / `unsafe_output` build raw generator output

use crate::cache::Clock;
use crate::content::NAME_PLACEHOLDER;
use crate::generation::{GeneratorError, TextGenerator};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One scripted generator response.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this text immediately.
    Text(String),
    /// Return this text after a delay.
    Delayed(Duration, String),
    /// Fail with this error.
    Error(GeneratorError),
    /// Hang for this long, then fail with a timeout.
    Stall(Duration),
}

/// A generator that returns scripted responses in order.
///
/// Once the script runs out, the fallback step (if any) repeats forever;
/// without one, every further call fails with a server error.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    steps: Vec<ScriptStep>,
    fallback: Option<ScriptStep>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn then_text(mut self, text: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Text(text.into()));
        self
    }

    /// Queue a successful response that arrives after `delay`.
    pub fn then_delayed_text(mut self, delay: Duration, text: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Delayed(delay, text.into()));
        self
    }

    /// Queue a failure.
    pub fn then_error(mut self, error: GeneratorError) -> Self {
        self.steps.push(ScriptStep::Error(error));
        self
    }

    /// Queue a call that hangs for `duration`.
    pub fn then_stall(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Stall(duration));
        self
    }

    /// Step to repeat once the script is used up.
    pub fn otherwise(mut self, step: ScriptStep) -> Self {
        self.fallback = Some(step);
        self
    }

    /// Always answer with `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self::new().otherwise(ScriptStep::Text(text.into()))
    }

    /// Number of calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock_prompts().clone()
    }

    fn lock_prompts(&self) -> MutexGuard<'_, Vec<String>> {
        self.prompts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn invoke(
        &self,
        prompt: &str,
        _max_length: usize,
        _temperature: f32,
    ) -> Result<String, GeneratorError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.lock_prompts().push(prompt.to_string());

        let step = self.steps.get(index).or(self.fallback.as_ref()).cloned();
        match step {
            Some(ScriptStep::Text(text)) => Ok(text),
            Some(ScriptStep::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(ScriptStep::Error(error)) => Err(error),
            Some(ScriptStep::Stall(duration)) => {
                tokio::time::sleep(duration).await;
                Err(GeneratorError::Timeout)
            }
            None => Err(GeneratorError::ServerError {
                reason: "no more scripted responses".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::days(365));
        *self.lock() += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.lock() = to;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z
        Self::new(DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

/// Raw generator output that passes every built-in safety rule.
pub fn safe_output(correct_answer: &str) -> String {
    serde_json::json!({
        "story_part": format!(
            "{NAME_PLACEHOLDER} and a friendly dragon discover a glowing cave full of treasure."
        ),
        "question": format!(
            "{NAME_PLACEHOLDER} finds 2 gems and then 3 more. How many gems are there now?"
        ),
        "correct_answer": correct_answer,
        "explanation": "Adding the gems together helps practice counting.",
    })
    .to_string()
}

/// Raw generator output that the denylist rejects.
pub fn unsafe_output() -> String {
    safe_output("5").replace("friendly", "scary")
}
