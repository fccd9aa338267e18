//! StorySession - one child's multi-part adventure.
//!
//! A session ties the pipeline together for a single child:
//! - asks the difficulty manager which level the next part is at
//! - fetches (cached or fresh) content for that level
//! - personalizes a copy with the child's name
//! - checks answers and feeds the outcome back into the difficulty manager
//!
//! The child's name lives only here. Everything below this layer works on
//! anonymous templates.

use crate::config::PipelineConfig;
use crate::content::{
    Difficulty, GeneratedContent, GenerationRequest, LearningFocus, Theme,
};
use crate::difficulty::{AdaptiveDifficultyManager, DifficultyState, DifficultyThresholds, Transition};
use crate::error::{ConfigError, SessionError, SessionResult};
use crate::fallback::{CannedFallback, FallbackProvider};
use crate::generation::GenerationClient;
use crate::id::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Minimum number of characters in a child's name.
pub const MIN_NAME_CHARS: usize = 2;

/// Per-session tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Number of parts in one adventure.
    pub total_parts: usize,
    /// Accept free-text answers that contain, or are contained in, the answer key.
    pub fuzzy_matching: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            total_parts: 3,
            fuzzy_matching: true,
        }
    }
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_parts == 0 {
            return Err(ConfigError::invalid("session.total_parts", "must be at least 1"));
        }
        Ok(())
    }

    /// Default settings sized to the part count `client` writes prompts for.
    pub fn for_client(client: &GenerationClient) -> Self {
        Self {
            total_parts: client.prompt_builder().total_parts(),
            ..Self::default()
        }
    }

    /// Validate, and require `client` to write prompts for the same number of parts.
    pub fn validate_for(&self, client: &GenerationClient) -> Result<(), ConfigError> {
        self.validate()?;
        let prompt_parts = client.prompt_builder().total_parts();
        if self.total_parts != prompt_parts {
            return Err(ConfigError::invalid(
                "session.total_parts",
                format!(
                    "is {} but the generation client writes prompts for {prompt_parts} parts",
                    self.total_parts
                ),
            ));
        }
        Ok(())
    }
}

/// One story part as the child sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPart {
    /// Personalized content.
    pub content: GeneratedContent,
    pub given_answer: Option<String>,
    pub is_correct: Option<bool>,
    /// Level that produced this part's question.
    pub difficulty_at_time: Difficulty,
    /// The part came from fallback content because generation was exhausted.
    pub degraded: bool,
}

impl StoryPart {
    pub fn is_answered(&self) -> bool {
        self.is_correct.is_some()
    }
}

/// Result of submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub part_index: usize,
    pub is_correct: bool,
    pub correct_answer: String,
    /// Parent-facing explanation generated with the question.
    pub explanation: String,
    /// Effect of this answer on the difficulty level.
    pub transition: Transition,
    /// Whether this answer completed the session.
    pub session_complete: bool,
}

impl AnswerOutcome {
    /// Level the next part will be requested at.
    pub fn next_level(&self) -> Difficulty {
        self.transition.level()
    }
}

/// Progress overview for the parent dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub answered: usize,
    pub correct: usize,
    /// Fraction of answered parts that were correct, 0.0 with no answers.
    pub success_rate: f64,
    /// Answered parts as a percentage of total parts.
    pub progress_percent: u32,
    /// Level each started part was generated at.
    pub difficulty_path: Vec<Difficulty>,
    /// Indices of parts served from fallback content.
    pub degraded_parts: Vec<usize>,
    pub current_level: Difficulty,
    pub complete: bool,
}

/// Normalize an answer for comparison.
///
/// Trims, lowercases, collapses inner whitespace and strips trailing punctuation.
pub fn normalize_answer(answer: &str) -> String {
    let collapsed = answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim_end()
        .to_string()
}

/// Number at the start of an answer: "5 gems" gives 5, "five" gives none.
fn leading_number(answer: &str) -> Option<f64> {
    let token = answer.split_whitespace().next()?;
    let end = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(token.len());
    token[..end].parse().ok()
}

/// Decide whether `given` answers a question whose key is `expected`.
///
/// Math answers compare their leading numbers when both sides start with
/// one, so "5" answers a key of "5 gems". Other
/// focuses compare normalized text and, with `fuzzy` set, accept either
/// side containing the other.
pub fn answer_matches(focus: LearningFocus, expected: &str, given: &str, fuzzy: bool) -> bool {
    let expected = normalize_answer(expected);
    let given = normalize_answer(given);
    if given.is_empty() || expected.is_empty() {
        return false;
    }

    match focus {
        LearningFocus::Math => match (leading_number(&expected), leading_number(&given)) {
            (Some(a), Some(b)) => (a - b).abs() < 1e-9,
            _ => expected == given,
        },
        LearningFocus::Vocabulary | LearningFocus::ProblemSolving => {
            expected == given || (fuzzy && (expected.contains(&given) || given.contains(&expected)))
        }
    }
}

/// A single child's adventure.
///
/// Single-owner: one UI session drives it, so it needs no locking. The
/// shared [`GenerationClient`] handles cross-session concurrency.
pub struct StorySession {
    id: SessionId,
    child_name: String,
    theme: Theme,
    learning_focus: LearningFocus,
    settings: SessionSettings,
    difficulty: AdaptiveDifficultyManager,
    parts: Vec<StoryPart>,
    client: Arc<GenerationClient>,
    fallback: Arc<dyn FallbackProvider>,
}

impl StorySession {
    /// Create a session at `Easy` with default thresholds.
    ///
    /// The session has as many parts as `client` writes prompts for.
    pub fn new(
        child_name: &str,
        theme: Theme,
        learning_focus: LearningFocus,
        client: Arc<GenerationClient>,
    ) -> SessionResult<Self> {
        let child_name = child_name.trim();
        if child_name.chars().count() < MIN_NAME_CHARS {
            return Err(SessionError::InvalidChildName {
                min: MIN_NAME_CHARS,
            });
        }

        let session = Self {
            id: SessionId::new(),
            child_name: child_name.to_string(),
            theme,
            learning_focus,
            settings: SessionSettings::for_client(&client),
            difficulty: AdaptiveDifficultyManager::default(),
            parts: Vec::new(),
            client,
            fallback: Arc::new(CannedFallback),
        };
        tracing::info!(
            session = %session.id,
            theme = %theme,
            focus = %learning_focus,
            "story session started"
        );
        Ok(session)
    }

    /// Replace the session settings.
    ///
    /// Fails when `settings.total_parts` differs from the client's prompt
    /// builder, which would number and close the story wrongly.
    pub fn with_settings(mut self, settings: SessionSettings) -> SessionResult<Self> {
        settings.validate_for(&self.client)?;
        self.settings = settings;
        Ok(self)
    }

    /// Use different promotion/demotion thresholds.
    pub fn with_thresholds(mut self, thresholds: DifficultyThresholds) -> Self {
        self.difficulty = AdaptiveDifficultyManager::new(thresholds);
        self
    }

    /// Use a different source of fallback content.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackProvider>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn child_name(&self) -> &str {
        &self.child_name
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn learning_focus(&self) -> LearningFocus {
        self.learning_focus
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn parts(&self) -> &[StoryPart] {
        &self.parts
    }

    pub fn difficulty_state(&self) -> DifficultyState {
        self.difficulty.state()
    }

    /// Level the next part will be requested at.
    pub fn current_level(&self) -> Difficulty {
        self.difficulty.current_level()
    }

    /// True once every configured part has an answer.
    pub fn is_complete(&self) -> bool {
        self.parts.len() >= self.settings.total_parts && self.parts.iter().all(StoryPart::is_answered)
    }

    /// Generate and append part `part_index`.
    ///
    /// Parts start in order, each after the previous one is answered.
    /// Exhausted generation serves fallback content and flags the part as
    /// degraded; fatal failures append nothing and are returned.
    pub async fn start_part(&mut self, part_index: usize) -> SessionResult<&StoryPart> {
        self.ensure_active()?;
        if part_index >= self.settings.total_parts {
            return Err(SessionError::state(format!(
                "part {part_index} is out of range (adventure has {} parts)",
                self.settings.total_parts
            )));
        }
        if part_index != self.parts.len() {
            return Err(SessionError::state(format!(
                "part {part_index} cannot start; the next part is {}",
                self.parts.len()
            )));
        }
        if let Some(previous) = self.parts.last() {
            if !previous.is_answered() {
                return Err(SessionError::state(format!(
                    "part {} has not been answered",
                    self.parts.len() - 1
                )));
            }
        }

        let level = self.difficulty.current_level();
        let request = GenerationRequest::new(self.theme, self.learning_focus, level, part_index);

        let (template, degraded) = match self.client.fetch(&request).await {
            Ok(content) => (content, false),
            Err(failure) if failure.is_fatal() => {
                tracing::error!(session = %self.id, part = part_index, error = %failure, "cannot start part");
                return Err(failure.into());
            }
            Err(failure) => {
                tracing::warn!(
                    session = %self.id,
                    part = part_index,
                    error = %failure,
                    "serving fallback content"
                );
                (self.fallback.fallback(&request), true)
            }
        };

        self.parts.push(StoryPart {
            content: template.personalize(&self.child_name),
            given_answer: None,
            is_correct: None,
            difficulty_at_time: level,
            degraded,
        });
        Ok(&self.parts[part_index])
    }

    /// Check `answer` against part `part_index` and update the difficulty level.
    pub fn submit_answer(&mut self, part_index: usize, answer: &str) -> SessionResult<AnswerOutcome> {
        self.ensure_active()?;
        let part = self
            .parts
            .get(part_index)
            .ok_or_else(|| SessionError::state(format!("part {part_index} has not been started")))?;
        if part.is_answered() {
            return Err(SessionError::state(format!("part {part_index} is already answered")));
        }

        // Fallback questions are open-ended.
        let is_correct = if part.degraded {
            !answer.trim().is_empty()
        } else {
            answer_matches(
                self.learning_focus,
                &part.content.correct_answer,
                answer,
                self.settings.fuzzy_matching,
            )
        };
        let correct_answer = part.content.correct_answer.clone();
        let explanation = part.content.explanation.clone();

        let transition = self.difficulty.record_outcome(is_correct);
        if let Some(part) = self.parts.get_mut(part_index) {
            part.given_answer = Some(answer.to_string());
            part.is_correct = Some(is_correct);
        }

        if !matches!(transition, Transition::Unchanged(_)) {
            tracing::info!(session = %self.id, ?transition, "difficulty changed");
        }
        let session_complete = self.is_complete();
        if session_complete {
            let summary = self.summary();
            tracing::info!(
                session = %self.id,
                correct = summary.correct,
                answered = summary.answered,
                "story session complete"
            );
        }

        Ok(AnswerOutcome {
            part_index,
            is_correct,
            correct_answer,
            explanation,
            transition,
            session_complete,
        })
    }

    pub fn summary(&self) -> SessionSummary {
        let answered = self.parts.iter().filter(|p| p.is_answered()).count();
        let correct = self.parts.iter().filter(|p| p.is_correct == Some(true)).count();
        let success_rate = if answered == 0 {
            0.0
        } else {
            correct as f64 / answered as f64
        };
        let progress_percent = if self.settings.total_parts == 0 {
            100
        } else {
            (answered * 100 / self.settings.total_parts) as u32
        };

        SessionSummary {
            answered,
            correct,
            success_rate,
            progress_percent,
            difficulty_path: self.parts.iter().map(|p| p.difficulty_at_time).collect(),
            degraded_parts: self
                .parts
                .iter()
                .enumerate()
                .filter(|(_, p)| p.degraded)
                .map(|(i, _)| i)
                .collect(),
            current_level: self.difficulty.current_level(),
            complete: self.is_complete(),
        }
    }

    fn ensure_active(&self) -> SessionResult<()> {
        if self.is_complete() {
            Err(SessionError::state("session is complete"))
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for StorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // No child name.
        f.debug_struct("StorySession")
            .field("id", &self.id)
            .field("theme", &self.theme)
            .field("learning_focus", &self.learning_focus)
            .field("difficulty", &self.difficulty.state())
            .field("parts", &self.parts.len())
            .finish()
    }
}

/// Hosts many independent sessions keyed by id.
///
/// Owned by the host; every session still has a single owner.
pub struct SessionRegistry {
    client: Arc<GenerationClient>,
    settings: SessionSettings,
    thresholds: DifficultyThresholds,
    fallback: Arc<dyn FallbackProvider>,
    sessions: HashMap<SessionId, StorySession>,
}

impl SessionRegistry {
    pub fn new(client: Arc<GenerationClient>) -> Self {
        Self {
            settings: SessionSettings::for_client(&client),
            client,
            thresholds: DifficultyThresholds::default(),
            fallback: Arc::new(CannedFallback),
            sessions: HashMap::new(),
        }
    }

    /// Create a registry using the session and difficulty sections of `config`.
    pub fn from_config(config: &PipelineConfig, client: Arc<GenerationClient>) -> Self {
        Self::new(client)
            .with_settings(config.session.clone())
            .with_thresholds(config.difficulty)
    }

    /// Settings for new sessions, checked against the client on each start.
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_thresholds(mut self, thresholds: DifficultyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackProvider>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Start a new session and return its id.
    pub fn start_session(
        &mut self,
        child_name: &str,
        theme: Theme,
        learning_focus: LearningFocus,
    ) -> SessionResult<SessionId> {
        let session = StorySession::new(child_name, theme, learning_focus, self.client.clone())?
            .with_settings(self.settings.clone())?
            .with_thresholds(self.thresholds)
            .with_fallback(self.fallback.clone());
        let id = session.id();
        self.sessions.insert(id, session);
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> SessionResult<&StorySession> {
        self.sessions.get(&id).ok_or(SessionError::UnknownSession(id))
    }

    pub fn get_mut(&mut self, id: SessionId) -> SessionResult<&mut StorySession> {
        self.sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))
    }

    pub async fn start_part(&mut self, id: SessionId, part_index: usize) -> SessionResult<&StoryPart> {
        self.get_mut(id)?.start_part(part_index).await
    }

    pub fn submit_answer(
        &mut self,
        id: SessionId,
        part_index: usize,
        answer: &str,
    ) -> SessionResult<AnswerOutcome> {
        self.get_mut(id)?.submit_answer(part_index, answer)
    }

    /// Remove a session, returning it.
    pub fn end_session(&mut self, id: SessionId) -> SessionResult<StorySession> {
        let session = self
            .sessions
            .remove(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        tracing::info!(session = %id, "story session ended");
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GenerationCache;
    use crate::generation::{GeneratorError, RetryPolicy};
    use crate::prompt::{PromptBuilder, PromptConfig};
    use crate::testing::{safe_output, ScriptedGenerator};

    fn client(generator: ScriptedGenerator) -> Arc<GenerationClient> {
        Arc::new(GenerationClient::new(
            Arc::new(generator),
            Arc::new(GenerationCache::default()),
        ))
    }

    fn client_with_parts(generator: ScriptedGenerator, total_parts: usize) -> Arc<GenerationClient> {
        Arc::new(
            GenerationClient::new(Arc::new(generator), Arc::new(GenerationCache::default()))
                .with_prompt_builder(PromptBuilder::new(PromptConfig::default(), total_parts)),
        )
    }

    fn session(generator: ScriptedGenerator) -> StorySession {
        StorySession::new("Maya", Theme::Dragons, LearningFocus::Math, client(generator)).unwrap()
    }

    #[test]
    fn test_answer_normalization() {
        assert_eq!(normalize_answer("  The   Big Dragon!! "), "the big dragon");
        assert_eq!(normalize_answer("5."), "5");
        assert_eq!(normalize_answer("?!"), "");
    }

    #[test]
    fn test_answer_matching() {
        assert!(answer_matches(LearningFocus::Math, "5", " 5.0 ", true));
        assert!(!answer_matches(LearningFocus::Math, "5", "6", true));
        assert!(answer_matches(LearningFocus::Math, "five", "Five", true));
        assert!(!answer_matches(LearningFocus::Math, "15", "5", true));
        assert!(answer_matches(LearningFocus::Math, "5 gems", "5", true));
        assert!(answer_matches(LearningFocus::Math, "5", "5 gems!", false));
        assert!(!answer_matches(LearningFocus::Math, "5 gems", "6", true));
        assert!(!answer_matches(LearningFocus::Math, "5 gems", "gems", true));

        assert!(answer_matches(LearningFocus::Vocabulary, "brave", "BRAVE!", false));
        assert!(answer_matches(LearningFocus::Vocabulary, "brave", "very brave", true));
        assert!(!answer_matches(LearningFocus::Vocabulary, "brave", "very brave", false));
        assert!(!answer_matches(LearningFocus::ProblemSolving, "use the rope", "   ", true));
    }

    #[test]
    fn test_child_name_validation() {
        let c = client(ScriptedGenerator::new());
        assert!(matches!(
            StorySession::new(" M ", Theme::Pirates, LearningFocus::Vocabulary, c.clone()),
            Err(SessionError::InvalidChildName { min: 2 })
        ));
        let session = StorySession::new("  Li ", Theme::Pirates, LearningFocus::Vocabulary, c).unwrap();
        assert_eq!(session.child_name(), "Li");
    }

    #[tokio::test(start_paused = true)]
    async fn test_adaptive_three_part_flow() {
        let mut session = session(ScriptedGenerator::always(safe_output("5")));
        let mut requested = Vec::new();

        for (index, answer) in ["5", "5", "7"].iter().enumerate() {
            let part = session.start_part(index).await.unwrap();
            requested.push(part.difficulty_at_time);
            assert!(part.content.story_text.starts_with("Maya and a friendly dragon"));
            assert!(!part.content.has_placeholder());
            session.submit_answer(index, answer).unwrap();
        }

        assert_eq!(
            requested,
            vec![Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
        );
        assert!(session.is_complete());
        // The final demotion only affects a part that will never be requested.
        assert_eq!(session.current_level(), Difficulty::Medium);
        assert_eq!(session.parts()[2].difficulty_at_time, Difficulty::Hard);

        let summary = session.summary();
        assert_eq!(summary.answered, 3);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.progress_percent, 100);
        assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_session_is_read_only() {
        let c = client_with_parts(ScriptedGenerator::always(safe_output("5")), 1);
        let mut session = StorySession::new("Maya", Theme::Dragons, LearningFocus::Math, c).unwrap();
        assert_eq!(session.settings().total_parts, 1);
        session.start_part(0).await.unwrap();
        let outcome = session.submit_answer(0, "5").unwrap();
        assert!(outcome.session_complete);

        assert!(matches!(
            session.start_part(1).await,
            Err(SessionError::InvalidSessionState { .. })
        ));
        assert!(matches!(
            session.submit_answer(0, "5"),
            Err(SessionError::InvalidSessionState { .. })
        ));
        assert_eq!(session.parts().len(), 1);
    }

    #[test]
    fn test_part_count_must_match_prompt_builder() {
        let five = SessionSettings {
            total_parts: 5,
            ..SessionSettings::default()
        };

        let err = session(ScriptedGenerator::new())
            .with_settings(five.clone())
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Config(ConfigError::Invalid { ref field, .. }) if field == "session.total_parts"
        ));

        let c = client_with_parts(ScriptedGenerator::new(), 5);
        let session = StorySession::new("Maya", Theme::Dragons, LearningFocus::Math, c)
            .unwrap()
            .with_settings(five.clone())
            .unwrap();
        assert_eq!(session.settings().total_parts, 5);

        let mut registry = SessionRegistry::new(client(ScriptedGenerator::new())).with_settings(five);
        assert!(matches!(
            registry.start_session("Maya", Theme::Dragons, LearningFocus::Math),
            Err(SessionError::Config(ConfigError::Invalid { .. }))
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_part_ordering_enforced() {
        let mut session = session(ScriptedGenerator::always(safe_output("5")));

        assert!(session.start_part(1).await.is_err());
        assert!(session.submit_answer(0, "5").is_err());

        session.start_part(0).await.unwrap();
        assert!(session.start_part(1).await.is_err(), "part 0 is unanswered");
        assert!(session.start_part(0).await.is_err(), "part 0 already started");

        session.submit_answer(0, "5").unwrap();
        assert!(session.submit_answer(0, "5").is_err(), "already answered");
        assert!(session.start_part(5).await.is_err());
        session.start_part(1).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_generation_degrades_to_fallback() {
        let generator = ScriptedGenerator::new().then_error(GeneratorError::Timeout);
        let c = GenerationClient::new(Arc::new(generator), Arc::new(GenerationCache::default()))
            .with_retry_policy(RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            });
        let mut session =
            StorySession::new("Maya", Theme::Pirates, LearningFocus::Vocabulary, Arc::new(c)).unwrap();

        let part = session.start_part(0).await.unwrap();
        assert!(part.degraded);
        assert!(part.content.story_text.contains("Captain Maya"));

        let outcome = session.submit_answer(0, "find the map").unwrap();
        assert!(outcome.is_correct);
        assert_eq!(session.summary().degraded_parts, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_generation_appends_nothing() {
        let generator = ScriptedGenerator::new().then_error(GeneratorError::AuthError {
            reason: "bad key".into(),
        });
        let mut session = session(generator);

        let err = session.start_part(0).await.unwrap_err();
        assert!(matches!(err, SessionError::Generation(ref f) if f.is_fatal()));
        assert!(session.parts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_routes_by_id() {
        let mut registry = SessionRegistry::new(client(ScriptedGenerator::always(safe_output("5"))));
        let maya = registry
            .start_session("Maya", Theme::Dragons, LearningFocus::Math)
            .unwrap();
        let leo = registry
            .start_session("Leo", Theme::Dragons, LearningFocus::Math)
            .unwrap();
        assert_eq!(registry.len(), 2);

        let part = registry.start_part(maya, 0).await.unwrap();
        assert!(part.content.story_text.starts_with("Maya"));
        let part = registry.start_part(leo, 0).await.unwrap();
        assert!(part.content.story_text.starts_with("Leo"));

        registry.submit_answer(maya, 0, "5").unwrap();
        assert_eq!(registry.get(maya).unwrap().current_level(), Difficulty::Medium);
        assert_eq!(registry.get(leo).unwrap().current_level(), Difficulty::Easy);

        registry.end_session(leo).unwrap();
        assert!(matches!(
            registry.submit_answer(leo, 0, "5"),
            Err(SessionError::UnknownSession(id)) if id == leo
        ));
    }

    #[test]
    fn test_debug_omits_child_name() {
        let session = session(ScriptedGenerator::new());
        assert!(!format!("{session:?}").contains("Maya"));
    }
}
