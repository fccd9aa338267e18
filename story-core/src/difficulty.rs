//! Per-session difficulty state machine.
//!
//! Levels move one step at a time: `K` correct answers in a row promote,
//! `M` incorrect answers in a row demote. `Easy` never demotes and `Hard`
//! never promotes. The manager knows nothing about content; it only answers
//! "what level next" and records outcomes.

use crate::content::Difficulty;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Streak lengths that trigger a level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyThresholds {
    /// Consecutive correct answers needed to move up.
    pub promote_after: u32,
    /// Consecutive incorrect answers needed to move down.
    pub demote_after: u32,
}

impl Default for DifficultyThresholds {
    fn default() -> Self {
        Self {
            promote_after: 1,
            demote_after: 1,
        }
    }
}

impl DifficultyThresholds {
    pub fn new(promote_after: u32, demote_after: u32) -> Result<Self, ConfigError> {
        let thresholds = Self {
            promote_after,
            demote_after,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.promote_after == 0 {
            return Err(ConfigError::invalid(
                "difficulty.promote_after",
                "must be at least 1",
            ));
        }
        if self.demote_after == 0 {
            return Err(ConfigError::invalid(
                "difficulty.demote_after",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Current level plus the running streaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DifficultyState {
    pub level: Difficulty,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
}

/// What a recorded outcome did to the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Promoted { from: Difficulty, to: Difficulty },
    Demoted { from: Difficulty, to: Difficulty },
    Unchanged(Difficulty),
}

impl Transition {
    /// Level after the transition.
    pub fn level(&self) -> Difficulty {
        match self {
            Transition::Promoted { to, .. } | Transition::Demoted { to, .. } => *to,
            Transition::Unchanged(level) => *level,
        }
    }
}

/// Owns one session's [`DifficultyState`].
#[derive(Debug, Clone)]
pub struct AdaptiveDifficultyManager {
    thresholds: DifficultyThresholds,
    state: DifficultyState,
}

impl AdaptiveDifficultyManager {
    /// Start at `Easy` with empty streaks.
    pub fn new(thresholds: DifficultyThresholds) -> Self {
        Self {
            thresholds,
            state: DifficultyState::default(),
        }
    }

    /// Level the next question should be generated at.
    pub fn current_level(&self) -> Difficulty {
        self.state.level
    }

    pub fn state(&self) -> DifficultyState {
        self.state
    }

    pub fn thresholds(&self) -> DifficultyThresholds {
        self.thresholds
    }

    /// Record one answer outcome and apply the transition rule.
    pub fn record_outcome(&mut self, is_correct: bool) -> Transition {
        let from = self.state.level;

        if is_correct {
            self.state.consecutive_correct = self.state.consecutive_correct.saturating_add(1);
            self.state.consecutive_incorrect = 0;

            if self.state.consecutive_correct >= self.thresholds.promote_after {
                if let Some(to) = from.harder() {
                    self.state = DifficultyState {
                        level: to,
                        ..DifficultyState::default()
                    };
                    return Transition::Promoted { from, to };
                }
            }
        } else {
            self.state.consecutive_incorrect = self.state.consecutive_incorrect.saturating_add(1);
            self.state.consecutive_correct = 0;

            if self.state.consecutive_incorrect >= self.thresholds.demote_after {
                if let Some(to) = from.easier() {
                    self.state = DifficultyState {
                        level: to,
                        ..DifficultyState::default()
                    };
                    return Transition::Demoted { from, to };
                }
            }
        }

        Transition::Unchanged(from)
    }
}

impl Default for AdaptiveDifficultyManager {
    fn default() -> Self {
        Self::new(DifficultyThresholds::default())
    }
}
