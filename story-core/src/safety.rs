//! Content safety validation for generated story parts.
//!
//! The validator runs a fixed battery of independent, named rules over raw
//! generator output:
//! - Structure: non-empty, sensible length, name placeholder, question/answer split
//! - Denylist: unsafe terms and themes
//! - Positive framing: at least one encouraging or educational indicator
//!
//! Every rule is evaluated on every call, so a report lists all problems at
//! once. Unsafe output must never be cached or shown.

use crate::content::{GeneratedContent, NAME_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single named safety check.
pub trait SafetyRule: Send + Sync {
    /// Short identifier used as the prefix of every reason.
    fn name(&self) -> &str;

    /// What this rule checks.
    fn description(&self) -> &str;

    /// Check the raw generator output.
    fn check(&self, text: &str) -> RuleVerdict;
}

/// Outcome of one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleVerdict {
    /// The rule is satisfied.
    Pass,
    /// The rule is violated, with one reason per problem found.
    Fail { reasons: Vec<String> },
}

impl RuleVerdict {
    fn fail(reason: impl Into<String>) -> Self {
        RuleVerdict::Fail {
            reasons: vec![reason.into()],
        }
    }

    /// Check if this is a pass
    pub fn is_pass(&self) -> bool {
        matches!(self, RuleVerdict::Pass)
    }
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: String,
    pub reason: String,
}

/// Complete result of validating one text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub safe: bool,
    /// `"<rule>: <reason>"` for every failure, in rule order.
    pub reasons: Vec<String>,
    pub findings: Vec<Finding>,
    pub rules_checked: Vec<String>,
}

impl SafetyReport {
    /// Whether a given rule reported at least one failure.
    pub fn failed(&self, rule: &str) -> bool {
        self.findings.iter().any(|f| f.rule == rule)
    }
}

/// Tunables for the built-in rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    /// Unsafe terms. Single words match any word starting with them
    /// ("hurt" matches "hurts"); phrases match as substrings.
    pub denylist: Vec<String>,
    /// Words and phrases signalling positive or educational framing.
    pub positive_indicators: Vec<String>,
    /// Minimum length in characters.
    pub min_length: usize,
    /// Maximum length in characters.
    pub max_length: usize,
}

impl Default for SafetySettings {
    fn default() -> Self {
        let list = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            denylist: list(&[
                "scary",
                "frightening",
                "violent",
                "dangerous",
                "death",
                "kill",
                "hurt",
                "blood",
                "weapon",
            ]),
            positive_indicators: list(&[
                "positive", "learn", "safe", "fun", "magical", "adventure", "help", "friendly",
                "treasure", "discover", "find", "how many", "what", "solve",
            ]),
            min_length: 40,
            max_length: 6000,
        }
    }
}

/// Lowercase words of `text`, split on anything that is not alphanumeric.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn contains_term(text_lower: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }
    if term.contains(char::is_whitespace) {
        text_lower.contains(&term)
    } else {
        words(text_lower).any(|w| w.starts_with(&term))
    }
}

/// Output must not be blank.
pub struct NonEmpty;

impl SafetyRule for NonEmpty {
    fn name(&self) -> &str {
        "non_empty"
    }

    fn description(&self) -> &str {
        "Output contains visible text"
    }

    fn check(&self, text: &str) -> RuleVerdict {
        if text.trim().is_empty() {
            RuleVerdict::fail("output is empty")
        } else {
            RuleVerdict::Pass
        }
    }
}

/// Output length must stay within bounds.
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl SafetyRule for LengthBounds {
    fn name(&self) -> &str {
        "length"
    }

    fn description(&self) -> &str {
        "Output length is within the configured bounds"
    }

    fn check(&self, text: &str) -> RuleVerdict {
        let len = text.trim().chars().count();
        if len < self.min {
            RuleVerdict::fail(format!("output is too short ({len} < {} characters)", self.min))
        } else if len > self.max {
            RuleVerdict::fail(format!("output is too long ({len} > {} characters)", self.max))
        } else {
            RuleVerdict::Pass
        }
    }
}

/// No denylisted term may appear.
pub struct Denylist {
    terms: Vec<String>,
}

impl Denylist {
    pub fn new(terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }
}

impl SafetyRule for Denylist {
    fn name(&self) -> &str {
        "denylist"
    }

    fn description(&self) -> &str {
        "Output contains no unsafe terms or themes"
    }

    fn check(&self, text: &str) -> RuleVerdict {
        let lower = text.to_lowercase();
        let reasons: Vec<String> = self
            .terms
            .iter()
            .filter(|term| contains_term(&lower, term))
            .map(|term| format!("contains unsafe term '{}'", term.trim().to_lowercase()))
            .collect();

        if reasons.is_empty() {
            RuleVerdict::Pass
        } else {
            RuleVerdict::Fail { reasons }
        }
    }
}

/// At least one positive indicator must appear.
pub struct PositiveFraming {
    indicators: Vec<String>,
}

impl PositiveFraming {
    pub fn new(indicators: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            indicators: indicators.into_iter().map(Into::into).collect(),
        }
    }
}

impl SafetyRule for PositiveFraming {
    fn name(&self) -> &str {
        "positive_framing"
    }

    fn description(&self) -> &str {
        "Output uses positive, educational framing"
    }

    fn check(&self, text: &str) -> RuleVerdict {
        let lower = text.to_lowercase();
        if self.indicators.iter().any(|i| contains_term(&lower, i)) {
            RuleVerdict::Pass
        } else {
            RuleVerdict::fail("no positive or educational framing found")
        }
    }
}

/// The story text must carry the name placeholder so the part can be
/// personalized. A placeholder elsewhere in the output does not count.
pub struct NamePlaceholder;

impl SafetyRule for NamePlaceholder {
    fn name(&self) -> &str {
        "name_placeholder"
    }

    fn description(&self) -> &str {
        "Story text refers to the child through the name placeholder"
    }

    fn check(&self, text: &str) -> RuleVerdict {
        match GeneratedContent::parse(text) {
            Ok(content) if content.story_text.contains(NAME_PLACEHOLDER) => RuleVerdict::Pass,
            Ok(_) => RuleVerdict::fail(format!("story text is missing placeholder {NAME_PLACEHOLDER}")),
            Err(e) => RuleVerdict::fail(format!("cannot locate story text: {e}")),
        }
    }
}

/// Output must split into a story, a question and an answer.
pub struct QuestionAnswerSplit;

impl SafetyRule for QuestionAnswerSplit {
    fn name(&self) -> &str {
        "question_answer"
    }

    fn description(&self) -> &str {
        "Output has a recognizable story, question and answer"
    }

    fn check(&self, text: &str) -> RuleVerdict {
        match GeneratedContent::parse(text) {
            Ok(_) => RuleVerdict::Pass,
            Err(e) => RuleVerdict::fail(format!("no question/answer split: {e}")),
        }
    }
}

/// Runs every configured rule and aggregates the verdicts.
#[derive(Clone)]
pub struct ContentSafetyValidator {
    rules: Vec<Arc<dyn SafetyRule>>,
}

impl ContentSafetyValidator {
    /// Create a validator with the built-in rule battery.
    pub fn new(settings: &SafetySettings) -> Self {
        Self {
            rules: vec![
                Arc::new(NonEmpty),
                Arc::new(LengthBounds {
                    min: settings.min_length,
                    max: settings.max_length,
                }),
                Arc::new(Denylist::new(settings.denylist.iter().cloned())),
                Arc::new(PositiveFraming::new(
                    settings.positive_indicators.iter().cloned(),
                )),
                Arc::new(NamePlaceholder),
                Arc::new(QuestionAnswerSplit),
            ],
        }
    }

    /// Create a validator with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule
    pub fn with_rule(mut self, rule: Arc<dyn SafetyRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Names of the rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate `text` against every rule.
    pub fn validate(&self, text: &str) -> SafetyReport {
        let mut findings = Vec::new();
        let mut rules_checked = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            rules_checked.push(rule.name().to_string());
            if let RuleVerdict::Fail { reasons } = rule.check(text) {
                findings.extend(reasons.into_iter().map(|reason| Finding {
                    rule: rule.name().to_string(),
                    reason,
                }));
            }
        }

        SafetyReport {
            safe: findings.is_empty(),
            reasons: findings
                .iter()
                .map(|f| format!("{}: {}", f.rule, f.reason))
                .collect(),
            findings,
            rules_checked,
        }
    }
}

impl Default for ContentSafetyValidator {
    fn default() -> Self {
        Self::new(&SafetySettings::default())
    }
}

impl std::fmt::Debug for ContentSafetyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSafetyValidator")
            .field("rules", &self.rule_names())
            .finish()
    }
}
