//! Canned, pre-approved content used when generation is exhausted.

use crate::content::{GeneratedContent, GenerationRequest, Theme, NAME_PLACEHOLDER};

/// Answer key marking an open-ended fallback question.
pub const OPEN_ENDED_ANSWER: &str = "any creative answer";

/// Supplies safe content when generation cannot.
pub trait FallbackProvider: Send + Sync {
    /// Content to show for `request`. Must carry the name placeholder, never a name.
    fn fallback(&self, request: &GenerationRequest) -> GeneratedContent;
}

/// Built-in theme-specific fallback parts with open-ended questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedFallback;

impl FallbackProvider for CannedFallback {
    fn fallback(&self, request: &GenerationRequest) -> GeneratedContent {
        let part = request.part_index + 1;
        let story_text = match request.theme {
            Theme::Dragons => format!(
                "Part {part}: {NAME_PLACEHOLDER} and a friendly dragon fly over sparkling hills, looking for the next clue on their adventure."
            ),
            Theme::Pirates => format!(
                "Part {part}: Captain {NAME_PLACEHOLDER} sails the sunny sea toward the next island, where a new treasure clue is waiting."
            ),
            Theme::Princesses => format!(
                "Part {part}: Princess {NAME_PLACEHOLDER} walks through the castle garden, ready to help a new friend on her quest."
            ),
        };

        GeneratedContent {
            story_text,
            question: format!("What do you think {NAME_PLACEHOLDER} should do next?"),
            correct_answer: OPEN_ENDED_ANSWER.to_string(),
            explanation: format!(
                "This part came from the built-in backup story. Any thoughtful idea is a great answer: it lets {NAME_PLACEHOLDER} practice {} thinking in their own words.",
                request.learning_focus.label()
            ),
        }
    }
}
