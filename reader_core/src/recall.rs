// Recall writing exercise: retell a story in your own words, scored by keyword use.

use serde::{Deserialize, Serialize};

use crate::api::{RecallCheckRequest, RecallCheckResponse, RecallPromptResponse};
use crate::error::ReaderError;
use crate::types::StoryId;

pub const EMPTY_WRITING: &str = "Please write something first!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallExercise {
    pub story: StoryId,
    pub story_title: String,
    pub prompt: String,
    pub keywords: Vec<String>,
}

/// The result card under the writing box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallFeedback {
    pub score: u32,
    pub title: String,
    pub items: Vec<String>,
}

impl RecallExercise {
    pub fn new(story: StoryId, response: RecallPromptResponse) -> Self {
        RecallExercise {
            story,
            story_title: response.story_title,
            prompt: response.prompt,
            keywords: response.keywords,
        }
    }

    /// Body for `/recall/check`. Blank writing never reaches the backend.
    pub fn check_request(&self, text: &str) -> Result<RecallCheckRequest, ReaderError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ReaderError::Validation(EMPTY_WRITING.to_string()));
        }
        Ok(RecallCheckRequest {
            text: text.to_string(),
            keywords: self.keywords.clone(),
        })
    }
}

impl From<RecallCheckResponse> for RecallFeedback {
    fn from(response: RecallCheckResponse) -> Self {
        RecallFeedback {
            score: response.score,
            title: format!(
                "{} {} (Score: {}/100)",
                response.emoji, response.message, response.score
            ),
            items: response.feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise() -> RecallExercise {
        RecallExercise::new(
            StoryId::new(4),
            RecallPromptResponse {
                prompt: "What happened to the brave cat?".to_string(),
                story_title: "The Brave Cat".to_string(),
                keywords: vec!["cat".to_string(), "tree".to_string()],
            },
        )
    }

    #[test]
    fn blank_writing_is_refused() {
        let err = exercise().check_request("   \n").unwrap_err();
        assert_eq!(err.user_message(), EMPTY_WRITING);
    }

    #[test]
    fn check_sends_trimmed_text_and_keywords() {
        let request = exercise().check_request("  The cat climbed a tree. ").unwrap();
        assert_eq!(request.text, "The cat climbed a tree.");
        assert_eq!(request.keywords, vec!["cat", "tree"]);
    }

    #[test]
    fn feedback_title_carries_score() {
        let feedback = RecallFeedback::from(RecallCheckResponse {
            score: 40,
            feedback: vec!["Try to write more sentences!".to_string()],
            message: "Keep practicing!".to_string(),
            emoji: "\u{1f4dd}".to_string(),
        });
        assert_eq!(feedback.title, "\u{1f4dd} Keep practicing! (Score: 40/100)");
        assert_eq!(feedback.items.len(), 1);
    }
}
