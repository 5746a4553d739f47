// Comprehension quiz: answer checking with hints, scoring and the results screen.
// A wrong pick only disables that option; the question stays open until solved.

use serde::{Deserialize, Serialize};

use crate::api::{AchievementCheckRequest, Activity, QuizSubmitRequest};
use crate::error::ReaderError;
use crate::types::StoryId;

pub const DEFAULT_HINT: &str = "Try again!";
pub const DEFAULT_EXPLANATION: &str = "Great job!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: Option<u64>,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
}

impl QuizQuestion {
    pub fn hint_text(&self) -> &str {
        self.hint
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(DEFAULT_HINT)
    }

    pub fn explanation_text(&self) -> &str {
        self.explanation
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_EXPLANATION)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AnswerFeedback {
    /// Locks the question and reveals Next.
    Correct { explanation: String },
    /// Disables only the picked option.
    TryAgain { option: usize, hint: String },
    /// Question already solved or option already ruled out.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
    pub encouragement: String,
    pub percent: f32,
}

impl QuizResult {
    pub fn new(score: usize, total: usize) -> Self {
        QuizResult {
            score,
            total,
            encouragement: encouragement(score, total).to_string(),
            percent: if total == 0 {
                0.0
            } else {
                score as f32 / total as f32 * 100.0
            },
        }
    }

    /// `"3/4"` as shown on the results card.
    pub fn score_label(&self) -> String {
        format!("{}/{}", self.score, self.total)
    }

    pub fn submission(&self, story: StoryId) -> QuizSubmitRequest {
        QuizSubmitRequest {
            story_id: story,
            score: self.percent,
        }
    }

    /// Perfect rounds count towards the quiz achievement.
    pub fn achievement(&self) -> Option<AchievementCheckRequest> {
        (self.total > 0 && self.score == self.total)
            .then(|| AchievementCheckRequest::new(Activity::QuizPerfect, self.percent))
    }
}

/// Everything the host sends once the results card is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizCompletion {
    pub result: QuizResult,
    pub submission: QuizSubmitRequest,
    pub achievement: Option<AchievementCheckRequest>,
}

pub fn encouragement(score: usize, total: usize) -> &'static str {
    if score == total {
        "Perfect score! You're a super reader!"
    } else if score * 2 > total {
        "Great job! Keep reading!"
    } else {
        "Good effort! Practice makes perfect!"
    }
}

#[derive(Debug, Clone, Default)]
struct QuestionState {
    disabled: Vec<usize>,
    solved: bool,
}

pub struct QuizSession {
    story: StoryId,
    questions: Vec<QuizQuestion>,
    states: Vec<QuestionState>,
    index: usize,
    score: usize,
}

impl QuizSession {
    pub fn new(story: StoryId, questions: Vec<QuizQuestion>) -> Result<Self, ReaderError> {
        if questions.is_empty() {
            return Err(ReaderError::Backend(
                "Could not generate quiz for this story.".to_string(),
            ));
        }
        let states = vec![QuestionState::default(); questions.len()];
        Ok(QuizSession {
            story,
            questions,
            states,
            index: 0,
            score: 0,
        })
    }

    pub fn story(&self) -> StoryId {
        self.story
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn current(&self) -> &QuizQuestion {
        &self.questions[self.index]
    }

    pub fn is_solved(&self) -> bool {
        self.states[self.index].solved
    }

    pub fn disabled_options(&self) -> &[usize] {
        &self.states[self.index].disabled
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.questions.len()
    }

    /// Check the option at `option` for the current question.
    pub fn answer(&mut self, option: usize) -> Result<AnswerFeedback, ReaderError> {
        let question = &self.questions[self.index];
        let Some(picked) = question.options.get(option) else {
            return Err(ReaderError::IndexOutOfRange {
                index: option,
                len: question.options.len(),
            });
        };
        let state = &mut self.states[self.index];
        if state.solved || state.disabled.contains(&option) {
            return Ok(AnswerFeedback::Ignored);
        }

        if *picked == question.correct_answer {
            state.solved = true;
            self.score += 1;
            log::debug!("question {} solved, score {}", self.index, self.score);
            Ok(AnswerFeedback::Correct {
                explanation: question.explanation_text().to_string(),
            })
        } else {
            state.disabled.push(option);
            Ok(AnswerFeedback::TryAgain {
                option,
                hint: question.hint_text().to_string(),
            })
        }
    }

    /// Move past a solved question. Returns the results once the last one is done.
    pub fn next(&mut self) -> Option<QuizResult> {
        if !self.is_solved() {
            return None;
        }
        if self.is_last() {
            return Some(self.finish());
        }
        self.index += 1;
        None
    }

    pub fn finish(&self) -> QuizResult {
        QuizResult::new(self.score, self.questions.len())
    }

    pub fn completion(&self) -> QuizCompletion {
        let result = self.finish();
        QuizCompletion {
            submission: result.submission(self.story),
            achievement: result.achievement(),
            result,
        }
    }
}
