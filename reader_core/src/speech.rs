// Speech practice: recognition error guidance and evaluation feedback tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{AchievementCheckRequest, Activity};

/// Browser speech-recognition failure, keyed by the `SpeechRecognitionErrorEvent.error` code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum RecognitionError {
    PermissionDenied,
    NoSpeech,
    NoMicrophone,
    Network,
    Other(String),
}

impl RecognitionError {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "not-allowed" | "service-not-allowed" => RecognitionError::PermissionDenied,
            "no-speech" => RecognitionError::NoSpeech,
            "audio-capture" => RecognitionError::NoMicrophone,
            "network" => RecognitionError::Network,
            other => RecognitionError::Other(other.to_string()),
        }
    }

    /// Human-readable guidance for the child or parent.
    pub fn guidance(&self) -> &'static str {
        match self {
            RecognitionError::PermissionDenied => {
                "Microphone access was blocked. Please allow the microphone and try again."
            }
            RecognitionError::NoSpeech => "I didn't hear anything. Please speak a little louder.",
            RecognitionError::NoMicrophone => "No microphone was found. Please connect one and try again.",
            RecognitionError::Network => "Speech recognition needs the internet. Please check your connection.",
            RecognitionError::Other(_) => "Could not recognize speech. Please try again.",
        }
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionError::Other(code) if !code.is_empty() => write!(f, "{code}"),
            _ => f.write_str(self.guidance()),
        }
    }
}

/// Evaluation returned by `POST /api/speech/evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechEvaluation {
    pub accuracy: f32,
    pub feedback: String,
    #[serde(default)]
    pub encouragement: String,
    #[serde(default)]
    pub words_to_practice: Vec<String>,
}

/// Visual tone of the practice feedback card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTone {
    Success,
    Info,
}

/// What the practice card shows after an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeFeedback {
    pub tone: FeedbackTone,
    pub accuracy: f32,
    pub feedback: String,
    pub encouragement: String,
    pub practice_hint: Option<String>,
    /// Every evaluated attempt counts as practice.
    pub achievement: AchievementCheckRequest,
}

/// Accuracy (percent) at or above which practice feedback is celebratory.
pub const SUCCESS_ACCURACY: f32 = 70.0;

impl SpeechEvaluation {
    pub fn tone(&self) -> FeedbackTone {
        if self.accuracy >= SUCCESS_ACCURACY {
            FeedbackTone::Success
        } else {
            FeedbackTone::Info
        }
    }

    pub fn into_feedback(self) -> PracticeFeedback {
        PracticeFeedback {
            tone: self.tone(),
            practice_hint: self.practice_hint(),
            achievement: AchievementCheckRequest::new(Activity::Practice, self.accuracy),
            accuracy: self.accuracy,
            feedback: self.feedback,
            encouragement: self.encouragement,
        }
    }

    /// Hint line listing the words to practise, if any.
    pub fn practice_hint(&self) -> Option<String> {
        if self.words_to_practice.is_empty() {
            None
        } else {
            Some(format!(
                "Practice these words: {}",
                self.words_to_practice.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_codes_map_to_permission_guidance() {
        assert_eq!(
            RecognitionError::from_code("not-allowed"),
            RecognitionError::PermissionDenied
        );
        assert_eq!(
            RecognitionError::from_code("service-not-allowed"),
            RecognitionError::PermissionDenied
        );
        assert!(RecognitionError::PermissionDenied
            .guidance()
            .contains("Microphone access"));
    }

    #[test]
    fn unknown_code_gets_generic_guidance() {
        let err = RecognitionError::from_code("aborted");
        assert_eq!(err, RecognitionError::Other("aborted".to_string()));
        assert_eq!(err.guidance(), "Could not recognize speech. Please try again.");
    }

    #[test]
    fn each_known_code_has_distinct_guidance() {
        let codes = ["no-speech", "audio-capture", "network", "not-allowed"];
        let mut seen: Vec<&str> = codes
            .iter()
            .map(|c| RecognitionError::from_code(c).guidance())
            .collect();
        seen.dedup();
        assert_eq!(seen.len(), codes.len());
    }

    #[test]
    fn tone_threshold() {
        let mut eval = SpeechEvaluation {
            accuracy: 70.0,
            feedback: "Very good!".to_string(),
            encouragement: String::new(),
            words_to_practice: vec![],
        };
        assert_eq!(eval.tone(), FeedbackTone::Success);
        assert_eq!(eval.practice_hint(), None);

        eval.accuracy = 69.9;
        eval.words_to_practice = vec!["happy".to_string(), "dog".to_string()];
        assert_eq!(eval.tone(), FeedbackTone::Info);
        assert_eq!(
            eval.practice_hint().as_deref(),
            Some("Practice these words: happy, dog")
        );
    }

    #[test]
    fn feedback_card_reports_practice() {
        let feedback = SpeechEvaluation {
            accuracy: 45.0,
            feedback: "Keep going".to_string(),
            encouragement: "You can do it".to_string(),
            words_to_practice: vec!["moon".to_string()],
        }
        .into_feedback();
        assert_eq!(feedback.tone, FeedbackTone::Info);
        assert_eq!(feedback.practice_hint.as_deref(), Some("Practice these words: moon"));
        assert_eq!(feedback.achievement.activity_type, Activity::Practice);
        assert_eq!(feedback.achievement.score, 45.0);
    }
}
