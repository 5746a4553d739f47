// Typed errors with thiserror. Surface meaningful messages to JS.
// Every variant maps to a short user-facing message via `user_message`.

use thiserror::Error;

use crate::speech::RecognitionError;

/// Reader core error types.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Story {0} has no sentences")]
    EmptyStory(u64),

    #[error("Index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend reported failure: {0}")]
    Backend(String),

    #[error("Audio playback error: {0}")]
    Audio(String),

    #[error("Speech recognition error: {0}")]
    Recognition(RecognitionError),

    #[error("{0}")]
    Validation(String),

    #[error("Response for {0} arrived after the view changed")]
    Stale(String),
}

impl ReaderError {
    /// Text shown to the child or parent in the alert/toast.
    pub fn user_message(&self) -> String {
        match self {
            ReaderError::Backend(message) | ReaderError::Validation(message) => message.clone(),
            ReaderError::Network(_) => "Could not reach the server. Please try again.".to_string(),
            ReaderError::Audio(_) => "Could not load audio.".to_string(),
            ReaderError::Recognition(err) => err.guidance().to_string(),
            ReaderError::EmptyStory(_) => "This story has nothing to read yet.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ReaderError {
    fn from(err: serde_json::Error) -> Self {
        ReaderError::Serialization(err.to_string())
    }
}

impl From<RecognitionError> for ReaderError {
    fn from(err: RecognitionError) -> Self {
        ReaderError::Recognition(err)
    }
}
