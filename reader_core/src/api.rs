// Backend REST contract: endpoint catalogue, request bodies, response envelope.
// The HTTP client itself only exists on wasm32, where it goes through `fetch`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::error::ReaderError;
use crate::playback::RequestTicket;
use crate::quiz::QuizQuestion;
use crate::scramble::{Difficulty, RoundSummary};
use crate::speech::RecognitionError;
use crate::types::{LanguageCode, Story, StoryId};
use crate::vocab::{VocabEntry, VocabStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
}

/// Every backend route the console talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    ListStories,
    GetStory(StoryId),
    BatchDeleteStories,
    StoryAudio(StoryId),
    Tts,
    EvaluateSpeech,
    GenerateRandom,
    GenerateTopic,
    QuizGenerate(StoryId),
    QuizSubmit,
    GetSettings,
    SaveSettings,
    ChatModeAsk,
    ChatAsk,
    ChatReset,
    ChatHistory,
    TinyStoriesList,
    TinyStoriesGenerate,
    TinyStory(StoryId),
    Vocabulary(StoryId),
    VocabularyStatus,
    ScrambleRound(StoryId),
    ScrambleResult,
    RecallDue,
    RecallPrompt(StoryId),
    RecallCheck,
    DailyProgress,
    AchievementsList,
    AchievementsCheck,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::ListStories
            | Endpoint::GetStory(_)
            | Endpoint::GetSettings
            | Endpoint::ChatHistory
            | Endpoint::TinyStoriesList
            | Endpoint::TinyStory(_)
            | Endpoint::Vocabulary(_)
            | Endpoint::RecallDue
            | Endpoint::RecallPrompt(_)
            | Endpoint::DailyProgress
            | Endpoint::AchievementsList => Method::Get,
            _ => Method::Post,
        }
    }

    /// Path below the API base, starting with `/`.
    pub fn path(&self) -> String {
        match self {
            Endpoint::ListStories => "/stories".to_string(),
            Endpoint::GetStory(id) => format!("/stories/{id}"),
            Endpoint::BatchDeleteStories => "/stories/batch-delete".to_string(),
            Endpoint::StoryAudio(id) => format!("/speech/story/{id}"),
            Endpoint::Tts => "/speech/tts".to_string(),
            Endpoint::EvaluateSpeech => "/speech/evaluate".to_string(),
            Endpoint::GenerateRandom => "/generator/random".to_string(),
            Endpoint::GenerateTopic => "/generator/topic".to_string(),
            Endpoint::QuizGenerate(id) => format!("/quiz/generate/{id}"),
            Endpoint::QuizSubmit => "/quiz/submit".to_string(),
            Endpoint::GetSettings | Endpoint::SaveSettings => "/settings".to_string(),
            Endpoint::ChatModeAsk => "/chatmode/ask".to_string(),
            Endpoint::ChatAsk => "/chatbot/ask".to_string(),
            Endpoint::ChatReset => "/chatbot/reset".to_string(),
            Endpoint::ChatHistory => "/chatbot/history".to_string(),
            Endpoint::TinyStoriesList => "/tinystories/".to_string(),
            Endpoint::TinyStoriesGenerate => "/tinystories/generate".to_string(),
            Endpoint::TinyStory(id) => format!("/tinystories/{id}"),
            Endpoint::Vocabulary(id) => format!("/tinystories/{id}/vocabulary"),
            Endpoint::VocabularyStatus => "/tinystories/vocabulary/status".to_string(),
            Endpoint::ScrambleRound(id) => format!("/tinystories/{id}/scramble"),
            Endpoint::ScrambleResult => "/tinystories/scramble/result".to_string(),
            Endpoint::RecallDue => "/recall/due".to_string(),
            Endpoint::RecallPrompt(id) => format!("/recall/prompt/{id}"),
            Endpoint::RecallCheck => "/recall/check".to_string(),
            Endpoint::DailyProgress => "/recall/daily-progress".to_string(),
            Endpoint::AchievementsList => "/achievements/list".to_string(),
            Endpoint::AchievementsCheck => "/achievements/check".to_string(),
        }
    }

    pub fn url(&self, api_base: &str) -> String {
        format!("{}{}", api_base.trim_end_matches('/'), self.path())
    }

    /// Message shown when the backend fails without saying why.
    pub fn fallback_error(&self) -> &'static str {
        match self {
            Endpoint::ListStories => "Failed to load stories",
            Endpoint::GetStory(_) | Endpoint::TinyStory(_) => "Failed to load story",
            Endpoint::BatchDeleteStories => "Failed to delete stories",
            Endpoint::StoryAudio(_) | Endpoint::Tts => "Could not load audio.",
            Endpoint::EvaluateSpeech => "Failed to evaluate speech",
            Endpoint::GenerateRandom | Endpoint::GenerateTopic | Endpoint::TinyStoriesGenerate => {
                "Failed to generate story"
            }
            Endpoint::QuizGenerate(_) => "Could not generate quiz for this story.",
            Endpoint::GetSettings => "Failed to load settings",
            Endpoint::SaveSettings => "Failed to save settings",
            Endpoint::RecallDue => "Failed to load daily challenges",
            Endpoint::RecallPrompt(_) => "Failed to load writing exercise",
            Endpoint::RecallCheck => "Failed to check writing",
            Endpoint::ScrambleRound(_) => "Could not start the word game.",
            Endpoint::ChatModeAsk => "Failed to process request",
            _ => "Something went wrong. Please try again.",
        }
    }
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryAudioRequest {
    pub speed: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    pub speed: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub expected_text: String,
    pub spoken_text: String,
}

impl EvaluateRequest {
    /// A blank transcript means the recognizer heard nothing.
    pub fn new(expected_text: &str, spoken_text: &str) -> Result<Self, ReaderError> {
        if expected_text.trim().is_empty() {
            return Err(ReaderError::Validation(
                "Pick a sentence to practise first.".to_string(),
            ));
        }
        let spoken_text = spoken_text.trim();
        if spoken_text.is_empty() {
            return Err(RecognitionError::NoSpeech.into());
        }
        Ok(EvaluateRequest {
            expected_text: expected_text.trim().to_string(),
            spoken_text: spoken_text.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub length: StoryLength,
    pub speed: f32,
    pub language: LanguageCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl GenerateRequest {
    /// Topic stories need a non-blank topic.
    pub fn topic(
        topic: &str,
        length: StoryLength,
        speed: f32,
        language: LanguageCode,
    ) -> Result<Self, ReaderError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ReaderError::Validation(
                "Please enter a topic for the story!".to_string(),
            ));
        }
        Ok(GenerateRequest {
            length,
            speed,
            language,
            topic: Some(topic.to_string()),
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        if self.topic.is_some() {
            Endpoint::GenerateTopic
        } else {
            Endpoint::GenerateRandom
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDeleteRequest {
    pub story_ids: Vec<StoryId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSubmitRequest {
    pub story_id: StoryId,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAskRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Body of `/chatbot/reset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatModeRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallCheckRequest {
    pub text: String,
    pub keywords: Vec<String>,
}

/// Activity kinds the achievement table unlocks on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Practice,
    Chat,
    QuizPerfect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementCheckRequest {
    pub activity_type: Activity,
    #[serde(default)]
    pub score: f32,
}

impl AchievementCheckRequest {
    pub fn new(activity_type: Activity, score: f32) -> Self {
        AchievementCheckRequest {
            activity_type,
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabStatusRequest {
    pub word: String,
    pub status: VocabStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrambleRequest {
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrambleResultRequest {
    pub story_id: StoryId,
    pub correct: usize,
    pub total: usize,
    pub difficulty: Difficulty,
    pub struggled: Vec<String>,
}

impl ScrambleResultRequest {
    pub fn from_summary(story_id: StoryId, summary: &RoundSummary) -> Self {
        ScrambleResultRequest {
            story_id,
            correct: summary.correct,
            total: summary.total,
            difficulty: summary.difficulty,
            struggled: summary.struggled.clone(),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: StoryId,
    pub title: String,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub translated_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryListResponse {
    pub stories: Vec<StorySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryResponse {
    pub story: Story,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioResponse {
    pub audio_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub story_id: Option<StoryId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GenerateResponse {
    /// Alert text shown once a story was generated.
    pub fn announcement(&self) -> String {
        let message = self
            .message
            .as_deref()
            .unwrap_or("Your new story is ready!");
        match self.title.as_deref() {
            Some(title) => format!("\u{2728} {}\n\nStory: \"{}\"", message, title),
            None => format!("\u{2728} {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyResponse {
    pub vocabulary: Vec<VocabEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallPromptResponse {
    pub prompt: String,
    #[serde(default)]
    pub story_title: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallCheckResponse {
    pub score: u32,
    #[serde(default)]
    pub feedback: Vec<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub emoji: String,
}

/// `/chatmode/ask` answers with an explanation when `is_safe`, suggestions otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatModeResponse {
    #[serde(default)]
    pub is_safe: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub explanation: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuddyReply {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrambleResponse {
    pub chunks: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// A request the host should send, and the ticket to hand back with its response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchPlan {
    pub ticket: RequestTicket,
    pub endpoint: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl FetchPlan {
    pub fn new(ticket: RequestTicket, endpoint: Endpoint) -> Self {
        FetchPlan {
            ticket,
            endpoint,
            body: None,
        }
    }

    pub fn with_body<B: Serialize>(mut self, body: &B) -> Result<Self, ReaderError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// The backend's `{ "success": bool, "error": ..., ...payload }` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

/// Unwrap an envelope, turning `success: false` into a `Backend` error.
pub fn parse_envelope<T: DeserializeOwned>(body: &str, endpoint: &Endpoint) -> Result<T, ReaderError> {
    let envelope: Envelope<serde_json::Value> = serde_json::from_str(body)?;

    if !envelope.success {
        let message = envelope
            .error
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(endpoint.fallback_error());
        log::warn!("{} failed: {}", endpoint.path(), message);
        return Err(ReaderError::Backend(message.to_string()));
    }

    Ok(serde_json::from_value(envelope.payload)?)
}

// =============================================================================
// HTTP client (browser only)
// =============================================================================

#[cfg(target_arch = "wasm32")]
pub use client::ApiClient;

#[cfg(target_arch = "wasm32")]
mod client {
    use gloo_net::http::Request;
    use serde::de::DeserializeOwned;
    use serde::Serialize;

    use super::{parse_envelope, Endpoint, Method};
    use crate::error::ReaderError;

    /// `fetch`-based client. Each call is one request; there are no automatic retries.
    #[derive(Debug, Clone)]
    pub struct ApiClient {
        base: String,
    }

    impl ApiClient {
        pub fn new(base: impl Into<String>) -> Self {
            ApiClient { base: base.into() }
        }

        pub async fn call<B: Serialize, T: DeserializeOwned>(
            &self,
            endpoint: &Endpoint,
            body: Option<&B>,
        ) -> Result<T, ReaderError> {
            let url = endpoint.url(&self.base);
            log::debug!("{:?} {}", endpoint.method(), url);

            let response = match (endpoint.method(), body) {
                (Method::Get, _) => Request::get(&url).send().await,
                (Method::Post, Some(body)) => {
                    Request::post(&url)
                        .json(body)
                        .map_err(|e| ReaderError::Serialization(e.to_string()))?
                        .send()
                        .await
                }
                (Method::Post, None) => Request::post(&url).send().await,
            }
            .map_err(|e| {
                log::error!("request to {} failed: {}", url, e);
                ReaderError::Network(e.to_string())
            })?;

            let text = response
                .text()
                .await
                .map_err(|e| ReaderError::Network(e.to_string()))?;
            parse_envelope(&text, endpoint)
        }
    }
}
