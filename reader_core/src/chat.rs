// Chat pages: "explore" mode that explains a safe object, and the Buddy chatbot.

use serde::{Deserialize, Serialize};

use crate::api::{
    AchievementCheckRequest, Activity, BuddyReply, ChatAskRequest, ChatHistoryResponse, ChatModeRequest,
    ChatModeResponse, ChatSessionRequest, TtsRequest,
};
use crate::error::ReaderError;

/// Explanations are read a little slower than normal speech.
pub const EXPLANATION_SPEED: f32 = 0.9;

const UNSAFE_FALLBACK: &str = "Let's explore something else!";

pub fn category_emoji(category: &str) -> &'static str {
    match category {
        "animals" => "\u{1f415}",
        "vehicles" => "\u{1f697}",
        "fruits" => "\u{1f34e}",
        "objects" => "\u{26bd}",
        "nature" => "\u{1f333}",
        _ => "\u{1f4e6}",
    }
}

/// Body for `/chatmode/ask`.
pub fn explore_request(prompt: &str) -> Result<ChatModeRequest, ReaderError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ReaderError::Validation("Prompt is required".to_string()));
    }
    Ok(ChatModeRequest {
        prompt: prompt.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionChip {
    pub label: String,
    pub prompt: String,
}

impl SuggestionChip {
    pub fn new(label: &str) -> Self {
        SuggestionChip {
            label: label.to_string(),
            prompt: format!("show me a {}", label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExploreAnswer {
    /// Safe request: picture, paragraphs, and narration for the host to fetch.
    Explanation {
        item: Option<String>,
        emoji: String,
        image_path: Option<String>,
        paragraphs: Vec<String>,
        narration: Option<TtsRequest>,
    },
    /// Unsafe or unknown request: a gentle message and other things to try.
    Suggestions {
        message: String,
        chips: Vec<SuggestionChip>,
    },
}

impl From<ChatModeResponse> for ExploreAnswer {
    fn from(response: ChatModeResponse) -> Self {
        if !response.is_safe {
            return ExploreAnswer::Suggestions {
                message: response
                    .message
                    .unwrap_or_else(|| UNSAFE_FALLBACK.to_string()),
                chips: response
                    .suggestions
                    .iter()
                    .map(|s| SuggestionChip::new(s))
                    .collect(),
            };
        }

        let text = response.explanation.join(" ");
        let narration = (!text.trim().is_empty()).then(|| TtsRequest {
            text,
            speed: EXPLANATION_SPEED,
            language: None,
        });
        ExploreAnswer::Explanation {
            emoji: category_emoji(response.category.as_deref().unwrap_or_default()).to_string(),
            item: response.item,
            image_path: response.image_path,
            paragraphs: response.explanation,
            narration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Buddy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ChatMessage {
    fn new(role: ChatRole, content: &str) -> Self {
        ChatMessage {
            role,
            content: content.to_string(),
            created_at: None,
        }
    }
}

/// Conversation with Buddy. The backend keeps the history per session id.
#[derive(Debug, Clone, Default)]
pub struct BuddyChat {
    session_id: Option<String>,
    messages: Vec<ChatMessage>,
}

impl BuddyChat {
    pub fn new(session_id: Option<String>) -> Self {
        BuddyChat {
            session_id,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Record the child's message and build the `/chatbot/ask` body.
    pub fn ask(&mut self, message: &str) -> Result<ChatAskRequest, ReaderError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ReaderError::Validation("Message is required".to_string()));
        }
        self.messages.push(ChatMessage::new(ChatRole::User, message));
        Ok(ChatAskRequest {
            message: message.to_string(),
            session_id: self.session_id.clone(),
        })
    }

    /// Buddy answered. Every exchange counts towards the chat achievement.
    pub fn reply(&mut self, reply: BuddyReply) -> AchievementCheckRequest {
        self.messages
            .push(ChatMessage::new(ChatRole::Buddy, &reply.response));
        AchievementCheckRequest::new(Activity::Chat, 0.0)
    }

    pub fn load_history(&mut self, history: ChatHistoryResponse) {
        self.messages = history.messages;
    }

    pub fn reset(&mut self) -> ChatSessionRequest {
        self.messages.clear();
        ChatSessionRequest {
            session_id: self.session_id.clone(),
        }
    }
}
