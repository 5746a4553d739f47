// reader_core: OST reading console, Rust/WASM core.
// Every state machine of the reading pages lives here; JS only renders effects and feeds events.

mod api;
mod chat;
mod config;
mod console;
mod error;
mod library;
mod logging;
mod playback;
mod quiz;
mod recall;
mod scramble;
mod speech;
mod step_reader;
mod story_player;
mod sync;
mod timeline;
mod types;
mod vocab;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::HtmlAudioElement;

pub use api::*;
pub use chat::{category_emoji, BuddyChat, ChatMessage, ChatRole, ExploreAnswer, SuggestionChip};
pub use config::{ConsoleConfig, SpeedPresets};
pub use console::ReaderConsole;
pub use error::ReaderError;
pub use library::{CardClick, DeleteButton, StoryLibrary};
pub use playback::{
    AudioHandle, AudioLease, AudioToken, CancellationToken, PlaybackKind, PlaybackSession, RequestGuard,
    RequestTicket, ViewKey,
};
pub use quiz::{encouragement, AnswerFeedback, QuizCompletion, QuizQuestion, QuizResult, QuizSession};
pub use recall::{RecallExercise, RecallFeedback, EMPTY_WRITING};
pub use scramble::{normalize, Advance, CheckOutcome, Difficulty, RoundPhase, RoundSummary, ScrambleRound, Tile};
pub use speech::{FeedbackTone, PracticeFeedback, RecognitionError, SpeechEvaluation, SUCCESS_ACCURACY};
pub use step_reader::{NarrationRequest, ReaderEffect, ReaderState, StepReader};
pub use story_player::{PlayerEffect, PlayerState, StoryAudioPlan, StoryPlayer};
pub use sync::{FrameSample, HighlightChange, StopReason, SyncLoop, SyncStep};
pub use timeline::{TimelineConfig, TimelineMapper, WasmTimeline};
pub use types::*;
pub use vocab::{CardFace, FlashcardDeck, StatusCounts, VocabEntry, VocabStatus};

/// Install the panic hook and the console logger.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init(log::LevelFilter::Info);
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

fn js_error(err: ReaderError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn ticket(json: &str) -> Result<RequestTicket, JsValue> {
    from_json(json, "ticket")
}

fn token(raw: f64) -> AudioToken {
    AudioToken::from_u64(raw as u64)
}

fn parse_track(track: &str) -> Result<TextTrack, JsValue> {
    match track {
        "source" | "" => Ok(TextTrack::Source),
        "translated" | "translation" => Ok(TextTrack::Translated),
        other => Err(JsValue::from_str(&format!("Unknown track: {}", other))),
    }
}

#[cfg(target_arch = "wasm32")]
fn entropy_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy_seed() -> u64 {
    0x5eed
}

/// Reading console exposed to JavaScript.
/// Page loads go through `begin_*`, which returns a fetch plan; the payload comes back with
/// the plan's ticket and is dropped when the page has moved on.
#[wasm_bindgen]
pub struct Console {
    inner: ReaderConsole<HtmlAudioElement>,
}

impl Console {
    /// Plan JSON for the host: ticket, method, resolved URL and body.
    fn plan_json(&self, plan: &FetchPlan) -> Result<String, JsValue> {
        to_json(&serde_json::json!({
            "ticket": plan.ticket,
            "endpoint": plan.endpoint,
            "method": plan.endpoint.method(),
            "url": plan.endpoint.url(&self.inner.config().api_base),
            "body": plan.body,
        }))
    }

    fn scramble_view_value(&self) -> serde_json::Value {
        let Some(round) = self.inner.scramble() else {
            return serde_json::Value::Null;
        };
        serde_json::json!({
            "phase": round.phase(),
            "chunk": round.current_index(),
            "total": round.total(),
            "pool": round.pool(),
            "workspace": round.workspace(),
            "reconstruction": round.reconstruction(),
            "can_check": round.can_check(),
            "solved": round.is_solved(),
            "story_so_far": round.story_so_far(),
            "difficulty": round.difficulty(),
        })
    }

    fn library_view_value(library: &StoryLibrary) -> serde_json::Value {
        serde_json::json!({
            "stories": library.stories(),
            "select_mode": library.is_select_mode(),
            "toggle_label": library.toggle_label(),
            "selected": library.selected().collect::<Vec<_>>(),
            "delete_button": library.delete_button(),
        })
    }

    fn flashcard_view_value(deck: &FlashcardDeck) -> serde_json::Value {
        serde_json::json!({
            "card": deck.current(),
            "face": deck.face(),
            "index": deck.index(),
            "total": deck.len(),
            "counts": deck.counts(),
        })
    }
}

#[wasm_bindgen]
impl Console {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<Console, JsValue> {
        let config = ConsoleConfig::from_json(config_json).map_err(js_error)?;
        logging::init(config.level_filter());
        log::info!("reader console ready (api base {})", config.api_base);

        Ok(Console {
            inner: ReaderConsole::new(config, entropy_seed()),
        })
    }

    /// Speed for a preset button (`slow`, `normal`, `fast`).
    pub fn speed(&self, preset: &str) -> f32 {
        self.inner.config().speed_for(preset)
    }

    pub fn url(&self, endpoint_json: &str) -> Result<String, JsValue> {
        let endpoint: Endpoint = from_json(endpoint_json, "endpoint")?;
        Ok(endpoint.url(&self.inner.config().api_base))
    }

    pub fn stop_audio(&mut self) {
        self.inner.stop_audio();
    }

    pub fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    /// Message to show for a failed planned request; empty when the page already moved on.
    pub fn request_failed(&self, ticket_json: &str, message: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let error = ReaderError::Backend(message.to_string());
        Ok(self.inner.request_failed(&ticket, &error).unwrap_or_default())
    }

    // -------------------------------------------------------------------------
    // Story list
    // -------------------------------------------------------------------------

    pub fn begin_story_list(&mut self) -> Result<String, JsValue> {
        let plan = self.inner.begin_story_list();
        self.plan_json(&plan)
    }

    pub fn load_story_list(&mut self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: StoryListResponse = from_json(response_json, "story list")?;
        let library = self.inner.load_story_list(&ticket, response).map_err(js_error)?;
        to_json(&Self::library_view_value(library))
    }

    pub fn library_view(&self) -> Result<String, JsValue> {
        to_json(&Self::library_view_value(self.inner.library()))
    }

    pub fn toggle_select_mode(&mut self) -> Result<String, JsValue> {
        self.inner.library_mut().toggle_select_mode();
        self.library_view()
    }

    /// Card click: opens the story, or toggles its selection in select mode.
    pub fn story_clicked(&mut self, story_id: u64) -> Result<String, JsValue> {
        let click = self.inner.library_mut().click(StoryId::new(story_id));
        to_json(&click)
    }

    /// Confirmation text for the delete dialog; empty with nothing selected.
    pub fn delete_confirmation(&self) -> String {
        self.inner.library().confirm_prompt().unwrap_or_default()
    }

    /// Batch-delete plan for the selection, `null` with nothing selected.
    pub fn begin_delete(&mut self) -> Result<String, JsValue> {
        match self.inner.begin_delete().map_err(js_error)? {
            Some(plan) => self.plan_json(&plan),
            None => to_json(&serde_json::Value::Null),
        }
    }

    pub fn stories_deleted(&mut self, ticket_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let library = self.inner.stories_deleted(&ticket).map_err(js_error)?;
        to_json(&Self::library_view_value(library))
    }

    // -------------------------------------------------------------------------
    // Classic player
    // -------------------------------------------------------------------------

    pub fn begin_story(&mut self, story_id: u64) -> Result<String, JsValue> {
        let plan = self.inner.begin_story(StoryId::new(story_id));
        self.plan_json(&plan)
    }

    /// Open the classic player on a `/stories/{id}` payload.
    pub fn open_story(&mut self, ticket_json: &str, response_json: &str) -> Result<(), JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: StoryResponse = from_json(response_json, "story")?;
        self.inner.open_story(&ticket, response).map_err(js_error)
    }

    pub fn close_story(&mut self) {
        self.inner.close_story();
    }

    pub fn play(&mut self, track: &str, speed: f32) -> Result<String, JsValue> {
        let track = parse_track(track)?;
        let effects = self.inner.play(track, speed).map_err(js_error)?;
        to_json(&effects)
    }

    /// Narration metadata loaded; returns the audio token for frame sampling.
    pub fn story_audio_ready(
        &mut self,
        ticket_json: &str,
        audio: HtmlAudioElement,
        duration_secs: f64,
    ) -> Result<f64, JsValue> {
        let ticket = ticket(ticket_json)?;
        let token = self
            .inner
            .story_audio_ready(&ticket, audio, Timestamp::from_secs_f64(duration_secs))
            .map_err(js_error)?;
        Ok(token.as_u64() as f64)
    }

    /// One `requestAnimationFrame` sample. Returns the `SyncStep` JSON.
    pub fn frame(&mut self, token: f64, elapsed_secs: f64, paused: bool, ended: bool) -> Result<String, JsValue> {
        let sample = FrameSample {
            elapsed: Timestamp::from_secs_f64(elapsed_secs),
            paused,
            ended,
        };
        to_json(&self.inner.frame(self::token(token), sample))
    }

    pub fn pause(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.pause())
    }

    pub fn stop(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.stop())
    }

    pub fn story_audio_ended(&mut self, token: f64) -> Result<String, JsValue> {
        to_json(&self.inner.story_audio_ended(self::token(token)))
    }

    pub fn story_audio_error(&mut self, token: f64, detail: &str) -> Result<String, JsValue> {
        to_json(&self.inner.story_audio_error(self::token(token), detail))
    }

    pub fn story_request_failed(&mut self, ticket_json: &str, message: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let error = ReaderError::Backend(message.to_string());
        to_json(&self.inner.story_request_failed(&ticket, &error))
    }

    // -------------------------------------------------------------------------
    // Step-by-step reader
    // -------------------------------------------------------------------------

    /// Open the step reader on a `/stories/{id}` payload fetched with `begin_story`.
    pub fn open_reader(&mut self, ticket_json: &str, response_json: &str, speed: f32) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: StoryResponse = from_json(response_json, "story")?;
        let effects = self.inner.open_reader(&ticket, response, speed).map_err(js_error)?;
        to_json(&effects)
    }

    pub fn close_reader(&mut self) {
        self.inner.close_reader();
    }

    pub fn reader_state(&self) -> Result<String, JsValue> {
        to_json(&self.inner.reader().map(StepReader::state))
    }

    pub fn set_automated(&mut self, automated: bool) {
        self.inner.set_automated(automated);
    }

    pub fn set_reader_speed(&mut self, speed: f32) {
        self.inner.set_reader_speed(speed);
    }

    pub fn choose_language(&mut self, code: &str) -> Result<String, JsValue> {
        to_json(&self.inner.choose_language(LanguageCode::new(code)))
    }

    pub fn reader_next(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.reader_next())
    }

    pub fn reader_back(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.reader_back())
    }

    pub fn reader_replay(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.reader_replay())
    }

    pub fn narration_ready(&mut self, ticket_json: &str, audio: HtmlAudioElement) -> Result<f64, JsValue> {
        let ticket = ticket(ticket_json)?;
        let token = self.inner.narration_ready(&ticket, audio).map_err(js_error)?;
        Ok(token.as_u64() as f64)
    }

    pub fn narration_finished(&mut self, token: f64) -> Result<String, JsValue> {
        to_json(&self.inner.narration_finished(self::token(token)))
    }

    pub fn illustration_failed(&self, index: usize) -> Result<String, JsValue> {
        to_json(&self.inner.illustration_failed(index))
    }

    // -------------------------------------------------------------------------
    // Quiz
    // -------------------------------------------------------------------------

    pub fn begin_quiz(&mut self, story_id: u64) -> Result<String, JsValue> {
        let plan = self.inner.begin_quiz(StoryId::new(story_id));
        self.plan_json(&plan)
    }

    /// Start the quiz from the `/quiz/generate/{id}` payload; returns the first question.
    pub fn start_quiz(&mut self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: QuizResponse = from_json(response_json, "quiz")?;
        let question = self
            .inner
            .start_quiz(&ticket, response)
            .map_err(|e| JsValue::from_str(&e.user_message()))?;
        to_json(question)
    }

    pub fn quiz_view(&self) -> Result<String, JsValue> {
        let Some(quiz) = self.inner.quiz() else {
            return to_json(&serde_json::Value::Null);
        };
        to_json(&serde_json::json!({
            "question": quiz.current(),
            "index": quiz.index(),
            "total": quiz.len(),
            "disabled": quiz.disabled_options(),
            "solved": quiz.is_solved(),
            "last": quiz.is_last(),
        }))
    }

    pub fn quiz_answer(&mut self, option: usize) -> Result<String, JsValue> {
        let feedback = self.inner.quiz_answer(option).map_err(js_error)?;
        to_json(&feedback)
    }

    /// Empty string while more questions remain, results JSON when finished.
    pub fn quiz_next(&mut self) -> Result<String, JsValue> {
        match self.inner.quiz_next().map_err(js_error)? {
            None => Ok(String::new()),
            Some(result) => to_json(&result),
        }
    }

    /// Result card, `/quiz/submit` body and achievement check for the finished quiz.
    pub fn quiz_completion(&self) -> Result<String, JsValue> {
        to_json(&self.inner.quiz_completion())
    }

    // -------------------------------------------------------------------------
    // Scramble game
    // -------------------------------------------------------------------------

    pub fn begin_scramble(&mut self, story_id: u64) -> Result<String, JsValue> {
        let plan = self.inner.begin_scramble(StoryId::new(story_id)).map_err(js_error)?;
        self.plan_json(&plan)
    }

    /// Start a round from the `/tinystories/{id}/scramble` payload.
    pub fn start_scramble(&mut self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: ScrambleResponse = from_json(response_json, "scramble round")?;
        self.inner.start_scramble(&ticket, response).map_err(js_error)?;
        self.scramble_view()
    }

    /// Pool, workspace and progress for rendering.
    pub fn scramble_view(&self) -> Result<String, JsValue> {
        to_json(&self.scramble_view_value())
    }

    pub fn scramble_select(&mut self, tile_id: usize) -> bool {
        self.inner.scramble_select(tile_id)
    }

    pub fn scramble_remove(&mut self, tile_id: usize) -> bool {
        self.inner.scramble_remove(tile_id)
    }

    pub fn scramble_check(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.scramble_check())
    }

    pub fn scramble_next(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.scramble_next())
    }

    pub fn scramble_skip(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.scramble_skip())
    }

    /// Body for `/tinystories/scramble/result` once the round is finished; `null` before.
    pub fn scramble_result(&self) -> Result<String, JsValue> {
        to_json(&self.inner.scramble_result())
    }

    // -------------------------------------------------------------------------
    // Vocabulary flashcards
    // -------------------------------------------------------------------------

    pub fn begin_vocabulary(&mut self, story_id: u64) -> Result<String, JsValue> {
        let plan = self.inner.begin_vocabulary(StoryId::new(story_id));
        self.plan_json(&plan)
    }

    /// Load the `/tinystories/{id}/vocabulary` payload into the deck.
    pub fn load_vocabulary(&mut self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: VocabularyResponse = from_json(response_json, "vocabulary")?;
        let deck = self.inner.load_vocabulary(&ticket, response).map_err(js_error)?;
        to_json(&Self::flashcard_view_value(deck))
    }

    pub fn flashcard_view(&self) -> Result<String, JsValue> {
        to_json(&Self::flashcard_view_value(self.inner.deck()))
    }

    pub fn flashcard_flip(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.deck_mut().flip())
    }

    pub fn flashcard_next(&mut self) -> Result<String, JsValue> {
        self.inner.deck_mut().next();
        self.flashcard_view()
    }

    pub fn flashcard_prev(&mut self) -> Result<String, JsValue> {
        self.inner.deck_mut().prev();
        self.flashcard_view()
    }

    /// Returns the `/tinystories/vocabulary/status` body.
    pub fn mark_learned(&mut self) -> Result<String, JsValue> {
        let request = self.inner.deck_mut().mark_learned().map_err(js_error)?;
        to_json(&request)
    }

    pub fn mark_for_review(&mut self) -> Result<String, JsValue> {
        let request = self.inner.deck_mut().mark_for_review().map_err(js_error)?;
        to_json(&request)
    }

    // -------------------------------------------------------------------------
    // Recall writing
    // -------------------------------------------------------------------------

    pub fn begin_recall(&mut self, story_id: u64) -> Result<String, JsValue> {
        let plan = self.inner.begin_recall(StoryId::new(story_id));
        self.plan_json(&plan)
    }

    pub fn recall_loaded(&mut self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: RecallPromptResponse = from_json(response_json, "writing exercise")?;
        let exercise = self.inner.recall_loaded(&ticket, response).map_err(js_error)?;
        to_json(exercise)
    }

    /// Plan for `/recall/check`; rejects blank writing with the message to show.
    pub fn begin_recall_check(&mut self, text: &str) -> Result<String, JsValue> {
        let plan = self
            .inner
            .begin_recall_check(text)
            .map_err(|e| JsValue::from_str(&e.user_message()))?;
        self.plan_json(&plan)
    }

    pub fn recall_feedback(&self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: RecallCheckResponse = from_json(response_json, "writing check")?;
        let feedback = self.inner.recall_feedback(&ticket, response).map_err(js_error)?;
        to_json(&feedback)
    }

    // -------------------------------------------------------------------------
    // Speech practice
    // -------------------------------------------------------------------------

    /// Plan for `/speech/evaluate`; a blank transcript fails with recognition guidance.
    pub fn begin_evaluation(&mut self, expected: &str, spoken: &str) -> Result<String, JsValue> {
        let plan = self
            .inner
            .begin_evaluation(expected, spoken)
            .map_err(|e| JsValue::from_str(&e.user_message()))?;
        self.plan_json(&plan)
    }

    /// Feedback card and achievement check for a `/speech/evaluate` result.
    pub fn speech_feedback(&self, ticket_json: &str, evaluation_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let evaluation: SpeechEvaluation = from_json(evaluation_json, "evaluation")?;
        let feedback = self.inner.evaluation_done(&ticket, evaluation).map_err(js_error)?;
        to_json(&feedback)
    }

    /// Guidance text for a `SpeechRecognition` error code.
    pub fn recognition_guidance(&self, code: &str) -> String {
        RecognitionError::from_code(code).guidance().to_string()
    }

    // -------------------------------------------------------------------------
    // Story generator
    // -------------------------------------------------------------------------

    pub fn begin_generate(&mut self, request_json: &str) -> Result<String, JsValue> {
        let request: GenerateRequest = from_json(request_json, "generate request")?;
        let plan = self
            .inner
            .begin_generate(request)
            .map_err(|e| JsValue::from_str(&e.user_message()))?;
        self.plan_json(&plan)
    }

    /// Announcement text and the new story's id.
    pub fn story_generated(&self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: GenerateResponse = from_json(response_json, "generated story")?;
        let response = self.inner.story_generated(&ticket, response).map_err(js_error)?;
        to_json(&serde_json::json!({
            "announcement": response.announcement(),
            "story_id": response.story_id,
        }))
    }

    // -------------------------------------------------------------------------
    // Chat pages
    // -------------------------------------------------------------------------

    pub fn begin_explore(&mut self, prompt: &str) -> Result<String, JsValue> {
        let plan = self
            .inner
            .begin_explore(prompt)
            .map_err(|e| JsValue::from_str(&e.user_message()))?;
        self.plan_json(&plan)
    }

    /// Explanation (with narration to fetch) or suggestion chips for a `/chatmode/ask` reply.
    pub fn explore_reply(&self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let response: ChatModeResponse = from_json(response_json, "explore answer")?;
        let answer = self.inner.explore_reply(&ticket, response).map_err(js_error)?;
        to_json(&answer)
    }

    pub fn utterance_ready(&mut self, ticket_json: &str, audio: HtmlAudioElement) -> Result<f64, JsValue> {
        let ticket = ticket(ticket_json)?;
        let token = self.inner.utterance_ready(&ticket, audio).map_err(js_error)?;
        Ok(token.as_u64() as f64)
    }

    pub fn utterance_finished(&mut self, token: f64) -> bool {
        self.inner.utterance_finished(self::token(token))
    }

    pub fn begin_buddy_history(&mut self) -> Result<String, JsValue> {
        let plan = self.inner.begin_buddy_history();
        self.plan_json(&plan)
    }

    pub fn buddy_history_loaded(&mut self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let history: ChatHistoryResponse = from_json(response_json, "chat history")?;
        let messages = self.inner.buddy_history_loaded(&ticket, history).map_err(js_error)?;
        to_json(&messages)
    }

    pub fn begin_buddy_ask(&mut self, message: &str) -> Result<String, JsValue> {
        let plan = self
            .inner
            .begin_buddy_ask(message)
            .map_err(|e| JsValue::from_str(&e.user_message()))?;
        self.plan_json(&plan)
    }

    /// Conversation so far plus the achievement check for this exchange.
    pub fn buddy_reply(&mut self, ticket_json: &str, response_json: &str) -> Result<String, JsValue> {
        let ticket = ticket(ticket_json)?;
        let reply: BuddyReply = from_json(response_json, "buddy reply")?;
        let achievement = self.inner.buddy_reply(&ticket, reply).map_err(js_error)?;
        to_json(&serde_json::json!({
            "messages": self.inner.buddy().messages(),
            "achievement": achievement,
        }))
    }

    pub fn begin_buddy_reset(&mut self) -> Result<String, JsValue> {
        let plan = self.inner.begin_buddy_reset().map_err(js_error)?;
        self.plan_json(&plan)
    }
}

// =============================================================================
// Backend fetch (browser only)
// =============================================================================

/// Call any backend route and return the unwrapped payload as JSON.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn fetch_json(api_base: String, endpoint_json: String, body_json: Option<String>) -> Result<String, JsValue> {
    let endpoint: Endpoint = from_json(&endpoint_json, "endpoint")?;
    let body: Option<serde_json::Value> = match body_json.as_deref() {
        Some(json) => Some(from_json(json, "request body")?),
        None => None,
    };
    let client = ApiClient::new(api_base);
    let payload: serde_json::Value = client
        .call(&endpoint, body.as_ref())
        .await
        .map_err(|e| JsValue::from_str(&e.user_message()))?;
    to_json(&payload)
}

/// Request narration (story or TTS) and return the audio URL to load.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn fetch_audio_url(api_base: String, endpoint_json: String, body_json: String) -> Result<String, JsValue> {
    let endpoint: Endpoint = from_json(&endpoint_json, "endpoint")?;
    let body: serde_json::Value = from_json(&body_json, "request body")?;
    let audio: AudioResponse = ApiClient::new(api_base)
        .call(&endpoint, Some(&body))
        .await
        .map_err(|e| JsValue::from_str(&e.user_message()))?;
    Ok(audio.audio_url)
}
