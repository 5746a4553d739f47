// Page coordinator behind the JS console: one audio slot, one navigation guard.
// Every page load is planned here, and its response is applied only while its ticket is fresh.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::api::{
    AchievementCheckRequest, BuddyReply, ChatHistoryResponse, ChatModeResponse, Endpoint, EvaluateRequest,
    FetchPlan, GenerateRequest, GenerateResponse, QuizResponse, RecallCheckResponse, RecallPromptResponse,
    ScrambleRequest, ScrambleResponse, ScrambleResultRequest, StoryListResponse, StoryResponse,
    VocabularyResponse,
};
use crate::chat::{explore_request, BuddyChat, ChatMessage, ExploreAnswer};
use crate::config::ConsoleConfig;
use crate::error::ReaderError;
use crate::library::StoryLibrary;
use crate::playback::{AudioHandle, AudioToken, PlaybackKind, PlaybackSession, RequestGuard, RequestTicket, ViewKey};
use crate::quiz::{AnswerFeedback, QuizCompletion, QuizQuestion, QuizResult, QuizSession};
use crate::recall::{RecallExercise, RecallFeedback};
use crate::scramble::{Advance, CheckOutcome, Difficulty, RoundPhase, ScrambleRound};
use crate::speech::{PracticeFeedback, SpeechEvaluation};
use crate::step_reader::{ReaderEffect, StepReader};
use crate::story_player::{PlayerEffect, StoryPlayer};
use crate::sync::{FrameSample, StopReason, SyncStep};
use crate::types::{LanguageCode, StoryId, TextTrack, Timestamp};
use crate::vocab::FlashcardDeck;

pub const EXPLORE_PAGE: &str = "explore";
pub const BUDDY_PAGE: &str = "buddy";
pub const PRACTICE_PAGE: &str = "practice";
pub const GENERATOR_PAGE: &str = "generator";

pub struct ReaderConsole<H: AudioHandle> {
    config: ConsoleConfig,
    session: PlaybackSession<H>,
    guard: RequestGuard,
    player: Option<StoryPlayer>,
    reader: Option<StepReader>,
    library: StoryLibrary,
    pending_delete: Vec<StoryId>,
    quiz: Option<QuizSession>,
    scramble: Option<(StoryId, ScrambleRound)>,
    difficulty: Difficulty,
    deck: FlashcardDeck,
    recall: Option<RecallExercise>,
    buddy: BuddyChat,
    rng: StdRng,
}

impl<H: AudioHandle> ReaderConsole<H> {
    pub fn new(config: ConsoleConfig, seed: u64) -> Self {
        let buddy = BuddyChat::new(config.chat_session_id.clone());
        ReaderConsole {
            config,
            session: PlaybackSession::new(),
            guard: RequestGuard::new(),
            player: None,
            reader: None,
            library: StoryLibrary::new(),
            pending_delete: Vec::new(),
            quiz: None,
            scramble: None,
            difficulty: Difficulty::default(),
            deck: FlashcardDeck::new(Vec::new()),
            recall: None,
            buddy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub fn stop_audio(&mut self) {
        self.session.stop();
    }

    /// Leave the current page. Audio stops, open players close, earlier tickets go stale.
    pub fn navigate(&mut self, view: ViewKey) -> RequestTicket {
        self.close_story();
        self.close_reader();
        self.session.stop();
        log::debug!("navigate to {:?}", view);
        self.guard.enter(view)
    }

    /// Ticket for a request made from within `view`; navigates there first if needed.
    fn ticket_for(&mut self, view: ViewKey) -> RequestTicket {
        match self.guard.ticket() {
            Some(ticket) if *ticket.view() == view => ticket,
            _ => self.navigate(view),
        }
    }

    fn accept_view(&self, ticket: &RequestTicket, view: &ViewKey, what: &str) -> Result<(), ReaderError> {
        if ticket.view() != view {
            log::warn!("{} response is for {:?}, not {:?}", what, ticket.view(), view);
            return Err(ReaderError::Stale(what.to_string()));
        }
        self.guard.accept(ticket, what)
    }

    /// Fresh ticket for a story-scoped view built by `view`; returns the story.
    fn accept_story(
        &self,
        ticket: &RequestTicket,
        view: fn(StoryId) -> ViewKey,
        what: &str,
    ) -> Result<StoryId, ReaderError> {
        let story = ticket
            .view()
            .story()
            .ok_or_else(|| ReaderError::Stale(what.to_string()))?;
        self.accept_view(ticket, &view(story), what)?;
        Ok(story)
    }

    /// A planned request failed. Returns the message to show, or `None` if the page moved on.
    pub fn request_failed(&self, ticket: &RequestTicket, error: &ReaderError) -> Option<String> {
        if self.guard.is_fresh(ticket) {
            log::error!("request for {:?} failed: {}", ticket.view(), error);
            Some(error.user_message())
        } else {
            log::debug!("ignoring failure of stale request for {:?}", ticket.view());
            None
        }
    }

    // -------------------------------------------------------------------------
    // Story list
    // -------------------------------------------------------------------------

    pub fn begin_story_list(&mut self) -> FetchPlan {
        FetchPlan::new(self.navigate(ViewKey::StoryList), Endpoint::ListStories)
    }

    pub fn load_story_list(
        &mut self,
        ticket: &RequestTicket,
        response: StoryListResponse,
    ) -> Result<&StoryLibrary, ReaderError> {
        self.accept_view(ticket, &ViewKey::StoryList, "story list")?;
        self.library.load(response.stories);
        Ok(&self.library)
    }

    pub fn library(&self) -> &StoryLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut StoryLibrary {
        &mut self.library
    }

    /// Plan the batch delete of the current selection; `None` with nothing selected.
    pub fn begin_delete(&mut self) -> Result<Option<FetchPlan>, ReaderError> {
        let Some(request) = self.library.delete_request() else {
            return Ok(None);
        };
        let ticket = self.ticket_for(ViewKey::StoryList);
        let plan = FetchPlan::new(ticket, Endpoint::BatchDeleteStories).with_body(&request)?;
        self.pending_delete = request.story_ids;
        Ok(Some(plan))
    }

    pub fn stories_deleted(&mut self, ticket: &RequestTicket) -> Result<&StoryLibrary, ReaderError> {
        self.accept_view(ticket, &ViewKey::StoryList, "batch delete")?;
        let ids = std::mem::take(&mut self.pending_delete);
        self.library.deleted(&ids);
        Ok(&self.library)
    }

    // -------------------------------------------------------------------------
    // Story pages: classic player and step-by-step reader
    // -------------------------------------------------------------------------

    pub fn begin_story(&mut self, story: StoryId) -> FetchPlan {
        FetchPlan::new(self.navigate(ViewKey::Story { story }), Endpoint::GetStory(story))
    }

    pub fn open_story(&mut self, ticket: &RequestTicket, response: StoryResponse) -> Result<(), ReaderError> {
        let view = ViewKey::Story { story: response.story.id };
        self.accept_view(ticket, &view, "story")?;
        self.close_story();
        self.close_reader();
        self.player = Some(StoryPlayer::new(response.story, self.config.silence_padding()));
        Ok(())
    }

    pub fn close_story(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.stop(&mut self.session);
        }
    }

    pub fn player(&self) -> Option<&StoryPlayer> {
        self.player.as_ref()
    }

    pub fn play(&mut self, track: TextTrack, speed: f32) -> Result<Vec<PlayerEffect>, ReaderError> {
        let player = self.player.as_mut().ok_or_else(no_story)?;
        player.play(track, speed, &mut self.session)
    }

    pub fn story_audio_ready(
        &mut self,
        ticket: &RequestTicket,
        mut handle: H,
        duration: Timestamp,
    ) -> Result<AudioToken, ReaderError> {
        match self.player.as_mut() {
            Some(player) => player.audio_ready(ticket, handle, duration, &mut self.session),
            None => {
                handle.pause();
                Err(no_story())
            }
        }
    }

    pub fn frame(&mut self, token: AudioToken, sample: FrameSample) -> SyncStep {
        match self.player.as_mut() {
            Some(player) => player.frame(token, sample),
            None => SyncStep::Stop {
                reason: StopReason::Superseded,
                change: None,
            },
        }
    }

    pub fn pause(&mut self) -> Vec<PlayerEffect> {
        match self.player.as_mut() {
            Some(player) => player.pause(&mut self.session),
            None => Vec::new(),
        }
    }

    pub fn stop(&mut self) -> Vec<PlayerEffect> {
        match self.player.as_mut() {
            Some(player) => player.stop(&mut self.session),
            None => Vec::new(),
        }
    }

    pub fn story_audio_ended(&mut self, token: AudioToken) -> Vec<PlayerEffect> {
        match self.player.as_mut() {
            Some(player) => player.ended(token, &mut self.session),
            None => Vec::new(),
        }
    }

    pub fn story_audio_error(&mut self, token: AudioToken, detail: &str) -> Vec<PlayerEffect> {
        match self.player.as_mut() {
            Some(player) => player.audio_error(token, detail, &mut self.session),
            None => Vec::new(),
        }
    }

    pub fn story_request_failed(&mut self, ticket: &RequestTicket, error: &ReaderError) -> Vec<PlayerEffect> {
        match self.player.as_mut() {
            Some(player) => player.request_failed(ticket, error, &mut self.session),
            None => Vec::new(),
        }
    }

    pub fn open_reader(
        &mut self,
        ticket: &RequestTicket,
        response: StoryResponse,
        speed: f32,
    ) -> Result<Vec<ReaderEffect>, ReaderError> {
        let view = ViewKey::Story { story: response.story.id };
        self.accept_view(ticket, &view, "story")?;
        self.close_story();
        self.close_reader();
        let (reader, effects) = StepReader::open(response.story, &self.config, speed)?;
        self.reader = Some(reader);
        Ok(effects)
    }

    pub fn close_reader(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.close(&mut self.session);
        }
    }

    pub fn reader(&self) -> Option<&StepReader> {
        self.reader.as_ref()
    }

    pub fn set_automated(&mut self, automated: bool) {
        self.config.automated_play = automated;
        if let Some(reader) = self.reader.as_mut() {
            reader.set_automated(automated);
        }
    }

    pub fn set_reader_speed(&mut self, speed: f32) {
        if let Some(reader) = self.reader.as_mut() {
            reader.set_speed(speed);
        }
    }

    pub fn choose_language(&mut self, code: LanguageCode) -> Vec<ReaderEffect> {
        match self.reader.as_mut() {
            Some(reader) => reader.choose_language(code, &mut self.session),
            None => Vec::new(),
        }
    }

    pub fn reader_next(&mut self) -> Vec<ReaderEffect> {
        match self.reader.as_mut() {
            Some(reader) => reader.next(&mut self.session),
            None => Vec::new(),
        }
    }

    pub fn reader_back(&mut self) -> Vec<ReaderEffect> {
        match self.reader.as_mut() {
            Some(reader) => reader.back(&mut self.session),
            None => Vec::new(),
        }
    }

    pub fn reader_replay(&mut self) -> Vec<ReaderEffect> {
        match self.reader.as_mut() {
            Some(reader) => reader.replay(&mut self.session),
            None => Vec::new(),
        }
    }

    pub fn narration_ready(&mut self, ticket: &RequestTicket, mut handle: H) -> Result<AudioToken, ReaderError> {
        match self.reader.as_mut() {
            Some(reader) => reader.narration_ready(ticket, handle, &mut self.session),
            None => {
                handle.pause();
                Err(ReaderError::Stale("sentence narration".to_string()))
            }
        }
    }

    pub fn narration_finished(&mut self, token: AudioToken) -> Vec<ReaderEffect> {
        match self.reader.as_mut() {
            Some(reader) => reader.narration_finished(token, &mut self.session),
            None => Vec::new(),
        }
    }

    pub fn illustration_failed(&self, index: usize) -> Option<ReaderEffect> {
        self.reader.as_ref().and_then(|r| r.illustration_failed(index))
    }

    // -------------------------------------------------------------------------
    // Quiz
    // -------------------------------------------------------------------------

    pub fn begin_quiz(&mut self, story: StoryId) -> FetchPlan {
        self.quiz = None;
        FetchPlan::new(self.navigate(ViewKey::Quiz { story }), Endpoint::QuizGenerate(story))
    }

    pub fn start_quiz(
        &mut self,
        ticket: &RequestTicket,
        response: QuizResponse,
    ) -> Result<&QuizQuestion, ReaderError> {
        let story = self.accept_story(ticket, |story| ViewKey::Quiz { story }, "quiz")?;
        let quiz = self.quiz.insert(QuizSession::new(story, response.questions)?);
        Ok(quiz.current())
    }

    pub fn quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    pub fn quiz_answer(&mut self, option: usize) -> Result<AnswerFeedback, ReaderError> {
        self.quiz.as_mut().ok_or_else(no_quiz)?.answer(option)
    }

    pub fn quiz_next(&mut self) -> Result<Option<QuizResult>, ReaderError> {
        Ok(self.quiz.as_mut().ok_or_else(no_quiz)?.next())
    }

    pub fn quiz_completion(&self) -> Option<QuizCompletion> {
        self.quiz.as_ref().map(QuizSession::completion)
    }

    // -------------------------------------------------------------------------
    // Scramble game
    // -------------------------------------------------------------------------

    /// Plan a round at the difficulty suggested by the previous one.
    pub fn begin_scramble(&mut self, story: StoryId) -> Result<FetchPlan, ReaderError> {
        self.scramble = None;
        let ticket = self.navigate(ViewKey::Scramble { story });
        FetchPlan::new(ticket, Endpoint::ScrambleRound(story)).with_body(&ScrambleRequest {
            difficulty: self.difficulty,
        })
    }

    pub fn start_scramble(
        &mut self,
        ticket: &RequestTicket,
        response: ScrambleResponse,
    ) -> Result<&ScrambleRound, ReaderError> {
        let story = self.accept_story(ticket, |story| ViewKey::Scramble { story }, "scramble round")?;
        let round = ScrambleRound::new(
            response.chunks,
            response.difficulty.unwrap_or(self.difficulty),
            self.config.scramble_promote_accuracy,
            &mut self.rng,
        );
        let (_, round) = self.scramble.insert((story, round));
        Ok(&*round)
    }

    pub fn scramble(&self) -> Option<&ScrambleRound> {
        self.scramble.as_ref().map(|(_, round)| round)
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn scramble_select(&mut self, tile_id: usize) -> bool {
        self.scramble
            .as_mut()
            .map(|(_, round)| round.select(tile_id))
            .unwrap_or(false)
    }

    pub fn scramble_remove(&mut self, tile_id: usize) -> bool {
        self.scramble
            .as_mut()
            .map(|(_, round)| round.remove(tile_id))
            .unwrap_or(false)
    }

    pub fn scramble_check(&mut self) -> CheckOutcome {
        self.scramble
            .as_mut()
            .map(|(_, round)| round.check())
            .unwrap_or(CheckOutcome::Ignored)
    }

    pub fn scramble_next(&mut self) -> Advance {
        let advance = match self.scramble.as_mut() {
            Some((_, round)) => round.next(&mut self.rng),
            None => Advance::Blocked,
        };
        self.remember_difficulty(&advance);
        advance
    }

    pub fn scramble_skip(&mut self) -> Advance {
        let advance = match self.scramble.as_mut() {
            Some((_, round)) => round.skip(&mut self.rng),
            None => Advance::Blocked,
        };
        self.remember_difficulty(&advance);
        advance
    }

    fn remember_difficulty(&mut self, advance: &Advance) {
        if let Advance::Finished(summary) = advance {
            self.difficulty = summary.suggested_difficulty;
        }
    }

    /// Body for `/tinystories/scramble/result` once the round is finished.
    pub fn scramble_result(&self) -> Option<ScrambleResultRequest> {
        self.scramble.as_ref().and_then(|(story, round)| match round.phase() {
            RoundPhase::Finished(summary) => Some(ScrambleResultRequest::from_summary(*story, summary)),
            _ => None,
        })
    }

    // -------------------------------------------------------------------------
    // Vocabulary flashcards
    // -------------------------------------------------------------------------

    pub fn begin_vocabulary(&mut self, story: StoryId) -> FetchPlan {
        FetchPlan::new(self.navigate(ViewKey::Vocabulary { story }), Endpoint::Vocabulary(story))
    }

    pub fn load_vocabulary(
        &mut self,
        ticket: &RequestTicket,
        response: VocabularyResponse,
    ) -> Result<&FlashcardDeck, ReaderError> {
        self.accept_story(ticket, |story| ViewKey::Vocabulary { story }, "vocabulary")?;
        self.deck = FlashcardDeck::new(response.vocabulary);
        Ok(&self.deck)
    }

    pub fn deck(&self) -> &FlashcardDeck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut FlashcardDeck {
        &mut self.deck
    }

    // -------------------------------------------------------------------------
    // Recall writing
    // -------------------------------------------------------------------------

    pub fn begin_recall(&mut self, story: StoryId) -> FetchPlan {
        self.recall = None;
        FetchPlan::new(self.navigate(ViewKey::Recall { story }), Endpoint::RecallPrompt(story))
    }

    pub fn recall_loaded(
        &mut self,
        ticket: &RequestTicket,
        response: RecallPromptResponse,
    ) -> Result<&RecallExercise, ReaderError> {
        let story = self.accept_story(ticket, |story| ViewKey::Recall { story }, "writing exercise")?;
        Ok(&*self.recall.insert(RecallExercise::new(story, response)))
    }

    pub fn begin_recall_check(&mut self, text: &str) -> Result<FetchPlan, ReaderError> {
        let exercise = self
            .recall
            .as_ref()
            .ok_or_else(|| ReaderError::Validation("Failed to load writing exercise".to_string()))?;
        let request = exercise.check_request(text)?;
        let story = exercise.story;
        let ticket = self.ticket_for(ViewKey::Recall { story });
        FetchPlan::new(ticket, Endpoint::RecallCheck).with_body(&request)
    }

    pub fn recall_feedback(
        &self,
        ticket: &RequestTicket,
        response: RecallCheckResponse,
    ) -> Result<RecallFeedback, ReaderError> {
        self.accept_story(ticket, |story| ViewKey::Recall { story }, "writing check")?;
        Ok(RecallFeedback::from(response))
    }

    // -------------------------------------------------------------------------
    // Speech practice and story generation
    // -------------------------------------------------------------------------

    pub fn begin_evaluation(&mut self, expected: &str, spoken: &str) -> Result<FetchPlan, ReaderError> {
        let request = EvaluateRequest::new(expected, spoken)?;
        let ticket = self.ticket_for(ViewKey::page(PRACTICE_PAGE));
        FetchPlan::new(ticket, Endpoint::EvaluateSpeech).with_body(&request)
    }

    pub fn evaluation_done(
        &self,
        ticket: &RequestTicket,
        evaluation: SpeechEvaluation,
    ) -> Result<PracticeFeedback, ReaderError> {
        self.accept_view(ticket, &ViewKey::page(PRACTICE_PAGE), "speech evaluation")?;
        Ok(evaluation.into_feedback())
    }

    pub fn begin_generate(&mut self, request: GenerateRequest) -> Result<FetchPlan, ReaderError> {
        let request = match request.topic.as_deref() {
            Some(topic) => GenerateRequest::topic(topic, request.length, request.speed, request.language.clone())?,
            None => request,
        };
        let ticket = self.ticket_for(ViewKey::page(GENERATOR_PAGE));
        FetchPlan::new(ticket, request.endpoint()).with_body(&request)
    }

    pub fn story_generated(
        &self,
        ticket: &RequestTicket,
        response: GenerateResponse,
    ) -> Result<GenerateResponse, ReaderError> {
        self.accept_view(ticket, &ViewKey::page(GENERATOR_PAGE), "generated story")?;
        Ok(response)
    }

    // -------------------------------------------------------------------------
    // Chat pages
    // -------------------------------------------------------------------------

    pub fn begin_explore(&mut self, prompt: &str) -> Result<FetchPlan, ReaderError> {
        let request = explore_request(prompt)?;
        let ticket = self.ticket_for(ViewKey::page(EXPLORE_PAGE));
        FetchPlan::new(ticket, Endpoint::ChatModeAsk).with_body(&request)
    }

    pub fn explore_reply(
        &self,
        ticket: &RequestTicket,
        response: ChatModeResponse,
    ) -> Result<ExploreAnswer, ReaderError> {
        self.accept_view(ticket, &ViewKey::page(EXPLORE_PAGE), "explore answer")?;
        Ok(ExploreAnswer::from(response))
    }

    /// Narration of an explanation arrived; plays only while the explore page is current.
    pub fn utterance_ready(&mut self, ticket: &RequestTicket, mut handle: H) -> Result<AudioToken, ReaderError> {
        if let Err(err) = self.accept_view(ticket, &ViewKey::page(EXPLORE_PAGE), "explanation narration") {
            handle.pause();
            return Err(err);
        }
        Ok(self.session.start(handle, PlaybackKind::Utterance).token)
    }

    pub fn utterance_finished(&mut self, token: AudioToken) -> bool {
        self.session.finish(token)
    }

    pub fn buddy(&self) -> &BuddyChat {
        &self.buddy
    }

    pub fn begin_buddy_history(&mut self) -> FetchPlan {
        FetchPlan::new(self.navigate(ViewKey::page(BUDDY_PAGE)), Endpoint::ChatHistory)
    }

    pub fn buddy_history_loaded(
        &mut self,
        ticket: &RequestTicket,
        history: ChatHistoryResponse,
    ) -> Result<&[ChatMessage], ReaderError> {
        self.accept_view(ticket, &ViewKey::page(BUDDY_PAGE), "chat history")?;
        self.buddy.load_history(history);
        Ok(self.buddy.messages())
    }

    pub fn begin_buddy_ask(&mut self, message: &str) -> Result<FetchPlan, ReaderError> {
        let request = self.buddy.ask(message)?;
        let ticket = self.ticket_for(ViewKey::page(BUDDY_PAGE));
        FetchPlan::new(ticket, Endpoint::ChatAsk).with_body(&request)
    }

    pub fn buddy_reply(
        &mut self,
        ticket: &RequestTicket,
        reply: BuddyReply,
    ) -> Result<AchievementCheckRequest, ReaderError> {
        self.accept_view(ticket, &ViewKey::page(BUDDY_PAGE), "buddy reply")?;
        Ok(self.buddy.reply(reply))
    }

    pub fn begin_buddy_reset(&mut self) -> Result<FetchPlan, ReaderError> {
        let request = self.buddy.reset();
        let ticket = self.ticket_for(ViewKey::page(BUDDY_PAGE));
        FetchPlan::new(ticket, Endpoint::ChatReset).with_body(&request)
    }
}

fn no_story() -> ReaderError {
    ReaderError::Validation("No story open".to_string())
}

fn no_quiz() -> ReaderError {
    ReaderError::Validation("No quiz in progress".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{StorySummary, TtsRequest};
    use crate::playback::mock::MockAudio;
    use crate::quiz::QuizQuestion;
    use crate::types::{Sentence, Story};
    use crate::vocab::VocabEntry;

    fn console() -> ReaderConsole<MockAudio> {
        ReaderConsole::new(ConsoleConfig::default(), 7)
    }

    fn story(id: u64) -> StoryResponse {
        StoryResponse {
            story: Story {
                id: StoryId::new(id),
                title: format!("Story {}", id),
                translated_title: None,
                target_language: None,
                moral: None,
                theme: None,
                sentences: vec![Sentence::new("The cat sat."), Sentence::new("It was happy.")],
                vocab: Default::default(),
                audio_speed: None,
            },
        }
    }

    fn scramble(chunk: &str) -> ScrambleResponse {
        ScrambleResponse {
            chunks: vec![chunk.to_string()],
            difficulty: Some(Difficulty::Easy),
        }
    }

    fn vocabulary(word: &str) -> VocabularyResponse {
        VocabularyResponse {
            vocabulary: vec![VocabEntry::new(word, "")],
        }
    }

    fn questions(correct: &str) -> QuizResponse {
        QuizResponse {
            questions: vec![QuizQuestion {
                id: None,
                question: "Who?".to_string(),
                options: vec!["cat".to_string(), "dog".to_string()],
                correct_answer: correct.to_string(),
                hint: None,
                explanation: None,
                question_type: None,
            }],
        }
    }

    fn assert_stale<T: std::fmt::Debug>(result: Result<T, ReaderError>) {
        assert!(matches!(result, Err(ReaderError::Stale(_))), "expected stale, got {:?}", result);
    }

    // =========================================================================
    // Stale responses
    // =========================================================================

    #[test]
    fn late_scramble_round_does_not_replace_current() {
        let mut console = console();
        let first = console.begin_scramble(StoryId::new(1)).unwrap();
        let second = console.begin_scramble(StoryId::new(2)).unwrap();

        console.start_scramble(&second.ticket, scramble("two words")).unwrap();
        assert_stale(console.start_scramble(&first.ticket, scramble("one")));

        let round = console.scramble().unwrap();
        assert_eq!(round.total(), 1);
        assert_eq!(round.pool().len(), 2);
        console.scramble_select(0);
        console.scramble_select(1);
        console.scramble_check();
        console.scramble_next();
        assert_eq!(console.scramble_result().unwrap().story_id, StoryId::new(2));
    }

    #[test]
    fn late_vocabulary_deck_does_not_overwrite() {
        let mut console = console();
        let stale = console.begin_vocabulary(StoryId::new(1));
        let fresh = console.begin_vocabulary(StoryId::new(2));

        console.load_vocabulary(&fresh.ticket, vocabulary("brave")).unwrap();
        assert_stale(console.load_vocabulary(&stale.ticket, vocabulary("stale")));
        assert_eq!(console.deck().current().map(|c| c.word.as_str()), Some("brave"));
    }

    #[test]
    fn late_quiz_is_dropped_after_navigation() {
        let mut console = console();
        let quiz = console.begin_quiz(StoryId::new(3));
        console.begin_story_list();

        assert_stale(console.start_quiz(&quiz.ticket, questions("cat")));
        assert!(console.quiz().is_none());
    }

    #[test]
    fn story_payload_must_match_requested_story() {
        let mut console = console();
        let stale = console.begin_story(StoryId::new(1));
        let fresh = console.begin_story(StoryId::new(2));

        assert_stale(console.open_story(&stale.ticket, story(1)));
        assert_stale(console.open_reader(&stale.ticket, story(1), 0.8));
        assert_stale(console.open_story(&fresh.ticket, story(1)));
        assert!(console.player().is_none());

        console.open_story(&fresh.ticket, story(2)).unwrap();
        assert_eq!(console.player().map(|p| p.story().id), Some(StoryId::new(2)));
    }

    #[test]
    fn ticket_for_another_page_kind_is_rejected() {
        let mut console = console();
        let plan = console.begin_vocabulary(StoryId::new(5));
        assert_stale(console.start_scramble(&plan.ticket, scramble("one")));
        assert_stale(console.start_quiz(&plan.ticket, questions("cat")));
    }

    #[test]
    fn failures_surface_only_while_fresh() {
        let mut console = console();
        let plan = console.begin_recall(StoryId::new(1));
        let error = ReaderError::Backend("Failed to load writing exercise".to_string());
        assert_eq!(
            console.request_failed(&plan.ticket, &error).as_deref(),
            Some("Failed to load writing exercise")
        );
        console.begin_story_list();
        assert_eq!(console.request_failed(&plan.ticket, &error), None);
    }

    // =========================================================================
    // Pages
    // =========================================================================

    #[test]
    fn navigation_stops_story_audio() {
        let mut console = console();
        let plan = console.begin_story(StoryId::new(1));
        console.open_story(&plan.ticket, story(1)).unwrap();
        let effects = console.play(TextTrack::Source, 0.8).unwrap();
        let ticket = effects
            .iter()
            .find_map(|e| match e {
                PlayerEffect::RequestAudio(plan) => Some(plan.ticket.clone()),
                _ => None,
            })
            .unwrap();
        let audio = MockAudio::playing();
        let paused = audio.paused_flag();
        console.story_audio_ready(&ticket, audio, Timestamp::from_secs_f64(4.0)).unwrap();
        assert!(console.is_playing());

        console.begin_quiz(StoryId::new(1));
        assert!(paused.get());
        assert!(!console.is_playing());
        assert!(console.player().is_none());
    }

    #[test]
    fn quiz_flow_reports_perfect_score() {
        let mut console = console();
        let plan = console.begin_quiz(StoryId::new(3));
        assert_eq!(console.start_quiz(&plan.ticket, questions("cat")).unwrap().question, "Who?");
        assert!(matches!(console.quiz_answer(1).unwrap(), AnswerFeedback::TryAgain { .. }));
        assert!(matches!(console.quiz_answer(0).unwrap(), AnswerFeedback::Correct { .. }));
        assert_eq!(console.quiz_next().unwrap().map(|r| r.score), Some(1));

        let completion = console.quiz_completion().unwrap();
        assert_eq!(completion.submission.story_id, StoryId::new(3));
        assert!(completion.achievement.is_some());
    }

    #[test]
    fn quiz_actions_without_quiz_fail() {
        let mut console = console();
        assert!(console.quiz_answer(0).is_err());
        assert!(console.quiz_next().is_err());
        assert!(console.quiz_completion().is_none());
    }

    #[test]
    fn scramble_difficulty_carries_to_next_round() {
        let mut console = ReaderConsole::<MockAudio>::new(
            ConsoleConfig {
                scramble_promote_accuracy: 0.5,
                ..ConsoleConfig::default()
            },
            7,
        );
        let plan = console.begin_scramble(StoryId::new(1)).unwrap();
        assert_eq!(plan.body.as_ref().map(|b| b["difficulty"].clone()), Some("easy".into()));
        console.start_scramble(&plan.ticket, scramble("hi")).unwrap();
        console.scramble_select(0);
        console.scramble_check();
        assert!(matches!(console.scramble_next(), Advance::Finished(_)));
        assert_eq!(console.difficulty(), Difficulty::Medium);

        let next = console.begin_scramble(StoryId::new(1)).unwrap();
        assert_eq!(next.body.as_ref().map(|b| b["difficulty"].clone()), Some("medium".into()));
        assert!(console.scramble().is_none());
    }

    #[test]
    fn library_select_and_delete() {
        let mut console = console();
        let plan = console.begin_story_list();
        let list = StoryListResponse {
            stories: vec![
                StorySummary {
                    id: StoryId::new(1),
                    title: "Moon".to_string(),
                    theme: None,
                    translated_title: None,
                },
                StorySummary {
                    id: StoryId::new(2),
                    title: "Sun".to_string(),
                    theme: None,
                    translated_title: None,
                },
            ],
        };
        assert_eq!(console.load_story_list(&plan.ticket, list).unwrap().stories().len(), 2);
        assert!(console.begin_delete().unwrap().is_none());

        console.library_mut().toggle_select_mode();
        console.library_mut().click(StoryId::new(2));
        let delete = console.begin_delete().unwrap().unwrap();
        assert_eq!(delete.endpoint, Endpoint::BatchDeleteStories);
        assert_eq!(delete.ticket, plan.ticket);

        let library = console.stories_deleted(&delete.ticket).unwrap();
        assert_eq!(library.stories().len(), 1);
        assert!(!library.is_select_mode());
    }

    #[test]
    fn recall_exercise_round_trip() {
        let mut console = console();
        let plan = console.begin_recall(StoryId::new(4));
        assert!(console.begin_recall_check("text").is_err());
        console
            .recall_loaded(
                &plan.ticket,
                RecallPromptResponse {
                    prompt: "Retell it".to_string(),
                    story_title: "Moon".to_string(),
                    keywords: vec!["moon".to_string()],
                },
            )
            .unwrap();

        assert_eq!(
            console.begin_recall_check(" ").unwrap_err().user_message(),
            "Please write something first!"
        );
        let check = console.begin_recall_check("The moon was bright.").unwrap();
        assert_eq!(check.ticket, plan.ticket);
        let feedback = console
            .recall_feedback(
                &check.ticket,
                RecallCheckResponse {
                    score: 30,
                    feedback: vec![],
                    message: "Keep practicing!".to_string(),
                    emoji: "*".to_string(),
                },
            )
            .unwrap();
        assert_eq!(feedback.title, "* Keep practicing! (Score: 30/100)");
    }

    #[test]
    fn explanation_narration_uses_utterance_slot() {
        let mut console = console();
        let plan = console.begin_explore("a dog").unwrap();
        let answer = console
            .explore_reply(
                &plan.ticket,
                ChatModeResponse {
                    is_safe: true,
                    category: Some("animals".to_string()),
                    item: Some("dog".to_string()),
                    image_path: None,
                    explanation: vec!["Dogs bark.".to_string()],
                    message: None,
                    suggestions: Vec::new(),
                },
            )
            .unwrap();
        let ExploreAnswer::Explanation { narration: Some(TtsRequest { text, .. }), .. } = answer else {
            panic!("expected narrated explanation");
        };
        assert_eq!(text, "Dogs bark.");

        let token = console.utterance_ready(&plan.ticket, MockAudio::playing()).unwrap();
        assert!(console.is_playing());

        // A second question on the same page keeps the ticket; leaving the page does not.
        assert_eq!(console.begin_explore("a cat").unwrap().ticket, plan.ticket);
        console.begin_buddy_history();
        assert!(!console.is_playing());
        assert!(!console.utterance_finished(token));

        let late = MockAudio::playing();
        let late_paused = late.paused_flag();
        assert_stale(console.utterance_ready(&plan.ticket, late));
        assert!(late_paused.get());
    }

    #[test]
    fn buddy_reply_counts_as_chat() {
        let mut console = console();
        let history = console.begin_buddy_history();
        console
            .buddy_history_loaded(&history.ticket, ChatHistoryResponse { messages: Vec::new() })
            .unwrap();
        let ask = console.begin_buddy_ask("Hello Buddy").unwrap();
        assert_eq!(ask.ticket, history.ticket);
        let achievement = console
            .buddy_reply(
                &ask.ticket,
                BuddyReply {
                    response: "Hi!".to_string(),
                },
            )
            .unwrap();
        assert_eq!(achievement.activity_type, crate::api::Activity::Chat);
        assert_eq!(console.buddy().messages().len(), 2);

        console.begin_buddy_reset().unwrap();
        assert!(console.buddy().messages().is_empty());
    }

    #[test]
    fn practice_and_generator_pages() {
        let mut console = console();
        assert!(console.begin_evaluation("The cat sat.", "   ").is_err());
        let plan = console.begin_evaluation("The cat sat.", "the cat sat").unwrap();
        let feedback = console
            .evaluation_done(
                &plan.ticket,
                SpeechEvaluation {
                    accuracy: 90.0,
                    feedback: "Great!".to_string(),
                    encouragement: String::new(),
                    words_to_practice: Vec::new(),
                },
            )
            .unwrap();
        assert_eq!(feedback.achievement.activity_type, crate::api::Activity::Practice);

        let request: GenerateRequest =
            serde_json::from_str(r#"{"length":"short","speed":0.8,"language":"en","topic":"  "}"#).unwrap();
        assert!(console.begin_generate(request).is_err());
        let request: GenerateRequest =
            serde_json::from_str(r#"{"length":"short","speed":0.8,"language":"en"}"#).unwrap();
        let plan = console.begin_generate(request).unwrap();
        assert_eq!(plan.endpoint, Endpoint::GenerateRandom);
        let done = console
            .story_generated(
                &plan.ticket,
                GenerateResponse {
                    story_id: Some(StoryId::new(9)),
                    title: Some("Moon".to_string()),
                    message: Some("Story created!".to_string()),
                },
            )
            .unwrap();
        assert!(done.announcement().ends_with("Story: \"Moon\""));
    }
}
