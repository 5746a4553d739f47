// Playback session: the single "currently playing audio" slot and stale-response guards.
// Starting any audio first stops and discards the previous handle and cancels its sync loop.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;
use crate::types::{LanguageCode, StoryId};

/// Something that can be paused: an `HTMLAudioElement` in the browser, a mock in tests.
pub trait AudioHandle {
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
}

impl AudioHandle for web_sys::HtmlAudioElement {
    fn pause(&mut self) {
        if let Err(err) = web_sys::HtmlMediaElement::pause(&**self) {
            log::warn!("audio pause failed: {:?}", err);
        }
    }

    fn is_paused(&self) -> bool {
        self.paused()
    }
}

/// Identity of one started playback. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioToken(u64);

impl AudioToken {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn from_u64(raw: u64) -> Self {
        AudioToken(raw)
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Which feature started the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackKind {
    Story,
    Translation,
    Sentence,
    Utterance,
}

/// Returned by `PlaybackSession::start`; binds a sync loop to the audio it was started for.
#[derive(Debug, Clone)]
pub struct AudioLease {
    pub token: AudioToken,
    pub cancel: CancellationToken,
}

struct ActiveAudio<H> {
    token: AudioToken,
    kind: PlaybackKind,
    handle: H,
    cancel: CancellationToken,
}

/// Per-screen playback state. At most one audio handle is held at a time.
pub struct PlaybackSession<H: AudioHandle> {
    current: Option<ActiveAudio<H>>,
    next_token: u64,
    narration_language: Option<LanguageCode>,
}

impl<H: AudioHandle> Default for PlaybackSession<H> {
    fn default() -> Self {
        PlaybackSession::new()
    }
}

impl<H: AudioHandle> PlaybackSession<H> {
    pub fn new() -> Self {
        PlaybackSession {
            current: None,
            next_token: 1,
            narration_language: None,
        }
    }

    /// Take ownership of a new handle. Any previous handle is paused and dropped first.
    pub fn start(&mut self, handle: H, kind: PlaybackKind) -> AudioLease {
        self.stop();

        let token = AudioToken(self.next_token);
        self.next_token += 1;
        let cancel = CancellationToken::new();
        log::debug!("audio {:?} started ({:?})", token, kind);

        self.current = Some(ActiveAudio {
            token,
            kind,
            handle,
            cancel: cancel.clone(),
        });
        AudioLease { token, cancel }
    }

    /// Stop and discard whatever is playing. Returns the stopped token.
    pub fn stop(&mut self) -> Option<AudioToken> {
        let mut active = self.current.take()?;
        active.cancel.cancel();
        if !active.handle.is_paused() {
            active.handle.pause();
        }
        log::debug!("audio {:?} stopped", active.token);
        Some(active.token)
    }

    /// Stop only if `token` is still the current audio.
    pub fn stop_if_current(&mut self, token: AudioToken) -> bool {
        if self.is_current(token) {
            self.stop();
            true
        } else {
            false
        }
    }

    /// Audio reported `ended`. Releases the slot if the token is still current.
    pub fn finish(&mut self, token: AudioToken) -> bool {
        match &self.current {
            Some(active) if active.token == token => {
                active.cancel.cancel();
                self.current = None;
                true
            }
            _ => false,
        }
    }

    /// Pause without releasing the handle.
    pub fn pause(&mut self) {
        if let Some(active) = self.current.as_mut() {
            active.handle.pause();
        }
    }

    pub fn is_current(&self, token: AudioToken) -> bool {
        self.current.as_ref().map(|a| a.token) == Some(token)
    }

    pub fn current_token(&self) -> Option<AudioToken> {
        self.current.as_ref().map(|a| a.token)
    }

    pub fn current_kind(&self) -> Option<PlaybackKind> {
        self.current.as_ref().map(|a| a.kind)
    }

    pub fn handle(&self) -> Option<&H> {
        self.current.as_ref().map(|a| &a.handle)
    }

    pub fn is_playing(&self) -> bool {
        self.current
            .as_ref()
            .map(|a| !a.handle.is_paused())
            .unwrap_or(false)
    }

    pub fn narration_language(&self) -> Option<&LanguageCode> {
        self.narration_language.as_ref()
    }

    pub fn set_narration_language(&mut self, language: Option<LanguageCode>) {
        self.narration_language = language;
    }
}

// =============================================================================
// Stale-response guard
// =============================================================================

/// The entity a screen is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewKey {
    StoryList,
    Story { story: StoryId },
    Sentence { story: StoryId, index: usize },
    Quiz { story: StoryId },
    Scramble { story: StoryId },
    Vocabulary { story: StoryId },
    Recall { story: StoryId },
    Page { name: String },
}

impl ViewKey {
    pub fn page(name: &str) -> Self {
        ViewKey::Page {
            name: name.to_string(),
        }
    }

    /// The story a story-scoped view belongs to.
    pub fn story(&self) -> Option<StoryId> {
        match self {
            ViewKey::Story { story }
            | ViewKey::Sentence { story, .. }
            | ViewKey::Quiz { story }
            | ViewKey::Scramble { story }
            | ViewKey::Vocabulary { story }
            | ViewKey::Recall { story } => Some(*story),
            ViewKey::StoryList | ViewKey::Page { .. } => None,
        }
    }
}

/// Issued when a request starts; checked when its response arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTicket {
    generation: u64,
    view: ViewKey,
}

impl RequestTicket {
    pub fn view(&self) -> &ViewKey {
        &self.view
    }
}

/// Tracks the displayed view so late responses can be dropped.
#[derive(Debug, Clone, Default)]
pub struct RequestGuard {
    generation: u64,
    view: Option<ViewKey>,
}

impl RequestGuard {
    pub fn new() -> Self {
        RequestGuard::default()
    }

    /// Navigate to `view`. Every ticket issued before this call becomes stale.
    pub fn enter(&mut self, view: ViewKey) -> RequestTicket {
        self.generation += 1;
        self.view = Some(view.clone());
        RequestTicket {
            generation: self.generation,
            view,
        }
    }

    /// Ticket for another request against the current view.
    pub fn ticket(&self) -> Option<RequestTicket> {
        self.view.clone().map(|view| RequestTicket {
            generation: self.generation,
            view,
        })
    }

    pub fn is_fresh(&self, ticket: &RequestTicket) -> bool {
        ticket.generation == self.generation && self.view.as_ref() == Some(&ticket.view)
    }

    /// `Ok` when the response may be applied; `Stale` otherwise.
    pub fn accept(&self, ticket: &RequestTicket, what: &str) -> Result<(), ReaderError> {
        if self.is_fresh(ticket) {
            Ok(())
        } else {
            log::warn!("dropping stale {} response for {:?}", what, ticket.view);
            Err(ReaderError::Stale(what.to_string()))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockAudio;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn start_stops_previous_audio() {
        let mut session = PlaybackSession::new();
        let first = MockAudio::playing();
        let first_paused = first.paused_flag();
        let lease1 = session.start(first, PlaybackKind::Story);

        let second = MockAudio::playing();
        let second_paused = second.paused_flag();
        let lease2 = session.start(second, PlaybackKind::Sentence);

        assert!(first_paused.get(), "previous handle must be paused");
        assert!(lease1.cancel.is_cancelled());
        assert!(!second_paused.get());
        assert!(!lease2.cancel.is_cancelled());
        assert_ne!(lease1.token, lease2.token);
        assert!(session.is_current(lease2.token));
        assert_eq!(session.current_kind(), Some(PlaybackKind::Sentence));
    }

    #[test]
    fn stop_if_current_ignores_old_tokens() {
        let mut session = PlaybackSession::new();
        let old = session.start(MockAudio::playing(), PlaybackKind::Story).token;
        let new = session.start(MockAudio::playing(), PlaybackKind::Story).token;

        assert!(!session.stop_if_current(old));
        assert!(session.is_current(new));
        assert!(session.stop_if_current(new));
        assert_eq!(session.current_token(), None);
    }

    #[test]
    fn finish_releases_slot_and_cancels_loop() {
        let mut session = PlaybackSession::new();
        let lease = session.start(MockAudio::playing(), PlaybackKind::Translation);
        assert!(session.finish(lease.token));
        assert!(lease.cancel.is_cancelled());
        assert!(!session.finish(lease.token));
    }

    #[test]
    fn pause_keeps_handle() {
        let mut session = PlaybackSession::new();
        let audio = MockAudio::playing();
        let paused = audio.paused_flag();
        let lease = session.start(audio, PlaybackKind::Story);
        session.pause();
        assert!(paused.get());
        assert!(session.is_current(lease.token));
        assert!(!session.is_playing());
    }

    #[test]
    fn request_guard_drops_responses_after_navigation() {
        let mut guard = RequestGuard::new();
        let story = StoryId::new(3);
        let ticket = guard.enter(ViewKey::Sentence { story, index: 0 });
        assert!(guard.accept(&ticket, "narration").is_ok());

        guard.enter(ViewKey::Sentence { story, index: 1 });
        let err = guard.accept(&ticket, "narration").unwrap_err();
        assert!(matches!(err, ReaderError::Stale(_)));
    }

    #[test]
    fn reentering_same_view_still_invalidates() {
        let mut guard = RequestGuard::new();
        let view = ViewKey::Story { story: StoryId::new(1) };
        let old = guard.enter(view.clone());
        let new = guard.enter(view);
        assert!(!guard.is_fresh(&old));
        assert!(guard.is_fresh(&new));
        assert_eq!(guard.ticket(), Some(new));
    }

    proptest! {
        /// After every start, only the newest handle may still be playing.
        #[test]
        fn at_most_one_handle_plays(ops in prop::collection::vec(any::<bool>(), 1..40)) {
            let mut session = PlaybackSession::new();
            let mut flags = Vec::new();
            for start in ops {
                if start {
                    let audio = MockAudio::playing();
                    flags.push(audio.paused_flag());
                    session.start(audio, PlaybackKind::Sentence);
                } else {
                    session.stop();
                }
                let playing = flags.iter().filter(|p| !p.get()).count();
                prop_assert!(playing <= 1);
                if playing == 1 {
                    prop_assert!(!flags.last().unwrap().get());
                    prop_assert!(session.current_token().is_some());
                }
            }
        }
    }
}
