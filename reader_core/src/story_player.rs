// Classic read-aloud player: full-story narration with sentence highlighting.
// Narrates either the source text or the translation and highlights the matching track.

use serde::{Deserialize, Serialize};

use crate::api::{Endpoint, StoryAudioRequest};
use crate::error::ReaderError;
use crate::playback::{AudioHandle, AudioToken, PlaybackKind, PlaybackSession, RequestGuard, RequestTicket, ViewKey};
use crate::sync::{FrameSample, HighlightChange, StopReason, SyncLoop, SyncStep};
use crate::timeline::TimelineMapper;
use crate::types::{Story, TextTrack, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Full-story narration the host should fetch, then hand back with its ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryAudioPlan {
    pub ticket: RequestTicket,
    pub endpoint: Endpoint,
    pub body: StoryAudioRequest,
    pub track: TextTrack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PlayerEffect {
    ShowPlayButton,
    ShowPauseButton,
    ClearHighlights,
    RequestAudio(StoryAudioPlan),
    ShowError { message: String },
}

pub struct StoryPlayer {
    story: Story,
    padding: Timestamp,
    state: PlayerState,
    track: TextTrack,
    guard: RequestGuard,
    sync: Option<SyncLoop>,
    audio: Option<AudioToken>,
    current_sentence: usize,
}

impl StoryPlayer {
    pub fn new(story: Story, padding: Timestamp) -> Self {
        StoryPlayer {
            story,
            padding,
            state: PlayerState::Idle,
            track: TextTrack::Source,
            guard: RequestGuard::new(),
            sync: None,
            audio: None,
            current_sentence: 0,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn track(&self) -> TextTrack {
        self.track
    }

    pub fn current_sentence(&self) -> usize {
        self.current_sentence
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    /// Request narration of the whole story on `track`.
    pub fn play<H: AudioHandle>(
        &mut self,
        track: TextTrack,
        speed: f32,
        session: &mut PlaybackSession<H>,
    ) -> Result<Vec<PlayerEffect>, ReaderError> {
        if self.story.sentences.is_empty() {
            return Err(ReaderError::EmptyStory(self.story.id.as_u64()));
        }
        self.release(session);

        let language = match track {
            TextTrack::Source => None,
            TextTrack::Translated => self
                .story
                .target_language
                .clone()
                .filter(|lang| !lang.is_english()),
        };
        self.track = track;
        self.state = PlayerState::Loading;
        let ticket = self.guard.enter(ViewKey::Story { story: self.story.id });
        log::debug!("requesting {:?} narration for story {}", track, self.story.id);

        Ok(vec![
            PlayerEffect::ShowPauseButton,
            PlayerEffect::RequestAudio(StoryAudioPlan {
                ticket,
                endpoint: Endpoint::StoryAudio(self.story.id),
                body: StoryAudioRequest {
                    speed: self.story.narration_speed(speed),
                    language,
                },
                track,
            }),
        ])
    }

    /// Narration loaded (duration known). Takes the audio slot and arms the sync loop.
    pub fn audio_ready<H: AudioHandle>(
        &mut self,
        ticket: &RequestTicket,
        mut handle: H,
        duration: Timestamp,
        session: &mut PlaybackSession<H>,
    ) -> Result<AudioToken, ReaderError> {
        let accepted = self.guard.accept(ticket, "story narration").and_then(|()| {
            if self.state == PlayerState::Loading {
                Ok(())
            } else {
                Err(ReaderError::Stale("story narration".to_string()))
            }
        });
        if let Err(err) = accepted {
            handle.pause();
            return Err(err);
        }

        let kind = match self.track {
            TextTrack::Source => PlaybackKind::Story,
            TextTrack::Translated => PlaybackKind::Translation,
        };
        let lease = session.start(handle, kind);
        let texts: Vec<&str> = self
            .story
            .sentences
            .iter()
            .map(|s| s.text(self.track))
            .collect();
        let timeline = TimelineMapper::from_texts(duration, self.padding, &texts);

        self.sync = Some(SyncLoop::new(timeline, self.track, &lease));
        self.audio = Some(lease.token);
        self.state = PlayerState::Playing;
        Ok(lease.token)
    }

    /// One animation frame for `token`'s audio.
    pub fn frame(&mut self, token: AudioToken, sample: FrameSample) -> SyncStep {
        let Some(sync) = self.sync.as_mut().filter(|s| s.audio() == token) else {
            return SyncStep::Stop {
                reason: StopReason::Superseded,
                change: None,
            };
        };
        let step = sync.tick(sample);
        if let Some(HighlightChange { current, .. }) = step.change() {
            self.current_sentence = current;
        }
        step
    }

    pub fn pause<H: AudioHandle>(&mut self, session: &mut PlaybackSession<H>) -> Vec<PlayerEffect> {
        match self.state {
            PlayerState::Playing => {
                if let Some(token) = self.audio {
                    if session.is_current(token) {
                        session.pause();
                    }
                }
            }
            PlayerState::Loading => {
                // Drop the pending narration response.
                self.guard.enter(ViewKey::Story { story: self.story.id });
            }
            PlayerState::Idle | PlayerState::Paused => {}
        }
        if self.state != PlayerState::Idle {
            self.state = PlayerState::Paused;
        }
        vec![PlayerEffect::ShowPlayButton, PlayerEffect::ClearHighlights]
    }

    /// Pause and rewind to the first sentence.
    pub fn stop<H: AudioHandle>(&mut self, session: &mut PlaybackSession<H>) -> Vec<PlayerEffect> {
        let effects = self.pause(session);
        self.release(session);
        self.guard.enter(ViewKey::Story { story: self.story.id });
        self.state = PlayerState::Idle;
        self.current_sentence = 0;
        effects
    }

    /// Audio `ended` event.
    pub fn ended<H: AudioHandle>(
        &mut self,
        token: AudioToken,
        session: &mut PlaybackSession<H>,
    ) -> Vec<PlayerEffect> {
        if self.audio != Some(token) {
            return Vec::new();
        }
        session.finish(token);
        self.audio = None;
        self.sync = None;
        self.state = PlayerState::Idle;
        self.current_sentence = 0;
        vec![PlayerEffect::ShowPlayButton, PlayerEffect::ClearHighlights]
    }

    /// Audio `error` event: stop and tell the user.
    pub fn audio_error<H: AudioHandle>(
        &mut self,
        token: AudioToken,
        detail: &str,
        session: &mut PlaybackSession<H>,
    ) -> Vec<PlayerEffect> {
        if self.audio != Some(token) {
            return Vec::new();
        }
        log::error!("narration playback failed: {}", detail);
        let mut effects = self.stop(session);
        effects.push(PlayerEffect::ShowError {
            message: ReaderError::Audio(detail.to_string()).user_message(),
        });
        effects
    }

    /// The narration request failed. Ignored if the user already moved on.
    pub fn request_failed<H: AudioHandle>(
        &mut self,
        ticket: &RequestTicket,
        error: &ReaderError,
        session: &mut PlaybackSession<H>,
    ) -> Vec<PlayerEffect> {
        if !self.guard.is_fresh(ticket) {
            return Vec::new();
        }
        log::error!("narration request failed: {}", error);
        let mut effects = self.stop(session);
        effects.push(PlayerEffect::ShowError {
            message: error.user_message(),
        });
        effects
    }

    fn release<H: AudioHandle>(&mut self, session: &mut PlaybackSession<H>) {
        if let Some(token) = self.audio.take() {
            session.stop_if_current(token);
        }
        self.sync = None;
    }
}
