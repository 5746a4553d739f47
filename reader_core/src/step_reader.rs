// Step-by-step reader: one sentence at a time, bilingual narration choice, end screen.
// Every transition stops sentence narration before the next sentence is shown.

use serde::{Deserialize, Serialize};

use crate::api::{Endpoint, TtsRequest};
use crate::config::ConsoleConfig;
use crate::error::ReaderError;
use crate::playback::{AudioHandle, AudioToken, PlaybackKind, PlaybackSession, RequestGuard, RequestTicket, ViewKey};
use crate::types::{LanguageCode, Story, TextTrack};

/// Reader position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReaderState {
    /// Bilingual story on its first sentence, narration language not yet picked.
    Choosing,
    Reading { index: usize },
    End,
}

/// Narration the host should fetch (`POST /api/speech/tts`) and hand back with its ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub ticket: RequestTicket,
    pub index: usize,
    pub endpoint: Endpoint,
    pub body: TtsRequest,
}

/// Side effects for the page to apply, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ReaderEffect {
    StopAudio,
    ShowSentence {
        index: usize,
        total: usize,
        text: String,
        translated: Option<String>,
        illustration: String,
    },
    ShowLanguageChoice { options: Vec<LanguageCode> },
    /// The illustration failed to load; show the placeholder icon instead.
    ShowPlaceholder { index: usize },
    RequestNarration(NarrationRequest),
    ShowEnd { text: String },
}

pub struct StepReader {
    story: Story,
    state: ReaderState,
    language: Option<LanguageCode>,
    automated: bool,
    speed: f32,
    config: ConsoleConfig,
    guard: RequestGuard,
    audio: Option<AudioToken>,
}

impl StepReader {
    /// Open a story on its first sentence.
    pub fn open(
        story: Story,
        config: &ConsoleConfig,
        speed: f32,
    ) -> Result<(StepReader, Vec<ReaderEffect>), ReaderError> {
        if story.sentences.is_empty() {
            return Err(ReaderError::EmptyStory(story.id.as_u64()));
        }

        let bilingual = story.is_bilingual();
        let mut reader = StepReader {
            language: if bilingual { None } else { Some(LanguageCode::english()) },
            state: if bilingual {
                ReaderState::Choosing
            } else {
                ReaderState::Reading { index: 0 }
            },
            automated: config.automated_play,
            speed,
            config: config.clone(),
            guard: RequestGuard::new(),
            audio: None,
            story,
        };

        let effects = if bilingual {
            let view = reader.view(0);
            reader.guard.enter(view);
            let mut options = vec![LanguageCode::english()];
            options.extend(reader.story.target_language.clone());
            vec![
                reader.show_sentence(0),
                ReaderEffect::ShowLanguageChoice { options },
            ]
        } else {
            reader.enter(0)
        };
        log::debug!("step reader opened story {} in {:?}", reader.story.id, reader.state);
        Ok((reader, effects))
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn language(&self) -> Option<&LanguageCode> {
        self.language.as_ref()
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn set_automated(&mut self, automated: bool) {
        self.automated = automated;
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Current sentence index; `Choosing` counts as sentence 0.
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            ReaderState::Choosing => Some(0),
            ReaderState::Reading { index } => Some(index),
            ReaderState::End => None,
        }
    }

    /// Pick the narration language. Only meaningful while it is unset.
    pub fn choose_language<H: AudioHandle>(
        &mut self,
        language: LanguageCode,
        session: &mut PlaybackSession<H>,
    ) -> Vec<ReaderEffect> {
        if self.language.is_some() {
            log::warn!("narration language already chosen; ignoring {}", language);
            return Vec::new();
        }
        session.set_narration_language(Some(language.clone()));
        self.language = Some(language);

        let index = self.current_index().unwrap_or(0);
        self.state = ReaderState::Reading { index };
        let mut effects = self.stop_narration(session);
        let view = self.view(index);
        let ticket = self.guard.enter(view);
        effects.extend(self.narration_request(index, ticket).map(ReaderEffect::RequestNarration));
        effects
    }

    pub fn next<H: AudioHandle>(&mut self, session: &mut PlaybackSession<H>) -> Vec<ReaderEffect> {
        let ReaderState::Reading { index } = self.state else {
            return Vec::new();
        };
        let mut effects = self.stop_narration(session);
        if index + 1 < self.story.sentences.len() {
            effects.extend(self.enter(index + 1));
        } else {
            self.state = ReaderState::End;
            self.guard.enter(ViewKey::Story { story: self.story.id });
            effects.push(ReaderEffect::ShowEnd {
                text: self.story.ending_text().to_string(),
            });
        }
        effects
    }

    pub fn back<H: AudioHandle>(&mut self, session: &mut PlaybackSession<H>) -> Vec<ReaderEffect> {
        let target = match self.state {
            ReaderState::Reading { index } if index > 0 => index - 1,
            ReaderState::End => self.story.sentences.len() - 1,
            _ => return Vec::new(),
        };
        let mut effects = self.stop_narration(session);
        effects.extend(self.enter(target));
        effects
    }

    /// Narrate the current sentence again.
    pub fn replay<H: AudioHandle>(&mut self, session: &mut PlaybackSession<H>) -> Vec<ReaderEffect> {
        let ReaderState::Reading { index } = self.state else {
            return Vec::new();
        };
        let mut effects = self.stop_narration(session);
        let view = self.view(index);
        let ticket = self.guard.enter(view);
        effects.extend(self.narration_request(index, ticket).map(ReaderEffect::RequestNarration));
        effects
    }

    /// Narration audio arrived. Starts it only if the ticket still matches the shown sentence;
    /// a rejected handle is paused before it is dropped.
    pub fn narration_ready<H: AudioHandle>(
        &mut self,
        ticket: &RequestTicket,
        mut handle: H,
        session: &mut PlaybackSession<H>,
    ) -> Result<AudioToken, ReaderError> {
        if let Err(err) = self.guard.accept(ticket, "sentence narration") {
            handle.pause();
            return Err(err);
        }
        let lease = session.start(handle, PlaybackKind::Sentence);
        self.audio = Some(lease.token);
        Ok(lease.token)
    }

    /// Narration finished playing. Advances in automated mode.
    pub fn narration_finished<H: AudioHandle>(
        &mut self,
        token: AudioToken,
        session: &mut PlaybackSession<H>,
    ) -> Vec<ReaderEffect> {
        if self.audio != Some(token) || !session.finish(token) {
            return Vec::new();
        }
        self.audio = None;
        if self.automated {
            self.next(session)
        } else {
            Vec::new()
        }
    }

    /// Illustration for `index` failed to load.
    pub fn illustration_failed(&self, index: usize) -> Option<ReaderEffect> {
        (self.current_index() == Some(index)).then_some(ReaderEffect::ShowPlaceholder { index })
    }

    /// Leave the reader: stop narration and invalidate pending requests.
    pub fn close<H: AudioHandle>(&mut self, session: &mut PlaybackSession<H>) {
        self.stop_narration(session);
        self.guard.enter(ViewKey::StoryList);
    }

    fn enter(&mut self, index: usize) -> Vec<ReaderEffect> {
        self.state = ReaderState::Reading { index };
        let view = self.view(index);
        let ticket = self.guard.enter(view);
        let mut effects = vec![self.show_sentence(index)];
        effects.extend(self.narration_request(index, ticket).map(ReaderEffect::RequestNarration));
        effects
    }

    fn stop_narration<H: AudioHandle>(&mut self, session: &mut PlaybackSession<H>) -> Vec<ReaderEffect> {
        let Some(token) = self.audio.take() else {
            return Vec::new();
        };
        if session.stop_if_current(token) {
            vec![ReaderEffect::StopAudio]
        } else {
            Vec::new()
        }
    }

    fn view(&self, index: usize) -> ViewKey {
        ViewKey::Sentence {
            story: self.story.id,
            index,
        }
    }

    fn show_sentence(&self, index: usize) -> ReaderEffect {
        let sentence = &self.story.sentences[index];
        ReaderEffect::ShowSentence {
            index,
            total: self.story.sentences.len(),
            text: sentence.sentence_text.clone(),
            translated: sentence.translated_text.clone(),
            illustration: self.config.illustration_url(self.story.id, index),
        }
    }

    fn narration_request(&self, index: usize, ticket: RequestTicket) -> Option<NarrationRequest> {
        let language = self.language.clone()?;
        let track = if language.is_english() {
            TextTrack::Source
        } else {
            TextTrack::Translated
        };
        let text = self.story.sentences.get(index)?.text(track).to_string();
        Some(NarrationRequest {
            ticket,
            index,
            endpoint: Endpoint::Tts,
            body: TtsRequest {
                text,
                speed: self.story.narration_speed(self.speed),
                language: (!language.is_english()).then_some(language),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::mock::MockAudio;
    use crate::types::{Sentence, StoryId};
    use std::collections::BTreeMap;

    fn story(n: usize, target: Option<&str>, moral: Option<&str>) -> Story {
        Story {
            id: StoryId::new(5),
            title: "Test".to_string(),
            translated_title: None,
            target_language: target.map(LanguageCode::new),
            moral: moral.map(str::to_string),
            theme: None,
            sentences: (0..n)
                .map(|i| Sentence::bilingual(format!("Sentence {i}."), format!("Vakya {i}.")))
                .collect(),
            vocab: BTreeMap::new(),
            audio_speed: None,
        }
    }

    fn narration(effects: &[ReaderEffect]) -> Option<&NarrationRequest> {
        effects.iter().find_map(|e| match e {
            ReaderEffect::RequestNarration(req) => Some(req),
            _ => None,
        })
    }

    fn open(story: Story) -> (StepReader, Vec<ReaderEffect>) {
        StepReader::open(story, &ConsoleConfig::default(), 0.8).unwrap()
    }

    #[test]
    fn monolingual_story_starts_reading_with_narration() {
        let (reader, effects) = open(story(3, None, None));
        assert_eq!(reader.state(), ReaderState::Reading { index: 0 });
        assert!(matches!(
            &effects[0],
            ReaderEffect::ShowSentence { index: 0, total: 3, illustration, .. }
                if illustration == "/images/stories/story_5_sentence_1.png"
        ));
        let req = narration(&effects).unwrap();
        assert_eq!(req.body.text, "Sentence 0.");
        assert_eq!(req.body.language, None);
    }

    #[test]
    fn bilingual_story_waits_for_language() {
        let mut session = PlaybackSession::<MockAudio>::new();
        let (mut reader, effects) = open(story(2, Some("hi"), None));
        assert_eq!(reader.state(), ReaderState::Choosing);
        assert!(narration(&effects).is_none());
        assert!(effects.iter().any(|e| matches!(
            e,
            ReaderEffect::ShowLanguageChoice { options } if options.len() == 2
        )));

        // Next is ignored until a language is chosen.
        assert!(reader.next(&mut session).is_empty());

        let effects = reader.choose_language(LanguageCode::new("hi"), &mut session);
        assert_eq!(reader.state(), ReaderState::Reading { index: 0 });
        let req = narration(&effects).unwrap();
        assert_eq!(req.body.text, "Vakya 0.");
        assert_eq!(req.body.language, Some(LanguageCode::new("hi")));
        assert_eq!(session.narration_language(), Some(&LanguageCode::new("hi")));

        // A second choice is ignored.
        assert!(reader.choose_language(LanguageCode::english(), &mut session).is_empty());
    }

    #[test]
    fn next_to_end_shows_moral_or_the_end() {
        let mut session = PlaybackSession::<MockAudio>::new();
        let (mut reader, _) = open(story(2, None, Some("Share with friends.")));
        reader.next(&mut session);
        let effects = reader.next(&mut session);
        assert_eq!(reader.state(), ReaderState::End);
        assert_eq!(
            effects.last(),
            Some(&ReaderEffect::ShowEnd {
                text: "Share with friends.".to_string()
            })
        );
        assert!(reader.next(&mut session).is_empty());

        let (mut reader, _) = open(story(1, None, None));
        let effects = reader.next(&mut session);
        assert_eq!(
            effects,
            vec![ReaderEffect::ShowEnd {
                text: "The End".to_string()
            }]
        );
    }

    #[test]
    fn back_transitions() {
        let mut session = PlaybackSession::<MockAudio>::new();
        let (mut reader, _) = open(story(2, None, None));
        assert!(reader.back(&mut session).is_empty(), "back on first sentence is a no-op");

        reader.next(&mut session);
        reader.next(&mut session);
        assert_eq!(reader.state(), ReaderState::End);
        reader.back(&mut session);
        assert_eq!(reader.state(), ReaderState::Reading { index: 1 });
        reader.back(&mut session);
        assert_eq!(reader.state(), ReaderState::Reading { index: 0 });
    }

    #[test]
    fn transitions_stop_playing_narration() {
        let mut session = PlaybackSession::new();
        let (mut reader, effects) = open(story(3, None, None));
        let ticket = narration(&effects).unwrap().ticket.clone();

        let audio = MockAudio::playing();
        let paused = audio.paused_flag();
        reader.narration_ready(&ticket, audio, &mut session).unwrap();
        assert!(session.is_playing());

        let effects = reader.next(&mut session);
        assert_eq!(effects[0], ReaderEffect::StopAudio);
        assert!(paused.get());
        assert_eq!(session.current_token(), None);
    }

    #[test]
    fn late_narration_for_previous_sentence_is_dropped() {
        let mut session = PlaybackSession::new();
        let (mut reader, effects) = open(story(3, None, None));
        let stale = narration(&effects).unwrap().ticket.clone();
        reader.next(&mut session);

        let late = MockAudio::playing();
        let late_paused = late.paused_flag();
        let err = reader.narration_ready(&stale, late, &mut session).unwrap_err();
        assert!(matches!(err, ReaderError::Stale(_)));
        assert!(late_paused.get(), "rejected narration must not keep playing");
        assert_eq!(session.current_token(), None);
    }

    #[test]
    fn automated_mode_advances_on_finish() {
        let mut session = PlaybackSession::new();
        let (mut reader, effects) = open(story(2, None, None));
        reader.set_automated(true);
        let ticket = narration(&effects).unwrap().ticket.clone();
        let token = reader
            .narration_ready(&ticket, MockAudio::playing(), &mut session)
            .unwrap();

        let effects = reader.narration_finished(token, &mut session);
        assert_eq!(reader.state(), ReaderState::Reading { index: 1 });
        assert!(narration(&effects).is_some());

        // A repeated ended event for the same token does nothing.
        assert!(reader.narration_finished(token, &mut session).is_empty());
    }

    #[test]
    fn manual_mode_stays_on_finish() {
        let mut session = PlaybackSession::new();
        let (mut reader, effects) = open(story(2, None, None));
        let ticket = narration(&effects).unwrap().ticket.clone();
        let token = reader
            .narration_ready(&ticket, MockAudio::playing(), &mut session)
            .unwrap();
        assert!(reader.narration_finished(token, &mut session).is_empty());
        assert_eq!(reader.state(), ReaderState::Reading { index: 0 });
    }

    #[test]
    fn placeholder_only_for_current_sentence() {
        let (reader, _) = open(story(2, None, None));
        assert_eq!(
            reader.illustration_failed(0),
            Some(ReaderEffect::ShowPlaceholder { index: 0 })
        );
        assert_eq!(reader.illustration_failed(1), None);
    }

    #[test]
    fn story_speed_override_wins() {
        let mut s = story(1, None, None);
        s.audio_speed = Some(0.6);
        let (_, effects) = open(s);
        assert_eq!(narration(&effects).unwrap().body.speed, 0.6);
    }

    #[test]
    fn empty_story_is_rejected() {
        let result = StepReader::open(story(0, None, None), &ConsoleConfig::default(), 0.8);
        assert!(matches!(result, Err(ReaderError::EmptyStory(5))));
    }
}
