// Strong typing over strings. Newtypes for playback time, story ids and language codes.
// Data model shared by every reader component (stories, sentences, text tracks).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Playback time in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// Convert from media-element seconds. Negative and NaN inputs become zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Timestamp(0);
        }
        Timestamp((secs * 1_000_000.0).round() as u64)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_secs(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn saturating_sub(&self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_sub(other.0))
    }
}

/// Backend story identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StoryId(u64);

impl StoryId {
    pub fn new(id: u64) -> Self {
        StoryId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Narration / target language code (`"en"`, `"hi"`, `"es"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        LanguageCode(code.into().trim().to_lowercase())
    }

    pub fn english() -> Self {
        LanguageCode("en".to_string())
    }

    pub fn is_english(&self) -> bool {
        self.0 == "en" || self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        LanguageCode::english()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which text of a bilingual sentence is narrated and highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextTrack {
    #[default]
    Source,
    Translated,
}

/// One sentence of a story. Ordering within the story is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub sentence_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
}

impl Sentence {
    pub fn new(text: impl Into<String>) -> Self {
        Sentence {
            sentence_text: text.into(),
            translated_text: None,
        }
    }

    pub fn bilingual(text: impl Into<String>, translated: impl Into<String>) -> Self {
        Sentence {
            sentence_text: text.into(),
            translated_text: Some(translated.into()),
        }
    }

    /// Text for the requested track. Falls back to the source text when a
    /// sentence carries no translation.
    pub fn text(&self, track: TextTrack) -> &str {
        match track {
            TextTrack::Source => &self.sentence_text,
            TextTrack::Translated => self
                .translated_text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(&self.sentence_text),
        }
    }
}

/// A story as served by `GET /api/stories/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    #[serde(default)]
    pub translated_title: Option<String>,
    #[serde(default)]
    pub target_language: Option<LanguageCode>,
    #[serde(default)]
    pub moral: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
    #[serde(default)]
    pub vocab: BTreeMap<String, String>,
    #[serde(default)]
    pub audio_speed: Option<f32>,
}

impl Story {
    /// A story is bilingual when it names a target language other than English.
    pub fn is_bilingual(&self) -> bool {
        self.target_language
            .as_ref()
            .map(|lang| !lang.is_english())
            .unwrap_or(false)
    }

    /// Moral text for the end screen, or the literal "The End".
    pub fn ending_text(&self) -> &str {
        self.moral
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(THE_END)
    }

    /// Narration speed: the story override wins over the user's selection.
    pub fn narration_speed(&self, selected: f32) -> f32 {
        self.audio_speed.filter(|s| *s > 0.0).unwrap_or(selected)
    }

    /// Full text of one track, sentences joined by single spaces.
    pub fn full_text(&self, track: TextTrack) -> String {
        self.sentences
            .iter()
            .map(|s| s.text(track).trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Literal shown on the end screen when a story has no moral.
pub const THE_END: &str = "The End";

/// Whitespace-delimited word count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
