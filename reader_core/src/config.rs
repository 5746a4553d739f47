// Console configuration passed from JS as JSON. Every field has a serde default.

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;
use crate::types::{StoryId, Timestamp};

/// Reader console configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Prefix for every backend route.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Leading silence in synthesized narration (milliseconds).
    #[serde(default)]
    pub silence_padding_ms: u64,
    /// Narration speed when no preset is selected.
    #[serde(default = "default_speed")]
    pub default_speed: f32,
    #[serde(default)]
    pub speed_presets: SpeedPresets,
    /// Advance the step reader automatically when a sentence finishes.
    #[serde(default)]
    pub automated_play: bool,
    /// Per-sentence illustration path. `{story}` and `{sentence}` (1-based) are substituted.
    #[serde(default = "default_illustration_path")]
    pub illustration_path: String,
    /// Scramble accuracy at which the next round is suggested one tier harder.
    #[serde(default = "default_promote_accuracy")]
    pub scramble_promote_accuracy: f32,
    /// Buddy chat session. The backend falls back to its default session when absent.
    #[serde(default)]
    pub chat_session_id: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Narration speed presets offered by the player buttons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedPresets {
    #[serde(default = "default_slow")]
    pub slow: f32,
    #[serde(default = "default_speed")]
    pub normal: f32,
    #[serde(default = "default_fast")]
    pub fast: f32,
}

impl Default for SpeedPresets {
    fn default() -> Self {
        SpeedPresets {
            slow: default_slow(),
            normal: default_speed(),
            fast: default_fast(),
        }
    }
}

fn default_api_base() -> String {
    "/api".to_string()
}

fn default_speed() -> f32 {
    0.8
}

fn default_slow() -> f32 {
    0.6
}

fn default_fast() -> f32 {
    1.0
}

fn default_illustration_path() -> String {
    "/images/stories/story_{story}_sentence_{sentence}.png".to_string()
}

fn default_promote_accuracy() -> f32 {
    0.8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            api_base: default_api_base(),
            silence_padding_ms: 0,
            default_speed: default_speed(),
            speed_presets: SpeedPresets::default(),
            automated_play: false,
            illustration_path: default_illustration_path(),
            scramble_promote_accuracy: default_promote_accuracy(),
            chat_session_id: None,
            log_level: default_log_level(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_json(json: &str) -> Result<Self, ReaderError> {
        if json.trim().is_empty() {
            return Ok(ConsoleConfig::default());
        }
        let config: ConsoleConfig =
            serde_json::from_str(json).map_err(|e| ReaderError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ReaderError> {
        if !(0.0..=1.0).contains(&self.scramble_promote_accuracy) {
            return Err(ReaderError::InvalidConfig(format!(
                "scramble_promote_accuracy must be within 0..=1, got {}",
                self.scramble_promote_accuracy
            )));
        }
        if self.default_speed <= 0.0 {
            return Err(ReaderError::InvalidConfig(
                "default_speed must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn silence_padding(&self) -> Timestamp {
        Timestamp::from_micros(self.silence_padding_ms.saturating_mul(1000))
    }

    /// Speed for a named preset button (`slow`, `normal`, `fast`).
    pub fn speed_for(&self, preset: &str) -> f32 {
        match preset {
            "slow" => self.speed_presets.slow,
            "normal" => self.speed_presets.normal,
            "fast" => self.speed_presets.fast,
            _ => self.default_speed,
        }
    }

    /// Conventional illustration URL for a sentence (0-based index in, 1-based in the path).
    pub fn illustration_url(&self, story: StoryId, sentence_index: usize) -> String {
        self.illustration_path
            .replace("{story}", &story.to_string())
            .replace("{sentence}", &(sentence_index + 1).to_string())
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
