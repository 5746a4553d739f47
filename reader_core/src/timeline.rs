// Playback timeline mapping for read-aloud highlighting.
// Maps elapsed narration time to the active chunk (sentence or word) by proportional word count.
// The model is a heuristic: synthesized speech carries no per-word timing, so chunk
// boundaries are placed where the cumulative word share of the audio would end.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::error::ReaderError;
use crate::types::{count_words, Timestamp};

/// Proportional timeline over an ordered list of chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineMapper {
    duration: Timestamp,
    padding: Timestamp,
    word_counts: Vec<usize>,
    end_times: Vec<Timestamp>,
    total_words: usize,
}

impl TimelineMapper {
    /// Build a timeline from per-chunk word counts.
    ///
    /// End time of chunk `i` is `cumulative_words_i / total_words * max(0, duration - padding)`,
    /// measured from the end of the leading silence.
    pub fn new(duration: Timestamp, padding: Timestamp, word_counts: Vec<usize>) -> Self {
        let total_words: usize = word_counts.iter().sum();
        let speech = duration.saturating_sub(padding).as_micros() as u128;

        let mut cumulative = 0u128;
        let end_times = word_counts
            .iter()
            .map(|&count| {
                cumulative += count as u128;
                if total_words == 0 {
                    Timestamp::from_micros(0)
                } else {
                    Timestamp::from_micros((cumulative * speech / total_words as u128) as u64)
                }
            })
            .collect();

        TimelineMapper {
            duration,
            padding,
            word_counts,
            end_times,
            total_words,
        }
    }

    /// Timeline with one chunk per text (sentences).
    pub fn from_texts<S: AsRef<str>>(duration: Timestamp, padding: Timestamp, texts: &[S]) -> Self {
        let counts = texts.iter().map(|t| count_words(t.as_ref())).collect();
        TimelineMapper::new(duration, padding, counts)
    }

    /// Timeline with one chunk per word of a single text.
    pub fn for_words(duration: Timestamp, padding: Timestamp, text: &str) -> Self {
        let counts = vec![1; count_words(text)];
        TimelineMapper::new(duration, padding, counts)
    }

    /// Active chunk at `elapsed` playback time.
    ///
    /// `None` only when there is nothing to highlight (no chunks, or no words at all).
    /// Inside the leading silence, and at time zero, the first chunk is active.
    /// Past the end of speech the last chunk stays active.
    pub fn active_chunk(&self, elapsed: Timestamp) -> Option<usize> {
        if self.end_times.is_empty() || self.total_words == 0 {
            return None;
        }
        if elapsed < self.padding || elapsed.as_micros() == 0 {
            return Some(0);
        }

        let relative = elapsed.saturating_sub(self.padding);
        let found = self.end_times.iter().position(|&end| relative < end);
        Some(found.unwrap_or(self.end_times.len() - 1))
    }

    /// Inclusive end time of each chunk, relative to the end of the leading silence.
    pub fn end_times(&self) -> &[Timestamp] {
        &self.end_times
    }

    pub fn word_counts(&self) -> &[usize] {
        &self.word_counts
    }

    pub fn total_words(&self) -> usize {
        self.total_words
    }

    pub fn duration(&self) -> Timestamp {
        self.duration
    }

    pub fn padding(&self) -> Timestamp {
        self.padding
    }

    pub fn len(&self) -> usize {
        self.end_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.end_times.is_empty()
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

/// JSON structure expected by `WasmTimeline::new()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Audio duration in seconds (`HTMLMediaElement.duration`).
    pub duration_secs: f64,
    /// Leading silence in seconds.
    #[serde(default)]
    pub padding_secs: f64,
    /// Chunk texts in narration order.
    pub chunks: Vec<String>,
}

/// WASM-exposed timeline for pages that only need the mapping.
///
/// # Example JSON Config
/// ```json
/// { "duration_secs": 10.0, "padding_secs": 0.0, "chunks": ["The cat sat.", "It was happy."] }
/// ```
#[wasm_bindgen]
pub struct WasmTimeline {
    inner: TimelineMapper,
}

#[wasm_bindgen]
impl WasmTimeline {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmTimeline, JsValue> {
        let inner = Self::parse(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmTimeline { inner })
    }

    /// Active chunk index at `elapsed_secs`, or -1 when nothing is highlightable.
    pub fn active_chunk(&self, elapsed_secs: f64) -> i32 {
        self.inner
            .active_chunk(Timestamp::from_secs_f64(elapsed_secs))
            .map(|i| i as i32)
            .unwrap_or(-1)
    }

    /// End times in seconds, as a JSON array.
    pub fn end_times_json(&self) -> Result<String, JsValue> {
        let secs: Vec<f64> = self.inner.end_times().iter().map(|t| t.as_secs()).collect();
        serde_json::to_string(&secs)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn total_words(&self) -> usize {
        self.inner.total_words()
    }
}

impl WasmTimeline {
    fn parse(config_json: &str) -> Result<TimelineMapper, ReaderError> {
        let config: TimelineConfig = serde_json::from_str(config_json)?;
        Ok(TimelineMapper::from_texts(
            Timestamp::from_secs_f64(config.duration_secs),
            Timestamp::from_secs_f64(config.padding_secs),
            &config.chunks,
        ))
    }
}
