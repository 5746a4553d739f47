// Visual sync loop: per-animation-frame highlight tracking for narrated text.
// JS samples the audio element each frame and applies the returned highlight change.

use serde::{Deserialize, Serialize};

use crate::playback::{AudioLease, AudioToken, CancellationToken};
use crate::timeline::TimelineMapper;
use crate::types::{TextTrack, Timestamp};

/// One animation-frame sample of the audio element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    pub elapsed: Timestamp,
    pub paused: bool,
    pub ended: bool,
}

impl FrameSample {
    pub fn playing(elapsed: Timestamp) -> Self {
        FrameSample {
            elapsed,
            paused: false,
            ended: false,
        }
    }
}

/// A single highlight-and-scroll side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightChange {
    pub target: TextTrack,
    pub previous: Option<usize>,
    pub current: usize,
}

/// Why the loop stopped scheduling frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Paused,
    Ended,
    Superseded,
}

/// Result of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SyncStep {
    /// Schedule another frame; apply `change` if present.
    Continue { change: Option<HighlightChange> },
    /// Do not schedule another frame.
    Stop { reason: StopReason, change: Option<HighlightChange> },
}

impl SyncStep {
    pub fn change(&self) -> Option<HighlightChange> {
        match self {
            SyncStep::Continue { change } | SyncStep::Stop { change, .. } => *change,
        }
    }

    pub fn keeps_running(&self) -> bool {
        matches!(self, SyncStep::Continue { .. })
    }
}

/// Polling loop bound to exactly one audio playback and one highlight track.
#[derive(Debug, Clone)]
pub struct SyncLoop {
    timeline: TimelineMapper,
    target: TextTrack,
    audio: AudioToken,
    cancel: CancellationToken,
    active: Option<usize>,
    stopped: Option<StopReason>,
}

impl SyncLoop {
    pub fn new(timeline: TimelineMapper, target: TextTrack, lease: &AudioLease) -> Self {
        SyncLoop {
            timeline,
            target,
            audio: lease.token,
            cancel: lease.cancel.clone(),
            active: None,
            stopped: None,
        }
    }

    /// Whether the loop may schedule another frame after `sample`.
    pub fn should_continue(&self, sample: &FrameSample) -> bool {
        self.stop_reason(sample).is_none()
    }

    fn stop_reason(&self, sample: &FrameSample) -> Option<StopReason> {
        if self.stopped.is_some() {
            return self.stopped;
        }
        if self.cancel.is_cancelled() {
            Some(StopReason::Superseded)
        } else if sample.ended {
            Some(StopReason::Ended)
        } else if sample.paused {
            Some(StopReason::Paused)
        } else {
            None
        }
    }

    /// Process one frame. The highlight is recomputed first, then the continue predicate.
    pub fn tick(&mut self, sample: FrameSample) -> SyncStep {
        if self.stopped.is_some() || self.cancel.is_cancelled() {
            let reason = self.stopped.unwrap_or(StopReason::Superseded);
            self.stopped = Some(reason);
            return SyncStep::Stop { reason, change: None };
        }

        let change = self.advance(sample.elapsed);
        match self.stop_reason(&sample) {
            None => SyncStep::Continue { change },
            Some(reason) => {
                log::debug!("sync loop for {:?} stopped: {:?}", self.audio, reason);
                self.stopped = Some(reason);
                SyncStep::Stop { reason, change }
            }
        }
    }

    fn advance(&mut self, elapsed: Timestamp) -> Option<HighlightChange> {
        let current = self.timeline.active_chunk(elapsed)?;
        if self.active == Some(current) {
            return None;
        }
        let change = HighlightChange {
            target: self.target,
            previous: self.active,
            current,
        };
        self.active = Some(current);
        Some(change)
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn target(&self) -> TextTrack {
        self.target
    }

    pub fn audio(&self) -> AudioToken {
        self.audio
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }
}
