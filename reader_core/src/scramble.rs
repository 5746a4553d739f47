// Sentence-scramble game: rebuild each chunk from shuffled word tiles.
// Tiles carry their original position so repeated words stay distinguishable.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Difficulty tier of a round. The backend splits chunks according to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// One tier harder; `Hard` stays `Hard`.
    pub fn escalate(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Hard => Difficulty::Hard,
        }
    }
}

/// A word tile: the word plus its position in the original chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub id: usize,
    pub word: String,
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Result of `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Correct,
    Incorrect,
    /// The chunk is already solved, or there is nothing to check.
    Ignored,
}

/// Where the round is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RoundPhase {
    /// No usable chunks were supplied.
    NothingToPlay,
    Playing { index: usize },
    Finished(RoundSummary),
}

/// Terminal report for a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub correct: usize,
    pub total: usize,
    pub attempts: usize,
    pub difficulty: Difficulty,
    pub suggested_difficulty: Difficulty,
    pub struggled: Vec<String>,
    /// The original text, chunks joined in order.
    pub full_text: String,
}

impl RoundSummary {
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }
}

/// Result of advancing past the current chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "advance", rename_all = "snake_case")]
pub enum Advance {
    Chunk { index: usize },
    Finished(RoundSummary),
    /// `next` before the chunk was solved, or no round in progress.
    Blocked,
}

/// One scramble round over an ordered list of chunks.
#[derive(Debug, Clone)]
pub struct ScrambleRound {
    chunks: Vec<String>,
    difficulty: Difficulty,
    promote_accuracy: f32,
    phase: RoundPhase,
    pool: Vec<Tile>,
    workspace: Vec<Tile>,
    solved: bool,
    correct: usize,
    attempts: usize,
    struggled: Vec<String>,
    story_so_far: Vec<String>,
}

impl ScrambleRound {
    /// Start a round. Blank chunks are dropped; with none left the round has nothing to play.
    pub fn new<R: Rng + ?Sized>(
        chunks: Vec<String>,
        difficulty: Difficulty,
        promote_accuracy: f32,
        rng: &mut R,
    ) -> Self {
        let chunks: Vec<String> = chunks
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !normalize(c).is_empty())
            .collect();

        let phase = if chunks.is_empty() {
            log::warn!("scramble round started without usable chunks");
            RoundPhase::NothingToPlay
        } else {
            RoundPhase::Playing { index: 0 }
        };

        let mut round = ScrambleRound {
            chunks,
            difficulty,
            promote_accuracy,
            phase,
            pool: Vec::new(),
            workspace: Vec::new(),
            solved: false,
            correct: 0,
            attempts: 0,
            struggled: Vec::new(),
            story_so_far: Vec::new(),
        };
        if round.current_index().is_some() {
            round.deal(rng);
        }
        round
    }

    fn deal<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let Some(chunk) = self.current_chunk() else {
            return;
        };
        let mut tiles: Vec<Tile> = chunk
            .split_whitespace()
            .enumerate()
            .map(|(id, word)| Tile {
                id,
                word: word.to_string(),
            })
            .collect();

        // A deal that comes out already in order is rotated by one.
        tiles.shuffle(rng);
        if tiles.len() > 1 && tiles.iter().enumerate().all(|(i, t)| t.id == i) {
            tiles.rotate_left(1);
        }

        self.pool = tiles;
        self.workspace.clear();
        self.solved = false;
    }

    pub fn phase(&self) -> &RoundPhase {
        &self.phase
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            RoundPhase::Playing { index } => Some(index),
            _ => None,
        }
    }

    pub fn current_chunk(&self) -> Option<&str> {
        self.current_index()
            .and_then(|i| self.chunks.get(i))
            .map(String::as_str)
    }

    /// Tiles still available, in display order.
    pub fn pool(&self) -> &[Tile] {
        &self.pool
    }

    /// The user's reconstruction so far.
    pub fn workspace(&self) -> &[Tile] {
        &self.workspace
    }

    pub fn reconstruction(&self) -> String {
        self.workspace
            .iter()
            .map(|t| t.word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn can_check(&self) -> bool {
        self.current_index().is_some() && !self.solved
    }

    pub fn story_so_far(&self) -> &[String] {
        &self.story_so_far
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn total(&self) -> usize {
        self.chunks.len()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Move a tile from the pool to the end of the reconstruction.
    pub fn select(&mut self, tile_id: usize) -> bool {
        if !self.can_check() {
            return false;
        }
        match self.pool.iter().position(|t| t.id == tile_id) {
            Some(pos) => {
                let tile = self.pool.remove(pos);
                self.workspace.push(tile);
                true
            }
            None => false,
        }
    }

    /// Return a tile from the reconstruction to the pool.
    pub fn remove(&mut self, tile_id: usize) -> bool {
        if !self.can_check() {
            return false;
        }
        match self.workspace.iter().position(|t| t.id == tile_id) {
            Some(pos) => {
                let tile = self.workspace.remove(pos);
                self.pool.push(tile);
                true
            }
            None => false,
        }
    }

    /// Compare the reconstruction with the chunk after normalization.
    pub fn check(&mut self) -> CheckOutcome {
        if !self.can_check() {
            return CheckOutcome::Ignored;
        }
        let Some(chunk) = self.current_chunk().map(str::to_string) else {
            return CheckOutcome::Ignored;
        };

        self.attempts += 1;
        if normalize(&self.reconstruction()) == normalize(&chunk) {
            self.correct += 1;
            self.solved = true;
            self.story_so_far.push(chunk);
            CheckOutcome::Correct
        } else {
            if !self.struggled.contains(&chunk) {
                self.struggled.push(chunk);
            }
            CheckOutcome::Incorrect
        }
    }

    /// Advance after a solved chunk.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Advance {
        if self.current_index().is_none() || !self.solved {
            return Advance::Blocked;
        }
        self.advance(rng)
    }

    /// Give up on the current chunk: it counts as struggled and the round moves on.
    pub fn skip<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Advance {
        let Some(chunk) = self.current_chunk().map(str::to_string) else {
            return Advance::Blocked;
        };
        if !self.solved {
            if !self.struggled.contains(&chunk) {
                self.struggled.push(chunk.clone());
            }
            self.story_so_far.push(chunk);
        }
        self.advance(rng)
    }

    fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Advance {
        let Some(index) = self.current_index() else {
            return Advance::Blocked;
        };
        if index + 1 < self.chunks.len() {
            self.phase = RoundPhase::Playing { index: index + 1 };
            self.deal(rng);
            Advance::Chunk { index: index + 1 }
        } else {
            let summary = self.summary();
            log::debug!(
                "scramble round finished: {}/{} at {:?}",
                summary.correct,
                summary.total,
                summary.difficulty
            );
            self.pool.clear();
            self.workspace.clear();
            self.phase = RoundPhase::Finished(summary.clone());
            Advance::Finished(summary)
        }
    }

    fn summary(&self) -> RoundSummary {
        let mut summary = RoundSummary {
            correct: self.correct,
            total: self.chunks.len(),
            attempts: self.attempts,
            difficulty: self.difficulty,
            suggested_difficulty: self.difficulty,
            struggled: self.struggled.clone(),
            full_text: self.chunks.join(" "),
        };
        if summary.total > 0 && summary.accuracy() >= self.promote_accuracy {
            summary.suggested_difficulty = self.difficulty.escalate();
        }
        summary
    }
}
