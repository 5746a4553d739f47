// Vocabulary flashcards over the words collected from read stories.
// Status changes are persisted by the backend; the deck only reflects them locally.

use serde::{Deserialize, Serialize};

use crate::api::VocabStatusRequest;
use crate::error::ReaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VocabStatus {
    #[default]
    New,
    Learning,
    Mastered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub word: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub status: VocabStatus,
    #[serde(default = "default_occurrences")]
    pub occurrence_count: u32,
}

fn default_occurrences() -> u32 {
    1
}

impl VocabEntry {
    pub fn new(word: impl Into<String>, meaning: impl Into<String>) -> Self {
        VocabEntry {
            word: word.into(),
            meaning: meaning.into(),
            status: VocabStatus::New,
            occurrence_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub new: usize,
    pub learning: usize,
    pub mastered: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.new + self.learning + self.mastered
    }
}

/// Which face of the card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardFace {
    Word,
    Meaning,
}

#[derive(Debug)]
pub struct FlashcardDeck {
    cards: Vec<VocabEntry>,
    index: usize,
    face: CardFace,
}

impl FlashcardDeck {
    pub fn new(cards: Vec<VocabEntry>) -> Self {
        FlashcardDeck {
            cards,
            index: 0,
            face: CardFace::Word,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn face(&self) -> CardFace {
        self.face
    }

    pub fn current(&self) -> Option<&VocabEntry> {
        self.cards.get(self.index)
    }

    pub fn cards(&self) -> &[VocabEntry] {
        &self.cards
    }

    pub fn flip(&mut self) -> CardFace {
        self.face = match self.face {
            CardFace::Word => CardFace::Meaning,
            CardFace::Meaning => CardFace::Word,
        };
        self.face
    }

    /// Advance, wrapping from the last card to the first. New cards show the word.
    pub fn next(&mut self) -> Option<&VocabEntry> {
        if self.cards.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.cards.len();
        self.face = CardFace::Word;
        self.current()
    }

    pub fn prev(&mut self) -> Option<&VocabEntry> {
        if self.cards.is_empty() {
            return None;
        }
        self.index = (self.index + self.cards.len() - 1) % self.cards.len();
        self.face = CardFace::Word;
        self.current()
    }

    pub fn mark_learned(&mut self) -> Result<VocabStatusRequest, ReaderError> {
        self.set_status(VocabStatus::Mastered)
    }

    pub fn mark_for_review(&mut self) -> Result<VocabStatusRequest, ReaderError> {
        self.set_status(VocabStatus::Learning)
    }

    fn set_status(&mut self, status: VocabStatus) -> Result<VocabStatusRequest, ReaderError> {
        let len = self.cards.len();
        let card = self
            .cards
            .get_mut(self.index)
            .ok_or(ReaderError::IndexOutOfRange { index: self.index, len })?;
        card.status = status;
        log::debug!("word {:?} marked {:?}", card.word, status);
        Ok(VocabStatusRequest {
            word: card.word.clone(),
            status,
        })
    }

    pub fn counts(&self) -> StatusCounts {
        self.cards
            .iter()
            .fold(StatusCounts::default(), |mut counts, card| {
                match card.status {
                    VocabStatus::New => counts.new += 1,
                    VocabStatus::Learning => counts.learning += 1,
                    VocabStatus::Mastered => counts.mastered += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn deck() -> FlashcardDeck {
        FlashcardDeck::new(vec![
            VocabEntry::new("brave", "not afraid"),
            VocabEntry::new("gentle", "kind and soft"),
            VocabEntry::new("curious", "wants to know"),
        ])
    }

    mod property_tests {
        use super::*;

        proptest! {
            #[test]
            fn next_then_prev_returns_to_same_card(len in 1usize..20, steps in 0usize..50) {
                let cards = (0..len).map(|i| VocabEntry::new(format!("w{}", i), "")).collect();
                let mut deck = FlashcardDeck::new(cards);
                for _ in 0..steps {
                    deck.next();
                }
                let here = deck.index();
                deck.next();
                deck.prev();
                prop_assert_eq!(deck.index(), here);
                prop_assert!(deck.index() < len);
            }
        }
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let mut deck = deck();
        assert_eq!(deck.prev().map(|c| c.word.as_str()), Some("curious"));
        assert_eq!(deck.next().map(|c| c.word.as_str()), Some("brave"));
        assert_eq!(deck.next().map(|c| c.word.as_str()), Some("gentle"));
    }

    #[test]
    fn flipping_resets_on_navigation() {
        let mut deck = deck();
        assert_eq!(deck.flip(), CardFace::Meaning);
        deck.next();
        assert_eq!(deck.face(), CardFace::Word);
    }

    #[test]
    fn marks_update_status_and_counts() {
        let mut deck = deck();
        let request = deck.mark_learned().unwrap();
        assert_eq!(request.word, "brave");
        assert_eq!(request.status, VocabStatus::Mastered);

        deck.next();
        deck.mark_for_review().unwrap();
        assert_eq!(
            deck.counts(),
            StatusCounts {
                new: 1,
                learning: 1,
                mastered: 1
            }
        );
        assert_eq!(deck.counts().total(), 3);
    }

    #[test]
    fn empty_deck_is_inert() {
        let mut deck = FlashcardDeck::new(Vec::new());
        assert!(deck.next().is_none());
        assert!(deck.prev().is_none());
        assert!(deck.mark_learned().is_err());
        assert_eq!(deck.counts(), StatusCounts::default());
    }

    #[test]
    fn status_serializes_lowercase() {
        let entry: VocabEntry =
            serde_json::from_str(r#"{"word":"moon","meaning":"night light","status":"mastered"}"#)
                .unwrap();
        assert_eq!(entry.status, VocabStatus::Mastered);
        assert_eq!(entry.occurrence_count, 1);
        assert_eq!(
            serde_json::to_string(&VocabStatus::Learning).unwrap(),
            "\"learning\""
        );
    }
}
