// Story list with "Manage Stories" select mode and batch delete.
// Clicking a card opens the story unless select mode is on, in which case it toggles selection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::api::{BatchDeleteRequest, StorySummary};
use crate::types::StoryId;

/// State of the "Delete Selected" button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteButton {
    pub visible: bool,
    pub enabled: bool,
    pub label: String,
}

/// What a click on a story card does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CardClick {
    Open { story: StoryId },
    Selected { story: StoryId },
    Deselected { story: StoryId },
}

#[derive(Debug, Clone, Default)]
pub struct StoryLibrary {
    stories: Vec<StorySummary>,
    select_mode: bool,
    selected: BTreeSet<StoryId>,
}

impl StoryLibrary {
    pub fn new() -> Self {
        StoryLibrary::default()
    }

    /// Replace the list. Selections for stories no longer listed are dropped.
    pub fn load(&mut self, stories: Vec<StorySummary>) {
        self.selected
            .retain(|id| stories.iter().any(|story| story.id == *id));
        self.stories = stories;
    }

    pub fn stories(&self) -> &[StorySummary] {
        &self.stories
    }

    pub fn is_select_mode(&self) -> bool {
        self.select_mode
    }

    pub fn selected(&self) -> impl Iterator<Item = StoryId> + '_ {
        self.selected.iter().copied()
    }

    pub fn toggle_select_mode(&mut self) -> bool {
        self.select_mode = !self.select_mode;
        self.selected.clear();
        log::debug!("select mode {}", self.select_mode);
        self.select_mode
    }

    pub fn toggle_label(&self) -> &'static str {
        if self.select_mode {
            "Cancel Selection"
        } else {
            "Manage Stories"
        }
    }

    pub fn click(&mut self, story: StoryId) -> CardClick {
        if !self.select_mode {
            return CardClick::Open { story };
        }
        if self.selected.remove(&story) {
            CardClick::Deselected { story }
        } else {
            self.selected.insert(story);
            CardClick::Selected { story }
        }
    }

    pub fn delete_button(&self) -> DeleteButton {
        let count = self.selected.len();
        DeleteButton {
            visible: self.select_mode,
            enabled: count > 0,
            label: if count > 0 {
                format!("Delete Selected ({})", count)
            } else {
                "Delete Selected".to_string()
            },
        }
    }

    /// Confirmation text, or `None` with nothing selected.
    pub fn confirm_prompt(&self) -> Option<String> {
        match self.selected.len() {
            0 => None,
            n => Some(format!("Are you sure you want to delete {} stories?", n)),
        }
    }

    pub fn delete_request(&self) -> Option<BatchDeleteRequest> {
        if self.selected.is_empty() {
            return None;
        }
        Some(BatchDeleteRequest {
            story_ids: self.selected.iter().copied().collect(),
        })
    }

    /// The backend deleted `ids`: drop them and leave select mode.
    pub fn deleted(&mut self, ids: &[StoryId]) {
        self.stories.retain(|story| !ids.contains(&story.id));
        self.selected.clear();
        self.select_mode = false;
        log::info!("{} stories deleted", ids.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: u64, title: &str) -> StorySummary {
        StorySummary {
            id: StoryId::new(id),
            title: title.to_string(),
            theme: None,
            translated_title: None,
        }
    }

    fn library() -> StoryLibrary {
        let mut library = StoryLibrary::new();
        library.load(vec![summary(1, "Moon"), summary(2, "Sun"), summary(3, "Rain")]);
        library
    }

    #[test]
    fn clicks_open_outside_select_mode() {
        let mut library = library();
        assert_eq!(
            library.click(StoryId::new(2)),
            CardClick::Open {
                story: StoryId::new(2)
            }
        );
        assert!(!library.delete_button().visible);
        assert_eq!(library.toggle_label(), "Manage Stories");
    }

    #[test]
    fn select_mode_toggles_selection_and_button() {
        let mut library = library();
        assert!(library.toggle_select_mode());
        assert_eq!(library.toggle_label(), "Cancel Selection");
        assert_eq!(
            library.delete_button(),
            DeleteButton {
                visible: true,
                enabled: false,
                label: "Delete Selected".to_string()
            }
        );

        library.click(StoryId::new(3));
        library.click(StoryId::new(1));
        assert_eq!(library.delete_button().label, "Delete Selected (2)");
        assert!(library.delete_button().enabled);

        assert_eq!(
            library.click(StoryId::new(3)),
            CardClick::Deselected {
                story: StoryId::new(3)
            }
        );
        assert_eq!(library.delete_button().label, "Delete Selected (1)");
    }

    #[test]
    fn leaving_select_mode_clears_selection() {
        let mut library = library();
        library.toggle_select_mode();
        library.click(StoryId::new(1));
        library.toggle_select_mode();
        library.toggle_select_mode();
        assert_eq!(library.selected().count(), 0);
        assert!(library.delete_request().is_none());
    }

    #[test]
    fn batch_delete_flow() {
        let mut library = library();
        assert!(library.confirm_prompt().is_none());
        library.toggle_select_mode();
        library.click(StoryId::new(3));
        library.click(StoryId::new(1));

        assert_eq!(
            library.confirm_prompt().as_deref(),
            Some("Are you sure you want to delete 2 stories?")
        );
        let request = library.delete_request().unwrap();
        assert_eq!(request.story_ids, vec![StoryId::new(1), StoryId::new(3)]);

        library.deleted(&request.story_ids);
        assert!(!library.is_select_mode());
        assert_eq!(library.stories().len(), 1);
        assert_eq!(library.stories()[0].title, "Sun");
    }

    #[test]
    fn reload_drops_missing_selections() {
        let mut library = library();
        library.toggle_select_mode();
        library.click(StoryId::new(2));
        library.click(StoryId::new(3));
        library.load(vec![summary(2, "Sun")]);
        assert_eq!(library.selected().collect::<Vec<_>>(), vec![StoryId::new(2)]);
    }
}
