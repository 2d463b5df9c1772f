use std::collections::BTreeMap;

use log::warn;
use serde::{Serialize, Deserialize};

use super::types::{PlayerId, PreferenceEntry};
use super::MAX_PREFERENCES;

/// Ranked character choices per player, capped at K entries each
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceStore {
    max_preferences: usize,
    entries: BTreeMap<PlayerId, Vec<PreferenceEntry>>,
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new(MAX_PREFERENCES)
    }
}

impl PreferenceStore {
    pub fn new(max_preferences: usize) -> Self {
        Self {
            max_preferences,
            entries: BTreeMap::new(),
        }
    }

    pub fn max_preferences(&self) -> usize {
        self.max_preferences
    }

    /// Records a player's list in submission order, replacing any earlier one.
    /// Blank references become empty entries; anything past K is dropped.
    pub fn insert<I, S>(&mut self, player_id: &str, choices: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let mut list: Vec<PreferenceEntry> = choices
            .into_iter()
            .enumerate()
            .map(|(rank, choice)| PreferenceEntry {
                rank,
                character: choice
                    .map(|c| c.as_ref().trim().to_string())
                    .filter(|c| !c.is_empty()),
            })
            .collect();

        if list.len() > self.max_preferences {
            warn!(
                "player {} submitted {} preferences, keeping the first {}",
                player_id,
                list.len(),
                self.max_preferences
            );
            list.truncate(self.max_preferences);
        }

        self.entries.insert(player_id.to_string(), list);
    }

    pub fn entries_for(&self, player_id: &str) -> &[PreferenceEntry] {
        self.entries
            .get(player_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
