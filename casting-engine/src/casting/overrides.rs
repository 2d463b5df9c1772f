use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use csv::{ReaderBuilder, WriterBuilder};
use log::info;
use serde::{Serialize, Deserialize};

use crate::error::CastingError;
use super::types::{CharacterId, PlayerId};

/// Operator marking for one (player, character) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMark {
    Normal,
    OperatorExcluded,
}

impl OverrideMark {
    pub fn toggled(self) -> Self {
        match self {
            OverrideMark::Normal => OverrideMark::OperatorExcluded,
            OverrideMark::OperatorExcluded => OverrideMark::Normal,
        }
    }
}

/// A recorded toggle, replayable from a cold start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub player_id: PlayerId,
    pub character_id: CharacterId,
}

/// Set of operator-excluded pairs; every pair not in the set is NORMAL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideState {
    excluded: BTreeSet<(PlayerId, CharacterId)>,
}

impl OverrideState {
    pub fn replay<'t, I>(toggles: I) -> Self
    where
        I: IntoIterator<Item = &'t Toggle>,
    {
        let mut state = Self::default();
        for t in toggles {
            state.toggle(&t.player_id, &t.character_id);
        }
        state
    }

    pub fn mark(&self, player_id: &str, character_id: &str) -> OverrideMark {
        if self.is_excluded(player_id, character_id) {
            OverrideMark::OperatorExcluded
        } else {
            OverrideMark::Normal
        }
    }

    pub fn is_excluded(&self, player_id: &str, character_id: &str) -> bool {
        self.excluded
            .contains(&(player_id.to_string(), character_id.to_string()))
    }

    /// Flips the pair and returns the new `excluded` value
    pub fn toggle(&mut self, player_id: &str, character_id: &str) -> bool {
        let key = (player_id.to_string(), character_id.to_string());
        match self.mark(player_id, character_id).toggled() {
            OverrideMark::OperatorExcluded => {
                self.excluded.insert(key);
                true
            }
            OverrideMark::Normal => {
                self.excluded.remove(&key);
                false
            }
        }
    }

    pub fn excluded_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.excluded.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }
}

/// Persistence for operator overrides. `toggle` writes through before returning;
/// `load` must read the latest persisted state, never a cached copy.
pub trait OverrideStore: Send + Sync {
    fn load(&self) -> Result<OverrideState, CastingError>;
    fn toggle(&self, player_id: &str, character_id: &str) -> Result<bool, CastingError>;
}

#[derive(Default)]
pub struct MemoryOverrideStore {
    state: Mutex<OverrideState>,
}

impl MemoryOverrideStore {
    pub fn new(state: OverrideState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl OverrideStore for MemoryOverrideStore {
    fn load(&self) -> Result<OverrideState, CastingError> {
        let state = self.state.lock().map_err(|_| CastingError::LockPoisoned)?;
        Ok(state.clone())
    }

    fn toggle(&self, player_id: &str, character_id: &str) -> Result<bool, CastingError> {
        let mut state = self.state.lock().map_err(|_| CastingError::LockPoisoned)?;
        Ok(state.toggle(player_id, character_id))
    }
}

/// Journal row: seq,timestamp,player_id,character_id,excluded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub seq: u64,
    pub timestamp: String,
    pub player_id: PlayerId,
    pub character_id: CharacterId,
    pub excluded: bool,
}

/// Append-only CSV journal of toggles; the state is the replay of every row
pub struct CsvOverrideJournal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvOverrideJournal {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> Result<Vec<JournalRecord>, CastingError> {
        let _guard = self.lock.lock().map_err(|_| CastingError::LockPoisoned)?;
        self.read_records()
    }

    fn read_records(&self) -> Result<Vec<JournalRecord>, CastingError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize::<JournalRecord>() {
            records.push(row?);
        }
        Ok(records)
    }
}

impl OverrideStore for CsvOverrideJournal {
    fn load(&self) -> Result<OverrideState, CastingError> {
        let toggles: Vec<Toggle> = self
            .records()?
            .into_iter()
            .map(|r| Toggle {
                player_id: r.player_id,
                character_id: r.character_id,
            })
            .collect();
        Ok(OverrideState::replay(&toggles))
    }

    fn toggle(&self, player_id: &str, character_id: &str) -> Result<bool, CastingError> {
        let _guard = self.lock.lock().map_err(|_| CastingError::LockPoisoned)?;
        let records = self.read_records()?;
        let toggles: Vec<Toggle> = records
            .iter()
            .map(|r| Toggle {
                player_id: r.player_id.clone(),
                character_id: r.character_id.clone(),
            })
            .collect();
        let excluded = OverrideState::replay(&toggles).toggle(player_id, character_id);

        let file_exists = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut wtr = WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);
        wtr.serialize(JournalRecord {
            seq: records.last().map(|r| r.seq + 1).unwrap_or(1),
            timestamp: Utc::now().to_rfc3339(),
            player_id: player_id.to_string(),
            character_id: character_id.to_string(),
            excluded,
        })?;
        wtr.flush()?;

        info!(
            "override ({}, {}) -> {}",
            player_id,
            character_id,
            if excluded { "excluded" } else { "normal" }
        );
        Ok(excluded)
    }
}
