pub mod types;
pub mod preferences;
pub mod availability;
pub mod compaction;
pub mod disappointment;
pub mod solver;
pub mod overrides;
pub mod run;

/// Upper bound on K; the score table has one tier per usable rank below it
pub const MAX_PREFERENCES: usize = 16;

/// Shared compacted rank of every unusable entry, one tier above the usable table
pub const UNUSABLE_RANK: usize = MAX_PREFERENCES;

pub use types::{
    Assignment, AssignmentResult, AvoidPair, CandidatePair, Character, CastingWarning,
    Classification, FixedIssue, InfeasibleReason, Player, PreferenceEntry, RankStat,
};
pub use preferences::PreferenceStore;
pub use overrides::{CsvOverrideJournal, MemoryOverrideStore, OverrideState, OverrideStore, Toggle};
pub use run::{solve, CastingSnapshot};
