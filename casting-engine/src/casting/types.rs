use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

pub type PlayerId = String;
pub type CharacterId = String;

/// A registered player and the metadata that weights their disappointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub name: String,
    pub priority: u32,
    pub registration_age: u32, // days since registration
    pub payment_age: u32,      // days since payment
    pub included: bool,
}

/// A castable character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub character_id: CharacterId,
    pub name: String,
    pub taken_elsewhere: bool,
    /// Character whose assignment this one follows; never assigned directly
    pub mirror_of: Option<CharacterId>,
}

/// One position in a player's ranked list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub rank: usize,
    pub character: Option<CharacterId>,
}

/// Why an entry can or cannot be offered to the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Empty,
    MirrorTarget,
    Taken,
    OperatorExcluded,
    Available,
}

impl Classification {
    pub fn is_usable(self) -> bool {
        self == Classification::Available
    }
}

/// A preference entry after classification and rank compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub rank: usize,
    pub character: Option<CharacterId>,
    pub classification: Classification,
    pub compacted_rank: usize,
}

/// A (player, character) pair offered to the solver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidatePair {
    pub player_id: PlayerId,
    pub character_id: CharacterId,
    pub original_rank: usize,
    pub compacted_rank: usize,
    pub cost: u64,
    pub usable: bool,
}

/// A pair chosen by the solver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub character_id: CharacterId,
    pub player_id: PlayerId,
    pub original_rank: usize,
    pub compacted_rank: usize,
    pub cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibleReason {
    InsufficientCharacters,
    PlayerExhaustedChoices,
    SolverTimeout,
}

impl InfeasibleReason {
    pub fn code(self) -> &'static str {
        match self {
            InfeasibleReason::InsufficientCharacters => "insufficient_characters",
            InfeasibleReason::PlayerExhaustedChoices => "player_exhausted_choices",
            InfeasibleReason::SolverTimeout => "solver_timeout",
        }
    }
}

/// How many included players received a given original preference rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankStat {
    pub rank: usize,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CastingWarning {
    /// More included players than assignable characters
    MorePlayersThanCharacters { players: usize, characters: usize },
    /// A mirror points at a character that does not exist
    DanglingMirror { character_id: CharacterId, mirror_of: CharacterId },
    /// A committed assignment that cannot be carried into the run
    DroppedFixed { character_id: CharacterId, player_id: PlayerId, cause: FixedIssue },
}

/// Why a committed assignment was dropped before solving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedIssue {
    UnknownCharacter,
    MirrorCharacter,
    HolderAlreadyCast,
}

impl FixedIssue {
    pub fn describe(self) -> &'static str {
        match self {
            FixedIssue::UnknownCharacter => "character does not exist",
            FixedIssue::MirrorCharacter => "character is a mirror",
            FixedIssue::HolderAlreadyCast => "player already holds another character",
        }
    }
}

/// Two players who should not be cast together; reported, never enforced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvoidPair {
    pub first: PlayerId,
    pub second: PlayerId,
}

/// Result of one solve pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub feasible: bool,
    pub reason: Option<InfeasibleReason>,
    /// Players implicated by `reason`
    pub blocked_players: Vec<PlayerId>,
    /// Final map, carried-over assignments included; empty when infeasible
    pub assignments: BTreeMap<CharacterId, PlayerId>,
    /// Pairs chosen in this pass
    pub solved: Vec<Assignment>,
    pub total_cost: u64,
    pub rank_stats: Vec<RankStat>,
    /// Mirror character -> player shown through its mirrored character
    pub mirror_displays: BTreeMap<CharacterId, PlayerId>,
    pub warnings: Vec<CastingWarning>,
    pub avoid_notices: Vec<AvoidPair>,
}

impl AssignmentResult {
    pub(crate) fn infeasible(reason: InfeasibleReason, blocked_players: Vec<PlayerId>) -> Self {
        Self {
            feasible: false,
            reason: Some(reason),
            blocked_players,
            ..Self::default()
        }
    }

    pub fn player_for(&self, character_id: &str) -> Option<&PlayerId> {
        self.assignments.get(character_id)
    }

    pub fn character_for(&self, player_id: &str) -> Option<&CharacterId> {
        self.assignments
            .iter()
            .find(|(_, p)| p.as_str() == player_id)
            .map(|(c, _)| c)
    }
}
