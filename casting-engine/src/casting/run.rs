use std::collections::{BTreeMap, HashMap, HashSet};

use log::{info, warn};
use serde::{Serialize, Deserialize};

use crate::config::CastingConfig;
use crate::error::CastingError;
use super::availability::AvailabilityResolver;
use super::compaction::compact_ranks;
use super::disappointment::cost;
use super::overrides::OverrideState;
use super::preferences::PreferenceStore;
use super::solver::{solve_assignment, SolveOutcome};
use super::types::{
    Assignment, AssignmentResult, AvoidPair, CandidatePair, CastingWarning, Character, CharacterId,
    FixedIssue, InfeasibleReason, Player, PlayerId, RankStat, RankedEntry,
};

/// Everything one solve pass reads; never mutated while solving
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CastingSnapshot {
    pub players: Vec<Player>,
    pub characters: Vec<Character>,
    pub preferences: PreferenceStore,
    pub overrides: OverrideState,
    /// Committed assignments from earlier runs (character -> player)
    pub fixed: BTreeMap<CharacterId, PlayerId>,
    pub avoid_pairs: Vec<AvoidPair>,
}

impl CastingSnapshot {
    /// Restricts the next pass to the given players
    pub fn include_only(&mut self, player_ids: &[&str]) {
        for player in &mut self.players {
            player.included = player_ids.contains(&player.player_id.as_str());
        }
    }

    /// Folds a feasible result into the committed assignments
    pub fn commit(&mut self, result: &AssignmentResult) -> Result<(), CastingError> {
        if !result.feasible {
            let code = result.reason.map(|r| r.code()).unwrap_or("unknown");
            return Err(CastingError::InfeasibleCommit(code.to_string()));
        }
        self.fixed = result.assignments.clone();
        Ok(())
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn character(&self, character_id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.character_id == character_id)
    }
}

/// Candidate pairs for one player's compacted list; entries without a character yield none
pub fn candidate_pairs(player: &Player, ranked: &[RankedEntry], config: &CastingConfig) -> Vec<CandidatePair> {
    ranked
        .iter()
        .filter_map(|entry| {
            let character_id = entry.character.clone()?;
            Some(CandidatePair {
                player_id: player.player_id.clone(),
                character_id,
                original_rank: entry.rank,
                compacted_rank: entry.compacted_rank,
                cost: cost(entry.compacted_rank, player, config),
                usable: entry.classification.is_usable(),
            })
        })
        .collect()
}

/// Runs one solve pass over the included players of `snapshot`.
///
/// Only configuration problems and cost overflow are errors; an unsatisfiable run comes
/// back as `feasible == false` with an empty assignment map.
pub fn solve(snapshot: &CastingSnapshot, config: &CastingConfig) -> Result<AssignmentResult, CastingError> {
    config.validate()?;

    let included: BTreeMap<&str, &Player> = snapshot
        .players
        .iter()
        .filter(|p| p.included)
        .map(|p| (p.player_id.as_str(), p))
        .collect();
    let included_ids: HashSet<&str> = included.keys().copied().collect();

    let mut warnings = dangling_mirrors(&snapshot.characters);
    let (fixed, dropped) = carried_fixed(&snapshot.characters, &snapshot.fixed);
    warnings.extend(dropped);

    let resolver = AvailabilityResolver::new(
        &snapshot.characters,
        &fixed,
        &included_ids,
        &snapshot.overrides,
    );

    let assignable = resolver.assignable_characters();
    if included.len() > assignable.len() {
        warn!(
            "{} included players but only {} assignable characters",
            included.len(),
            assignable.len()
        );
        warnings.push(CastingWarning::MorePlayersThanCharacters {
            players: included.len(),
            characters: assignable.len(),
        });
        let mut result = AssignmentResult::infeasible(InfeasibleReason::InsufficientCharacters, Vec::new());
        result.warnings = warnings;
        return Ok(result);
    }

    let mut offered: Vec<CandidatePair> = Vec::new();
    for (player_id, player) in &included {
        let entries = snapshot.preferences.entries_for(player_id);
        let entries = &entries[..entries.len().min(config.max_preferences)];
        let classifications = resolver.classify_list(player_id, entries);
        let ranked = compact_ranks(entries, &classifications);
        offered.extend(
            candidate_pairs(player, &ranked, config)
                .into_iter()
                .filter(|pair| pair.usable),
        );
    }

    let player_ids: Vec<&str> = included.keys().copied().collect();
    let outcome = solve_assignment(&player_ids, &assignable, &offered, config.solver_budget)?;

    let (chosen, total_cost) = match outcome {
        SolveOutcome::Solved { chosen, total_cost } => (chosen, total_cost),
        SolveOutcome::Infeasible { reason, players } => {
            warn!(
                "solve infeasible ({}) for {} included players, blocked: {:?}",
                reason.code(),
                included.len(),
                players
            );
            let mut result = AssignmentResult::infeasible(reason, players);
            result.warnings = warnings;
            return Ok(result);
        }
    };

    let solved: Vec<Assignment> = chosen
        .into_iter()
        .map(|idx| {
            let pair = &offered[idx];
            Assignment {
                character_id: pair.character_id.clone(),
                player_id: pair.player_id.clone(),
                original_rank: pair.original_rank,
                compacted_rank: pair.compacted_rank,
                cost: pair.cost,
            }
        })
        .collect();

    let mut assignments: BTreeMap<CharacterId, PlayerId> = fixed
        .iter()
        .filter(|(_, holder)| !included_ids.contains(holder.as_str()))
        .map(|(c, p)| (c.clone(), p.clone()))
        .collect();
    for a in &solved {
        assignments.insert(a.character_id.clone(), a.player_id.clone());
    }

    let rank_stats = rank_statistics(&solved, included.len(), config.max_preferences);
    let mirror_displays = mirror_displays(&snapshot.characters, &assignments);
    let avoid_notices = avoid_notices(&snapshot.avoid_pairs, &assignments);

    info!(
        "solved {} players (total disappointment {}, {} carried over)",
        solved.len(),
        total_cost,
        assignments.len() - solved.len()
    );

    Ok(AssignmentResult {
        feasible: true,
        reason: None,
        blocked_players: Vec::new(),
        assignments,
        solved,
        total_cost,
        rank_stats,
        mirror_displays,
        warnings,
        avoid_notices,
    })
}

fn dangling_mirrors(characters: &[Character]) -> Vec<CastingWarning> {
    let known: HashSet<&str> = characters.iter().map(|c| c.character_id.as_str()).collect();
    characters
        .iter()
        .filter_map(|c| {
            let target = c.mirror_of.as_deref()?;
            if known.contains(target) {
                return None;
            }
            warn!("character {} mirrors unknown character {}", c.character_id, target);
            Some(CastingWarning::DanglingMirror {
                character_id: c.character_id.clone(),
                mirror_of: target.to_string(),
            })
        })
        .collect()
}

/// Committed assignments that may be carried into a run: known, non-mirror characters,
/// at most one per player (the first in character order). The rest come back as warnings.
fn carried_fixed(
    characters: &[Character],
    fixed: &BTreeMap<CharacterId, PlayerId>,
) -> (BTreeMap<CharacterId, PlayerId>, Vec<CastingWarning>) {
    let known: HashMap<&str, &Character> = characters
        .iter()
        .map(|c| (c.character_id.as_str(), c))
        .collect();
    let mut holders: HashSet<&str> = HashSet::new();
    let mut kept = BTreeMap::new();
    let mut warnings = Vec::new();

    for (character_id, player_id) in fixed {
        let cause = match known.get(character_id.as_str()) {
            None => Some(FixedIssue::UnknownCharacter),
            Some(c) if c.mirror_of.is_some() => Some(FixedIssue::MirrorCharacter),
            Some(_) if !holders.insert(player_id.as_str()) => Some(FixedIssue::HolderAlreadyCast),
            Some(_) => None,
        };
        match cause {
            Some(cause) => {
                warn!(
                    "dropping committed {} -> {}: {}",
                    character_id,
                    player_id,
                    cause.describe()
                );
                warnings.push(CastingWarning::DroppedFixed {
                    character_id: character_id.clone(),
                    player_id: player_id.clone(),
                    cause,
                });
            }
            None => {
                kept.insert(character_id.clone(), player_id.clone());
            }
        }
    }
    (kept, warnings)
}

/// Count and share of included players per original rank `0..ranks`
fn rank_statistics(solved: &[Assignment], included: usize, ranks: usize) -> Vec<RankStat> {
    (0..ranks)
        .map(|rank| {
            let count = solved.iter().filter(|a| a.original_rank == rank).count();
            let percentage = if included == 0 {
                0.0
            } else {
                count as f64 * 100.0 / included as f64
            };
            RankStat { rank, count, percentage }
        })
        .collect()
}

/// Mirror character -> the player holding the character it follows
fn mirror_displays(
    characters: &[Character],
    assignments: &BTreeMap<CharacterId, PlayerId>,
) -> BTreeMap<CharacterId, PlayerId> {
    characters
        .iter()
        .filter_map(|c| {
            let holder = assignments.get(c.mirror_of.as_deref()?)?;
            Some((c.character_id.clone(), holder.clone()))
        })
        .collect()
}

fn avoid_notices(pairs: &[AvoidPair], assignments: &BTreeMap<CharacterId, PlayerId>) -> Vec<AvoidPair> {
    let cast: HashSet<&str> = assignments.values().map(String::as_str).collect();
    pairs
        .iter()
        .filter(|pair| cast.contains(pair.first.as_str()) && cast.contains(pair.second.as_str()))
        .cloned()
        .collect()
}
