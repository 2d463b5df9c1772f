use std::collections::{HashMap, HashSet};

use log::debug;
use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;

use crate::error::CastingError;
use super::types::{CandidatePair, InfeasibleReason, PlayerId};

/// Outcome of the assignment solve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Indices into the candidate slice, one per player
    Solved { chosen: Vec<usize>, total_cost: u64 },
    Infeasible { reason: InfeasibleReason, players: Vec<PlayerId> },
}

/// Minimum-cost assignment of every player to exactly one character, at most one player
/// per character, using only usable candidate pairs.
///
/// Kuhn-Munkres runs on a dense players x characters matrix. Cells without a usable pair
/// carry a cost above the sum of all usable costs, so an optimum that still picks one of
/// them proves no all-usable assignment exists.
pub fn solve_assignment(
    players: &[&str],
    characters: &[&str],
    candidates: &[CandidatePair],
    budget: Option<usize>,
) -> Result<SolveOutcome, CastingError> {
    if players.is_empty() {
        return Ok(SolveOutcome::Solved { chosen: Vec::new(), total_cost: 0 });
    }
    if players.len() > characters.len() {
        return Ok(SolveOutcome::Infeasible {
            reason: InfeasibleReason::InsufficientCharacters,
            players: Vec::new(),
        });
    }

    let row_of: HashMap<&str, usize> = players.iter().enumerate().map(|(i, p)| (*p, i)).collect();
    let col_of: HashMap<&str, usize> = characters.iter().enumerate().map(|(i, c)| (*c, i)).collect();

    // (row, col) -> candidate index; the cheapest pair wins if a pair repeats
    let mut cells: HashMap<(usize, usize), usize> = HashMap::new();
    for (idx, pair) in candidates.iter().enumerate() {
        if !pair.usable {
            continue;
        }
        let (Some(&row), Some(&col)) = (
            row_of.get(pair.player_id.as_str()),
            col_of.get(pair.character_id.as_str()),
        ) else {
            continue;
        };
        cells
            .entry((row, col))
            .and_modify(|existing| {
                if pair.cost < candidates[*existing].cost {
                    *existing = idx;
                }
            })
            .or_insert(idx);
    }

    let rows_with_choices: HashSet<usize> = cells.keys().map(|(row, _)| *row).collect();
    let exhausted: Vec<PlayerId> = players
        .iter()
        .enumerate()
        .filter(|(row, _)| !rows_with_choices.contains(row))
        .map(|(_, p)| p.to_string())
        .collect();
    if !exhausted.is_empty() {
        return Ok(SolveOutcome::Infeasible {
            reason: InfeasibleReason::PlayerExhaustedChoices,
            players: exhausted,
        });
    }

    let size = players.len().saturating_mul(characters.len());
    if let Some(limit) = budget {
        if size > limit {
            debug!("cost matrix of {} cells exceeds budget {}", size, limit);
            return Ok(SolveOutcome::Infeasible {
                reason: InfeasibleReason::SolverTimeout,
                players: Vec::new(),
            });
        }
    }

    let forbidden = forbidden_cost(cells.values().map(|&idx| candidates[idx].cost), players.len())?;
    let mut weights = Matrix::new(players.len(), characters.len(), forbidden);
    for (&(row, col), &idx) in &cells {
        weights[(row, col)] = candidates[idx].cost as i64;
    }

    let (_, columns) = kuhn_munkres_min(&weights);

    let mut chosen = Vec::with_capacity(players.len());
    let mut stranded = Vec::new();
    for (row, col) in columns.into_iter().enumerate() {
        match cells.get(&(row, col)) {
            Some(&idx) => chosen.push(idx),
            None => stranded.push(players[row].to_string()),
        }
    }
    if !stranded.is_empty() {
        return Ok(SolveOutcome::Infeasible {
            reason: InfeasibleReason::PlayerExhaustedChoices,
            players: stranded,
        });
    }

    let total_cost = chosen.iter().map(|&idx| candidates[idx].cost).sum();
    Ok(SolveOutcome::Solved { chosen, total_cost })
}

/// One more than the sum of every usable cost, checked so that a full row of forbidden
/// cells still fits in the solver's integer type.
fn forbidden_cost<I: Iterator<Item = u64>>(costs: I, rows: usize) -> Result<i64, CastingError> {
    let mut sum: i64 = 0;
    for cost in costs {
        let cost = i64::try_from(cost).map_err(|_| CastingError::CostOverflow)?;
        sum = sum.checked_add(cost).ok_or(CastingError::CostOverflow)?;
    }
    let forbidden = sum.checked_add(1).ok_or(CastingError::CostOverflow)?;
    let rows = i64::try_from(rows).map_err(|_| CastingError::CostOverflow)?;
    // worst-case row total: every cell forbidden
    let _headroom = forbidden
        .checked_mul(rows.saturating_add(1))
        .ok_or(CastingError::CostOverflow)?;
    Ok(forbidden)
}
