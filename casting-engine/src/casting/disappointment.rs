use crate::config::CastingConfig;
use super::types::Player;
use super::UNUSABLE_RANK;

/// Base score for a compacted rank: doubles per rank, `UNUSABLE_RANK` is the top tier.
pub fn base_score(compacted_rank: usize) -> u64 {
    1u64 << compacted_rank.min(UNUSABLE_RANK)
}

/// Disappointment cost of giving `player` their choice at `compacted_rank`:
/// base * (registration_age * w_reg / norm) * (payment_age * w_pay / norm) * priority, floored.
pub fn cost(compacted_rank: usize, player: &Player, config: &CastingConfig) -> u64 {
    let registration = player.registration_age as f64 * config.registration_weight / config.normalization;
    let payment = player.payment_age as f64 * config.payment_weight / config.normalization;
    let raw = base_score(compacted_rank) as f64 * registration * payment * player.priority as f64;
    // saturating float-to-int cast; config validation keeps `raw` non-negative
    raw.floor() as u64
}
