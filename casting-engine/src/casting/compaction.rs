use super::types::{Classification, PreferenceEntry, RankedEntry};
use super::UNUSABLE_RANK;

/// Re-ranks a player's list over usable entries only, keeping their original order.
/// The first usable entry is always rank 0; every unusable entry gets `UNUSABLE_RANK`.
pub fn compact_ranks(entries: &[PreferenceEntry], classifications: &[Classification]) -> Vec<RankedEntry> {
    let mut next_rank = 0;
    entries
        .iter()
        .zip(classifications)
        .map(|(entry, &classification)| {
            let compacted_rank = if classification.is_usable() {
                next_rank += 1;
                next_rank - 1
            } else {
                UNUSABLE_RANK
            };
            RankedEntry {
                rank: entry.rank,
                character: entry.character.clone(),
                classification,
                compacted_rank,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Classification::*;

    fn entries(ids: &[&str]) -> Vec<PreferenceEntry> {
        ids.iter()
            .enumerate()
            .map(|(rank, id)| PreferenceEntry {
                rank,
                character: Some(id.to_string()),
            })
            .collect()
    }

    fn ranks(ranked: &[RankedEntry]) -> Vec<usize> {
        ranked.iter().map(|r| r.compacted_rank).collect()
    }

    #[test]
    fn test_all_available_keeps_order() {
        let ranked = compact_ranks(&entries(&["a", "b", "c"]), &[Available, Available, Available]);
        assert_eq!(ranks(&ranked), vec![0, 1, 2]);
    }

    #[test]
    fn test_skips_leading_taken_entry() {
        let ranked = compact_ranks(&entries(&["t", "x", "y"]), &[Taken, Available, Available]);
        assert_eq!(ranks(&ranked), vec![UNUSABLE_RANK, 0, 1]);
        assert_eq!(ranked[1].character.as_deref(), Some("x"));
        assert_eq!(ranked[1].rank, 1);
    }

    #[test]
    fn test_every_unusable_kind_shares_sentinel() {
        let ranked = compact_ranks(
            &entries(&["a", "b", "c", "d", "e"]),
            &[Empty, MirrorTarget, Available, OperatorExcluded, Taken],
        );
        assert_eq!(
            ranks(&ranked),
            vec![UNUSABLE_RANK, UNUSABLE_RANK, 0, UNUSABLE_RANK, UNUSABLE_RANK]
        );
    }

    #[test]
    fn test_gaps_in_the_middle() {
        let ranked = compact_ranks(
            &entries(&["a", "b", "c", "d"]),
            &[Available, OperatorExcluded, Empty, Available],
        );
        assert_eq!(ranks(&ranked), vec![0, UNUSABLE_RANK, UNUSABLE_RANK, 1]);
    }
}
