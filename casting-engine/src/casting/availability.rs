use std::collections::{BTreeMap, HashMap, HashSet};

use log::warn;

use super::overrides::OverrideState;
use super::types::{Character, CharacterId, Classification, PlayerId, PreferenceEntry};

/// Classifies preference entries against one run's character snapshot
pub struct AvailabilityResolver<'a> {
    characters: HashMap<&'a str, &'a Character>,
    taken: HashSet<&'a str>,
    overrides: &'a OverrideState,
}

impl<'a> AvailabilityResolver<'a> {
    /// `fixed` holds committed assignments; those held by players outside `included` count as taken.
    pub fn new(
        characters: &'a [Character],
        fixed: &'a BTreeMap<CharacterId, PlayerId>,
        included: &HashSet<&str>,
        overrides: &'a OverrideState,
    ) -> Self {
        let mut taken: HashSet<&'a str> = characters
            .iter()
            .filter(|c| c.taken_elsewhere)
            .map(|c| c.character_id.as_str())
            .collect();

        for (character_id, holder) in fixed {
            if !included.contains(holder.as_str()) {
                taken.insert(character_id.as_str());
            }
        }

        Self {
            characters: characters
                .iter()
                .map(|c| (c.character_id.as_str(), c))
                .collect(),
            taken,
            overrides,
        }
    }

    /// Classifies a single entry; references to unknown characters are EMPTY.
    pub fn classify(&self, player_id: &str, entry: &PreferenceEntry) -> Classification {
        let Some(character_id) = entry.character.as_deref() else {
            return Classification::Empty;
        };
        let Some(character) = self.characters.get(character_id) else {
            warn!(
                "player {} rank {} references unknown character {}",
                player_id, entry.rank, character_id
            );
            return Classification::Empty;
        };

        if character.mirror_of.is_some() {
            Classification::MirrorTarget
        } else if self.taken.contains(character_id) {
            Classification::Taken
        } else if self.overrides.is_excluded(player_id, character_id) {
            Classification::OperatorExcluded
        } else {
            Classification::Available
        }
    }

    /// Classifies a whole list. A character repeated later in the same list is EMPTY
    /// so each (player, character) pair is offered at most once, at its best rank.
    pub fn classify_list(&self, player_id: &str, entries: &[PreferenceEntry]) -> Vec<Classification> {
        let mut seen: HashSet<&str> = HashSet::new();
        entries
            .iter()
            .map(|entry| match entry.character.as_deref() {
                Some(c) if !seen.insert(c) => Classification::Empty,
                _ => self.classify(player_id, entry),
            })
            .collect()
    }

    /// Characters any player could be given this run: known, not mirrored, not taken.
    pub fn assignable_characters(&self) -> Vec<&'a str> {
        let mut ids: Vec<&'a str> = self
            .characters
            .values()
            .filter(|c| c.mirror_of.is_none() && !self.taken.contains(c.character_id.as_str()))
            .map(|c| c.character_id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(id: &str, taken: bool, mirror_of: Option<&str>) -> Character {
        Character {
            character_id: id.to_string(),
            name: id.to_uppercase(),
            taken_elsewhere: taken,
            mirror_of: mirror_of.map(str::to_string),
        }
    }

    fn entry(rank: usize, character: Option<&str>) -> PreferenceEntry {
        PreferenceEntry {
            rank,
            character: character.map(str::to_string),
        }
    }

    fn cast() -> Vec<Character> {
        vec![
            character("free", false, None),
            character("booked", true, None),
            character("alias", false, Some("free")),
            character("held", false, None),
        ]
    }

    #[test]
    fn test_classification_table() {
        let characters = cast();
        let mut fixed = BTreeMap::new();
        fixed.insert("held".to_string(), "outsider".to_string());
        let mut overrides = OverrideState::default();
        overrides.toggle("p1", "free");
        let included: HashSet<&str> = ["p1", "p2"].into_iter().collect();
        let resolver = AvailabilityResolver::new(&characters, &fixed, &included, &overrides);

        assert_eq!(resolver.classify("p1", &entry(0, None)), Classification::Empty);
        assert_eq!(resolver.classify("p1", &entry(0, Some("nobody"))), Classification::Empty);
        assert_eq!(resolver.classify("p1", &entry(0, Some("alias"))), Classification::MirrorTarget);
        assert_eq!(resolver.classify("p1", &entry(0, Some("booked"))), Classification::Taken);
        assert_eq!(resolver.classify("p1", &entry(0, Some("held"))), Classification::Taken);
        assert_eq!(resolver.classify("p1", &entry(0, Some("free"))), Classification::OperatorExcluded);
        assert_eq!(resolver.classify("p2", &entry(0, Some("free"))), Classification::Available);
    }

    #[test]
    fn test_fixed_assignment_of_included_player_is_released() {
        let characters = cast();
        let mut fixed = BTreeMap::new();
        fixed.insert("held".to_string(), "p1".to_string());
        let overrides = OverrideState::default();
        let included: HashSet<&str> = ["p1"].into_iter().collect();
        let resolver = AvailabilityResolver::new(&characters, &fixed, &included, &overrides);

        assert_eq!(resolver.classify("p1", &entry(0, Some("held"))), Classification::Available);
    }

    #[test]
    fn test_taken_wins_over_operator_exclusion() {
        let characters = cast();
        let fixed = BTreeMap::new();
        let mut overrides = OverrideState::default();
        overrides.toggle("p1", "booked");
        let included = HashSet::new();
        let resolver = AvailabilityResolver::new(&characters, &fixed, &included, &overrides);

        assert_eq!(resolver.classify("p1", &entry(0, Some("booked"))), Classification::Taken);
    }

    #[test]
    fn test_repeated_character_only_counts_once() {
        let characters = cast();
        let fixed = BTreeMap::new();
        let overrides = OverrideState::default();
        let included = HashSet::new();
        let resolver = AvailabilityResolver::new(&characters, &fixed, &included, &overrides);

        let list = vec![entry(0, Some("free")), entry(1, Some("held")), entry(2, Some("free"))];
        assert_eq!(
            resolver.classify_list("p1", &list),
            vec![Classification::Available, Classification::Available, Classification::Empty]
        );
    }

    #[test]
    fn test_assignable_characters_skip_mirrors_and_taken() {
        let characters = cast();
        let fixed = BTreeMap::new();
        let overrides = OverrideState::default();
        let included = HashSet::new();
        let resolver = AvailabilityResolver::new(&characters, &fixed, &included, &overrides);

        assert_eq!(resolver.assignable_characters(), vec!["free", "held"]);
    }
}
