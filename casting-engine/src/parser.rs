use csv::{ReaderBuilder, StringRecord};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use log::warn;

use crate::casting::{AvoidPair, Character, Player, PreferenceStore};
use crate::casting::types::{CharacterId, PlayerId};
use crate::error::CastingError;

/// Players, their ranked choices and the avoid-pairs they declared
#[derive(Debug, Clone)]
pub struct Roster {
    pub players: Vec<Player>,
    pub preferences: PreferenceStore,
    pub avoid_pairs: Vec<AvoidPair>,
}

/// Characters plus the assignments already committed to them
#[derive(Debug, Clone)]
pub struct CharacterTable {
    pub characters: Vec<Character>,
    pub fixed: BTreeMap<CharacterId, PlayerId>,
}

/// Parses a boolean value from various string representations
fn parse_bool(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "yes" || lower == "true" || lower == "1"
}

/// Parses a number, returning `default` if empty or invalid
fn parse_number(value: &str, default: u32) -> u32 {
    value.trim().parse().unwrap_or(default)
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Finds a column whose normalized header equals one of `names`
fn column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_lowercase().replace(' ', "_");
        names.contains(&h.as_str())
    })
}

fn field<'r>(record: &'r StringRecord, col: Option<usize>) -> &'r str {
    col.and_then(|c| record.get(c)).unwrap_or("")
}

/// Loads the roster from a CSV file
pub fn load_roster<P: AsRef<Path>>(csv_path: P, max_preferences: usize) -> Result<Roster, CastingError> {
    let file = std::fs::File::open(csv_path)?;
    read_roster(file, max_preferences)
}

/// Reads roster rows: player_id, name, priority, registration_age, payment_age, included,
/// avoid (player ids separated by ';') and any number of choice_* columns in order.
/// A later row for the same player replaces the earlier one.
pub fn read_roster<R: Read>(reader: R, max_preferences: usize) -> Result<Roster, CastingError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let id_col = column(&headers, &["player_id", "player", "id"]);
    let name_col = column(&headers, &["name", "player_name"]);
    let priority_col = column(&headers, &["priority"]);
    let registration_col = column(&headers, &["registration_age", "registered_days"]);
    let payment_col = column(&headers, &["payment_age", "paid_days"]);
    let included_col = column(&headers, &["included", "include"]);
    let avoid_col = column(&headers, &["avoid", "avoid_players"]);
    let choice_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            let h = h.trim().to_lowercase();
            h.starts_with("choice") || h.starts_with("pref")
        })
        .map(|(i, _)| i)
        .collect();

    let mut players: HashMap<PlayerId, Player> = HashMap::new();
    let mut choices: HashMap<PlayerId, Vec<Option<String>>> = HashMap::new();
    let mut avoids: HashMap<PlayerId, Vec<PlayerId>> = HashMap::new();

    for result in reader.records() {
        let record = result?;

        let player_id = field(&record, id_col).trim().to_string();
        if player_id.is_empty() {
            continue; // Skip rows without an id
        }
        let name = optional(field(&record, name_col)).unwrap_or_else(|| player_id.clone());
        let included_raw = field(&record, included_col);

        let player = Player {
            player_id: player_id.clone(),
            name,
            priority: parse_number(field(&record, priority_col), 1),
            registration_age: parse_number(field(&record, registration_col), 1),
            payment_age: parse_number(field(&record, payment_col), 1),
            // a missing column means everyone takes part
            included: included_raw.trim().is_empty() || parse_bool(included_raw),
        };

        if players.insert(player_id.clone(), player).is_some() {
            warn!("player {} appears more than once, keeping the last row", player_id);
        }
        choices.insert(
            player_id.clone(),
            choice_cols.iter().map(|&c| optional(field(&record, Some(c)))).collect(),
        );
        avoids.insert(
            player_id,
            field(&record, avoid_col)
                .split(';')
                .filter_map(optional)
                .collect(),
        );
    }

    let mut preferences = PreferenceStore::new(max_preferences);
    for (player_id, list) in &choices {
        preferences.insert(player_id, list.iter().cloned());
    }

    let mut avoid_pairs: Vec<AvoidPair> = Vec::new();
    for (first, others) in &avoids {
        for second in others {
            let (a, b) = if first <= second { (first, second) } else { (second, first) };
            let pair = AvoidPair { first: a.clone(), second: b.clone() };
            if !avoid_pairs.contains(&pair) {
                avoid_pairs.push(pair);
            }
        }
    }
    avoid_pairs.sort_by(|x, y| (&x.first, &x.second).cmp(&(&y.first, &y.second)));

    let mut players: Vec<Player> = players.into_values().collect();
    players.sort_by(|a, b| a.player_id.cmp(&b.player_id));

    Ok(Roster { players, preferences, avoid_pairs })
}

/// Loads the character table from a CSV file
pub fn load_characters<P: AsRef<Path>>(csv_path: P) -> Result<CharacterTable, CastingError> {
    let file = std::fs::File::open(csv_path)?;
    read_characters(file)
}

/// Reads character rows: character_id, name, taken, mirror_of, assigned_to
pub fn read_characters<R: Read>(reader: R) -> Result<CharacterTable, CastingError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let id_col = column(&headers, &["character_id", "character", "id"]);
    let name_col = column(&headers, &["name", "character_name"]);
    let taken_col = column(&headers, &["taken", "taken_elsewhere"]);
    let mirror_col = column(&headers, &["mirror_of", "mirror"]);
    let assigned_col = column(&headers, &["assigned_to", "assigned_player"]);

    let mut characters: Vec<Character> = Vec::new();
    let mut fixed = BTreeMap::new();
    let mut holders: HashSet<String> = HashSet::new();

    for result in reader.records() {
        let record = result?;

        let character_id = field(&record, id_col).trim().to_string();
        if character_id.is_empty() {
            continue;
        }
        if characters.iter().any(|c| c.character_id == character_id) {
            warn!("character {} listed twice, ignoring the repeat", character_id);
            continue;
        }

        if let Some(holder) = optional(field(&record, assigned_col)) {
            if !holders.insert(holder.clone()) {
                warn!("player {} is assigned to more than one character ({})", holder, character_id);
            }
            fixed.insert(character_id.clone(), holder);
        }
        characters.push(Character {
            name: optional(field(&record, name_col)).unwrap_or_else(|| character_id.clone()),
            taken_elsewhere: parse_bool(field(&record, taken_col)),
            mirror_of: optional(field(&record, mirror_col)),
            character_id,
        });
    }

    Ok(CharacterTable { characters, fixed })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "\
player_id,name,priority,registration_age,payment_age,included,avoid,choice_1,choice_2,choice_3
p1,Alice,2,10,5,yes,p2,hero,villain,
p2,Bob,,,,no,,villain,,sidekick
p3,,1,1,1,,p1;p2,sidekick
,Nobody,1,1,1,yes,,hero
p2,Bob,3,4,4,yes,,sidekick,hero,villain
";

    const CHARACTERS: &str = "\
character_id,name,taken,mirror_of,assigned_to
hero,The Hero,no,,
villain,The Villain,,,p1
sidekick,Sidekick,yes,,
alias,Secret Identity,,hero,
";

    #[test]
    fn test_read_roster() {
        let roster = read_roster(ROSTER.as_bytes(), 5).unwrap();
        assert_eq!(roster.players.len(), 3);

        let p1 = &roster.players[0];
        assert_eq!(p1.name, "Alice");
        assert_eq!((p1.priority, p1.registration_age, p1.payment_age), (2, 10, 5));
        assert!(p1.included);

        // resubmission replaced the first p2 row
        let p2 = &roster.players[1];
        assert_eq!(p2.priority, 3);
        assert!(p2.included);
        let p2_choices: Vec<_> = roster
            .preferences
            .entries_for("p2")
            .iter()
            .map(|e| e.character.as_deref())
            .collect();
        assert_eq!(p2_choices, vec![Some("sidekick"), Some("hero"), Some("villain")]);

        let p3 = &roster.players[2];
        assert_eq!(p3.name, "p3");
        assert!(p3.included);
        let p3_choices = roster.preferences.entries_for("p3");
        assert_eq!(p3_choices[0].character.as_deref(), Some("sidekick"));
        assert_eq!(p3_choices[1].character, None);

        assert_eq!(
            roster.avoid_pairs,
            vec![
                AvoidPair { first: "p1".to_string(), second: "p2".to_string() },
                AvoidPair { first: "p1".to_string(), second: "p3".to_string() },
                AvoidPair { first: "p2".to_string(), second: "p3".to_string() },
            ]
        );
    }

    #[test]
    fn test_read_roster_defaults_metadata() {
        let roster = read_roster("player_id,choice_1\nx,hero\n".as_bytes(), 3).unwrap();
        let x = &roster.players[0];
        assert_eq!((x.priority, x.registration_age, x.payment_age), (1, 1, 1));
        assert!(x.included);
    }

    #[test]
    fn test_read_characters() {
        let table = read_characters(CHARACTERS.as_bytes()).unwrap();
        assert_eq!(table.characters.len(), 4);
        assert!(!table.characters[0].taken_elsewhere);
        assert!(table.characters[2].taken_elsewhere);
        assert_eq!(table.characters[3].mirror_of.as_deref(), Some("hero"));
        assert_eq!(table.fixed.get("villain").map(String::as_str), Some("p1"));
        assert_eq!(table.fixed.len(), 1);
    }

    #[test]
    fn test_read_characters_keeps_repeated_holder() {
        let csv = "character_id,assigned_to\nc1,x\nc2,x\nc3,\n";
        let table = read_characters(csv.as_bytes()).unwrap();
        // both rows survive parsing; the solve pass keeps only the first
        assert_eq!(table.fixed.len(), 2);
        assert_eq!(table.fixed.get("c2").map(String::as_str), Some("x"));
    }
}
