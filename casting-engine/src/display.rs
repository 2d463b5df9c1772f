use std::fs::File;
use std::io::Write;

use crate::casting::{AssignmentResult, CastingSnapshot, CastingWarning};

/// Formats a player as "Name (id)", falling back to the bare id
pub fn format_player_name(snapshot: &CastingSnapshot, player_id: &str) -> String {
    match snapshot.player(player_id) {
        Some(p) if p.name != p.player_id => format!("{} ({})", p.name, p.player_id),
        _ => player_id.to_string(),
    }
}

pub fn format_character_name(snapshot: &CastingSnapshot, character_id: &str) -> String {
    snapshot
        .character(character_id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| character_id.to_string())
}

fn format_warning(warning: &CastingWarning) -> String {
    match warning {
        CastingWarning::MorePlayersThanCharacters { players, characters } => format!(
            "{} players included but only {} characters can be assigned",
            players, characters
        ),
        CastingWarning::DanglingMirror { character_id, mirror_of } => {
            format!("{} mirrors unknown character {}", character_id, mirror_of)
        }
        CastingWarning::DroppedFixed { character_id, player_id, cause } => format!(
            "committed {} -> {} dropped: {}",
            character_id,
            player_id,
            cause.describe()
        ),
    }
}

/// Renders a result as report lines, one character per line in id order
pub fn render_result(snapshot: &CastingSnapshot, result: &AssignmentResult) -> Vec<String> {
    let mut lines = Vec::new();

    if !result.feasible {
        let code = result.reason.map(|r| r.code()).unwrap_or("unknown");
        lines.push(format!("INFEASIBLE: {}", code));
        for player_id in &result.blocked_players {
            lines.push(format!("  blocked: {}", format_player_name(snapshot, player_id)));
        }
    }

    for warning in &result.warnings {
        lines.push(format!("WARNING: {}", format_warning(warning)));
    }

    if !result.feasible {
        return lines;
    }

    for character in &snapshot.characters {
        let id = character.character_id.as_str();
        let holder = result
            .player_for(id)
            .or_else(|| result.mirror_displays.get(id));
        let line = match holder {
            Some(player_id) => {
                let mut line = format!("{} -> {}", character.name, format_player_name(snapshot, player_id));
                if let Some(a) = result.solved.iter().find(|a| a.character_id == id) {
                    line.push_str(&format!(" (choice #{}, cost {})", a.original_rank + 1, a.cost));
                } else if let Some(target) = character.mirror_of.as_deref() {
                    line.push_str(&format!(" (via {})", format_character_name(snapshot, target)));
                }
                line
            }
            None => format!("{} [EMPTY]", character.name),
        };
        lines.push(line);
    }

    lines.push(format!("Total disappointment: {}", result.total_cost));
    for stat in &result.rank_stats {
        lines.push(format!(
            "Choice #{}: {} players ({:.1}%)",
            stat.rank + 1,
            stat.count,
            stat.percentage
        ));
    }
    for pair in &result.avoid_notices {
        lines.push(format!(
            "NOTE: {} and {} were asked to be kept apart",
            format_player_name(snapshot, &pair.first),
            format_player_name(snapshot, &pair.second)
        ));
    }

    lines
}

/// Writes a casting result to a plain-text file
pub fn write_result_to_file(
    title: &str,
    snapshot: &CastingSnapshot,
    result: &AssignmentResult,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(filename)?;

    writeln!(file, "** {} **", title)?;
    for line in render_result(snapshot, result) {
        writeln!(file, "{}", line)?;
    }

    Ok(())
}

/// Prints a casting result in a readable format
pub fn print_result(title: &str, snapshot: &CastingSnapshot, result: &AssignmentResult) {
    println!("\n=== {} ===", title);
    println!(
        "Included players: {}, characters assigned: {}",
        snapshot.players.iter().filter(|p| p.included).count(),
        result.assignments.len()
    );
    for line in render_result(snapshot, result) {
        println!("  {}", line);
    }
}
