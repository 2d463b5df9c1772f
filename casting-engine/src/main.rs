use std::path::Path;

use casting_engine::casting::{
    solve, CastingSnapshot, CsvOverrideJournal, MemoryOverrideStore, OverrideState, OverrideStore,
};
use casting_engine::config::CastingConfig;
use casting_engine::display::{print_result, write_result_to_file};
use casting_engine::parser::{load_characters, load_roster};
use casting_engine::web::{self, AppState};

/// Value following `--name` on the command line
fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn usage() {
    println!("usage:");
    println!("  casting-engine solve --roster R.csv --characters C.csv [--overrides J.csv] [--config F.json] [--only id,id] [--out FILE]");
    println!("  casting-engine toggle J.csv <player_id> <character_id>");
    println!("  casting-engine web [port] [--overrides J.csv] [--config F.json]");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = CastingConfig::load(flag(&args, "--config").map(Path::new))?;

    match args.get(1).map(String::as_str) {
        Some("web") => {
            let port = args.get(2)
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8080);
            let password = std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()); // Default password, change this!
            let overrides: Box<dyn OverrideStore> = match flag(&args, "--overrides") {
                Some(path) => Box::new(CsvOverrideJournal::new(path)),
                None => Box::new(MemoryOverrideStore::default()),
            };

            println!("Starting web server on port {}...", port);
            println!("Access the API at http://localhost:{}/api", port);

            web::start_server(port, AppState::new(config, overrides, password)).await?;
        }
        Some("toggle") => {
            let (Some(journal), Some(player_id), Some(character_id)) = (args.get(2), args.get(3), args.get(4)) else {
                usage();
                return Ok(());
            };
            let excluded = CsvOverrideJournal::new(journal).toggle(player_id, character_id)?;
            println!(
                "{} / {} is now {}",
                player_id,
                character_id,
                if excluded { "EXCLUDED" } else { "normal" }
            );
        }
        Some("solve") | None => {
            // Use sample data if available
            let roster_path = flag(&args, "--roster").unwrap_or("data/roster.csv");
            let characters_path = flag(&args, "--characters").unwrap_or("data/characters.csv");
            if !Path::new(roster_path).exists() || !Path::new(characters_path).exists() {
                usage();
                return Ok(());
            }

            println!("Loading roster and characters from CSV...");
            let roster = load_roster(roster_path, config.max_preferences)?;
            let table = load_characters(characters_path)?;
            println!("Loaded {} players and {} characters", roster.players.len(), table.characters.len());

            let overrides = match flag(&args, "--overrides") {
                Some(path) => CsvOverrideJournal::new(path).load()?,
                None => OverrideState::default(),
            };

            let mut snapshot = CastingSnapshot {
                players: roster.players,
                characters: table.characters,
                preferences: roster.preferences,
                overrides,
                fixed: table.fixed,
                avoid_pairs: roster.avoid_pairs,
            };
            if let Some(only) = flag(&args, "--only") {
                let ids: Vec<&str> = only.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
                snapshot.include_only(&ids);
            }

            println!("\n\n=== Running Casting Solver ===");
            let result = solve(&snapshot, &config)?;
            print_result("Casting", &snapshot, &result);

            let out = flag(&args, "--out").unwrap_or("casting_result.txt");
            write_result_to_file("Casting", &snapshot, &result, out)?;
            println!("\nResult saved to {}", out);

            if !result.feasible {
                println!("The assignment is infeasible and must not be committed.");
            }
        }
        Some(_) => usage(),
    }

    Ok(())
}
