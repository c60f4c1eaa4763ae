//! # Encore - Weighted-Random Track Selection
//!
//! Encore is the decision core of a music player: it filters a track
//! library, distributes raffle entries over the remaining candidates and
//! keeps the playback statistics that feed the next round. This binary
//! exposes the engine over a small CLI working against JSON library files.
//!
//! ## Architecture
//!
//! - `cli`: Command-line interface definitions
//! - `filter`: Four-stage candidate filter pipeline
//! - `select`: Entry distribution and the weighted draw
//! - `stats`: Rating, score, play count, skip count and last-played updates
//! - `history`: Bounded playback history lists
//! - `engine`: Stateful façade tying the above together
//! - `library`: In-memory track store with JSON persistence
//! - `config`: Configuration aggregate and data directory management
//!
//! ## Usage
//!
//! ```bash
//! # Show the library with statistics
//! encore list
//!
//! # Run one decision round
//! encore pick
//!
//! # Simulate 500 playback rounds and persist the statistics
//! encore simulate --rounds 500 --save
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::info;
use rand::Rng;

use encore::cli;
use encore::config::{self, EngineConfig};
use encore::engine::{Engine, SystemClock};
use encore::library::TrackStore;
use encore::track::Track;

/// Main entry point for the Encore application.
///
/// Initializes logging, parses command-line arguments, and routes commands
/// to the appropriate module functions. All operations return Results for
/// consistent error handling throughout the application.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug encore pick` - Enable debug logging
/// - `RUST_LOG=encore::filter=debug encore pick` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::List { library } => {
            let store = load_library(library)?;
            list_tracks(&store);
        }
        cli::Command::Pick { library, seed } => {
            let mut store = load_library(library)?;
            let mut engine = build_engine(seed)?;

            match engine.next_track(&mut store) {
                Some(id) => {
                    // next_track only returns ids taken from the store
                    if let Some(track) = store.get(id) {
                        println!("{}", track.uri);
                    }
                }
                None => {
                    println!("No track qualified; check the library and filter settings");
                }
            }
        }
        cli::Command::Simulate { library, rounds, seed, incognito, save } => {
            let path = resolve_library_path(library.clone())?;
            let mut store = load_library(library)?;
            let mut engine = build_engine(seed)?;
            engine.set_incognito(incognito);

            simulate(&mut engine, &mut store, rounds, seed);

            if save {
                store.save(&path)?;
            }
        }
        cli::Command::Completions { shell } => {
            let mut cmd = cli::Args::command();
            clap_complete::generate(shell, &mut cmd, "encore", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn resolve_library_path(library: Option<PathBuf>) -> Result<PathBuf> {
    match library {
        Some(path) => Ok(path),
        None => Ok(config::get_data_dir()?.join("library.json")),
    }
}

fn load_library(library: Option<PathBuf>) -> Result<TrackStore> {
    let path = resolve_library_path(library)?;
    TrackStore::load(&path)
}

fn build_engine(seed: Option<u64>) -> Result<Engine> {
    let config = EngineConfig::load_default()?;

    Ok(match seed {
        Some(seed) => Engine::with_clock_and_seed(config, Box::new(SystemClock), seed),
        None => Engine::new(config),
    })
}

fn list_tracks(store: &TrackStore) {
    println!(
        "{:<40} {:>6} {:>7} {:>6} {:>6} {:>12}",
        "Track", "Rating", "Score", "Plays", "Skips", "Last played"
    );

    for track in store.iter() {
        println!(
            "{:<40} {:>6} {:>7.2} {:>6} {:>6} {:>12}",
            track.name(),
            track.rating,
            track.score,
            track.play_count,
            track.skip_count,
            track.last_played,
        );
    }

    println!("{} tracks", store.len());
}

/// Drives the engine through `rounds` pick-play-record cycles.
///
/// Each round plays a random fraction of the picked track, biased towards
/// completed plays so the statistics drift the way a real session would.
fn simulate(engine: &mut Engine, store: &mut TrackStore, rounds: u32, seed: Option<u64>) {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut played = 0u32;

    for round in 0..rounds {
        let Some(id) = engine.next_track(store) else {
            info!("Round {round}: no track qualified, stopping");
            break;
        };

        engine.mark_playing(id);

        // Two thirds of the plays run to completion
        let fraction: f64 = if rng.gen_bool(2.0 / 3.0) {
            1.0
        } else {
            rng.gen_range(0.0..1.0)
        };

        engine.record_played(store, id, fraction, false);
        played += 1;
    }

    println!("Simulated {played} rounds");

    let mut tracks: Vec<&Track> = store.iter().collect();
    tracks.sort_by_key(|t| std::cmp::Reverse(t.play_count));

    println!("\nMost played:");
    for track in tracks.iter().take(5) {
        println!(
            "  {:<40} plays {:>4} skips {:>4} score {:>6.2}",
            track.name(),
            track.play_count,
            track.skip_count,
            track.score,
        );
    }

    println!("\nLeast played:");
    for track in tracks.iter().rev().take(5) {
        println!(
            "  {:<40} plays {:>4} skips {:>4} score {:>6.2}",
            track.name(),
            track.play_count,
            track.skip_count,
            track.score,
        );
    }
}
