//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Encore using Clap
//! derive macros. It provides a type-safe way to parse command-line
//! arguments and route them to the engine.
//!
//! ## Commands
//!
//! - `list`: Display all catalogued tracks with statistics
//! - `pick`: Run one decision round and print the chosen track
//! - `simulate`: Run many playback rounds against a library file
//! - `completions`: Generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! encore list --library ~/music/library.json
//! encore pick --library ~/music/library.json --seed 42
//! encore simulate --library ~/music/library.json --rounds 500
//! ```

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main application arguments structure.
///
/// Uses Clap derive macros to automatically generate argument parsing,
/// help text, and validation. The main structure contains only a subcommand
/// since all functionality is accessed through specific commands.
#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Encore - weighted-random track selection with playback statistics")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
///
/// Each variant corresponds to one operation against a library file. The
/// library is a JSON array of tracks; when no path is given, the file
/// `library.json` in the platform data directory is used.
#[derive(Subcommand)]
pub enum Command {
    /// List all tracks in the library
    ///
    /// Displays every catalogued track with its statistics: rating, score,
    /// play count, skip count and the last-played timestamp.
    List {
        /// Path to the library file (JSON array of tracks)
        #[arg(long, env = "ENCORE_LIBRARY")]
        library: Option<PathBuf>,
    },

    /// Run one decision round and print the chosen track
    ///
    /// Applies the configured filter pipeline to the library, distributes
    /// raffle entries over the remaining candidates and prints the winner.
    /// The library file is not modified.
    Pick {
        /// Path to the library file (JSON array of tracks)
        #[arg(long, env = "ENCORE_LIBRARY")]
        library: Option<PathBuf>,

        /// Seed for the random number generator
        ///
        /// With a fixed seed the same library and configuration always
        /// produce the same pick. Useful for debugging filter settings.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Simulate a listening session
    ///
    /// Runs the given number of playback rounds: each round picks a track,
    /// plays a random fraction of it and records the outcome, so ratings
    /// drift the way they would during real listening. Prints a summary of
    /// the most and least played tracks afterwards.
    Simulate {
        /// Path to the library file (JSON array of tracks)
        #[arg(long, env = "ENCORE_LIBRARY")]
        library: Option<PathBuf>,

        /// Number of playback rounds to simulate
        #[arg(long, default_value = "100")]
        rounds: u32,

        /// Seed for the random number generator
        #[arg(long)]
        seed: Option<u64>,

        /// Run in incognito mode (no statistics are updated)
        #[arg(long)]
        incognito: bool,

        /// Write the updated statistics back to the library file
        #[arg(long)]
        save: bool,
    },

    /// Generate shell completion scripts
    ///
    /// Prints a completion script for the given shell to standard output.
    /// Pipe it to the location your shell expects, e.g.
    /// `encore completions bash > ~/.local/share/bash-completion/completions/encore`.
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
