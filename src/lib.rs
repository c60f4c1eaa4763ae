//! Decision core of a music player: filtering, weighted-random selection
//! and playback statistics.
//!
//! Core modules:
//! - [`filter`] - Four-stage candidate filter pipeline
//! - [`select`] - Entry distribution and the weighted draw
//! - [`stats`] - Statistics validation and update rules
//! - [`history`] - Bounded playback history lists
//! - [`engine`] - Stateful façade tying the above together
//!
//! ### Supporting Modules
//!
//! - [`track`] - Track model and identifiers
//! - [`library`] - In-memory track store with JSON persistence
//! - [`config`] - Configuration aggregate and data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use encore::config::EngineConfig;
//! use encore::engine::Engine;
//! use encore::library::TrackStore;
//! use encore::track::Track;
//!
//! let mut store = TrackStore::new();
//! let mut track = Track::new("/music/artist/album/song.flac");
//! track.artist = "Test Artist".to_string();
//! track.rating = 80;
//! store.insert(track);
//!
//! let mut engine = Engine::new(EngineConfig::default());
//!
//! // Run one decision round
//! if let Some(id) = engine.next_track(&mut store) {
//!     engine.mark_playing(id);
//!
//!     // ... play the track, then record how much of it was heard
//!     engine.record_played(&mut store, id, 0.95, false);
//! }
//! ```
//!
//! ## How a Track Gets Chosen
//!
//! Every decision round runs two phases:
//!
//! 1. **Filter** - the library is narrowed down in a fixed stage order:
//!    unavailable tracks, tracks by recently played artists, tracks whose
//!    statistics fall outside the configured windows, and finally a share
//!    of the most recently played tracks.
//! 2. **Select** - each remaining candidate receives raffle entries from
//!    its statistics (scaled by 1000 to keep fractional multipliers exact),
//!    counts and elapsed time are squashed onto `0..=100` by saturating
//!    curves, and one entry is drawn uniformly at random.
//!
//! ## Statistics
//!
//! A recorded playback updates up to four statistics, gated by how much of
//! the track was actually heard:
//!
//! - **Score**: play-count-weighted running average of played fractions
//! - **Play count**: incremented when at least 20% was heard
//! - **Skip count**: incremented unless at least 80% was heard
//! - **Last played**: stamped when at least 20% was heard
//!
//! Incognito mode suppresses all four while the history lists keep
//! working, so "what just played" stays correct without leaving a trace.
//!
//! ## Error Handling
//!
//! The pure engine layers (filter, select, stats, history) never fail;
//! invalid values are logged and skipped. Everything that touches the
//! filesystem returns `Result<T, anyhow::Error>` with context attached.

pub mod cli;
pub mod config;
pub mod engine;
pub mod filter;
pub mod history;
pub mod library;
pub mod select;
pub mod stats;
pub mod track;
