//! In-memory track store backing the CLI and the engine.
//!
//! Canonical track ownership lives here; everything else works with
//! [`TrackId`] handles or short-lived `&Track` borrows. The real library of
//! a player frontend would sit behind the same interface.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::track::{Track, TrackId};

/// Owns every track and indexes them by id.
#[derive(Debug, Default)]
pub struct TrackStore {
    tracks: Vec<Track>,
    index: HashMap<TrackId, usize>,
}

impl TrackStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a track, replacing an existing one with the same id.
    pub fn insert(&mut self, track: Track) {
        let id = track.id();

        if let Some(&pos) = self.index.get(&id) {
            debug!("Replacing track {id} ({})", track.name());
            self.tracks[pos] = track;
        } else {
            self.index.insert(id, self.tracks.len());
            self.tracks.push(track);
        }
    }

    #[must_use]
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.index.get(&id).map(|&pos| &self.tracks[pos])
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.index.get(&id).map(|&pos| &mut self.tracks[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Loads a library from a JSON file (an array of tracks).
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read library file {}", path.display()))?;

        let tracks: Vec<Track> = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse library file {}", path.display()))?;

        let mut store = Self::new();
        for track in tracks {
            store.insert(track);
        }

        info!("Loaded {} tracks from {}", store.len(), path.display());
        Ok(store)
    }

    /// Saves the library as a JSON array.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.tracks)
            .context("Failed to serialize the library")?;

        fs::write(path, data)
            .with_context(|| format!("Failed to write library file {}", path.display()))?;

        info!("Saved {} tracks to {}", self.len(), path.display());
        Ok(())
    }
}
