//! Playback history: the bounded lists feeding the filter pipeline.
//!
//! Four lists and one slot, all holding [`TrackId`] handles:
//! previously played (newest first), recent artist hashes (newest first),
//! the user queue (FIFO) and the upcoming list, plus the currently playing
//! track. The previous and artist lists are capped so an old library never
//! starves the filter of candidates.

use log::{debug, info};

use crate::track::{Track, TrackId};

/// Maximum length of the previously-played list.
pub const PLAYED_ITEMS_LIMIT: usize = 100;

/// Maximum length of the recent-artists list.
pub const PLAYED_ARTISTS_LIMIT: usize = 50;

/// All playback-order state of one engine instance.
#[derive(Debug, Default)]
pub struct History {
    /// Previously played tracks, newest first.
    previous: Vec<TrackId>,
    /// Artist hashes of recently played tracks, newest first.
    recent_artists: Vec<u32>,
    /// Tracks the user queued explicitly, in play order. Duplicates are
    /// allowed; each slot is one future playback.
    queue: Vec<TrackId>,
    /// Tracks the engine already committed to play next.
    upcoming: Vec<TrackId>,
    /// The track currently playing, if any.
    current: Option<TrackId>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously played tracks, newest first.
    #[must_use]
    pub fn previous(&self) -> &[TrackId] {
        &self.previous
    }

    /// Recent artist hashes, newest first.
    #[must_use]
    pub fn recent_artists(&self) -> &[u32] {
        &self.recent_artists
    }

    #[must_use]
    pub fn queue(&self) -> &[TrackId] {
        &self.queue
    }

    #[must_use]
    pub fn upcoming(&self) -> &[TrackId] {
        &self.upcoming
    }

    #[must_use]
    pub fn current(&self) -> Option<TrackId> {
        self.current
    }

    /// Appends a track to the user queue and marks it queued.
    ///
    /// The same track may occupy several queue slots; the flag stays set
    /// until the last slot is gone.
    pub fn add_to_queue(&mut self, track: &mut Track) {
        let id = track.id();
        track.queued = true;
        self.queue.push(id);
        info!("Queued {} ({} in queue)", track.name(), self.queue.len());
    }

    /// Removes one queue slot of `track`, clearing the queued flag once no
    /// slot holds it anymore. Returns whether a slot was removed.
    pub fn remove_from_queue(&mut self, track: &mut Track) -> bool {
        let id = track.id();

        let Some(pos) = self.queue.iter().position(|entry| *entry == id) else {
            debug!("{} is not queued", track.name());
            return false;
        };

        self.queue.remove(pos);

        if !self.queue.contains(&id) {
            track.queued = false;
        }

        info!("Removed {} from the queue ({} left)", track.name(), self.queue.len());
        true
    }

    /// Pops the next queued track, if any.
    pub fn pop_queue(&mut self) -> Option<TrackId> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0))
        }
    }

    /// Schedules a track to play next. Rejects an id already scheduled.
    pub fn push_upcoming(&mut self, id: TrackId) {
        if self.upcoming.contains(&id) {
            debug!("Track {id} is already scheduled");
            return;
        }

        self.upcoming.push(id);
    }

    /// Takes the first upcoming track, if any.
    pub fn pop_upcoming(&mut self) -> Option<TrackId> {
        if self.upcoming.is_empty() {
            None
        } else {
            Some(self.upcoming.remove(0))
        }
    }

    pub fn clear_upcoming(&mut self) {
        self.upcoming.clear();
    }

    /// Marks a track as currently playing.
    pub fn mark_playing(&mut self, id: TrackId) {
        self.current = Some(id);
    }

    /// Records that the current playback finished: pushes the track onto
    /// the previous list and folds its artist into the recent-artist list.
    ///
    /// The artist hash `0` (no artist identity) is never recorded.
    pub fn record_played(&mut self, id: TrackId, artist_hash: u32) {
        self.previous.insert(0, id);

        if artist_hash != 0 && self.recent_artists.first() != Some(&artist_hash) {
            self.recent_artists.insert(0, artist_hash);
        }

        if self.current == Some(id) {
            self.current = None;
        }

        self.trim();
    }

    /// Undoes the most recent [`record_played`](Self::record_played):
    /// removes the newest previous entry and returns it. The track that was
    /// current, if any, is pushed back onto the front of upcoming so it
    /// plays again after the revert.
    pub fn revert_to_previous(&mut self) -> Option<TrackId> {
        if self.previous.is_empty() {
            info!("No previous track to go back to");
            return None;
        }

        let id = self.previous.remove(0);

        if let Some(current) = self.current.take() {
            self.upcoming.insert(0, current);
        }

        debug!("Reverted to previous track {id}");
        Some(id)
    }

    /// Enforces the list caps, dropping the oldest entries.
    pub fn trim(&mut self) {
        if self.previous.len() > PLAYED_ITEMS_LIMIT {
            debug!("Trimming previous list to {PLAYED_ITEMS_LIMIT} items");
            self.previous.truncate(PLAYED_ITEMS_LIMIT);
        }

        if self.recent_artists.len() > PLAYED_ARTISTS_LIMIT {
            debug!("Trimming recent artists to {PLAYED_ARTISTS_LIMIT} items");
            self.recent_artists.truncate(PLAYED_ARTISTS_LIMIT);
        }
    }
}
