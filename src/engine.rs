//! The engine: one stateful façade over the pure filter, selection and
//! statistics functions.
//!
//! An [`Engine`] owns the playback history, the configuration, the random
//! number generator and a clock. Track storage stays outside; every entry
//! point borrows a [`TrackStore`] for the duration of the call. The
//! timestamp for an event is captured once at the start of the call and
//! reused for every update it triggers.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::history::History;
use crate::library::TrackStore;
use crate::select;
use crate::stats;
use crate::track::TrackId;

/// Source of the current Unix timestamp.
///
/// Injected so tests can pin time; production code uses [`SystemClock`].
pub trait Clock {
    fn now(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        match std::time::SystemTime::UNIX_EPOCH.elapsed() {
            Ok(elapsed) => elapsed.as_secs() as i64,
            Err(err) => {
                warn!("System clock is before the Unix epoch: {err}");
                0
            }
        }
    }
}

/// Snapshot of the three tracks surrounding the playback position,
/// emitted after every operation that may change one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongsChanged {
    pub previous: Option<TrackId>,
    pub current: Option<TrackId>,
    pub next: Option<TrackId>,
}

/// Stateful decision core: history, configuration, randomness and time.
pub struct Engine {
    history: History,
    config: EngineConfig,
    incognito: bool,
    clock: Box<dyn Clock>,
    rng: StdRng,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("history", &self.history)
            .field("incognito", &self.incognito)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine with the system clock and an entropy-seeded RNG.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            history: History::new(),
            config,
            incognito: false,
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a deterministic engine: fixed RNG seed, injected clock.
    #[must_use]
    pub fn with_clock_and_seed(config: EngineConfig, clock: Box<dyn Clock>, seed: u64) -> Self {
        Self {
            history: History::new(),
            config,
            incognito: false,
            clock,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn incognito(&self) -> bool {
        self.incognito
    }

    /// Toggles incognito mode: while active, no statistic is updated and
    /// playback leaves no trace beyond the in-memory history lists.
    pub fn set_incognito(&mut self, enable: bool) {
        info!("Incognito mode {}", if enable { "enabled" } else { "disabled" });
        self.incognito = enable;
    }

    /// Runs one full decision round and returns the chosen track, without
    /// scheduling it.
    ///
    /// The currently playing track is excluded from the candidates and its
    /// artist is folded into the recent-artist list for the diversity
    /// filter, so two tracks by the same artist never play back to back
    /// while that filter is active.
    pub fn choose_new_track(&mut self, store: &TrackStore) -> Option<TrackId> {
        self.choose_excluding(store, self.history.current())
    }

    /// Decision round with an explicit exclusion. The lookahead refill
    /// passes the track it just handed out here, since that track is not
    /// marked current yet at that point.
    fn choose_excluding(&mut self, store: &TrackStore, excluded: Option<TrackId>) -> Option<TrackId> {
        if store.is_empty() {
            info!("Library is empty; nothing to choose");
            return None;
        }

        let excluded_artist = excluded
            .and_then(|id| store.get(id))
            .map(|track| track.artist_hash())
            .unwrap_or(0);

        let candidates: Vec<_> = store
            .iter()
            .filter(|track| Some(track.id()) != excluded)
            .collect();

        if candidates.is_empty() {
            info!("The current track is the only one present");
            return None;
        }

        let mut artists = Vec::with_capacity(self.history.recent_artists().len() + 1);
        if excluded_artist != 0 {
            artists.push(excluded_artist);
        }
        artists.extend_from_slice(self.history.recent_artists());

        let now = self.clock.now();

        select::choose_new_track(
            candidates,
            self.history.previous(),
            self.history.upcoming(),
            &artists,
            Some(&self.config.filter),
            &self.config.probability,
            now,
            &mut self.rng,
        )
        .map(|track| track.id())
    }

    /// Returns the track to play next and refills the lookahead.
    ///
    /// The user queue always wins; otherwise the first still-known upcoming
    /// track is taken (stale ids of removed tracks are silently dropped);
    /// otherwise a fresh decision round runs. After the pick, an empty
    /// upcoming list is refilled so the following call is instant.
    pub fn next_track(&mut self, store: &mut TrackStore) -> Option<TrackId> {
        let next = self
            .pop_queued(store)
            .or_else(|| self.pop_known_upcoming(store))
            .or_else(|| self.choose_new_track(store));

        if next.is_some() && self.history.upcoming().is_empty() {
            if let Some(id) = self.choose_excluding(store, next) {
                self.history.push_upcoming(id);
            }
        }

        next
    }

    fn pop_queued(&mut self, store: &mut TrackStore) -> Option<TrackId> {
        let id = self.history.pop_queue()?;

        // Last slot gone: drop the queued marker
        if !self.history.queue().contains(&id) {
            if let Some(track) = store.get_mut(id) {
                track.queued = false;
            }
        }

        Some(id)
    }

    fn pop_known_upcoming(&mut self, store: &TrackStore) -> Option<TrackId> {
        while let Some(id) = self.history.pop_upcoming() {
            if store.get(id).is_some() {
                return Some(id);
            }

            info!("Dropping upcoming track {id}: no longer in the library");
        }

        None
    }

    /// Marks a track as currently playing.
    pub fn mark_playing(&mut self, id: TrackId) {
        self.history.mark_playing(id);
    }

    /// Appends a track to the user queue.
    pub fn queue_track(&mut self, store: &mut TrackStore, id: TrackId) -> bool {
        let Some(track) = store.get_mut(id) else {
            warn!("Cannot queue unknown track {id}");
            return false;
        };

        self.history.add_to_queue(track);
        true
    }

    /// Removes one queue slot of a track.
    pub fn dequeue_track(&mut self, store: &mut TrackStore, id: TrackId) -> bool {
        let Some(track) = store.get_mut(id) else {
            warn!("Cannot dequeue unknown track {id}");
            return false;
        };

        self.history.remove_from_queue(track)
    }

    /// Records that a track finished (or was skipped) after playing
    /// `played_fraction` of its length.
    ///
    /// Pushes it onto the history lists, then updates its statistics in a
    /// fixed order: score first (it must see the pre-increment play count),
    /// then play count, skip count and last-played. One timestamp, captured
    /// here, covers the whole batch. With incognito active the history
    /// lists still grow but every statistic stays untouched.
    ///
    /// Returns the new surroundings of the playback position so a frontend
    /// can refresh its previous/current/next display.
    pub fn record_played(
        &mut self,
        store: &mut TrackStore,
        id: TrackId,
        played_fraction: f64,
        skip_score_update: bool,
    ) -> SongsChanged {
        if !(0.0..=1.0).contains(&played_fraction) {
            warn!("Refusing to record an invalid played fraction {played_fraction}");
            return self.songs_changed();
        }

        let Some(track) = store.get_mut(id) else {
            warn!("Cannot record playback of unknown track {id}");
            return self.songs_changed();
        };

        let artist = track.artist_hash();
        let policy = self.config.stats.policy(self.incognito);
        let now = self.clock.now();

        if !skip_score_update {
            stats::modify_and_update_score(track, played_fraction, &policy);
        }

        stats::modify_and_update_playcount(track, played_fraction, false, &policy);
        stats::modify_and_update_skipcount(track, played_fraction, false, &policy);
        stats::modify_and_update_lastplayed(track, played_fraction, now, &policy);

        self.history.record_played(id, artist);
        self.songs_changed()
    }

    /// Steps back to the most recently played track and returns it.
    ///
    /// The track that was current, if any, moves to the front of the
    /// upcoming list so it plays again after the revert. Statistics are not
    /// rolled back; only the playback position moves.
    pub fn revert_last_played(&mut self) -> Option<TrackId> {
        self.history.revert_to_previous()
    }

    /// Discards the computed lookahead and recomputes it. Called after a
    /// configuration change so stale decisions never play.
    pub fn refresh_upcoming(&mut self, store: &mut TrackStore) {
        self.history.clear_upcoming();
        self.sync(store);
    }

    /// Housekeeping that may take time: refills an empty lookahead and
    /// trims the history lists to their caps. Run this after the quick
    /// response to a playback event has gone out.
    pub fn sync(&mut self, store: &mut TrackStore) {
        if self.history.upcoming().is_empty() {
            if let Some(id) = self.choose_new_track(store) {
                self.history.push_upcoming(id);
            }
        }

        self.history.trim();
    }

    /// Current surroundings of the playback position. The next slot shows
    /// the queue head when one exists, the upcoming head otherwise.
    #[must_use]
    pub fn songs_changed(&self) -> SongsChanged {
        SongsChanged {
            previous: self.history.previous().first().copied(),
            current: self.history.current(),
            next: self
                .history
                .queue()
                .first()
                .or_else(|| self.history.upcoming().first())
                .copied(),
        }
    }
}
