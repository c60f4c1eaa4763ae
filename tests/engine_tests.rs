//! # Integration Tests for Encore
//!
//! End-to-end tests driving the engine the way a player frontend would:
//! pick a track, mark it playing, record how much of it was heard, and
//! occasionally step back or queue something explicitly. Everything runs
//! against deterministic clocks and seeded random number generators.

use anyhow::Result;

use encore::config::EngineConfig;
use encore::engine::{Clock, Engine};
use encore::library::TrackStore;
use encore::track::{Track, TrackId};

/// Clock that returns a fixed timestamp and can be stepped manually.
struct TestClock(std::cell::Cell<i64>);

impl TestClock {
    fn boxed(start: i64) -> Box<Self> {
        Box::new(Self(std::cell::Cell::new(start)))
    }
}

impl Clock for TestClock {
    fn now(&self) -> i64 {
        // Advance one minute per observation so consecutive events never
        // share a timestamp
        let now = self.0.get();
        self.0.set(now + 60);
        now
    }
}

fn test_engine(seed: u64) -> Engine {
    Engine::with_clock_and_seed(EngineConfig::default(), TestClock::boxed(1_700_000_000), seed)
}

/// Builds a library of rated tracks across a handful of artists.
fn test_library(count: usize) -> TrackStore {
    let mut store = TrackStore::new();

    for i in 0..count {
        let mut track = Track::new(format!("/music/artist{}/song{i}.flac", i % 4));
        track.title = format!("Song {i}");
        track.artist = format!("Artist {}", i % 4);
        track.rating = 60 + (i as i32 % 5) * 8;
        store.insert(track);
    }

    store
}

fn ids(store: &TrackStore) -> Vec<TrackId> {
    store.iter().map(Track::id).collect()
}

#[test]
fn session_never_repeats_a_track_back_to_back() {
    let mut store = test_library(10);
    let mut engine = test_engine(1);
    let mut last: Option<TrackId> = None;

    for _ in 0..50 {
        let id = engine.next_track(&mut store).expect("library is not empty");
        assert_ne!(Some(id), last, "picked the same track twice in a row");

        engine.mark_playing(id);
        engine.record_played(&mut store, id, 1.0, false);
        last = Some(id);
    }
}

#[test]
fn session_updates_statistics() {
    let mut store = test_library(6);
    let mut engine = test_engine(2);

    for _ in 0..30 {
        let id = engine.next_track(&mut store).expect("library is not empty");
        engine.mark_playing(id);
        engine.record_played(&mut store, id, 1.0, false);
    }

    let total_plays: i32 = store.iter().map(|t| t.play_count).sum();
    assert_eq!(total_plays, 30);

    // Full plays push scores up and never register skips
    assert!(store.iter().all(|t| t.skip_count == 0));
    assert!(store.iter().filter(|t| t.play_count > 0).all(|t| t.score > 50.0));
    assert!(store.iter().filter(|t| t.play_count > 0).all(|t| t.last_played > 0));
}

#[test]
fn skipped_tracks_lose_ground() {
    let mut store = test_library(6);
    let mut engine = test_engine(3);

    for round in 0..30 {
        let id = engine.next_track(&mut store).expect("library is not empty");
        engine.mark_playing(id);

        // Skip every third pick early into the track
        let fraction = if round % 3 == 0 { 0.05 } else { 1.0 };
        engine.record_played(&mut store, id, fraction, false);
    }

    let skips: i32 = store.iter().map(|t| t.skip_count).sum();
    assert_eq!(skips, 10);

    // Early skips do not count as plays and leave no last-played stamp
    let plays: i32 = store.iter().map(|t| t.play_count).sum();
    assert_eq!(plays, 20);
}

#[test]
fn queued_tracks_play_in_order_before_anything_else() {
    let mut store = test_library(8);
    let mut engine = test_engine(4);
    let all = ids(&store);

    engine.queue_track(&mut store, all[5]);
    engine.queue_track(&mut store, all[2]);
    engine.sync(&mut store);

    assert_eq!(engine.next_track(&mut store), Some(all[5]));
    assert_eq!(engine.next_track(&mut store), Some(all[2]));

    // Queue drained; the engine decides again
    let free_pick = engine.next_track(&mut store);
    assert!(free_pick.is_some());
}

#[test]
fn dequeue_cancels_a_queued_track() {
    let mut store = test_library(4);
    let mut engine = test_engine(5);
    let all = ids(&store);

    engine.queue_track(&mut store, all[1]);
    assert!(store.get(all[1]).unwrap().queued);

    assert!(engine.dequeue_track(&mut store, all[1]));
    assert!(!store.get(all[1]).unwrap().queued);
    assert!(!engine.dequeue_track(&mut store, all[1]));
}

#[test]
fn incognito_session_leaves_no_trace_in_the_library() {
    let mut store = test_library(6);
    let mut engine = test_engine(6);
    engine.set_incognito(true);

    for _ in 0..20 {
        let id = engine.next_track(&mut store).expect("library is not empty");
        engine.mark_playing(id);
        engine.record_played(&mut store, id, 1.0, false);
    }

    for track in store.iter() {
        assert_eq!(track.play_count, 0);
        assert_eq!(track.skip_count, 0);
        assert_eq!(track.last_played, 0);
        assert_eq!(track.score, 50.0);
    }

    // The in-memory history still works so revert stays possible
    assert_eq!(engine.history().previous().len(), 20);
}

#[test]
fn revert_steps_back_and_replays_the_interrupted_track() {
    let mut store = test_library(6);
    let mut engine = test_engine(7);

    let first = engine.next_track(&mut store).unwrap();
    engine.mark_playing(first);
    engine.record_played(&mut store, first, 1.0, false);

    let second = engine.next_track(&mut store).unwrap();
    engine.mark_playing(second);

    // Step back mid-playback
    assert_eq!(engine.revert_last_played(), Some(first));

    // The interrupted track comes up again right after
    assert_eq!(engine.next_track(&mut store), Some(second));
}

#[test]
fn higher_rated_tracks_accumulate_more_plays() {
    let mut store = TrackStore::new();

    let mut strong = Track::new("/music/strong.flac");
    strong.rating = 100;
    let strong_id = strong.id();
    store.insert(strong);

    for i in 0..4 {
        let mut weak = Track::new(format!("/music/weak{i}.flac"));
        weak.rating = 5;
        store.insert(weak);
    }

    // Disable every filter influence so only the draw weights matter
    let mut config = EngineConfig::default();
    config.filter.remove_recents_percentage = 0.0;
    config.filter.use_rating = false;
    config.filter.use_score = false;
    config.probability.use_skipcount = false;
    config.probability.use_lastplayed = false;

    let mut engine = Engine::with_clock_and_seed(config, TestClock::boxed(1_700_000_000), 8);
    engine.set_incognito(true);

    let mut strong_picks = 0u32;
    for _ in 0..400 {
        let id = engine.next_track(&mut store).expect("library is not empty");
        engine.mark_playing(id);
        engine.record_played(&mut store, id, 1.0, false);

        if id == strong_id {
            strong_picks += 1;
        }
    }

    // The strong track can never play twice in a row, so its expected
    // share is just under half of all rounds; each weak track lands near
    // one eighth. Leave room for variance.
    assert!(
        strong_picks > 120,
        "strong track only picked {strong_picks} of 400 rounds"
    );
    assert!(strong_picks < 240);
}

#[test]
fn library_survives_a_save_load_cycle_with_statistics() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("library.json");

    let mut store = test_library(5);
    let mut engine = test_engine(9);

    for _ in 0..10 {
        let id = engine.next_track(&mut store).expect("library is not empty");
        engine.mark_playing(id);
        engine.record_played(&mut store, id, 1.0, false);
    }

    store.save(&path)?;
    let reloaded = TrackStore::load(&path)?;

    assert_eq!(reloaded.len(), store.len());

    for track in store.iter() {
        let copy = reloaded.get(track.id()).expect("track survived the reload");
        assert_eq!(copy.play_count, track.play_count);
        assert_eq!(copy.last_played, track.last_played);
        assert_eq!(copy.score, track.score);
    }

    Ok(())
}

#[test]
fn artist_diversity_keeps_consecutive_artists_apart() {
    let mut store = TrackStore::new();

    // Two artists, several tracks each
    for i in 0..6 {
        let mut track = Track::new(format!("/music/a{i}.flac"));
        track.artist = format!("Artist {}", i % 2);
        track.rating = 80;
        store.insert(track);
    }

    let mut config = EngineConfig::default();
    config.filter.recent_artists = 1;
    config.filter.remove_recents_percentage = 0.0;

    let mut engine = Engine::with_clock_and_seed(config, TestClock::boxed(1_700_000_000), 10);
    engine.set_incognito(true);

    let mut last_artist: Option<String> = None;

    for _ in 0..30 {
        let id = engine.next_track(&mut store).expect("library is not empty");
        let artist = store.get(id).unwrap().artist.clone();

        assert_ne!(Some(&artist), last_artist.as_ref(), "same artist twice in a row");

        engine.mark_playing(id);
        engine.record_played(&mut store, id, 1.0, false);
        last_artist = Some(artist);
    }
}
