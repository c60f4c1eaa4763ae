//! Filter pipeline: narrows the candidate set before a selection round.
//!
//! The pipeline runs four stages in a fixed order: availability, artist
//! diversity, per-statistic filters and recency removal. The order is
//! load-bearing. Say there are 10 tracks, the recency amount is 3, the
//! recency percentage is 50 and 1 track matches a statistic filter. If the
//! statistic filters and the fixed amount ran first, the percentage stage
//! would only remove 3 items (50% of 10 - 1 - 3 = 6), although 50% of the
//! remaining library is 4 or 5. The percentage is therefore always computed
//! against the set left over by the earlier stages.
//!
//! The recency stage can "remove" a track that an earlier stage already
//! dropped. Such a removal still counts toward the recency budget: the
//! budget expresses how many recent plays to suppress, not how many list
//! nodes to unlink.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::stats;
use crate::track::{Track, TrackId};

/// Parameters for one run of the filter pipeline.
///
/// Each statistic filter is only *active* when it is enabled and its bounds
/// are non-degenerate; an inactive filter is skipped entirely rather than
/// excluding everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// How many recent artists to match against when filtering.
    pub recent_artists: i32,

    /// Fixed number of recent tracks to remove.
    pub remove_recents_amount: i32,
    /// Recent tracks to remove as a percentage of the remaining set.
    pub remove_recents_percentage: f64,

    pub use_rating: bool,
    pub use_score: bool,
    pub use_playcount: bool,
    pub use_skipcount: bool,
    pub use_lastplayed: bool,

    /// Keep unrated tracks (rating 0) even when the rating filter is active.
    pub rating_include_zero: bool,

    pub playcount_invert: bool,
    pub skipcount_invert: bool,
    pub lastplayed_invert: bool,

    pub rating_min: i32,
    pub rating_max: i32,
    pub score_min: f64,
    pub score_max: f64,
    pub playcount_threshold: i32,
    pub skipcount_threshold: i32,
    /// Threshold in seconds since last played.
    pub lastplayed_threshold: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            recent_artists: 0,
            remove_recents_amount: 0,
            remove_recents_percentage: 50.0,
            use_rating: true,
            use_score: true,
            use_playcount: false,
            use_skipcount: false,
            use_lastplayed: false,
            rating_include_zero: true,
            playcount_invert: false,
            skipcount_invert: false,
            lastplayed_invert: false,
            rating_min: 50,
            rating_max: 100,
            score_min: 25.0,
            score_max: 100.0,
            playcount_threshold: 0,
            skipcount_threshold: 0,
            lastplayed_threshold: 0,
        }
    }
}

impl FilterConfig {
    fn rating_filter_active(&self) -> bool {
        self.use_rating
            && self.rating_min > 0
            && self.rating_max > 0
            && stats::rating_is_valid(self.rating_min)
            && stats::rating_is_valid(self.rating_max)
    }

    fn score_filter_active(&self) -> bool {
        self.use_score
            && self.score_min > 0.0
            && self.score_max > 0.0
            && stats::score_is_valid(self.score_min)
            && stats::score_is_valid(self.score_max)
    }

    fn playcount_filter_active(&self) -> bool {
        self.use_playcount
            && self.playcount_threshold > 0
            && stats::playcount_is_valid(self.playcount_threshold)
    }

    fn skipcount_filter_active(&self) -> bool {
        self.use_skipcount
            && self.skipcount_threshold > 0
            && stats::skipcount_is_valid(self.skipcount_threshold)
    }

    fn lastplayed_filter_active(&self) -> bool {
        self.use_lastplayed
            && self.lastplayed_threshold > 0
            && stats::lastplayed_is_valid(self.lastplayed_threshold)
    }
}

/// Runs the full filter pipeline over `candidates`.
///
/// `previously_played` is expected newest-first, `recent_artists` likewise.
/// `now` is the event timestamp captured once by the caller; it is reused
/// for every track so all candidates face the same last-played cutoff.
///
/// An empty input or a fully filtered-out library both yield an empty
/// result; neither is an error.
#[must_use]
pub fn filter<'a>(
    candidates: Vec<&'a Track>,
    previously_played: &[TrackId],
    upcoming: &[TrackId],
    recent_artists: &[u32],
    config: Option<&FilterConfig>,
    now: i64,
) -> Vec<&'a Track> {
    if candidates.is_empty() {
        info!("No songs to filter (empty list)");
        return Vec::new();
    }

    let Some(config) = config else {
        info!("Nothing to filter (no filter configuration)");
        return candidates;
    };

    let mut remaining = remove_unavailable(candidates);
    remaining = remove_recent_artists(remaining, recent_artists, config.recent_artists);
    remaining = filter_by_stats(remaining, config, now);

    // Percentage computed against the set *after* the stages above
    let budget = percentage_of(remaining.len(), config.remove_recents_percentage)
        + config.remove_recents_amount;
    remaining = remove_recents(remaining, previously_played, upcoming, budget);

    if remaining.is_empty() {
        info!("All songs are filtered out");
    }

    remaining
}

/// Stage 1: drop every track that is not directly playable.
fn remove_unavailable(candidates: Vec<&Track>) -> Vec<&Track> {
    candidates
        .into_iter()
        .filter(|track| {
            if track.is_available() {
                true
            } else {
                debug!("Filtered out {} because it is not available", track.name());
                false
            }
        })
        .collect()
}

/// Stage 2: drop tracks whose artist matches one of the first `amount`
/// entries of the recent-artist list. A track without an artist identity
/// (hash 0) is never matched.
fn remove_recent_artists<'a>(
    candidates: Vec<&'a Track>,
    recent_artists: &[u32],
    amount: i32,
) -> Vec<&'a Track> {
    if candidates.is_empty() || recent_artists.is_empty() || amount <= 0 {
        info!("No songs to remove that match any recent artist");
        return candidates;
    }

    let recent = &recent_artists[..recent_artists.len().min(amount as usize)];

    candidates
        .into_iter()
        .filter(|track| {
            let hash = track.artist_hash();

            if hash != 0 && recent.contains(&hash) {
                debug!("Filtered out {} by artist {}", track.name(), track.artist);
                false
            } else {
                true
            }
        })
        .collect()
}

/// Stage 3: apply the five per-statistic filters.
///
/// Each track is checked filter by filter and removed on the first failure;
/// the remaining statistics are not evaluated for it.
fn filter_by_stats<'a>(candidates: Vec<&'a Track>, config: &FilterConfig, now: i64) -> Vec<&'a Track> {
    let rating_on = config.rating_filter_active();
    let score_on = config.score_filter_active();
    let playcount_on = config.playcount_filter_active();
    let skipcount_on = config.skipcount_filter_active();
    let lastplayed_on = config.lastplayed_filter_active();

    candidates
        .into_iter()
        .filter(|track| {
            if rating_on {
                let rating = track.rating;
                let keep_zero = config.rating_include_zero && rating == 0;

                if !stats::rating_is_valid(rating)
                    || (!keep_zero && (rating < config.rating_min || rating > config.rating_max))
                {
                    debug!("Song {} filtered out by rating {rating}", track.name());
                    return false;
                }
            }

            if score_on {
                let score = track.score;

                if !stats::score_is_valid(score)
                    || score < config.score_min
                    || score > config.score_max
                {
                    debug!("Song {} filtered out by score {score}", track.name());
                    return false;
                }
            }

            if playcount_on {
                let count = track.play_count;

                if !stats::playcount_is_valid(count)
                    || (config.playcount_invert && count > config.playcount_threshold)
                    || (!config.playcount_invert && count < config.playcount_threshold)
                {
                    debug!("Song {} filtered out by play count {count}", track.name());
                    return false;
                }
            }

            if skipcount_on {
                let count = track.skip_count;

                if !stats::skipcount_is_valid(count)
                    || (config.skipcount_invert && count > config.skipcount_threshold)
                    || (!config.skipcount_invert && count < config.skipcount_threshold)
                {
                    debug!("Song {} filtered out by skip count {count}", track.name());
                    return false;
                }
            }

            if lastplayed_on {
                let last_played = track.last_played;
                let since = now - last_played;

                if !stats::lastplayed_is_valid(last_played)
                    || (config.lastplayed_invert && since > config.lastplayed_threshold)
                    || (!config.lastplayed_invert && since < config.lastplayed_threshold)
                {
                    debug!("Song {} filtered out by last played {last_played}", track.name());
                    return false;
                }
            }

            true
        })
        .collect()
}

/// Stage 4: remove up to `amount` recently played or already scheduled
/// tracks.
///
/// Priority: upcoming tracks first, then previously played (newest-first),
/// then the remaining candidates ordered by last-played descending.
/// Never-played tracks are exempt from the last sub-stage. Budget is
/// consumed for every entry walked in the first two sub-stages even when
/// the track is no longer in the working set.
fn remove_recents<'a>(
    candidates: Vec<&'a Track>,
    previously_played: &[TrackId],
    upcoming: &[TrackId],
    amount: i32,
) -> Vec<&'a Track> {
    if candidates.is_empty() || amount <= 0 {
        info!("No recent items to remove");
        return candidates;
    }

    info!("Removing {amount} recently played songs");

    let amount = amount as usize;
    let mut candidates = candidates;
    let mut removed = 0usize;

    // Tracks already chosen to play soon
    for id in upcoming {
        if removed >= amount {
            break;
        }

        if let Some(pos) = candidates.iter().position(|t| t.id() == *id) {
            debug!("Filtered out previously selected {}", candidates[pos].name());
            candidates.remove(pos);
        }

        // Counts whether or not the track was still present
        removed += 1;
    }

    // Tracks in the play history, newest first
    for id in previously_played {
        if removed >= amount {
            break;
        }

        if let Some(pos) = candidates.iter().position(|t| t.id() == *id) {
            debug!("Filtered out recently played {}", candidates[pos].name());
            candidates.remove(pos);
        }

        removed += 1;
    }

    // Still short: order what is left by last played and drop the most
    // recent ones. Never-played tracks stay.
    if removed < amount {
        let mut by_recency: Vec<TrackId> = candidates.iter().map(|t| t.id()).collect();
        by_recency.sort_by_key(|id| {
            let track = candidates.iter().find(|t| t.id() == *id);
            std::cmp::Reverse(track.map_or(0, |t| t.last_played))
        });

        for id in by_recency {
            if removed >= amount {
                break;
            }

            let Some(pos) = candidates.iter().position(|t| t.id() == id) else {
                continue;
            };

            if candidates[pos].last_played <= 0 {
                continue;
            }

            debug!(
                "Filtered out {} by last_played {}",
                candidates[pos].name(),
                candidates[pos].last_played
            );
            candidates.remove(pos);
            removed += 1;
        }
    }

    if removed == 0 {
        info!("Did not remove any recently played songs");
    } else if removed < amount {
        info!("Only removed {removed} of the recently played songs");
    }

    candidates
}

/// Floor of `percentage` percent of `len`, clamped to `[0, len]`.
fn percentage_of(len: usize, percentage: f64) -> i32 {
    if len == 0 || percentage <= 0.0 {
        return 0;
    }

    if percentage >= 100.0 {
        return len as i32;
    }

    ((len as f64) * percentage / 100.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackStatus;

    fn track(uri: &str) -> Track {
        Track::new(uri)
    }

    fn refs(tracks: &[Track]) -> Vec<&Track> {
        tracks.iter().collect()
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = filter(Vec::new(), &[], &[], &[], Some(&FilterConfig::default()), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn missing_config_is_a_noop() {
        let tracks = vec![track("a"), track("b")];
        let out = filter(refs(&tracks), &[], &[], &[], None, 0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn unavailable_tracks_are_dropped() {
        let mut tracks = vec![track("a"), track("b"), track("c")];
        tracks[1].status = TrackStatus::Missing;
        tracks[2].status = TrackStatus::Playing;

        let out = remove_unavailable(refs(&tracks));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].uri, "a");
    }

    #[test]
    fn recent_artist_filter_respects_count() {
        let mut tracks = vec![track("a"), track("b"), track("c")];
        tracks[0].artist = "One".to_string();
        tracks[1].artist = "Two".to_string();
        tracks[2].artist = "Three".to_string();

        let recents = vec![
            tracks[0].artist_hash(),
            tracks[1].artist_hash(),
            tracks[2].artist_hash(),
        ];

        // Only the first two recent artists are considered
        let out = remove_recent_artists(refs(&tracks), &recents, 2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].artist, "Three");
    }

    #[test]
    fn artistless_tracks_never_match() {
        let tracks = vec![track("a")];
        let out = remove_recent_artists(refs(&tracks), &[0], 5);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn rating_filter_keeps_unrated_when_configured() {
        let mut tracks = vec![track("rated-low"), track("unrated"), track("rated-high")];
        tracks[0].rating = 10;
        tracks[1].rating = 0;
        tracks[2].rating = 90;

        let mut config = FilterConfig {
            use_score: false,
            ..FilterConfig::default()
        };

        let out = filter_by_stats(refs(&tracks), &config, 0);
        let uris: Vec<&str> = out.iter().map(|t| t.uri.as_str()).collect();
        assert_eq!(uris, ["unrated", "rated-high"]);

        config.rating_include_zero = false;
        let out = filter_by_stats(refs(&tracks), &config, 0);
        let uris: Vec<&str> = out.iter().map(|t| t.uri.as_str()).collect();
        assert_eq!(uris, ["rated-high"]);
    }

    #[test]
    fn degenerate_bounds_deactivate_a_filter() {
        let mut tracks = vec![track("a")];
        tracks[0].rating = 10;

        // rating_max 0 makes the filter inactive; nothing is excluded
        let config = FilterConfig {
            use_score: false,
            rating_max: 0,
            ..FilterConfig::default()
        };

        let out = filter_by_stats(refs(&tracks), &config, 0);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn playcount_filter_and_invert() {
        let mut tracks = vec![track("fresh"), track("worn")];
        tracks[0].play_count = 1;
        tracks[1].play_count = 10;

        let mut config = FilterConfig {
            use_rating: false,
            use_score: false,
            use_playcount: true,
            playcount_threshold: 5,
            ..FilterConfig::default()
        };

        let out = filter_by_stats(refs(&tracks), &config, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].uri, "worn");

        config.playcount_invert = true;
        let out = filter_by_stats(refs(&tracks), &config, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].uri, "fresh");
    }

    #[test]
    fn lastplayed_filter_uses_injected_now() {
        let now = 1_000_000;
        let mut tracks = vec![track("old"), track("recent")];
        tracks[0].last_played = now - 10_000;
        tracks[1].last_played = now - 10;

        let config = FilterConfig {
            use_rating: false,
            use_score: false,
            use_lastplayed: true,
            lastplayed_threshold: 1_000,
            ..FilterConfig::default()
        };

        // Keep only tracks not played within the threshold
        let out = filter_by_stats(refs(&tracks), &config, now);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].uri, "old");
    }

    #[test]
    fn percentage_is_computed_after_earlier_stages() {
        // Library of 10, 1 matching the rating filter; with 50% recency
        // removal, exactly 4 (50% of 9, floored) must go, not 5.
        let mut tracks: Vec<Track> = (0..10)
            .map(|i| {
                let mut t = track(&format!("t{i}"));
                t.rating = 80;
                t.last_played = 1_000 + i;
                t
            })
            .collect();
        tracks[0].rating = 10; // removed by the rating filter

        let config = FilterConfig {
            use_score: false,
            remove_recents_percentage: 50.0,
            ..FilterConfig::default()
        };

        let out = filter(refs(&tracks), &[], &[], &[], Some(&config), 2_000);
        assert_eq!(out.len(), 5); // 10 - 1 (rating) - 4 (recency)
    }

    #[test]
    fn recency_budget_counts_tracks_already_removed() {
        // Two upcoming tracks are not in the candidate set at all; they
        // must still consume the recency budget.
        let mut tracks: Vec<Track> = (0..4)
            .map(|i| {
                let mut t = track(&format!("t{i}"));
                t.last_played = 100 + i;
                t
            })
            .collect();
        tracks.iter_mut().for_each(|t| t.rating = 80);

        let ghost_a = track("ghost-a").id();
        let ghost_b = track("ghost-b").id();

        let out = remove_recents(refs(&tracks), &[], &[ghost_a, ghost_b], 3);

        // Budget 3: two consumed by absent upcoming entries, one by the
        // most recently played candidate.
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|t| t.uri != "t3"));
    }

    #[test]
    fn never_played_tracks_survive_recency_sort() {
        let mut tracks = vec![track("never"), track("played")];
        tracks[1].last_played = 500;

        let out = remove_recents(refs(&tracks), &[], &[], 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].uri, "never");
    }

    #[test]
    fn upcoming_removed_before_history() {
        let tracks = vec![track("in-upcoming"), track("in-history")];
        let upcoming = vec![tracks[0].id()];
        let history = vec![tracks[1].id()];

        let out = remove_recents(refs(&tracks), &history, &upcoming, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].uri, "in-history");
    }

    #[test]
    fn percentage_helper_bounds() {
        assert_eq!(percentage_of(0, 50.0), 0);
        assert_eq!(percentage_of(10, 0.0), 0);
        assert_eq!(percentage_of(10, -5.0), 0);
        assert_eq!(percentage_of(10, 100.0), 10);
        assert_eq!(percentage_of(10, 150.0), 10);
        assert_eq!(percentage_of(9, 50.0), 4);
    }
}
