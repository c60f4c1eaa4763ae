//! Statistics engine: bounded update rules for the five per-track values.
//!
//! Every `update_*` function validates the resulting value before storing it
//! and refuses the whole update (logging a warning, leaving the track
//! untouched) when the result would fall out of range. Silent clamping would
//! mask bugs in the caller, so it is deliberately not done here.
//!
//! The `modify_and_update_*` wrappers add the playback-event policy on top:
//! incognito suppression and the minimum/full played-fraction gates.

use log::{debug, info, warn};

use crate::track::Track;
use serde::{Deserialize, Serialize};

pub const RATING_MIN: i32 = 0;
pub const RATING_MAX: i32 = 100;
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// Policy applied by the `modify_and_update_*` wrappers after a playback
/// event. The engine fills `incognito` from its runtime flag per batch.
#[derive(Debug, Clone, Copy)]
pub struct UpdatePolicy {
    /// Suppress every statistics mutation when set.
    pub incognito: bool,
    /// Plays shorter than this fraction do not count at all.
    pub min_played_fraction: f64,
    /// Plays at or beyond this fraction count as fully played.
    pub full_played_fraction: f64,
}

/// Persistent half of [`UpdatePolicy`]: the two fraction settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub min_played_fraction: f64,
    pub full_played_fraction: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            min_played_fraction: 0.2,
            full_played_fraction: 0.8,
        }
    }
}

impl StatsConfig {
    /// Combines the persisted fractions with the runtime incognito flag.
    #[must_use]
    pub fn policy(&self, incognito: bool) -> UpdatePolicy {
        UpdatePolicy {
            incognito,
            min_played_fraction: self.min_played_fraction,
            full_played_fraction: self.full_played_fraction,
        }
    }
}

// Validators. Counts and timestamps have no upper bound.

#[must_use]
pub fn rating_is_valid(rating: i32) -> bool {
    if (RATING_MIN..=RATING_MAX).contains(&rating) {
        true
    } else {
        debug!("Rating {rating} is invalid");
        false
    }
}

#[must_use]
pub fn score_is_valid(score: f64) -> bool {
    if (SCORE_MIN..=SCORE_MAX).contains(&score) {
        true
    } else {
        debug!("Score {score} is invalid");
        false
    }
}

#[must_use]
pub fn playcount_is_valid(play_count: i32) -> bool {
    if play_count >= 0 {
        true
    } else {
        debug!("Play count {play_count} is invalid");
        false
    }
}

#[must_use]
pub fn skipcount_is_valid(skip_count: i32) -> bool {
    if skip_count >= 0 {
        true
    } else {
        debug!("Skip count {skip_count} is invalid");
        false
    }
}

#[must_use]
pub fn lastplayed_is_valid(last_played: i64) -> bool {
    if last_played >= 0 {
        true
    } else {
        debug!("Last played {last_played} is invalid");
        false
    }
}

/// Makes low ratings high and high ratings low, within range.
///
/// A rating of `0` is the "unset" sentinel and stays `0`; it must never be
/// inverted into a real rating.
#[must_use]
pub fn invert_rating(rating: i32) -> i32 {
    if !rating_is_valid(rating) {
        return 0;
    }

    if rating == 0 {
        0
    } else {
        RATING_MAX - rating
    }
}

/// Makes low scores high and high scores low, within range.
#[must_use]
pub fn invert_score(score: f64) -> f64 {
    if !score_is_valid(score) {
        return 0.0;
    }

    SCORE_MAX - score
}

/// Updates a track's rating.
///
/// `rating == -1` resets to 0 (unset); a valid non-zero `rating` sets it
/// directly; otherwise `increase` is added to the current rating. An
/// increase that would leave the valid range is refused.
pub fn update_rating(track: &mut Track, rating: i32, increase: i32) {
    let current = track.rating;

    let new_rating = if rating == -1 {
        debug!("Rating of {} has been reset to 0", track.name());
        0
    } else if rating != 0 && (RATING_MIN..=RATING_MAX).contains(&rating) {
        debug!("Rating of {} is now set to {rating}", track.name());
        rating
    } else if (-RATING_MAX..=RATING_MAX).contains(&increase) {
        let value = current + increase;

        if value <= RATING_MIN || value > RATING_MAX {
            warn!(
                "Increasing rating of {} resulted in an invalid value {value}; value is unchanged",
                track.name()
            );
            return;
        }

        debug!("Rating of {} is increased by {increase} to {value}", track.name());
        value
    } else {
        warn!(
            "No valid parameters in attempt to update rating of {}. Rating is (still) {current}",
            track.name()
        );
        return;
    };

    track.rating = new_rating;
}

/// Updates a track's score; same reset/set/increase contract as
/// [`update_rating`] with `-1.0` as the reset sentinel.
pub fn update_score(track: &mut Track, score: f64, increase: f64) {
    let current = track.score;

    let new_score = if score == -1.0 {
        debug!("Score of {} has been reset to 0", track.name());
        0.0
    } else if score != 0.0 && (SCORE_MIN..=SCORE_MAX).contains(&score) {
        debug!("Score of {} is now set to {score}", track.name());
        score
    } else if (-SCORE_MAX..=SCORE_MAX).contains(&increase) {
        let value = current + increase;

        if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
            warn!(
                "Increasing score of {} resulted in an invalid value {value}; value is unchanged",
                track.name()
            );
            return;
        }

        debug!("Score of {} is increased by {increase} to {value}", track.name());
        value
    } else {
        warn!(
            "No valid parameters in attempt to update score of {}. Score is (still) {current}",
            track.name()
        );
        return;
    };

    track.score = new_score;
}

/// Updates a track's play count: `-1` resets, a zero `increase` sets the
/// count to `play_count`, otherwise the increase is applied.
pub fn update_playcount(track: &mut Track, play_count: i32, increase: i32) {
    let new_count = if play_count == -1 {
        debug!("Play count of {} has been reset to 0", track.name());
        0
    } else if increase == 0 {
        debug!("Play count of {} is now set to {play_count}", track.name());
        play_count
    } else {
        let value = track.play_count + increase;

        if value < 0 {
            warn!(
                "Increasing play count of {} resulted in an invalid value {value}; value is unchanged",
                track.name()
            );
            return;
        }

        debug!("Play count of {} is increased by {increase} to {value}", track.name());
        value
    };

    track.play_count = new_count;
}

/// Updates a track's skip count; same contract as [`update_playcount`].
pub fn update_skipcount(track: &mut Track, skip_count: i32, increase: i32) {
    let new_count = if skip_count == -1 {
        debug!("Skip count of {} has been reset to 0", track.name());
        0
    } else if increase == 0 {
        debug!("Skip count of {} is now set to {skip_count}", track.name());
        skip_count
    } else {
        let value = track.skip_count + increase;

        if value < 0 {
            warn!(
                "Increasing skip count of {} resulted in an invalid value {value}; value is unchanged",
                track.name()
            );
            return;
        }

        debug!("Skip count of {} is increased by {increase} to {value}", track.name());
        value
    };

    track.skip_count = new_count;
}

/// Updates a track's last-played timestamp: `-1` resets, any non-negative
/// timestamp sets it, otherwise `increase` is added.
pub fn update_lastplayed(track: &mut Track, last_played: i64, increase: i64) {
    let new_value = if last_played == -1 {
        debug!("Last played of {} has been reset to 0", track.name());
        0
    } else if last_played >= 0 {
        debug!("Last played of {} is now set to {last_played}", track.name());
        last_played
    } else {
        let value = track.last_played + increase;

        if value <= 0 {
            warn!(
                "Increasing last played of {} resulted in an invalid value {value}; value is unchanged",
                track.name()
            );
            return;
        }

        debug!("Last played of {} is increased by {increase} to {value}", track.name());
        value
    };

    track.last_played = new_value;
}

/// Folds a finished play into the track's score.
///
/// Must run *before* the play count is incremented: the score update uses
/// the pre-increment count as the weight of the running average. The
/// averaging scheme follows the Amarok music player: for the first play the
/// new score is the mean of the old score and `played_fraction * 100`,
/// afterwards it is the play-count-weighted mean.
pub fn modify_and_update_score(track: &mut Track, played_fraction: f64, policy: &UpdatePolicy) {
    if policy.incognito {
        info!("Incognito mode active; not updating score");
        return;
    }

    if !(0.0..=1.0).contains(&played_fraction) {
        info!("Invalid calculated played fraction");
        return;
    }

    let fraction = if played_fraction >= policy.full_played_fraction {
        debug!("Over full played fraction setting; using a fraction of 1.0");
        1.0
    } else {
        played_fraction
    };

    let play_count = track.play_count;
    let old_score = track.score;

    if !score_is_valid(old_score) {
        warn!("Invalid score {old_score}");
        return;
    }

    let new_score = if play_count <= 0 {
        // Average of old and new; default score for new tracks is 50
        (old_score + fraction * 100.0) / 2.0
    } else {
        (old_score * f64::from(play_count) + fraction * 100.0) / f64::from(play_count + 1)
    };

    update_score(track, new_score.clamp(SCORE_MIN, SCORE_MAX), 0.0);
}

/// Increments (or decrements) the play count if the play was long enough to
/// count at all.
pub fn modify_and_update_playcount(
    track: &mut Track,
    played_fraction: f64,
    decrease: bool,
    policy: &UpdatePolicy,
) {
    if policy.incognito {
        info!("Incognito mode active; not updating play count");
        return;
    }

    if played_fraction < policy.min_played_fraction {
        info!("Below minimum played fraction; not updating play count");
        return;
    }

    update_playcount(track, 0, if decrease { -1 } else { 1 });
}

/// Increments (or decrements) the skip count, unless the track was played
/// nearly to the end: advancing past the trailing silence is not a skip.
pub fn modify_and_update_skipcount(
    track: &mut Track,
    played_fraction: f64,
    decrease: bool,
    policy: &UpdatePolicy,
) {
    if policy.incognito {
        info!("Incognito mode active; not updating skip count");
        return;
    }

    if played_fraction > policy.full_played_fraction {
        info!("Above full played fraction; not updating skip count");
        return;
    }

    update_skipcount(track, 0, if decrease { -1 } else { 1 });
}

/// Stamps the track with `timestamp` if the play was long enough to count.
///
/// The caller captures the timestamp once per batch of updates so that every
/// track touched by the same event shares an identical value.
pub fn modify_and_update_lastplayed(
    track: &mut Track,
    played_fraction: f64,
    timestamp: i64,
    policy: &UpdatePolicy,
) {
    if policy.incognito {
        info!("Incognito mode active; not updating last played");
        return;
    }

    if played_fraction < policy.min_played_fraction {
        info!("Below minimum played fraction; not updating last played");
        return;
    }

    update_lastplayed(track, timestamp, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UpdatePolicy {
        StatsConfig::default().policy(false)
    }

    fn incognito_policy() -> UpdatePolicy {
        StatsConfig::default().policy(true)
    }

    #[test]
    fn validators_accept_ranges() {
        assert!(rating_is_valid(0));
        assert!(rating_is_valid(100));
        assert!(!rating_is_valid(-1));
        assert!(!rating_is_valid(101));

        assert!(score_is_valid(0.0));
        assert!(score_is_valid(100.0));
        assert!(!score_is_valid(-0.1));
        assert!(!score_is_valid(100.1));

        assert!(playcount_is_valid(0));
        assert!(!playcount_is_valid(-1));
        assert!(skipcount_is_valid(5));
        assert!(!skipcount_is_valid(-5));
        assert!(lastplayed_is_valid(0));
        assert!(!lastplayed_is_valid(-1));
    }

    #[test]
    fn invert_rating_keeps_unset_sentinel() {
        assert_eq!(invert_rating(0), 0);
        assert_eq!(invert_rating(1), 99);
        assert_eq!(invert_rating(100), 0);
        assert_eq!(invert_rating(80), 20);
    }

    #[test]
    fn invert_score_mirrors_range() {
        assert_eq!(invert_score(0.0), 100.0);
        assert_eq!(invert_score(100.0), 0.0);
        assert_eq!(invert_score(25.0), 75.0);
    }

    #[test]
    fn update_rating_set_reset_increase() {
        let mut track = crate::track::Track::new("t");

        update_rating(&mut track, 80, 0);
        assert_eq!(track.rating, 80);

        update_rating(&mut track, 0, 10);
        assert_eq!(track.rating, 90);

        // Out-of-range result is refused
        update_rating(&mut track, 0, 20);
        assert_eq!(track.rating, 90);

        update_rating(&mut track, -1, 0);
        assert_eq!(track.rating, 0);
    }

    #[test]
    fn update_playcount_refuses_negative_result() {
        let mut track = crate::track::Track::new("t");
        update_playcount(&mut track, 0, -1);
        assert_eq!(track.play_count, 0);

        update_playcount(&mut track, 0, 1);
        update_playcount(&mut track, 0, -1);
        assert_eq!(track.play_count, 0);
    }

    #[test]
    fn first_play_score_is_mean_of_old_and_new() {
        let mut track = crate::track::Track::new("t");
        assert_eq!(track.score, 50.0);
        assert_eq!(track.play_count, 0);

        modify_and_update_score(&mut track, 1.0, &policy());
        assert_eq!(track.score, 75.0);
    }

    #[test]
    fn score_uses_preincrement_playcount_as_weight() {
        let mut track = crate::track::Track::new("t");
        track.score = 60.0;
        track.play_count = 3;

        // (60 * 3 + 100) / 4 = 70
        modify_and_update_score(&mut track, 1.0, &policy());
        assert_eq!(track.score, 70.0);
    }

    #[test]
    fn score_treats_near_full_play_as_full() {
        let mut track = crate::track::Track::new("t");

        // 0.9 >= full_played_fraction (0.8), so treated as 1.0
        modify_and_update_score(&mut track, 0.9, &policy());
        assert_eq!(track.score, 75.0);
    }

    #[test]
    fn score_rejects_invalid_fraction() {
        let mut track = crate::track::Track::new("t");
        modify_and_update_score(&mut track, 1.5, &policy());
        modify_and_update_score(&mut track, -0.1, &policy());
        assert_eq!(track.score, 50.0);
    }

    #[test]
    fn playcount_gated_by_minimum_fraction() {
        let mut track = crate::track::Track::new("t");

        modify_and_update_playcount(&mut track, 0.1, false, &policy());
        assert_eq!(track.play_count, 0);

        modify_and_update_playcount(&mut track, 0.2, false, &policy());
        assert_eq!(track.play_count, 1);
    }

    #[test]
    fn skipcount_not_incremented_for_near_full_play() {
        let mut track = crate::track::Track::new("t");

        modify_and_update_skipcount(&mut track, 0.9, false, &policy());
        assert_eq!(track.skip_count, 0);

        modify_and_update_skipcount(&mut track, 0.5, false, &policy());
        assert_eq!(track.skip_count, 1);
    }

    #[test]
    fn lastplayed_uses_supplied_timestamp() {
        let mut track = crate::track::Track::new("t");

        modify_and_update_lastplayed(&mut track, 1.0, 1_700_000_000, &policy());
        assert_eq!(track.last_played, 1_700_000_000);

        // Too short to count
        modify_and_update_lastplayed(&mut track, 0.05, 1_800_000_000, &policy());
        assert_eq!(track.last_played, 1_700_000_000);
    }

    #[test]
    fn incognito_suppresses_every_update() {
        let mut track = crate::track::Track::new("t");
        track.rating = 40;

        modify_and_update_score(&mut track, 1.0, &incognito_policy());
        modify_and_update_playcount(&mut track, 1.0, false, &incognito_policy());
        modify_and_update_skipcount(&mut track, 0.3, false, &incognito_policy());
        modify_and_update_lastplayed(&mut track, 1.0, 123, &incognito_policy());

        assert_eq!(track.score, 50.0);
        assert_eq!(track.play_count, 0);
        assert_eq!(track.skip_count, 0);
        assert_eq!(track.last_played, 0);
        assert_eq!(track.rating, 40);
    }
}
