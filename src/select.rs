//! Weighted-random selection: turns the filtered candidate set into one
//! chosen track.
//!
//! Every candidate is assigned a number of *entries* in a virtual raffle.
//! Each enabled statistic contributes `value × multiplier × 1000`; the
//! fixed scale keeps fractional multipliers meaningful without carrying
//! doubles through the draw. Counts and elapsed time are first mapped onto
//! `0..=100` by a saturating curve so a track with thousands of plays does
//! not drown out the rest.

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::filter::{self, FilterConfig};
use crate::stats;
use crate::track::{Track, TrackId};

/// Fixed point scale for entry contributions.
const ENTRY_SCALE: f64 = 1000.0;

/// Upper bound of the curve output range.
const MAX_ENTRIES: i64 = 100;

/// Shape constant of the rational curve used for play and skip counts.
const COUNT_SHAPE: i64 = 100;

/// Shape constant of the sqrt curve used for elapsed time. Chosen so the
/// curve tops out around one year (5616² seconds ≈ 365 days).
const TIME_SHAPE: i64 = 5616;

const ONE_YEAR: i64 = 365 * 24 * 60 * 60;

/// Parameters controlling how entries are distributed over candidates.
///
/// A statistic only contributes when its `use_` flag is set and its
/// multiplier is positive. Inverting a statistic favors low values; for the
/// rating this means unrated tracks keep zero entries instead of receiving
/// `default_rating`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityConfig {
    pub use_rating: bool,
    pub use_score: bool,
    pub use_playcount: bool,
    pub use_skipcount: bool,
    pub use_lastplayed: bool,

    pub invert_rating: bool,
    pub invert_score: bool,
    pub invert_playcount: bool,
    pub invert_skipcount: bool,
    pub invert_lastplayed: bool,

    /// Rating to assume for unrated tracks (only when not inverting).
    pub default_rating: i32,

    pub rating_multiplier: f64,
    pub score_multiplier: f64,
    pub playcount_multiplier: f64,
    pub skipcount_multiplier: f64,
    pub lastplayed_multiplier: f64,
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            use_rating: true,
            use_score: false,
            use_playcount: false,
            use_skipcount: false,
            use_lastplayed: true,
            invert_rating: false,
            invert_score: false,
            invert_playcount: false,
            invert_skipcount: true,
            invert_lastplayed: false,
            default_rating: 0,
            rating_multiplier: 1.0,
            score_multiplier: 1.0,
            playcount_multiplier: 1.0,
            skipcount_multiplier: 1.0,
            lastplayed_multiplier: 1.0,
        }
    }
}

/// Scaled per-statistic factors, resolved once per selection round.
#[derive(Debug, Default)]
struct Modifiers {
    rating_factor: f64,
    score_factor: f64,
    playcount_factor: f64,
    skipcount_factor: f64,
    lastplayed_factor: f64,
    favor_low_rating: bool,
    favor_low_score: bool,
    favor_low_playcount: bool,
    favor_low_skipcount: bool,
    favor_low_lastplayed: bool,
    default_rating: i32,
}

impl Modifiers {
    fn from_config(config: &ProbabilityConfig) -> Self {
        let mut modifiers = Self::default();

        if config.use_rating && config.rating_multiplier > 0.0 {
            modifiers.rating_factor = config.rating_multiplier * ENTRY_SCALE;
            modifiers.favor_low_rating = config.invert_rating;
            modifiers.default_rating = config.default_rating;
            info!("Probability: use rating (invert: {})", config.invert_rating);
        }

        if config.use_score && config.score_multiplier > 0.0 {
            modifiers.score_factor = config.score_multiplier * ENTRY_SCALE;
            modifiers.favor_low_score = config.invert_score;
            info!("Probability: use score (invert: {})", config.invert_score);
        }

        if config.use_playcount && config.playcount_multiplier > 0.0 {
            modifiers.playcount_factor = config.playcount_multiplier * ENTRY_SCALE;
            modifiers.favor_low_playcount = config.invert_playcount;
            info!("Probability: use play count (invert: {})", config.invert_playcount);
        }

        if config.use_skipcount && config.skipcount_multiplier > 0.0 {
            modifiers.skipcount_factor = config.skipcount_multiplier * ENTRY_SCALE;
            modifiers.favor_low_skipcount = config.invert_skipcount;
            info!("Probability: use skip count (invert: {})", config.invert_skipcount);
        }

        if config.use_lastplayed && config.lastplayed_multiplier > 0.0 {
            modifiers.lastplayed_factor = config.lastplayed_multiplier * ENTRY_SCALE;
            modifiers.favor_low_lastplayed = config.invert_lastplayed;
            info!("Probability: use last played (invert: {})", config.invert_lastplayed);
        }

        modifiers
    }
}

/// One candidate with its raffle entries.
#[derive(Debug, Clone, Copy)]
struct WeightedTrack<'a> {
    track: &'a Track,
    entries: i64,
}

/// Picks one track from `candidates` with probability proportional to its
/// entry count. Returns `None` when no candidate qualifies.
pub fn select<'a>(
    candidates: &[&'a Track],
    config: &ProbabilityConfig,
    now: i64,
    rng: &mut impl Rng,
) -> Option<&'a Track> {
    if candidates.is_empty() {
        return None;
    }

    let modifiers = Modifiers::from_config(config);
    let (weighted, total) = calculate_entries(candidates, &modifiers, now);

    if total <= 0 {
        info!("No qualified songs");
        return None;
    }

    let draw = rng.gen_range(1..=total);

    pick_winner(&weighted, draw, total)
}

/// Runs the full decision: filter pipeline, then the weighted draw.
pub fn choose_new_track<'a>(
    library: Vec<&'a Track>,
    previously_played: &[TrackId],
    upcoming: &[TrackId],
    recent_artists: &[u32],
    filter_config: Option<&FilterConfig>,
    probability_config: &ProbabilityConfig,
    now: i64,
    rng: &mut impl Rng,
) -> Option<&'a Track> {
    if library.is_empty() {
        return None;
    }

    let candidates = filter::filter(
        library,
        previously_played,
        upcoming,
        recent_artists,
        filter_config,
        now,
    );

    select(&candidates, probability_config, now, rng)
}

/// Computes the entry count of every candidate and the qualifying total.
///
/// Contributions accumulate as `f64` and are rounded once per track. A
/// negative sum disqualifies the track; a zero sum is bumped to one entry
/// so enabled-but-neutral statistics never make a track unreachable.
fn calculate_entries<'a>(
    candidates: &[&'a Track],
    modifiers: &Modifiers,
    now: i64,
) -> (Vec<WeightedTrack<'a>>, i64) {
    let mut weighted = Vec::with_capacity(candidates.len());
    let mut total: i64 = 0;

    for &track in candidates {
        let mut acc = 0.0_f64;

        if modifiers.rating_factor != 0.0 {
            let rating = track.rating;

            if stats::rating_is_valid(rating) {
                let rating = if modifiers.favor_low_rating {
                    stats::invert_rating(rating)
                } else if rating == 0 {
                    modifiers.default_rating
                } else {
                    rating
                };

                acc += f64::from(rating) * modifiers.rating_factor;
            }
        }

        if modifiers.score_factor != 0.0 {
            let score = track.score;

            if stats::score_is_valid(score) {
                let score = if modifiers.favor_low_score {
                    stats::invert_score(score)
                } else {
                    score
                };

                acc += score * modifiers.score_factor;
            }
        }

        if modifiers.playcount_factor != 0.0 && stats::playcount_is_valid(track.play_count) {
            let value = count_entries(track.play_count, modifiers.favor_low_playcount);
            acc += value as f64 * modifiers.playcount_factor;
        }

        if modifiers.skipcount_factor != 0.0 && stats::skipcount_is_valid(track.skip_count) {
            let value = count_entries(track.skip_count, modifiers.favor_low_skipcount);
            acc += value as f64 * modifiers.skipcount_factor;
        }

        if modifiers.lastplayed_factor != 0.0 && stats::lastplayed_is_valid(track.last_played) {
            let since = now - track.last_played;

            // Anything beyond a year saturates at the curve maximum
            let value = if since > ONE_YEAR {
                MAX_ENTRIES
            } else {
                time_entries(since, modifiers.favor_low_lastplayed)
            };

            acc += value as f64 * modifiers.lastplayed_factor;
        }

        let entries = acc.round() as i64;

        if entries < 0 {
            debug!("{} disqualified", track.name());
            continue;
        }

        // Enabled modifiers that all came out neutral still leave the
        // track reachable
        let entries = entries.max(1);

        debug!("Song <{}> has {} entries", track.name(), entries);

        weighted.push(WeightedTrack { track, entries });
        total += entries;
    }

    (weighted, total)
}

/// Walks the cumulative entry counts; the first track whose running sum
/// reaches `draw` wins.
fn pick_winner<'a>(weighted: &[WeightedTrack<'a>], draw: i64, total: i64) -> Option<&'a Track> {
    let mut sum: i64 = 0;

    for item in weighted {
        if item.entries <= 0 {
            debug!("Invalid entry count {}/{total}", item.entries);
            continue;
        }

        sum += item.entries;

        if sum >= draw {
            info!("Winner (entry {draw}/{total}): {}", item.track.name());
            return Some(item.track);
        }
    }

    warn!("Failed to draw a winner (entry {draw}/{total})");
    None
}

/// Rational saturating curve for play and skip counts.
///
/// `f(x) = r - a*r/(x + a)` with `a = r = 100`: zero maps to zero, the
/// shape constant maps to `r/2` and the curve approaches `r` as the count
/// grows. Inverting yields `a*r/(x + a)` instead, favoring low counts.
fn count_entries(count: i32, invert: bool) -> i64 {
    let x = i64::from(count.max(0));
    let (a, r) = (COUNT_SHAPE, MAX_ENTRIES);

    let fraction = (a as f64 * r as f64) / ((x + a) as f64);

    if invert {
        fraction as i64
    } else {
        r - fraction as i64
    }
}

/// Square-root curve for the time since last playback.
///
/// `f(x) = r*sqrt(x)/a` with `r = 100`, `a = 5616`: zero elapsed maps to
/// zero and a full year maps to `r`. Inverting yields `r - r*sqrt(x)/a`,
/// favoring recently played tracks.
fn time_entries(time_since: i64, invert: bool) -> i64 {
    let x = time_since.clamp(0, ONE_YEAR);
    let (a, r) = (TIME_SHAPE, MAX_ENTRIES);

    let value = (r as f64 * (x as f64).sqrt()) / a as f64;

    if invert {
        r - value as i64
    } else {
        value as i64
    }
}
