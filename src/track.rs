//! Track data model shared by every part of the decision core.
//!
//! The engine never owns a track's canonical storage; history lists and
//! weighted-entry sets only hold [`TrackId`] handles into a [`TrackStore`]
//! (see the `library` module) and borrow `&Track` for the duration of a
//! filtering or selection round.
//!
//! [`TrackStore`]: crate::library::TrackStore

use serde::{Deserialize, Serialize};

/// Stable identifier of a track, derived from its URI.
///
/// Computed with FNV-1a so the same URI always maps to the same id, which
/// keeps history lists meaningful across library reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

/// Playability state of a track.
///
/// Anything other than `Available` must never be chosen or scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackStatus {
    #[default]
    Available,
    Playing,
    Missing,
    Unknown,
}

/// Default score for a track that has never been rated by playback.
pub const DEFAULT_SCORE: f64 = 50.0;

/// A single library track with its five mutable statistics.
///
/// Fields follow the ranges in the statistics module: rating `0` means
/// unset (else `1..=100`), score lives in `0.0..=100.0`, counts are
/// non-negative and `last_played` is Unix seconds with `0` meaning never.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album_artist: String,
    #[serde(default)]
    pub status: TrackStatus,
    #[serde(default)]
    pub rating: i32,
    #[serde(default = "default_score")]
    pub score: f64,
    #[serde(default)]
    pub play_count: i32,
    #[serde(default)]
    pub skip_count: i32,
    #[serde(default)]
    pub last_played: i64,
    /// Runtime flag: the track currently occupies at least one slot of the
    /// user queue. Not part of the persisted model.
    #[serde(skip)]
    pub queued: bool,
}

fn default_score() -> f64 {
    DEFAULT_SCORE
}

impl Track {
    /// Creates an available track with neutral statistics.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: String::new(),
            artist: String::new(),
            album_artist: String::new(),
            status: TrackStatus::Available,
            rating: 0,
            score: DEFAULT_SCORE,
            play_count: 0,
            skip_count: 0,
            last_played: 0,
            queued: false,
        }
    }

    /// The track's stable identifier, hashed from its URI.
    #[must_use]
    pub fn id(&self) -> TrackId {
        TrackId(fnv1a32(self.uri.as_bytes()))
    }

    /// Artist identity hash used by the diversity filter.
    ///
    /// The album artist takes precedence over the track artist; a track
    /// without either yields `0` and is never matched by the filter.
    #[must_use]
    pub fn artist_hash(&self) -> u32 {
        if !self.album_artist.is_empty() {
            fnv1a32(self.album_artist.as_bytes())
        } else if !self.artist.is_empty() {
            fnv1a32(self.artist.as_bytes())
        } else {
            0
        }
    }

    /// Display name for log messages: title if tagged, URI otherwise.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.title.is_empty() {
            &self.uri
        } else {
            &self.title
        }
    }

    /// Whether the track may take part in a selection round.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == TrackStatus::Available
    }
}

/// 32-bit FNV-1a over raw bytes.
#[must_use]
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let mut hash = OFFSET;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
