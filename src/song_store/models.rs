//! Song model and the fixed audio-feature schema.
//!
//! Every numeric column of a song is described once by [`AudioFeature`]:
//! its model name, the key used by column-oriented exports, whether it is
//! an integer or a float, the value used when an import provides nothing
//! usable, and the range values are expected to fall in.

use serde::{Deserialize, Serialize};

/// Title used when an imported row has no usable title.
pub const DEFAULT_TITLE: &str = "Untitled Song";

/// Lowest accepted rating.
pub const MIN_RATING: i64 = 1;

/// Highest accepted rating.
pub const MAX_RATING: i64 = 5;

/// Maximum length of `song_id` and `title`.
pub const MAX_TEXT_FIELD_LEN: usize = 255;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeatureValue {
    Integer(i64),
    Float(f64),
}

impl FeatureValue {
    pub fn as_f64(self) -> f64 {
        match self {
            FeatureValue::Integer(v) => v as f64,
            FeatureValue::Float(v) => v,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeatureKind {
    Integer { default: i64 },
    Float { default: f64 },
}

impl FeatureKind {
    pub fn default_value(self) -> FeatureValue {
        match self {
            FeatureKind::Integer { default } => FeatureValue::Integer(default),
            FeatureKind::Float { default } => FeatureValue::Float(default),
        }
    }
}

/// Expected (not enforced) range for a feature value, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureBounds {
    pub min: f64,
    pub max: f64,
}

impl FeatureBounds {
    const fn new(min: f64, max: f64) -> Self {
        FeatureBounds { min, max }
    }

    const UNIT: FeatureBounds = FeatureBounds::new(0.0, 1.0);

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioFeature {
    Danceability,
    Energy,
    Acousticness,
    Tempo,
    DurationMs,
    NumSections,
    NumSegments,
    Key,
    Loudness,
    Mode,
    TimeSignature,
    NumBars,
    SongClass,
    Instrumentalness,
    Liveness,
    Valence,
}

impl AudioFeature {
    pub const ALL: [AudioFeature; 16] = [
        AudioFeature::Danceability,
        AudioFeature::Energy,
        AudioFeature::Acousticness,
        AudioFeature::Tempo,
        AudioFeature::DurationMs,
        AudioFeature::NumSections,
        AudioFeature::NumSegments,
        AudioFeature::Key,
        AudioFeature::Loudness,
        AudioFeature::Mode,
        AudioFeature::TimeSignature,
        AudioFeature::NumBars,
        AudioFeature::SongClass,
        AudioFeature::Instrumentalness,
        AudioFeature::Liveness,
        AudioFeature::Valence,
    ];

    /// Name of the model field and database column.
    pub fn name(self) -> &'static str {
        match self {
            AudioFeature::Danceability => "danceability",
            AudioFeature::Energy => "energy",
            AudioFeature::Acousticness => "acousticness",
            AudioFeature::Tempo => "tempo",
            AudioFeature::DurationMs => "duration_ms",
            AudioFeature::NumSections => "num_sections",
            AudioFeature::NumSegments => "num_segments",
            AudioFeature::Key => "key",
            AudioFeature::Loudness => "loudness",
            AudioFeature::Mode => "mode",
            AudioFeature::TimeSignature => "time_signature",
            AudioFeature::NumBars => "num_bars",
            AudioFeature::SongClass => "song_class",
            AudioFeature::Instrumentalness => "instrumentalness",
            AudioFeature::Liveness => "liveness",
            AudioFeature::Valence => "valence",
        }
    }

    /// Key used for this feature in column-oriented exports.
    pub fn export_key(self) -> &'static str {
        match self {
            AudioFeature::SongClass => "class",
            other => other.name(),
        }
    }

    pub fn kind(self) -> FeatureKind {
        match self {
            AudioFeature::DurationMs
            | AudioFeature::NumSections
            | AudioFeature::NumSegments
            | AudioFeature::Key
            | AudioFeature::Mode
            | AudioFeature::NumBars
            | AudioFeature::SongClass => FeatureKind::Integer { default: 0 },
            AudioFeature::TimeSignature => FeatureKind::Integer { default: 4 },
            AudioFeature::Tempo => FeatureKind::Float { default: 120.0 },
            AudioFeature::Loudness => FeatureKind::Float { default: -60.0 },
            AudioFeature::Danceability
            | AudioFeature::Energy
            | AudioFeature::Acousticness
            | AudioFeature::Instrumentalness
            | AudioFeature::Liveness
            | AudioFeature::Valence => FeatureKind::Float { default: 0.0 },
        }
    }

    pub fn bounds(self) -> Option<FeatureBounds> {
        match self {
            AudioFeature::Danceability
            | AudioFeature::Energy
            | AudioFeature::Acousticness
            | AudioFeature::Instrumentalness
            | AudioFeature::Liveness
            | AudioFeature::Valence => Some(FeatureBounds::UNIT),
            AudioFeature::Tempo => Some(FeatureBounds::new(0.0, 300.0)),
            AudioFeature::Loudness => Some(FeatureBounds::new(-60.0, 0.0)),
            AudioFeature::DurationMs => Some(FeatureBounds::new(0.0, f64::INFINITY)),
            _ => None,
        }
    }
}

/// A song with its audio features, as stored and as served.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub danceability: f64,
    pub energy: f64,
    pub acousticness: f64,
    pub tempo: f64,
    pub duration_ms: i64,
    pub num_sections: i64,
    pub num_segments: i64,
    pub rating: Option<i64>,
    pub key: i64,
    pub loudness: f64,
    pub mode: i64,
    pub time_signature: i64,
    pub num_bars: i64,
    pub song_class: i64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
}

impl Song {
    /// Creates an unrated song with every audio feature at its default.
    pub fn new<I: Into<String>, T: Into<String>>(song_id: I, title: T) -> Self {
        let mut song = Song {
            song_id: song_id.into(),
            title: title.into(),
            danceability: 0.0,
            energy: 0.0,
            acousticness: 0.0,
            tempo: 0.0,
            duration_ms: 0,
            num_sections: 0,
            num_segments: 0,
            rating: None,
            key: 0,
            loudness: 0.0,
            mode: 0,
            time_signature: 0,
            num_bars: 0,
            song_class: 0,
            instrumentalness: 0.0,
            liveness: 0.0,
            valence: 0.0,
        };
        for feature in AudioFeature::ALL {
            song.set_feature(feature, feature.kind().default_value());
        }
        song
    }

    pub fn with_rating(mut self, rating: Option<i64>) -> Self {
        self.rating = rating;
        self
    }

    /// Score of this song in the rating index: the rating, or 0 when unrated.
    pub fn score(&self) -> f64 {
        self.rating.unwrap_or(0) as f64
    }

    pub fn feature(&self, feature: AudioFeature) -> FeatureValue {
        use FeatureValue::{Float, Integer};
        match feature {
            AudioFeature::Danceability => Float(self.danceability),
            AudioFeature::Energy => Float(self.energy),
            AudioFeature::Acousticness => Float(self.acousticness),
            AudioFeature::Tempo => Float(self.tempo),
            AudioFeature::DurationMs => Integer(self.duration_ms),
            AudioFeature::NumSections => Integer(self.num_sections),
            AudioFeature::NumSegments => Integer(self.num_segments),
            AudioFeature::Key => Integer(self.key),
            AudioFeature::Loudness => Float(self.loudness),
            AudioFeature::Mode => Integer(self.mode),
            AudioFeature::TimeSignature => Integer(self.time_signature),
            AudioFeature::NumBars => Integer(self.num_bars),
            AudioFeature::SongClass => Integer(self.song_class),
            AudioFeature::Instrumentalness => Float(self.instrumentalness),
            AudioFeature::Liveness => Float(self.liveness),
            AudioFeature::Valence => Float(self.valence),
        }
    }

    /// Sets a feature, converting the value to the feature's kind.
    pub fn set_feature(&mut self, feature: AudioFeature, value: FeatureValue) {
        let as_int = match value {
            FeatureValue::Integer(v) => v,
            FeatureValue::Float(v) => v.trunc() as i64,
        };
        let as_float = value.as_f64();
        match feature {
            AudioFeature::Danceability => self.danceability = as_float,
            AudioFeature::Energy => self.energy = as_float,
            AudioFeature::Acousticness => self.acousticness = as_float,
            AudioFeature::Tempo => self.tempo = as_float,
            AudioFeature::DurationMs => self.duration_ms = as_int,
            AudioFeature::NumSections => self.num_sections = as_int,
            AudioFeature::NumSegments => self.num_segments = as_int,
            AudioFeature::Key => self.key = as_int,
            AudioFeature::Loudness => self.loudness = as_float,
            AudioFeature::Mode => self.mode = as_int,
            AudioFeature::TimeSignature => self.time_signature = as_int,
            AudioFeature::NumBars => self.num_bars = as_int,
            AudioFeature::SongClass => self.song_class = as_int,
            AudioFeature::Instrumentalness => self.instrumentalness = as_float,
            AudioFeature::Liveness => self.liveness = as_float,
            AudioFeature::Valence => self.valence = as_float,
        }
    }
}

/// Outcome of a committed rating update.
#[derive(Clone, Debug, PartialEq)]
pub struct RatingChange {
    pub song: Song,
    pub old_rating: Option<i64>,
}

impl RatingChange {
    /// Human readable transition, e.g. `None → 4` or `2 → 5`.
    pub fn describe(&self) -> String {
        let old = self
            .old_rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "None".to_string());
        let new = self
            .song
            .rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "None".to_string());
        format!("{} → {}", old, new)
    }
}
