//! Per-field coercion of imported records into songs.

use super::normalizer::RawRow;
use crate::song_store::{
    AudioFeature, FeatureKind, FeatureValue, Song, DEFAULT_TITLE, MAX_RATING, MIN_RATING,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced<T> {
    Value(T),
    Missing,
    Invalid,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("Integrity error - song_id must be a non-empty string or an integer")]
    InvalidSongId,
}

pub fn coerce_integer(value: Option<&Value>) -> Coerced<i64> {
    match value {
        None | Some(Value::Null) => Coerced::Missing,
        Some(Value::Bool(b)) => Coerced::Value(i64::from(*b)),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_i64() {
                Coerced::Value(v)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                        Coerced::Value(f.trunc() as i64)
                    }
                    _ => Coerced::Invalid,
                }
            }
        }
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(v) => Coerced::Value(v),
            Err(_) => Coerced::Invalid,
        },
        Some(_) => Coerced::Invalid,
    }
}

pub fn coerce_float(value: Option<&Value>) -> Coerced<f64> {
    let parsed = match value {
        None | Some(Value::Null) => return Coerced::Missing,
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Coerced::Value(f),
        _ => Coerced::Invalid,
    }
}

/// Identity of a row, stringified. Integers are accepted as identifiers.
pub fn coerce_song_id(value: Option<&Value>) -> Result<String, RowError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(RowError::InvalidSongId),
    }
}

/// Identifier shown in row error messages, whatever the row contains.
pub fn display_song_id(row: &RawRow) -> String {
    match row.get("song_id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "N/A".to_string(),
    }
}

fn coerce_feature(row: &RawRow, feature: AudioFeature, song_id: &str) -> FeatureValue {
    let raw = row.get(feature.name());
    let kind = feature.kind();
    let coerced = match kind {
        FeatureKind::Integer { .. } => match coerce_integer(raw) {
            Coerced::Value(v) => Coerced::Value(FeatureValue::Integer(v)),
            Coerced::Missing => Coerced::Missing,
            Coerced::Invalid => Coerced::Invalid,
        },
        FeatureKind::Float { .. } => match coerce_float(raw) {
            Coerced::Value(v) => Coerced::Value(FeatureValue::Float(v)),
            Coerced::Missing => Coerced::Missing,
            Coerced::Invalid => Coerced::Invalid,
        },
    };

    match coerced {
        Coerced::Value(value) => {
            if let Some(bounds) = feature.bounds() {
                if !bounds.contains(value.as_f64()) {
                    warn!(
                        "Song {}: {} = {} is outside the expected range [{}, {}]",
                        song_id,
                        feature.name(),
                        value.as_f64(),
                        bounds.min,
                        bounds.max
                    );
                }
            }
            value
        }
        Coerced::Missing => kind.default_value(),
        Coerced::Invalid => {
            warn!(
                "Could not convert {} ({:?}) for song {}. Using default.",
                feature.name(),
                raw,
                song_id
            );
            kind.default_value()
        }
    }
}

fn coerce_rating(row: &RawRow, song_id: &str) -> Option<i64> {
    match coerce_integer(row.get("rating")) {
        Coerced::Value(r) if (MIN_RATING..=MAX_RATING).contains(&r) => Some(r),
        Coerced::Value(r) => {
            warn!("Invalid rating {} for song {}. Setting to None.", r, song_id);
            None
        }
        Coerced::Missing => None,
        Coerced::Invalid => {
            warn!(
                "Could not convert rating to an integer for song {}. Setting to None.",
                song_id
            );
            None
        }
    }
}

fn coerce_title(row: &RawRow, song_id: &str) -> String {
    match row.get("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => title.clone(),
        _ => {
            warn!("Song {} has a missing or invalid title. Using default.", song_id);
            DEFAULT_TITLE.to_string()
        }
    }
}

/// Builds a song out of a raw record.
///
/// Only an unusable `song_id` fails the row; every other field falls back
/// to its default.
pub fn coerce_song(row: &RawRow) -> Result<Song, RowError> {
    let song_id = coerce_song_id(row.get("song_id"))?;
    let mut song = Song::new(song_id, coerce_title(row, display_song_id(row).as_str()));
    for feature in AudioFeature::ALL {
        let value = coerce_feature(row, feature, &song.song_id);
        song.set_feature(feature, value);
    }
    song.rating = coerce_rating(row, &song.song_id);
    debug!("Coerced song {}", song.song_id);
    Ok(song)
}
