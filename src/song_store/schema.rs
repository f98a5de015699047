//! Versioned schema of the song database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

pub const SONGS_TABLE_V_1: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!(
            "song_id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Integer),
        sqlite_column!(
            "danceability",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0.0")
        ),
        sqlite_column!(
            "energy",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0.0")
        ),
        sqlite_column!(
            "acousticness",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0.0")
        ),
        sqlite_column!(
            "tempo",
            &SqlType::Real,
            non_null = true,
            default_value = Some("120.0")
        ),
        sqlite_column!(
            "duration_ms",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "num_sections",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "num_segments",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "key",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "loudness",
            &SqlType::Real,
            non_null = true,
            default_value = Some("-60.0")
        ),
        sqlite_column!(
            "mode",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "time_signature",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("4")
        ),
        sqlite_column!(
            "num_bars",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "song_class",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "instrumentalness",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0.0")
        ),
        sqlite_column!(
            "liveness",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0.0")
        ),
        sqlite_column!(
            "valence",
            &SqlType::Real,
            non_null = true,
            default_value = Some("0.0")
        ),
    ],
    indices: &[("idx_songs_rating", "rating"), ("idx_songs_title", "title")],
    checks: &["rating IS NULL OR (rating >= 1 AND rating <= 5)"],
};

pub const SONG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[SONGS_TABLE_V_1],
}];

/// Column list shared by every query that reads or writes a full song.
pub const SONG_COLUMNS: &str = "song_id, title, rating, danceability, energy, acousticness, \
     tempo, duration_ms, num_sections, num_segments, key, loudness, mode, time_signature, \
     num_bars, song_class, instrumentalness, liveness, valence";
