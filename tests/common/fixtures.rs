//! Test data for end-to-end tests

use super::constants::*;
use serde_json::{json, Value};
use song_catalog_server::song_store::{Song, SongStore, SqliteSongStore};

/// Inserts the songs described in constants.rs.
pub fn seed_songs(store: &SqliteSongStore) {
    let mut first = Song::new(SONG_1_ID, SONG_1_TITLE).with_rating(Some(5));
    first.danceability = 0.521;
    first.tempo = 108.0;
    first.duration_ms = 225_947;

    let mut second = Song::new(SONG_2_ID, SONG_2_TITLE).with_rating(Some(3));
    second.energy = 0.73;

    let third = Song::new(SONG_3_ID, SONG_3_TITLE);

    for song in [first, second, third] {
        store.upsert_song(&song).expect("Failed to seed song");
    }
}

/// A column-oriented export wrapped in a list, as produced by pandas.
pub fn column_oriented_upload() -> Value {
    json!([{
        "id": {"0": "new-1", "1": "new-2", "2": "new-3"},
        "title": {"0": "Imported One", "1": "Imported Two", "2": "Imported Three"},
        "danceability": {"0": 0.5, "1": 0.25, "2": null},
        "tempo": {"0": 98.2, "1": 130.0, "2": 120.0},
        "duration_ms": {"0": 200000, "1": 180000, "2": 190000},
        "class": {"0": 1, "1": 0, "2": 1}
    }])
}
