mod models;
mod schema;
mod store;
mod trait_def;
mod validation;

pub use models::*;
pub use schema::SONG_VERSIONED_SCHEMAS;
pub use store::SqliteSongStore;
pub use trait_def::{SongStore, StoreError, StoreResult};
pub use validation::{validate_rating, validate_song, ValidationError, ValidationResult};
