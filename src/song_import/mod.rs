mod coercion;
mod importer;
mod normalizer;

pub use coercion::{coerce_song, RowError};
pub use importer::{ImportSummary, SongImporter, MAX_REPORTED_ERRORS};
pub use normalizer::{normalize_document, parse_upload, MalformedInput, RawRow};
