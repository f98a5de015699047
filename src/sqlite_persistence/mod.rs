mod versioned_schema;

pub use versioned_schema::*;

/// Offset added to schema versions before they are written to `PRAGMA user_version`,
/// so that a database created by something else is not mistaken for one of ours.
pub const BASE_DB_VERSION: usize = 4200;
