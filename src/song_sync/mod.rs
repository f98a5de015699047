mod synchronizer;

pub use synchronizer::{CacheSynchronizer, Listing, ListingSource};
