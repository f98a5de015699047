//! Bulk import of songs.

use super::coercion::{coerce_song, display_song_id};
use super::normalizer::RawRow;
use crate::server::metrics;
use crate::song_store::{Song, StoreError, StoreResult};
use crate::song_sync::CacheSynchronizer;
use serde::Serialize;
use tracing::{error, info, warn};

/// Only the first errors are reported back to the uploader.
pub const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub processed_records: usize,
    pub skipped_records: usize,
    pub total_records: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ImportSummary {
    fn record_processed(&mut self) {
        self.processed_records += 1;
        self.total_records += 1;
    }

    fn record_skipped(&mut self, row_number: usize, song_id: &str, reason: String) {
        let message = format!("Row {} (song_id: {}): {}", row_number, song_id, reason);
        warn!("{}", message);
        self.skipped_records += 1;
        self.total_records += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(message);
        }
    }
}

fn store_error_reason(err: &StoreError) -> String {
    match err {
        StoreError::Integrity(detail) => format!(
            "Integrity error - {}. This song ID might already exist or a NOT NULL field is missing.",
            detail
        ),
        other => format!("Error processing - {}", other),
    }
}

#[derive(Clone)]
pub struct SongImporter {
    sync: CacheSynchronizer,
}

impl SongImporter {
    pub fn new(sync: CacheSynchronizer) -> Self {
        SongImporter { sync }
    }

    /// Upserts `rows` in one transaction, then rebuilds the cache.
    ///
    /// Rows that can't be coerced or written are skipped and reported in the
    /// summary. The error case means the transaction as a whole failed and
    /// nothing was written.
    pub fn import_rows(&self, rows: &[RawRow]) -> StoreResult<ImportSummary> {
        // Row number (1-based) and display id of every song sent to the store.
        let mut pending: Vec<(usize, String)> = Vec::with_capacity(rows.len());
        let mut songs: Vec<Song> = Vec::with_capacity(rows.len());
        let mut rejected: Vec<(usize, String, String)> = vec![];

        for (index, row) in rows.iter().enumerate() {
            match coerce_song(row) {
                Ok(song) => {
                    pending.push((index + 1, song.song_id.clone()));
                    songs.push(song);
                }
                Err(err) => rejected.push((index + 1, display_song_id(row), err.to_string())),
            }
        }

        let batch_result = self.sync.store().upsert_batch(&songs);

        // The cache is refreshed whether or not the batch committed.
        if let Err(err) = self.sync.rebuild_from_store() {
            error!("Failed to read songs back for the cache rebuild: {}", err);
        }

        let outcomes = batch_result?;

        let mut reports: Vec<(usize, String, Result<(), String>)> = rejected
            .into_iter()
            .map(|(row, id, reason)| (row, id, Err(reason)))
            .collect();
        for ((row, id), outcome) in pending.into_iter().zip(outcomes) {
            let outcome = outcome.map(|_| ()).map_err(|e| store_error_reason(&e));
            reports.push((row, id, outcome));
        }
        reports.sort_by_key(|(row, _, _)| *row);

        let mut summary = ImportSummary::default();
        for (row, id, outcome) in reports {
            match outcome {
                Ok(()) => summary.record_processed(),
                Err(reason) => summary.record_skipped(row, &id, reason),
            }
        }

        metrics::record_import_rows("processed", summary.processed_records);
        metrics::record_import_rows("skipped", summary.skipped_records);
        info!(
            "Imported songs: {} processed, {} skipped",
            summary.processed_records, summary.skipped_records
        );
        Ok(summary)
    }
}
