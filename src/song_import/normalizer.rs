//! Turns uploaded JSON documents into row-oriented song records.
//!
//! Two layouts are understood. A column-oriented export maps each field to
//! an object keyed by row index (`{"id": {"0": "s1"}, "title": {"0": "A"}}`),
//! optionally wrapped in a single-element list. A row-oriented document is a
//! list of song objects.

use crate::song_store::{AudioFeature, FeatureValue};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One song record keyed by model field name, before coercion.
pub type RawRow = Map<String, Value>;

#[derive(Debug, Error)]
pub enum MalformedInput {
    #[error("Invalid JSON file format. Could not decode JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("JSON file must contain a list of song objects or a single column-oriented object")]
    UnexpectedShape,
}

/// Decodes an uploaded file and normalizes it into rows.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<RawRow>, MalformedInput> {
    let document: Value = serde_json::from_slice(bytes).map_err(MalformedInput::InvalidJson)?;
    normalize_document(document)
}

fn is_column_oriented(object: &Map<String, Value>) -> bool {
    matches!(object.get("id"), Some(Value::Object(_)))
}

pub fn normalize_document(document: Value) -> Result<Vec<RawRow>, MalformedInput> {
    match document {
        Value::Object(object) if is_column_oriented(&object) => {
            info!("Detected column-oriented song export");
            Ok(normalize_columns(&object))
        }
        Value::Array(items) => {
            if let [Value::Object(object)] = items.as_slice() {
                if is_column_oriented(object) {
                    info!("Detected list containing a single column-oriented song export");
                    return Ok(normalize_columns(object));
                }
            }
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(normalize_row(row)),
                    _ => Err(MalformedInput::UnexpectedShape),
                })
                .collect()
        }
        _ => Err(MalformedInput::UnexpectedShape),
    }
}

/// Renames export keys of a row-oriented record to model field names.
fn normalize_row(mut row: RawRow) -> RawRow {
    for (alias, field) in [("id", "song_id"), ("class", "song_class")] {
        if !row.contains_key(field) {
            if let Some(value) = row.remove(alias) {
                row.insert(field.to_string(), value);
            }
        }
    }
    row
}

fn trimmed(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn normalize_columns(columns: &Map<String, Value>) -> Vec<RawRow> {
    let cell = |key: &str, index: &str| -> Option<Value> {
        columns
            .get(key)
            .and_then(Value::as_object)
            .and_then(|column| column.get(index))
            .filter(|value| !value.is_null())
            .cloned()
            .map(trimmed)
    };

    let num_rows = columns
        .get("id")
        .and_then(Value::as_object)
        .map(|ids| ids.len())
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(num_rows);
    for i in 0..num_rows {
        let index = i.to_string();
        let mut row = RawRow::new();

        if let Some(song_id) = cell("id", &index) {
            row.insert("song_id".to_string(), song_id);
        }
        if let Some(title) = cell("title", &index) {
            row.insert("title".to_string(), title);
        }
        for feature in AudioFeature::ALL {
            let value = match cell(feature.export_key(), &index) {
                Some(value) => value,
                None => {
                    debug!(
                        "Applying default for missing field '{}' at index {}",
                        feature.name(),
                        i
                    );
                    match feature.kind().default_value() {
                        FeatureValue::Integer(v) => Value::from(v),
                        FeatureValue::Float(v) => Value::from(v),
                    }
                }
            };
            row.insert(feature.name().to_string(), value);
        }
        row.insert("rating".to_string(), Value::Null);

        if is_blank(row.get("song_id")) || is_blank(row.get("title")) {
            warn!("Skipping song at index {} with missing song_id or title", i);
            continue;
        }
        rows.push(row);
    }
    rows
}
