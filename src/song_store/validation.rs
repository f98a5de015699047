//! Validation for songs.
//!
//! Runs before any write so that an invalid song never reaches the database.

use super::models::{Song, MAX_RATING, MAX_TEXT_FIELD_LEN, MIN_RATING};
use std::fmt;

/// Validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField {
        field: &'static str,
    },
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    RatingOutOfRange {
        value: i64,
    },
    RatingNotInteger {
        raw: String,
    },
    MissingField {
        field: &'static str,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' is required but was empty", field)
            }
            ValidationError::FieldTooLong { field, max, actual } => write!(
                f,
                "Field '{}' must be at most {} characters, got {}",
                field, max, actual
            ),
            ValidationError::RatingOutOfRange { .. } => {
                write!(f, "Rating must be between {} and {}", MIN_RATING, MAX_RATING)
            }
            ValidationError::RatingNotInteger { .. } => write!(
                f,
                "Rating must be a number between {} and {}",
                MIN_RATING, MAX_RATING
            ),
            ValidationError::MissingField { field } => {
                if *field == "rating" {
                    write!(f, "Rating is required")
                } else {
                    write!(f, "{} is required in payload", field)
                }
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::RatingOutOfRange { value: rating });
    }
    Ok(())
}

fn validate_text(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    let actual = value.chars().count();
    if actual > MAX_TEXT_FIELD_LEN {
        return Err(ValidationError::FieldTooLong {
            field,
            max: MAX_TEXT_FIELD_LEN,
            actual,
        });
    }
    Ok(())
}

/// Validate a song before it is written.
pub fn validate_song(song: &Song) -> ValidationResult<()> {
    validate_text("song_id", &song.song_id)?;
    validate_text("title", &song.title)?;
    if let Some(rating) = song.rating {
        validate_rating(rating)?;
    }
    Ok(())
}
