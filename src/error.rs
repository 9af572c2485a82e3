//! Errors for the edges of the crate: record normalization, query strings,
//! configuration and favorites persistence.
//!
//! The engine itself (filtering, clustering, ranking, visibility) has no error
//! paths. Empty input and no matches are empty collections.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("location {id}: missing coordinate")]
    MissingCoordinate { id: String },

    #[error("location {id}: coordinate ({lat}, {lng}) out of range")]
    InvalidCoordinate { id: String, lat: f64, lng: f64 },

    #[error("location {id}: {field} is not a number: \"{value}\"")]
    UnparsableNumber {
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("location record without an id")]
    MissingId,

    #[error("location {id}: empty name")]
    EmptyName { id: String },

    #[error("invalid query parameter \"{key}\": {reason}")]
    InvalidQueryParam { key: String, reason: String },

    #[error("invalid config field {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
