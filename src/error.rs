//! Error types for the booking pipeline.
//!
//! `ExplorerError` covers everything that is fatal for a request (load
//! failures, invalid filters, bad config). `ViewError` is local to a single
//! view and is folded into that view's `Failed` state instead of being
//! propagated.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplorerError {
    /// The booking file could not be opened or read as CSV.
    #[error("Failed to read booking file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The source had no header row or no records.
    #[error("Booking data is empty: {reason}")]
    EmptySource { reason: String },

    #[error("Invalid year range: {min} is greater than {max}")]
    InvalidYearRange { min: i32, max: i32 },

    #[error("Invalid year selection '{input}': {reason}")]
    InvalidYearSelection { input: String, reason: String },

    #[error("Failed to load config '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure of one view. Other views are unaffected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViewError {
    #[error("column '{column}' holds no numeric values")]
    NonNumeric { column: String },
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
