//! Explorer configuration.
//!
//! Every field has a default matching the NCR ride-booking export, so an
//! empty JSON object (or no config file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExplorerError, Result};

/// How `load_and_clean` finds the timestamp of each record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSpec {
    /// Prefer a date + time pair, then a single datetime-like column, then
    /// a lone date column.
    #[default]
    Auto,
    Combined {
        column: String,
    },
    Split {
        date: String,
        time: String,
    },
}

/// Options evaluated once per load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    pub timestamp: TimestampSpec,
    /// Columns whose non-null fraction falls below this are dropped.
    pub min_non_null_fraction: f64,
}

impl Default for CleanOptions {
    fn default() -> Self {
        CleanOptions {
            timestamp: TimestampSpec::Auto,
            min_non_null_fraction: 0.3,
        }
    }
}

/// Input column each view reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub pickup_location: String,
    pub drop_location: String,
    pub booking_value: String,
    pub ride_distance: String,
    pub payment_method: String,
    pub driver_rating: String,
    pub customer_rating: String,
    pub driver_cancellation_reason: String,
    pub customer_cancellation_reason: String,
    pub journal: String,
    pub title: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            pickup_location: "Pickup Location".to_string(),
            drop_location: "Drop Location".to_string(),
            booking_value: "Booking Value".to_string(),
            ride_distance: "Ride Distance".to_string(),
            payment_method: "Payment Method".to_string(),
            driver_rating: "Driver Ratings".to_string(),
            customer_rating: "Customer Rating".to_string(),
            driver_cancellation_reason: "Driver Cancellation Reason".to_string(),
            customer_cancellation_reason: "Reason for cancelling by Customer".to_string(),
            journal: "journal".to_string(),
            title: "title".to_string(),
        }
    }
}

/// Options for `compute_views`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub columns: ColumnMap,
    pub top_n: usize,
    pub preview_rows: usize,
    /// Preferred preview columns. Those present in the dataset are shown; if
    /// none are, the leading columns of the dataset are used instead.
    pub preview_columns: Vec<String>,
    /// Reason values meaning "not cancelled", compared case-insensitively.
    pub cancellation_placeholders: Vec<String>,
    pub title_terms_limit: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        ViewOptions {
            columns: ColumnMap::default(),
            top_n: 10,
            preview_rows: 5,
            preview_columns: [
                "Date",
                "Time",
                "Booking ID",
                "Booking Status",
                "Vehicle Type",
                "Pickup Location",
                "Drop Location",
                "Booking Value",
                "title",
                "journal",
                "publish_time",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            cancellation_placeholders: vec![
                "no cancellation".to_string(),
                "not cancelled".to_string(),
                "not canceled".to_string(),
            ],
            title_terms_limit: 25,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub cleaning: CleanOptions,
    pub views: ViewOptions,
}

impl ExplorerConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ExplorerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ExplorerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
