//! Descriptive analytics over ride-booking exports.
//!
//! The pipeline is: read a CSV into a [`RawTable`], clean it into a
//! [`Dataset`] with [`load_and_clean`], narrow it with a [`YearFilter`], and
//! compute the named [`Views`] with [`compute_views`]. [`Session`] ties these
//! together for an interactive front end.

pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod session;
pub mod summary;
pub mod types;
pub mod util;
pub mod views;

pub use config::{CleanOptions, ColumnMap, ExplorerConfig, TimestampSpec, ViewOptions};
pub use error::{ExplorerError, Result, ViewError};
pub use filter::{filter_by_year, filter_by_years, YearFilter};
pub use loader::{load_and_clean, load_path, read_table, read_table_from_path};
pub use session::Session;
pub use summary::{summarize, DatasetSummary};
pub use types::{
    CountRow, Dataset, DerivedRecord, LoadReport, MonthPeriod, MonthlyMeanRow, PreviewTable,
    RawTable, TimeFields, TimestampSource, View, ViewData, ViewName, Views,
};
pub use views::{compute_view, compute_views};
