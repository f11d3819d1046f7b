//! Year selection over a cleaned dataset.
//!
//! Two modes exist: an inclusive range (slider) and an explicit set of years
//! (multi-select). Records without a derived year never pass either.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{ExplorerError, Result};
use crate::types::Dataset;

/// Keep records whose year lies in `[min_year, max_year]`.
///
/// A range reaching past the dataset's own year span is clamped to it; a
/// range entirely outside it simply yields an empty dataset.
pub fn filter_by_year(dataset: &Dataset, min_year: i32, max_year: i32) -> Result<Dataset> {
    if min_year > max_year {
        return Err(ExplorerError::InvalidYearRange {
            min: min_year,
            max: max_year,
        });
    }
    let (lo, hi) = match dataset.year_span() {
        Some((span_lo, span_hi)) => (min_year.max(span_lo), max_year.min(span_hi)),
        None => (min_year, max_year),
    };
    if (lo, hi) != (min_year, max_year) {
        debug!(min_year, max_year, lo, hi, "year range clamped to dataset span");
    }
    Ok(dataset.retain_records(|r| matches!(r.year(), Some(y) if lo <= y && y <= hi)))
}

/// Keep records whose year is one of `years`.
pub fn filter_by_years(dataset: &Dataset, years: &BTreeSet<i32>) -> Dataset {
    dataset.retain_records(|r| r.year().is_some_and(|y| years.contains(&y)))
}

/// A year selection as chosen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum YearFilter {
    /// No filtering at all; records without a year are kept.
    #[default]
    All,
    Range { min: i32, max: i32 },
    Years(BTreeSet<i32>),
}

impl YearFilter {
    pub fn range(min: i32, max: i32) -> Result<Self> {
        if min > max {
            return Err(ExplorerError::InvalidYearRange { min, max });
        }
        Ok(YearFilter::Range { min, max })
    }

    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        match self {
            YearFilter::All => Ok(dataset.clone()),
            YearFilter::Range { min, max } => filter_by_year(dataset, *min, *max),
            YearFilter::Years(years) => Ok(filter_by_years(dataset, years)),
        }
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => write!(f, "all years"),
            YearFilter::Range { min, max } => write!(f, "{}-{}", min, max),
            YearFilter::Years(years) => {
                let list: Vec<String> = years.iter().map(|y| y.to_string()).collect();
                write!(f, "{}", list.join(","))
            }
        }
    }
}

/// Accepts `all`, `2021-2023`, `2021,2023` or a single `2022`.
impl FromStr for YearFilter {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        let invalid = |reason: &str| ExplorerError::InvalidYearSelection {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let year = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| invalid("expected a four-digit year"))
        };

        if input.is_empty() {
            return Err(invalid("empty selection"));
        }
        if input.eq_ignore_ascii_case("all") {
            return Ok(YearFilter::All);
        }
        if let Some((a, b)) = input.split_once('-') {
            return YearFilter::range(year(a)?, year(b)?);
        }
        let years = input
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(year)
            .collect::<Result<BTreeSet<i32>>>()?;
        if years.is_empty() {
            return Err(invalid("no years given"));
        }
        Ok(YearFilter::Years(years))
    }
}
