use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

use crate::util::{find_column, weekday_name};

/// A header row plus the normalized cells of every record, before any
/// derivation or cleaning. Missing cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Rows the reader could not decode and skipped.
    pub malformed_rows: usize,
}

/// Calendar year-month bucket. Orders chronologically and prints as
/// `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Time fields derived from a parsed timestamp. A record either has all of
/// them or none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeFields {
    pub timestamp: NaiveDateTime,
    pub year: i32,
    pub month: u32,
    pub weekday: Weekday,
    pub month_period: MonthPeriod,
}

impl TimeFields {
    pub fn from_timestamp(timestamp: NaiveDateTime) -> Self {
        let year = timestamp.year();
        let month = timestamp.month();
        TimeFields {
            timestamp,
            year,
            month,
            weekday: timestamp.weekday(),
            month_period: MonthPeriod { year, month },
        }
    }

    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    /// Cell values, positionally aligned with `Dataset::columns`.
    pub values: Vec<Option<String>>,
    pub time: Option<TimeFields>,
}

impl DerivedRecord {
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn year(&self) -> Option<i32> {
        self.time.map(|t| t.year)
    }

    pub fn month_period(&self) -> Option<MonthPeriod> {
        self.time.map(|t| t.month_period)
    }
}

/// A resolved column of a `Dataset`. Holding one is proof that the column
/// is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef<'a> {
    pub index: usize,
    pub name: &'a str,
}

/// Cleaned records sharing one (sparse) column set. Filtering returns a new
/// `Dataset`; nothing mutates an existing one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<DerivedRecord>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<DerivedRecord>) -> Self {
        Dataset { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[DerivedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a column by exact name, falling back to a trimmed
    /// case-insensitive match.
    pub fn column(&self, name: &str) -> Option<ColumnRef<'_>> {
        let found = find_column(&self.columns, name)?;
        Some(ColumnRef {
            index: found,
            name: &self.columns[found],
        })
    }

    /// Smallest and largest derived year, if any record has one.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let mut years = self.records.iter().filter_map(|r| r.year());
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    /// Records that keep the predicate, as a new dataset with the same columns.
    pub fn retain_records<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&DerivedRecord) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Back to the raw shape, dropping derived fields. Feeding the result to
    /// `load_and_clean` again yields the same columns.
    pub fn to_raw_table(&self) -> RawTable {
        RawTable {
            headers: self.columns.clone(),
            rows: self.records.iter().map(|r| r.values.clone()).collect(),
            malformed_rows: 0,
        }
    }
}

/// Where the timestamp of each record comes from, as resolved against the
/// input headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    Combined { column: String },
    Split { date: String, time: String },
    Missing,
}

impl fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampSource::Combined { column } => write!(f, "column '{}'", column),
            TimestampSource::Split { date, time } => write!(f, "columns '{}' + '{}'", date, time),
            TimestampSource::Missing => write!(f, "none"),
        }
    }
}

/// Diagnostics produced by one `load_and_clean` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub malformed_rows: usize,
    pub unparseable_timestamps: usize,
    pub dropped_columns: Vec<String>,
    pub timestamp_source: TimestampSource,
}

/// Every view the aggregator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewName {
    BookingsPerYear,
    MonthlyTrend,
    BookingsByWeekday,
    TopPickupLocations,
    TopDropLocations,
    MonthlyValueDistance,
    PaymentMethodDistribution,
    RatingDistributions,
    CancellationReasons,
    TopJournals,
    TitleTerms,
    SamplePreview,
}

impl ViewName {
    pub const ALL: [ViewName; 12] = [
        ViewName::BookingsPerYear,
        ViewName::MonthlyTrend,
        ViewName::BookingsByWeekday,
        ViewName::TopPickupLocations,
        ViewName::TopDropLocations,
        ViewName::MonthlyValueDistance,
        ViewName::PaymentMethodDistribution,
        ViewName::RatingDistributions,
        ViewName::CancellationReasons,
        ViewName::TopJournals,
        ViewName::TitleTerms,
        ViewName::SamplePreview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewName::BookingsPerYear => "bookings_per_year",
            ViewName::MonthlyTrend => "monthly_trend",
            ViewName::BookingsByWeekday => "bookings_by_weekday",
            ViewName::TopPickupLocations => "top_pickup_locations",
            ViewName::TopDropLocations => "top_drop_locations",
            ViewName::MonthlyValueDistance => "monthly_value_distance",
            ViewName::PaymentMethodDistribution => "payment_method_distribution",
            ViewName::RatingDistributions => "rating_distributions",
            ViewName::CancellationReasons => "cancellation_reasons",
            ViewName::TopJournals => "top_journals",
            ViewName::TitleTerms => "title_terms",
            ViewName::SamplePreview => "sample_preview",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ViewName::BookingsPerYear => "Bookings per Year",
            ViewName::MonthlyTrend => "Monthly Booking Trend",
            ViewName::BookingsByWeekday => "Bookings by Weekday",
            ViewName::TopPickupLocations => "Top Pickup Locations",
            ViewName::TopDropLocations => "Top Drop Locations",
            ViewName::MonthlyValueDistance => "Avg Booking Value & Distance Over Time",
            ViewName::PaymentMethodDistribution => "Payment Method Distribution",
            ViewName::RatingDistributions => "Ratings Distribution",
            ViewName::CancellationReasons => "Cancellation Reasons",
            ViewName::TopJournals => "Top Journals",
            ViewName::TitleTerms => "Title Terms",
            ViewName::SamplePreview => "Dataset Preview",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ViewName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CountRow {
    #[serde(rename = "Key")]
    #[tabled(rename = "Key")]
    pub key: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

impl CountRow {
    pub fn new(key: impl Into<String>, count: usize) -> Self {
        CountRow {
            key: key.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MonthlyMeanRow {
    #[serde(rename = "MonthPeriod")]
    #[tabled(rename = "MonthPeriod")]
    pub month_period: MonthPeriod,
    #[serde(rename = "AvgBookingValue")]
    #[tabled(rename = "AvgBookingValue", display_with = "display_mean")]
    pub avg_booking_value: Option<f64>,
    #[serde(rename = "AvgRideDistance")]
    #[tabled(rename = "AvgRideDistance", display_with = "display_mean")]
    pub avg_ride_distance: Option<f64>,
}

fn display_mean(v: &Option<f64>) -> String {
    match v {
        Some(v) => crate::util::format_number(*v, 2),
        None => "-".to_string(),
    }
}

/// Small projection of the first records, for display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreviewTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Payload of an available view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum ViewData {
    Counts(Vec<CountRow>),
    Means(Vec<MonthlyMeanRow>),
    Preview(PreviewTable),
    /// Two independent halves (driver-side and customer-side), each with
    /// its own availability.
    ByParty {
        driver: Box<View>,
        customer: Box<View>,
    },
}

/// Outcome of computing one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum View {
    Available(ViewData),
    /// A required column is absent from the dataset.
    Unavailable { reason: String },
    /// The column exists but the computation could not be carried out.
    Failed { message: String },
}

impl View {
    pub fn unavailable_column(column: &str) -> Self {
        View::Unavailable {
            reason: format!("no '{}' column in dataset", column),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, View::Available(_))
    }

    pub fn counts(&self) -> Option<&[CountRow]> {
        match self {
            View::Available(ViewData::Counts(rows)) => Some(rows.as_slice()),
            _ => None,
        }
    }

    pub fn means(&self) -> Option<&[MonthlyMeanRow]> {
        match self {
            View::Available(ViewData::Means(rows)) => Some(rows.as_slice()),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&PreviewTable> {
        match self {
            View::Available(ViewData::Preview(table)) => Some(table),
            _ => None,
        }
    }

    /// The `(driver, customer)` halves of a split view.
    pub fn by_party(&self) -> Option<(&View, &View)> {
        match self {
            View::Available(ViewData::ByParty { driver, customer }) => {
                Some((driver.as_ref(), customer.as_ref()))
            }
            _ => None,
        }
    }
}

/// All views for one filtered dataset, keyed by name.
pub type Views = BTreeMap<ViewName, View>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(values: &[Option<&str>]) -> DerivedRecord {
        DerivedRecord {
            values: values.iter().map(|v| v.map(str::to_string)).collect(),
            time: None,
        }
    }

    #[test]
    fn month_period_orders_chronologically() {
        let a = MonthPeriod { year: 2021, month: 12 };
        let b = MonthPeriod { year: 2022, month: 1 };
        assert!(a < b);
        assert_eq!(a.to_string(), "2021-12");
    }

    #[test]
    fn time_fields_follow_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 23)
            .unwrap()
            .and_hms_opt(12, 29, 38)
            .unwrap();
        let t = TimeFields::from_timestamp(ts);
        assert_eq!(t.year, 2024);
        assert_eq!(t.month, 3);
        assert_eq!(t.weekday_name(), "Saturday");
        assert_eq!(t.month_period.to_string(), "2024-03");
    }

    #[test]
    fn column_lookup_falls_back_to_case_insensitive() {
        let ds = Dataset::new(
            vec!["Date".into(), "Pickup Location".into()],
            vec![record(&[Some("2024-01-01"), Some("Saket")])],
        );
        assert_eq!(ds.column("Pickup Location").map(|c| c.index), Some(1));
        assert_eq!(ds.column(" pickup location").map(|c| c.index), Some(1));
        assert!(ds.column("Drop Location").is_none());
        assert_eq!(ds.records()[0].value(1), Some("Saket"));
    }

    #[test]
    fn view_serializes_with_status_tag() {
        let view = View::Available(ViewData::Counts(vec![CountRow::new("2021", 2)]));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["data"]["kind"], "counts");
        assert_eq!(json["data"]["rows"][0]["Count"], 2);

        let missing = serde_json::to_value(View::unavailable_column("journal")).unwrap();
        assert_eq!(missing["status"], "unavailable");
    }

    #[test]
    fn month_period_serializes_as_text() {
        let row = MonthlyMeanRow {
            month_period: MonthPeriod { year: 2021, month: 3 },
            avg_booking_value: Some(150.0),
            avg_ride_distance: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["MonthPeriod"], "2021-03");
        assert!(json["AvgRideDistance"].is_null());
    }
}
