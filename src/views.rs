use crate::config::ViewOptions;
use crate::error::ViewError;
use crate::types::{
    ColumnRef, CountRow, Dataset, MonthPeriod, MonthlyMeanRow, PreviewTable, View, ViewData,
    ViewName, Views,
};
use crate::util::{mean, parse_f64_safe, weekday_name};
use chrono::Weekday;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Fallback width of the preview when none of the preferred columns exist.
const FALLBACK_PREVIEW_COLUMNS: usize = 6;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "were", "its", "into",
    "over", "under", "between", "among", "via", "using", "their", "has", "have", "not", "but",
];

/// Compute every view over an already filtered dataset.
///
/// Views are independent: a missing column makes only its own view
/// `Unavailable`, and a failed computation only its own view `Failed`.
pub fn compute_views(dataset: &Dataset, opts: &ViewOptions) -> Views {
    let mut views = Views::new();
    for name in ViewName::ALL {
        let view = compute_view(dataset, opts, name);
        match &view {
            View::Available(_) => debug!(view = %name, "view computed"),
            View::Unavailable { reason } => debug!(view = %name, %reason, "view unavailable"),
            View::Failed { message } => warn!(view = %name, %message, "view failed"),
        }
        views.insert(name, view);
    }
    views
}

/// Compute a single named view.
pub fn compute_view(dataset: &Dataset, opts: &ViewOptions, name: ViewName) -> View {
    let cols = &opts.columns;
    match name {
        ViewName::BookingsPerYear => View::Available(ViewData::Counts(bookings_per_year(dataset))),
        ViewName::MonthlyTrend => View::Available(ViewData::Counts(monthly_trend(dataset))),
        ViewName::BookingsByWeekday => {
            View::Available(ViewData::Counts(bookings_by_weekday(dataset)))
        }
        ViewName::TopPickupLocations => {
            top_categories(dataset, &cols.pickup_location, opts.top_n)
        }
        ViewName::TopDropLocations => top_categories(dataset, &cols.drop_location, opts.top_n),
        ViewName::MonthlyValueDistance => {
            monthly_value_distance(dataset, &cols.booking_value, &cols.ride_distance)
        }
        ViewName::PaymentMethodDistribution => {
            category_counts(dataset, &cols.payment_method, &[], None)
        }
        ViewName::RatingDistributions => by_party(
            rating_distribution(dataset, &cols.driver_rating),
            rating_distribution(dataset, &cols.customer_rating),
        ),
        ViewName::CancellationReasons => by_party(
            category_counts(
                dataset,
                &cols.driver_cancellation_reason,
                &opts.cancellation_placeholders,
                None,
            ),
            category_counts(
                dataset,
                &cols.customer_cancellation_reason,
                &opts.cancellation_placeholders,
                None,
            ),
        ),
        ViewName::TopJournals => top_categories(dataset, &cols.journal, opts.top_n),
        ViewName::TitleTerms => title_terms(dataset, &cols.title, opts.title_terms_limit),
        ViewName::SamplePreview => View::Available(ViewData::Preview(sample_preview(
            dataset,
            &opts.preview_columns,
            opts.preview_rows,
        ))),
    }
}

fn by_party(driver: View, customer: View) -> View {
    View::Available(ViewData::ByParty {
        driver: Box::new(driver),
        customer: Box::new(customer),
    })
}

/// Record counts per derived year, ascending. Years without records are
/// absent rather than zero.
pub fn bookings_per_year(dataset: &Dataset) -> Vec<CountRow> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for y in dataset.records().iter().filter_map(|r| r.year()) {
        *counts.entry(y).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(y, c)| CountRow::new(y.to_string(), c))
        .collect()
}

/// Record counts per month bucket, chronological.
pub fn monthly_trend(dataset: &Dataset) -> Vec<CountRow> {
    let mut counts: BTreeMap<MonthPeriod, usize> = BTreeMap::new();
    for p in dataset.records().iter().filter_map(|r| r.month_period()) {
        *counts.entry(p).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(p, c)| CountRow::new(p.to_string(), c))
        .collect()
}

/// Record counts per weekday, Monday first. Weekdays with no records are
/// absent.
pub fn bookings_by_weekday(dataset: &Dataset) -> Vec<CountRow> {
    let mut counts = [0usize; 7];
    for t in dataset.records().iter().filter_map(|r| r.time) {
        counts[t.weekday.num_days_from_monday() as usize] += 1;
    }
    let mut day = Weekday::Mon;
    let mut rows = Vec::new();
    for c in counts {
        if c > 0 {
            rows.push(CountRow::new(weekday_name(day), c));
        }
        day = day.succ();
    }
    rows
}

/// Counts per distinct value, descending; ties keep first-seen order.
/// Null values and `excluded` (case-insensitive) are not counted.
fn count_values<'a, I>(values: I, excluded: &[String]) -> Vec<CountRow>
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut acc: HashMap<&'a str, (usize, usize)> = HashMap::new();
    for (pos, v) in values.enumerate() {
        let Some(v) = v else { continue };
        if excluded.iter().any(|e| e.eq_ignore_ascii_case(v)) {
            continue;
        }
        acc.entry(v).or_insert((pos, 0)).1 += 1;
    }
    let mut rows: Vec<(&str, usize, usize)> =
        acc.into_iter().map(|(k, (first, c))| (k, first, c)).collect();
    rows.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));
    rows.into_iter().map(|(k, _, c)| CountRow::new(k, c)).collect()
}

fn column_values<'a>(
    dataset: &'a Dataset,
    col: ColumnRef<'_>,
) -> impl Iterator<Item = Option<&'a str>> {
    let index = col.index;
    dataset.records().iter().map(move |r| r.value(index))
}

/// Count-by-category over `column`, optionally truncated to `limit`.
fn category_counts(
    dataset: &Dataset,
    column: &str,
    excluded: &[String],
    limit: Option<usize>,
) -> View {
    let Some(col) = dataset.column(column) else {
        return View::unavailable_column(column);
    };
    let mut rows = count_values(column_values(dataset, col), excluded);
    if let Some(n) = limit {
        rows.truncate(n);
    }
    View::Available(ViewData::Counts(rows))
}

fn top_categories(dataset: &Dataset, column: &str, n: usize) -> View {
    category_counts(dataset, column, &[], Some(n))
}

/// Mean booking value and ride distance per month bucket. Each mean only
/// uses records where that field parses; buckets with neither are dropped.
/// A present column with values but no numeric ones fails the view.
fn monthly_value_distance(dataset: &Dataset, value_column: &str, distance_column: &str) -> View {
    let value = dataset.column(value_column);
    let distance = dataset.column(distance_column);
    if value.is_none() && distance.is_none() {
        return View::Unavailable {
            reason: format!(
                "no '{}' or '{}' column in dataset",
                value_column, distance_column
            ),
        };
    }
    match monthly_means(dataset, value, distance) {
        Ok(rows) => View::Available(ViewData::Means(rows)),
        Err(e) => View::Failed {
            message: e.to_string(),
        },
    }
}

fn monthly_means(
    dataset: &Dataset,
    value: Option<ColumnRef<'_>>,
    distance: Option<ColumnRef<'_>>,
) -> Result<Vec<MonthlyMeanRow>, ViewError> {
    #[derive(Default)]
    struct Acc {
        values: Vec<f64>,
        distances: Vec<f64>,
    }
    // Non-null and numeric cell counts per column, across all buckets.
    let mut value_cells = (0usize, 0usize);
    let mut distance_cells = (0usize, 0usize);
    let mut map: BTreeMap<MonthPeriod, Acc> = BTreeMap::new();
    for r in dataset.records() {
        let Some(period) = r.month_period() else { continue };
        let e = map.entry(period).or_default();
        if let Some(raw) = value.and_then(|c| r.value(c.index)) {
            value_cells.0 += 1;
            if let Some(v) = parse_f64_safe(Some(raw)) {
                value_cells.1 += 1;
                e.values.push(v);
            }
        }
        if let Some(raw) = distance.and_then(|c| r.value(c.index)) {
            distance_cells.0 += 1;
            if let Some(d) = parse_f64_safe(Some(raw)) {
                distance_cells.1 += 1;
                e.distances.push(d);
            }
        }
    }
    for (col, (present, numeric)) in [(value, value_cells), (distance, distance_cells)] {
        if let Some(col) = col {
            if present > 0 && numeric == 0 {
                return Err(ViewError::NonNumeric {
                    column: col.name.to_string(),
                });
            }
        }
    }

    Ok(map
        .into_iter()
        .map(|(month_period, acc)| MonthlyMeanRow {
            month_period,
            avg_booking_value: mean(&acc.values),
            avg_ride_distance: mean(&acc.distances),
        })
        .filter(|row| row.avg_booking_value.is_some() || row.avg_ride_distance.is_some())
        .collect())
}

/// Counts per numeric rating, ascending by rating. Unparseable ratings are
/// skipped; a column with values but no numeric ones fails.
fn rating_distribution(dataset: &Dataset, column: &str) -> View {
    match rating_counts(dataset, column) {
        Ok(Some(rows)) => View::Available(ViewData::Counts(rows)),
        Ok(None) => View::unavailable_column(column),
        Err(e) => View::Failed {
            message: e.to_string(),
        },
    }
}

fn rating_counts(dataset: &Dataset, column: &str) -> Result<Option<Vec<CountRow>>, ViewError> {
    let Some(col) = dataset.column(column) else {
        return Ok(None);
    };
    let mut present = 0usize;
    // Keyed by bit pattern so that 4 and 4.0 share a bucket.
    let mut acc: HashMap<u64, (f64, usize)> = HashMap::new();
    for v in column_values(dataset, col).flatten() {
        present += 1;
        if let Some(rating) = parse_f64_safe(Some(v)) {
            let rating = if rating == 0.0 { 0.0 } else { rating };
            acc.entry(rating.to_bits()).or_insert((rating, 0)).1 += 1;
        }
    }
    if present > 0 && acc.is_empty() {
        return Err(ViewError::NonNumeric {
            column: col.name.to_string(),
        });
    }
    let mut rows: Vec<(f64, usize)> = acc.into_values().collect();
    rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    Ok(Some(
        rows.into_iter()
            .map(|(r, c)| CountRow::new(r.to_string(), c))
            .collect(),
    ))
}

/// Word frequencies over the title column, most frequent first.
fn title_terms(dataset: &Dataset, column: &str, limit: usize) -> View {
    let Some(col) = dataset.column(column) else {
        return View::unavailable_column(column);
    };
    let words: Vec<String> = column_values(dataset, col)
        .flatten()
        .flat_map(|title| title.split(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() >= 3 && !w.chars().all(|c| c.is_ascii_digit()))
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect();
    let mut rows = count_values(words.iter().map(|w| Some(w.as_str())), &[]);
    rows.truncate(limit);
    View::Available(ViewData::Counts(rows))
}

/// First `rows` records projected to the preferred display columns.
pub fn sample_preview(dataset: &Dataset, preferred: &[String], rows: usize) -> PreviewTable {
    let mut picked: Vec<ColumnRef<'_>> = Vec::new();
    for name in preferred {
        if let Some(col) = dataset.column(name) {
            if !picked.iter().any(|p| p.index == col.index) {
                picked.push(col);
            }
        }
    }
    if picked.is_empty() {
        picked = dataset
            .columns()
            .iter()
            .enumerate()
            .take(FALLBACK_PREVIEW_COLUMNS)
            .map(|(index, name)| ColumnRef { index, name })
            .collect();
    }
    PreviewTable {
        columns: picked.iter().map(|c| c.name.to_string()).collect(),
        rows: dataset
            .records()
            .iter()
            .take(rows)
            .map(|r| {
                picked
                    .iter()
                    .map(|c| r.value(c.index).map(str::to_string))
                    .collect()
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanOptions;
    use crate::loader::{load_and_clean, read_table};

    fn dataset(csv_text: &str) -> Dataset {
        let t = read_table(csv_text.as_bytes()).unwrap();
        load_and_clean(t, &CleanOptions::default()).unwrap().0
    }

    fn counts(view: &View) -> Vec<(String, usize)> {
        view.counts()
            .unwrap()
            .iter()
            .map(|r| (r.key.clone(), r.count))
            .collect()
    }

    #[test]
    fn per_year_and_month_are_chronological() {
        let ds = dataset(
            "Date,Time\n\
             2022-02-01,09:00\n\
             2021-01-15,11:00\n\
             2021-01-01,10:00\n\
             2021-12-01,10:00\n\
             nope,10:00\n",
        );
        assert_eq!(
            bookings_per_year(&ds),
            vec![CountRow::new("2021", 3), CountRow::new("2022", 1)]
        );
        let months: Vec<String> = monthly_trend(&ds).into_iter().map(|r| r.key).collect();
        assert_eq!(months, vec!["2021-01", "2021-12", "2022-02"]);
    }

    #[test]
    fn weekday_counts_start_on_monday() {
        // 2024-03-23 is a Saturday, 2024-03-25 a Monday.
        let ds = dataset("Date,Time\n2024-03-23,10:00\n2024-03-25,10:00\n2024-03-25,11:00\n");
        assert_eq!(
            bookings_by_weekday(&ds),
            vec![CountRow::new("Monday", 2), CountRow::new("Saturday", 1)]
        );
    }

    #[test]
    fn top_locations_truncate_and_keep_first_seen_ties() {
        let mut text = String::from("Date,Time,Pickup Location\n");
        for i in 0..12 {
            text.push_str(&format!("2024-01-01,10:00,Loc{}\n", i));
        }
        text.push_str("2024-01-01,10:00,Loc5\n");
        let ds = dataset(&text);
        let view = top_categories(&ds, "Pickup Location", 10);
        let rows = counts(&view);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0], ("Loc5".to_string(), 2));
        assert_eq!(rows[1], ("Loc0".to_string(), 1));
        assert!(rows.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn monthly_means_skip_null_fields() {
        let ds = dataset(
            "Date,Time,Booking Value,Ride Distance\n\
             2021-01-01,10:00,100,5\n\
             2021-01-15,11:00,200,\n\
             2021-02-01,09:00,null,null\n\
             2021-03-01,09:00,,7.5\n",
        );
        let view = monthly_value_distance(&ds, "Booking Value", "Ride Distance");
        let rows = view.means().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month_period.to_string(), "2021-01");
        assert_eq!(rows[0].avg_booking_value, Some(150.0));
        assert_eq!(rows[0].avg_ride_distance, Some(5.0));
        assert_eq!(rows[1].month_period.to_string(), "2021-03");
        assert_eq!(rows[1].avg_booking_value, None);
    }

    #[test]
    fn ratings_sort_numerically_and_merge_equal_values() {
        let ds = dataset(
            "Date,Time,Driver Ratings\n\
             2021-01-01,10:00,4.5\n\
             2021-01-01,10:00,10\n\
             2021-01-01,10:00,4.50\n\
             2021-01-01,10:00,\n",
        );
        let view = rating_distribution(&ds, "Driver Ratings");
        assert_eq!(
            counts(&view),
            vec![("4.5".to_string(), 2), ("10".to_string(), 1)]
        );
    }

    #[test]
    fn non_numeric_ratings_fail_only_that_view() {
        let ds = dataset(
            "Date,Time,Driver Ratings,Customer Rating\n\
             2021-01-01,10:00,great,4\n\
             2021-01-02,10:00,fine,5\n",
        );
        let opts = ViewOptions::default();
        let views = compute_views(&ds, &opts);
        let (driver, customer) = views[&ViewName::RatingDistributions].by_party().unwrap();
        assert!(matches!(driver, View::Failed { .. }));
        assert_eq!(counts(customer), vec![("4".to_string(), 1), ("5".to_string(), 1)]);
        assert!(views[&ViewName::BookingsPerYear].is_available());
    }

    #[test]
    fn non_numeric_values_fail_monthly_means() {
        let ds = dataset(
            "Date,Time,Booking Value,Ride Distance,Driver Ratings\n\
             2021-01-01,10:00,cheap,far,great\n\
             2021-02-01,10:00,pricey,near,fine\n",
        );
        let views = compute_views(&ds, &ViewOptions::default());
        match &views[&ViewName::MonthlyValueDistance] {
            View::Failed { message } => assert!(message.contains("Booking Value")),
            other => panic!("expected a failed view, got {:?}", other),
        }
        let (driver, _) = views[&ViewName::RatingDistributions].by_party().unwrap();
        assert!(matches!(driver, View::Failed { .. }));
        assert_eq!(
            counts(&views[&ViewName::MonthlyTrend]),
            vec![("2021-01".to_string(), 1), ("2021-02".to_string(), 1)]
        );
    }

    #[test]
    fn one_numeric_column_is_not_enough_when_the_other_is_text() {
        let ds = dataset(
            "Date,Time,Booking Value,Ride Distance\n\
             2021-01-01,10:00,100,far\n\
             2021-01-02,10:00,200,\n",
        );
        let view = monthly_value_distance(&ds, "Booking Value", "Ride Distance");
        match view {
            View::Failed { message } => assert!(message.contains("Ride Distance")),
            other => panic!("expected a failed view, got {:?}", other),
        }
    }

    #[test]
    fn null_only_range_gives_empty_means() {
        let ds = dataset(
            "Date,Time,Booking Value\n\
             2021-01-01,10:00,100\n\
             2022-01-02,10:00,\n\
             2022-01-03,10:00,null\n",
        );
        let filtered = crate::filter::filter_by_year(&ds, 2022, 2022).unwrap();
        let view = monthly_value_distance(&filtered, "Booking Value", "Ride Distance");
        assert_eq!(view.means().map(|rows| rows.len()), Some(0));
    }

    #[test]
    fn cancellation_placeholders_are_excluded() {
        let ds = dataset(
            "Date,Time,Driver Cancellation Reason\n\
             2021-01-01,10:00,No Cancellation\n\
             2021-01-01,10:00,Vehicle issue\n\
             2021-01-01,10:00,Vehicle issue\n\
             2021-01-01,10:00,Customer sick\n",
        );
        let opts = ViewOptions::default();
        let view = compute_view(&ds, &opts, ViewName::CancellationReasons);
        let (driver, customer) = view.by_party().unwrap();
        assert_eq!(
            counts(driver),
            vec![("Vehicle issue".to_string(), 2), ("Customer sick".to_string(), 1)]
        );
        assert!(matches!(customer, View::Unavailable { .. }));
    }

    #[test]
    fn missing_columns_mark_views_unavailable() {
        let ds = dataset("Date,Time\n2021-01-01,10:00\n");
        let views = compute_views(&ds, &ViewOptions::default());
        assert_eq!(views.len(), ViewName::ALL.len());
        for name in [
            ViewName::TopPickupLocations,
            ViewName::TopDropLocations,
            ViewName::MonthlyValueDistance,
            ViewName::PaymentMethodDistribution,
            ViewName::TopJournals,
            ViewName::TitleTerms,
        ] {
            assert!(matches!(views[&name], View::Unavailable { .. }), "{}", name);
        }
        assert!(views[&ViewName::SamplePreview].is_available());
    }

    #[test]
    fn title_terms_drop_short_words_and_stopwords() {
        let ds = dataset(
            "title,journal\nThe Rust book,J1\nRust and safety of code,J2\nA rust primer,J1\n",
        );
        let view = title_terms(&ds, "title", 2);
        assert_eq!(
            counts(&view),
            vec![("rust".to_string(), 3), ("book".to_string(), 1)]
        );
        let journals = top_categories(&ds, "journal", 10);
        assert_eq!(counts(&journals)[0], ("J1".to_string(), 2));
    }

    #[test]
    fn preview_projects_known_columns() {
        let ds = dataset(
            "Date,Time,Booking ID,Secret\n\
             2021-01-01,10:00,B1,x\n2021-01-02,10:00,B2,x\n2021-01-03,10:00,B3,x\n",
        );
        let table = sample_preview(&ds, &ViewOptions::default().preview_columns, 2);
        assert_eq!(table.columns, vec!["Date", "Time", "Booking ID"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][2].as_deref(), Some("B2"));
    }

    #[test]
    fn preview_falls_back_to_leading_columns() {
        let ds = dataset("a,b\n1,2\n");
        let table = sample_preview(&ds, &["zzz".to_string()], 5);
        assert_eq!(table.columns, vec!["a", "b"]);
    }
}
