use crate::config::{CleanOptions, TimestampSpec};
use crate::error::{ExplorerError, Result};
use crate::types::{Dataset, DerivedRecord, LoadReport, RawTable, TimeFields, TimestampSource};
use crate::util::{clean_cell, find_column, parse_timestamp_safe};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const COMBINED_CANDIDATES: &[&str] = &["datetime", "timestamp", "publish_time", "date_time"];

/// Read a delimited file with one header row into a `RawTable`.
pub fn read_table_from_path(path: &Path) -> Result<RawTable> {
    let rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| ExplorerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    read_records(rdr)
}

/// Same as `read_table_from_path`, for uploaded bytes or any other reader.
pub fn read_table<R: Read>(reader: R) -> Result<RawTable> {
    let rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    read_records(rdr)
}

fn read_records<R: Read>(mut rdr: csv::Reader<R>) -> Result<RawTable> {
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ExplorerError::EmptySource {
            reason: "no header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    let mut malformed = 0usize;
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                malformed += 1;
                warn!(error = %e, "skipping malformed row");
                continue;
            }
        };
        // Short rows are padded with nulls, extra cells are ignored.
        let mut row: Vec<Option<String>> =
            record.iter().take(headers.len()).map(clean_cell).collect();
        row.resize(headers.len(), None);
        rows.push(row);
    }
    if malformed > 0 {
        warn!(malformed, "rows skipped while reading");
    }
    if rows.is_empty() {
        return Err(ExplorerError::EmptySource {
            reason: "no records after the header row".to_string(),
        });
    }
    Ok(RawTable {
        headers,
        rows,
        malformed_rows: malformed,
    })
}

/// Load a booking file from disk and clean it.
pub fn load_path(path: &Path, opts: &CleanOptions) -> Result<(Dataset, LoadReport)> {
    let table = read_table_from_path(path)?;
    load_and_clean(table, opts)
}

/// Derive time fields, then drop columns that are mostly empty.
///
/// Unparseable timestamps leave the record's time fields unset; they never
/// fail the load. Only an empty table is an error here.
pub fn load_and_clean(table: RawTable, opts: &CleanOptions) -> Result<(Dataset, LoadReport)> {
    let RawTable {
        headers,
        rows,
        malformed_rows,
    } = table;
    if rows.is_empty() {
        return Err(ExplorerError::EmptySource {
            reason: "no records to clean".to_string(),
        });
    }
    let total_rows = rows.len();

    let source = resolve_timestamp_source(&headers, &opts.timestamp);
    let indices = source_indices(&headers, &source);
    debug!(source = %source, "resolved timestamp source");

    let mut unparseable_timestamps = 0usize;
    let mut records: Vec<DerivedRecord> = rows
        .into_iter()
        .map(|values| {
            let time = indices
                .and_then(|idx| record_timestamp(&values, idx))
                .map(TimeFields::from_timestamp);
            if time.is_none() {
                unparseable_timestamps += 1;
            }
            DerivedRecord { values, time }
        })
        .collect();

    // Sparsity is a dataset-wide decision, evaluated once.
    let keep: Vec<bool> = (0..headers.len())
        .map(|i| {
            let non_null = records.iter().filter(|r| r.value(i).is_some()).count();
            (non_null as f64 / total_rows as f64) >= opts.min_non_null_fraction
        })
        .collect();
    let dropped_columns: Vec<String> = headers
        .iter()
        .zip(&keep)
        .filter(|(_, k)| !**k)
        .map(|(h, _)| h.clone())
        .collect();
    for name in &dropped_columns {
        debug!(column = %name, "dropping sparse column");
    }
    let columns: Vec<String> = headers
        .into_iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(h, _)| h)
        .collect();
    if !dropped_columns.is_empty() {
        for r in &mut records {
            let values = std::mem::take(&mut r.values);
            r.values = values
                .into_iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| v)
                .collect();
        }
    }

    info!(
        rows = total_rows,
        columns = columns.len(),
        dropped = dropped_columns.len(),
        unparseable_timestamps,
        "booking data cleaned"
    );

    let report = LoadReport {
        total_rows,
        malformed_rows,
        unparseable_timestamps,
        dropped_columns,
        timestamp_source: source,
    };
    Ok((Dataset::new(columns, records), report))
}

#[derive(Debug, Clone, Copy)]
enum SourceIndex {
    Combined(usize),
    Split(usize, usize),
}

fn resolve_timestamp_source(headers: &[String], spec: &TimestampSpec) -> TimestampSource {
    let name_of = |i: usize| headers[i].clone();
    match spec {
        TimestampSpec::Combined { column } => match find_column(headers, column) {
            Some(i) => TimestampSource::Combined { column: name_of(i) },
            None => TimestampSource::Missing,
        },
        TimestampSpec::Split { date, time } => {
            match (find_column(headers, date), find_column(headers, time)) {
                (Some(d), Some(t)) => TimestampSource::Split {
                    date: name_of(d),
                    time: name_of(t),
                },
                _ => TimestampSource::Missing,
            }
        }
        TimestampSpec::Auto => {
            let date = find_column(headers, "date");
            if let (Some(d), Some(t)) = (date, find_column(headers, "time")) {
                return TimestampSource::Split {
                    date: name_of(d),
                    time: name_of(t),
                };
            }
            if let Some(i) = COMBINED_CANDIDATES
                .iter()
                .find_map(|c| find_column(headers, c))
            {
                return TimestampSource::Combined { column: name_of(i) };
            }
            match date {
                Some(d) => TimestampSource::Combined { column: name_of(d) },
                None => TimestampSource::Missing,
            }
        }
    }
}

fn source_indices(headers: &[String], source: &TimestampSource) -> Option<SourceIndex> {
    match source {
        TimestampSource::Combined { column } => {
            find_column(headers, column).map(SourceIndex::Combined)
        }
        TimestampSource::Split { date, time } => {
            Some(SourceIndex::Split(find_column(headers, date)?, find_column(headers, time)?))
        }
        TimestampSource::Missing => None,
    }
}

fn record_timestamp(values: &[Option<String>], idx: SourceIndex) -> Option<chrono::NaiveDateTime> {
    let cell = |i: usize| values.get(i).and_then(|v| v.as_deref());
    match idx {
        SourceIndex::Combined(i) => parse_timestamp_safe(cell(i)),
        SourceIndex::Split(d, t) => {
            // Either half missing means no timestamp.
            let joined = format!("{} {}", cell(d)?, cell(t)?);
            parse_timestamp_safe(Some(&joined))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv_text: &str) -> RawTable {
        read_table(csv_text.as_bytes()).unwrap()
    }

    #[test]
    fn splits_date_and_time_columns() {
        let t = table("Date,Time,Booking Value\n2024-03-23,12:29:38,250\n2024-11-29,18:01:39,\n");
        let (ds, report) = load_and_clean(t, &CleanOptions::default()).unwrap();
        assert_eq!(
            report.timestamp_source,
            TimestampSource::Split {
                date: "Date".into(),
                time: "Time".into()
            }
        );
        assert_eq!(ds.records()[0].year(), Some(2024));
        assert_eq!(ds.records()[1].month_period().map(|p| p.to_string()), Some("2024-11".into()));
        assert_eq!(report.unparseable_timestamps, 0);
    }

    #[test]
    fn uses_single_datetime_column() {
        let t = table("title,publish_time\nA,2020-04-01 10:00:00\nB,garbage\n");
        let (ds, report) = load_and_clean(t, &CleanOptions::default()).unwrap();
        assert_eq!(
            report.timestamp_source,
            TimestampSource::Combined {
                column: "publish_time".into()
            }
        );
        assert_eq!(ds.records()[0].year(), Some(2020));
        assert!(ds.records()[1].time.is_none());
        assert_eq!(report.unparseable_timestamps, 1);
    }

    #[test]
    fn missing_time_half_gives_null_timestamp() {
        let t = table("Date,Time\n2021-01-01,\n2021-01-02,09:00\n");
        let (ds, _) = load_and_clean(t, &CleanOptions::default()).unwrap();
        assert!(ds.records()[0].time.is_none());
        assert!(ds.records()[1].time.is_some());
    }

    #[test]
    fn drops_mostly_empty_columns() {
        // `Notes` is 1/4 filled (below 30%), `Rating` is 2/4.
        let t = table(
            "Date,Time,Notes,Rating\n\
             2021-01-01,10:00,x,4.5\n\
             2021-01-02,10:00,,null\n\
             2021-01-03,10:00,,\n\
             2021-01-04,10:00,,3.0\n",
        );
        let (ds, report) = load_and_clean(t, &CleanOptions::default()).unwrap();
        assert_eq!(report.dropped_columns, vec!["Notes".to_string()]);
        assert_eq!(ds.columns(), &["Date", "Time", "Rating"]);
        assert_eq!(ds.records()[0].value(2), Some("4.5"));
    }

    #[test]
    fn recleaning_drops_nothing_further() {
        let t = table(
            "Date,Time,Sparse,Half\n\
             2021-01-01,10:00,a,\n\
             2021-01-02,10:00,,b\n\
             2021-01-03,10:00,,c\n\
             2021-01-04,10:00,,\n",
        );
        let (first, _) = load_and_clean(t, &CleanOptions::default()).unwrap();
        let (second, report) =
            load_and_clean(first.to_raw_table(), &CleanOptions::default()).unwrap();
        assert!(report.dropped_columns.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_split_spec_is_honoured() {
        let t = table("day,clock\n2022-02-01,09:00\n");
        let opts = CleanOptions {
            timestamp: TimestampSpec::Split {
                date: "day".into(),
                time: "clock".into(),
            },
            ..CleanOptions::default()
        };
        let (ds, _) = load_and_clean(t, &opts).unwrap();
        assert_eq!(ds.records()[0].year(), Some(2022));
    }

    #[test]
    fn no_timestamp_column_is_not_an_error() {
        let t = table("Pickup Location\nSaket\n");
        let (ds, report) = load_and_clean(t, &CleanOptions::default()).unwrap();
        assert_eq!(report.timestamp_source, TimestampSource::Missing);
        assert_eq!(ds.year_span(), None);
    }

    #[test]
    fn header_only_source_is_empty() {
        let err = read_table("Date,Time\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ExplorerError::EmptySource { .. }));
    }

    #[test]
    fn short_rows_are_padded() {
        let t = table("a,b,c\n1,2\n");
        assert_eq!(t.rows[0], vec![Some("1".into()), Some("2".into()), None]);
    }
}
