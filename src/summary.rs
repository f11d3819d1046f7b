//! Dataset description: shape, year span and a profile per column.

use serde::Serialize;
use tabled::Tabled;

use crate::types::Dataset;
use crate::util::{format_number, mean, parse_f64_safe};

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct ColumnProfile {
    #[serde(rename = "Column")]
    #[tabled(rename = "Column")]
    pub name: String,
    #[serde(rename = "NonNull")]
    #[tabled(rename = "NonNull")]
    pub non_null: usize,
    #[serde(rename = "Numeric")]
    #[tabled(rename = "Numeric")]
    pub numeric: usize,
    #[serde(rename = "Mean")]
    #[tabled(rename = "Mean", display_with = "display_stat")]
    pub mean: Option<f64>,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min", display_with = "display_stat")]
    pub min: Option<f64>,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max", display_with = "display_stat")]
    pub max: Option<f64>,
}

fn display_stat(v: &Option<f64>) -> String {
    v.map(|v| format_number(v, 2)).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub records_without_timestamp: usize,
    pub year_span: Option<(i32, i32)>,
    pub profiles: Vec<ColumnProfile>,
}

/// Describe a dataset. A column counts as numeric for the statistics only
/// where its values parse as numbers; other values still count as non-null.
pub fn summarize(dataset: &Dataset) -> DatasetSummary {
    let profiles = dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut non_null = 0usize;
            let mut numbers: Vec<f64> = Vec::new();
            for r in dataset.records() {
                let Some(v) = r.value(i) else { continue };
                non_null += 1;
                if let Some(n) = parse_f64_safe(Some(v)) {
                    numbers.push(n);
                }
            }
            ColumnProfile {
                name: name.clone(),
                non_null,
                numeric: numbers.len(),
                mean: mean(&numbers),
                min: numbers.iter().copied().reduce(f64::min),
                max: numbers.iter().copied().reduce(f64::max),
            }
        })
        .collect();

    DatasetSummary {
        rows: dataset.len(),
        columns: dataset.columns().len(),
        records_without_timestamp: dataset.records().iter().filter(|r| r.time.is_none()).count(),
        year_span: dataset.year_span(),
        profiles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanOptions;
    use crate::loader::{load_and_clean, read_table};

    #[test]
    fn profiles_numeric_and_text_columns() {
        let t = read_table(
            "Date,Time,Booking Value,Vehicle Type\n\
             2021-01-01,10:00,100,Auto\n\
             2022-01-01,10:00,300,eBike\n\
             junk,10:00,n/a,Auto\n"
                .as_bytes(),
        )
        .unwrap();
        let (ds, _) = load_and_clean(t, &CleanOptions::default()).unwrap();
        let s = summarize(&ds);
        assert_eq!((s.rows, s.columns), (3, 4));
        assert_eq!(s.records_without_timestamp, 1);
        assert_eq!(s.year_span, Some((2021, 2022)));

        let value = &s.profiles[2];
        assert_eq!((value.non_null, value.numeric), (2, 2));
        assert_eq!(value.mean, Some(200.0));
        assert_eq!((value.min, value.max), (Some(100.0), Some(300.0)));

        let vehicle = &s.profiles[3];
        assert_eq!((vehicle.non_null, vehicle.numeric), (3, 0));
        assert_eq!(vehicle.mean, None);
    }
}
