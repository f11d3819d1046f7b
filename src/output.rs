use serde::Serialize;
use std::fs;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::error::Result;
use crate::summary::DatasetSummary;
use crate::types::{LoadReport, PreviewTable, View, ViewData, ViewName, Views};
use crate::util::format_int;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

fn write_preview_csv(path: &Path, table: &PreviewTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|v| v.as_deref().unwrap_or("")))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one CSV per available view (split views get a `_driver` and a
/// `_customer` file) plus `views.json` with every view's status. Returns the
/// files written.
pub fn export_views(dir: &Path, views: &Views) -> Result<Vec<String>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (name, view) in views {
        export_view(dir, name.as_str(), view, &mut written)?;
    }
    write_json(&dir.join("views.json"), views)?;
    written.push("views.json".to_string());
    Ok(written)
}

fn export_view(dir: &Path, stem: &str, view: &View, written: &mut Vec<String>) -> Result<()> {
    let View::Available(data) = view else {
        return Ok(());
    };
    let file = format!("{}.csv", stem);
    match data {
        ViewData::Counts(rows) => write_csv(&dir.join(&file), rows)?,
        ViewData::Means(rows) => write_csv(&dir.join(&file), rows)?,
        ViewData::Preview(table) => write_preview_csv(&dir.join(&file), table)?,
        ViewData::ByParty { driver, customer } => {
            export_view(dir, &format!("{}_driver", stem), driver, written)?;
            export_view(dir, &format!("{}_customer", stem), customer, written)?;
            return Ok(());
        }
    }
    written.push(file);
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn render_preview(table: &PreviewTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns.iter().cloned());
    for row in &table.rows {
        builder.push_record(row.iter().map(|v| v.clone().unwrap_or_default()));
    }
    builder.build().with(Style::markdown()).to_string()
}

fn print_view(label: &str, view: &View, max_rows: usize) {
    match view {
        View::Available(ViewData::Counts(rows)) => preview_table_rows(rows, max_rows),
        View::Available(ViewData::Means(rows)) => preview_table_rows(rows, max_rows),
        View::Available(ViewData::Preview(table)) => {
            if table.rows.is_empty() {
                println!("(no rows)\n");
            } else {
                println!("{}\n", render_preview(table));
            }
        }
        View::Available(ViewData::ByParty { driver, customer }) => {
            println!("Driver {}:", label);
            print_view(label, driver, max_rows);
            println!("Customer {}:", label);
            print_view(label, customer, max_rows);
        }
        View::Unavailable { reason } => println!("Unavailable: {}\n", reason),
        View::Failed { message } => println!("Error: {}\n", message),
    }
}

/// Print every view as a Markdown table. The sample preview is only shown
/// when asked for.
pub fn print_views(views: &Views, show_sample: bool, max_rows: usize) {
    for (name, view) in views {
        if *name == ViewName::SamplePreview && !show_sample {
            continue;
        }
        println!("{} ({})\n", name.title(), name);
        let label = match name {
            ViewName::RatingDistributions => "Ratings",
            ViewName::CancellationReasons => "Cancellation Reasons",
            _ => "",
        };
        print_view(label, view, max_rows);
    }
}

pub fn print_load_report(report: &LoadReport) {
    println!(
        "Processing dataset... ({} rows loaded, timestamp from {})",
        format_int(report.total_rows),
        report.timestamp_source
    );
    if report.malformed_rows > 0 {
        println!(
            "Note: {} rows skipped as malformed.",
            format_int(report.malformed_rows)
        );
    }
    if report.unparseable_timestamps > 0 {
        println!(
            "Note: {} rows have no parseable timestamp and are left out of time-based views.",
            format_int(report.unparseable_timestamps)
        );
    }
    if !report.dropped_columns.is_empty() {
        println!(
            "Info: dropped mostly-empty columns: {}",
            report.dropped_columns.join(", ")
        );
    }
    println!();
}

pub fn print_summary(summary: &DatasetSummary) {
    println!(
        "Shape: {} rows x {} columns",
        format_int(summary.rows),
        summary.columns
    );
    match summary.year_span {
        Some((lo, hi)) => println!("Years: {}-{}", lo, hi),
        None => println!("Years: none parsed"),
    }
    println!(
        "Records without timestamp: {}\n",
        format_int(summary.records_without_timestamp)
    );
    preview_table_rows(&summary.profiles, summary.profiles.len());
}
