//! Session context: the loaded dataset plus the user's current choices.
//!
//! Every request recomputes views from the cleaned dataset and the current
//! filter; nothing is cached between requests.

use std::path::Path;
use tracing::info;

use crate::config::ExplorerConfig;
use crate::error::Result;
use crate::filter::YearFilter;
use crate::loader;
use crate::types::{Dataset, LoadReport, Views};
use crate::views::compute_views;

#[derive(Debug, Clone)]
pub struct Session {
    dataset: Dataset,
    report: LoadReport,
    filter: YearFilter,
    show_sample: bool,
    config: ExplorerConfig,
}

impl Session {
    pub fn new(dataset: Dataset, report: LoadReport, config: ExplorerConfig) -> Self {
        Session {
            dataset,
            report,
            filter: YearFilter::All,
            show_sample: false,
            config,
        }
    }

    /// Load and clean a file, starting a fresh session over it.
    pub fn open(path: &Path, config: ExplorerConfig) -> Result<Self> {
        let (dataset, report) = loader::load_path(path, &config.cleaning)?;
        Ok(Session::new(dataset, report, config))
    }

    /// Swap in a freshly loaded file. The year filter resets because the
    /// old selection may not exist in the new data.
    pub fn reload(&mut self, path: &Path) -> Result<()> {
        let (dataset, report) = loader::load_path(path, &self.config.cleaning)?;
        info!(rows = dataset.len(), "dataset replaced");
        self.dataset = dataset;
        self.report = report;
        self.filter = YearFilter::All;
        Ok(())
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn filter(&self) -> &YearFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: YearFilter) {
        self.filter = filter;
    }

    pub fn show_sample(&self) -> bool {
        self.show_sample
    }

    pub fn set_show_sample(&mut self, show: bool) {
        self.show_sample = show;
    }

    /// Bounds for a year-range selector: the observed year span.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        self.dataset.year_span()
    }

    /// Distinct years available for a multi-select, ascending.
    pub fn available_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.dataset.records().iter().filter_map(|r| r.year()).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    pub fn filtered(&self) -> Result<Dataset> {
        self.filter.apply(&self.dataset)
    }

    pub fn views(&self) -> Result<Views> {
        let filtered = self.filtered()?;
        info!(filter = %self.filter, rows = filtered.len(), "computing views");
        Ok(compute_views(&filtered, &self.config.views))
    }
}
