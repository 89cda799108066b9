//! Cleaning stage: per-municipality outlier smoothing and cumulative recount

use crate::calendar::parse_day;
use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use crate::frame::{i64_values, require_columns, string_values};
use crate::schema::{DATE, MUNICIPALITY, NEW_CASES, RECOUNTED_CUMULATIVE, SMOOTHED_NEW_CASES, STATE};
use crate::smoothing::{smooth_series, SmoothingParams};
use hashbrown::HashMap;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use rayon::prelude::*;
use std::fmt;

/// Identity of a region group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub municipality: String,
    pub state: String,
}

impl GroupKey {
    pub fn new(municipality: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            municipality: municipality.into(),
            state: state.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.state, self.municipality)
    }
}

/// Rows of the input frame sharing one (municipality, state)
#[derive(Debug, Clone)]
pub struct RegionGroup {
    pub key: GroupKey,
    /// Row indices in input order
    pub rows: Vec<usize>,
}

/// Columns a group reads, extracted once from the frame
#[derive(Debug)]
pub struct CaseColumns {
    pub dates: Vec<Option<String>>,
    pub new_cases: Vec<Option<i64>>,
}

/// Cleaned values of one group, in processing order
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutput {
    pub rows: Vec<usize>,
    pub smoothed: Vec<Option<i64>>,
    pub cumulative: Vec<Option<i64>>,
    pub outliers: usize,
}

/// Counters for one cleaning run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub groups: usize,
    pub failed_groups: usize,
    pub rows_in: usize,
    pub rows_out: usize,
    /// Rows with no municipality or state
    pub ungrouped_rows: usize,
    pub outliers: usize,
}

/// Partition a frame into region groups, ordered by key.
///
/// Returns the groups and the number of rows that belong to none.
pub fn partition_groups(df: &DataFrame) -> Result<(Vec<RegionGroup>, usize)> {
    let municipalities = string_values(df, MUNICIPALITY)?;
    let states = string_values(df, STATE)?;

    let mut by_key: HashMap<GroupKey, Vec<usize>> = HashMap::new();
    let mut ungrouped = 0;
    for (row, (municipality, state)) in municipalities.into_iter().zip(states).enumerate() {
        match (municipality, state) {
            (Some(municipality), Some(state)) => {
                by_key
                    .entry(GroupKey { municipality, state })
                    .or_insert_with(Vec::new)
                    .push(row);
            }
            _ => ungrouped += 1,
        }
    }

    let mut groups: Vec<RegionGroup> = by_key
        .into_iter()
        .map(|(key, rows)| RegionGroup { key, rows })
        .collect();
    groups.sort_by(|a, b| a.key.cmp(&b.key));

    Ok((groups, ungrouped))
}

fn to_count(value: f64) -> Option<i64> {
    if value.is_nan() {
        None
    } else {
        Some(value.round() as i64)
    }
}

/// Smooth one group's daily counts in date order
pub fn process_group(
    group: &RegionGroup,
    columns: &CaseColumns,
    params: &SmoothingParams,
) -> Result<GroupOutput> {
    let group_error = |message: String| EtlError::Group {
        municipality: group.key.municipality.clone(),
        state: group.key.state.clone(),
        message,
    };

    let mut dated = Vec::with_capacity(group.rows.len());
    for &row in &group.rows {
        let raw = columns.dates[row]
            .as_deref()
            .ok_or_else(|| group_error(format!("missing date at row {}", row)))?;
        let date = parse_day(raw)
            .map_err(|e| group_error(format!("invalid date '{}' at row {}: {}", raw, row, e)))?;
        dated.push((date, row));
    }
    dated.sort_by_key(|&(date, _)| date);

    let rows: Vec<usize> = dated.into_iter().map(|(_, row)| row).collect();
    let values: Vec<f64> = rows
        .iter()
        .map(|&row| columns.new_cases[row].map_or(f64::NAN, |v| v as f64))
        .collect();

    let series = smooth_series(&values, params);
    let outliers = series.outlier_count();

    Ok(GroupOutput {
        rows,
        smoothed: series.smoothed.into_iter().map(to_count).collect(),
        cumulative: series.cumulative.into_iter().map(to_count).collect(),
        outliers,
    })
}

/// Applies [`process_group`] to every group and merges the survivors
#[derive(Debug, Clone)]
pub struct Cleaner {
    params: SmoothingParams,
    parallel: bool,
    show_progress: bool,
}

impl Cleaner {
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            params,
            parallel: false,
            show_progress: false,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(SmoothingParams::new(config.window_size, config.threshold))
            .with_parallel(config.parallel_groups)
            .with_progress(config.show_progress)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Clean a frame with the standard per-group processing
    pub fn clean(&self, df: &DataFrame) -> Result<(DataFrame, CleanReport)> {
        self.clean_with(df, process_group)
    }

    /// Clean a frame with a custom per-group function.
    ///
    /// A group whose function fails is logged and left out of the result.
    pub fn clean_with<F>(&self, df: &DataFrame, process: F) -> Result<(DataFrame, CleanReport)>
    where
        F: Fn(&RegionGroup, &CaseColumns, &SmoothingParams) -> Result<GroupOutput> + Sync,
    {
        require_columns(df, &[MUNICIPALITY, STATE, DATE, NEW_CASES])?;

        log::info!("Partitioning {} rows by municipality and state", df.height());
        let (groups, ungrouped_rows) = partition_groups(df)?;
        if ungrouped_rows > 0 {
            log::warn!(
                "{} rows without municipality or state left out of the groups",
                ungrouped_rows
            );
        }
        log::info!("{} groups found", groups.len());

        let columns = CaseColumns {
            dates: string_values(df, DATE)?,
            new_cases: i64_values(df, NEW_CASES)?,
        };

        let progress = self.progress_bar(groups.len() as u64);
        let run = |group: &RegionGroup| {
            let result = process(group, &columns, &self.params);
            progress.inc(1);
            result
        };
        let results: Vec<Result<GroupOutput>> = if self.parallel {
            groups.par_iter().map(run).collect()
        } else {
            groups.iter().map(run).collect()
        };
        progress.finish_and_clear();

        let mut report = CleanReport {
            groups: groups.len(),
            rows_in: df.height(),
            ungrouped_rows,
            ..CleanReport::default()
        };
        let mut order: Vec<IdxSize> = Vec::with_capacity(df.height());
        let mut smoothed = Vec::with_capacity(df.height());
        let mut cumulative = Vec::with_capacity(df.height());

        for (group, result) in groups.iter().zip(results) {
            match result {
                Ok(output) => {
                    report.outliers += output.outliers;
                    order.extend(output.rows.iter().map(|&row| row as IdxSize));
                    smoothed.extend(output.smoothed);
                    cumulative.extend(output.cumulative);
                }
                Err(e) => {
                    report.failed_groups += 1;
                    log::error!("{} was not saved", group.key);
                    log::error!("{}", e);
                }
            }
        }

        let mut cleaned = df.take(&IdxCa::from_vec("idx", order))?;
        cleaned.with_column(Series::new(SMOOTHED_NEW_CASES, smoothed))?;
        cleaned.with_column(Series::new(RECOUNTED_CUMULATIVE, cumulative))?;
        report.rows_out = cleaned.height();

        log::info!(
            "Cleaned {} groups ({} failed), {} outliers replaced, {} rows kept",
            report.groups - report.failed_groups,
            report.failed_groups,
            report.outliers,
            report.rows_out
        );

        Ok((cleaned, report))
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("Processing [{bar:40}] {pos}/{len} groups ({eta})")
        {
            bar.set_style(style);
        }
        bar
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(SmoothingParams::default())
    }
}
