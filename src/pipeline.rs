//! Four-stage batch pipeline: aggregate, clean, enrich, load
//!
//! Each stage reads the snapshot written by the previous one, so a run can be
//! restarted from any stage.

use crate::aggregate::aggregate_directory;
use crate::clean::{CleanReport, Cleaner};
use crate::config::PipelineConfig;
use crate::enrich::enrich;
use crate::error::Result;
use crate::frame::{read_snapshot, write_snapshot};
use crate::logging::run_stage;
use crate::sink::TableSink;
use std::fmt;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Aggregate,
    Clean,
    Enrich,
    Load,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Aggregate, Stage::Clean, Stage::Enrich, Stage::Load];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Aggregate => "aggregate",
            Stage::Clean => "clean",
            Stage::Enrich => "enrich",
            Stage::Load => "load",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Row counts of the stages that ran
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub aggregated_rows: Option<usize>,
    pub clean_report: Option<CleanReport>,
    pub enriched_rows: Option<usize>,
    pub loaded_rows: Option<usize>,
}

/// Pipeline runner
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage
    pub fn run(&self) -> Result<RunSummary> {
        self.run_from(Stage::Aggregate)
    }

    /// Run `first` and every stage after it
    pub fn run_from(&self, first: Stage) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for stage in Stage::ALL.into_iter().filter(|s| *s >= first) {
            match stage {
                Stage::Aggregate => summary.aggregated_rows = Some(self.aggregate()?),
                Stage::Clean => summary.clean_report = Some(self.clean()?),
                Stage::Enrich => summary.enriched_rows = Some(self.enrich()?),
                Stage::Load => summary.loaded_rows = Some(self.load()?),
            }
        }
        Ok(summary)
    }

    /// Raw files to the raw snapshot
    pub fn aggregate(&self) -> Result<usize> {
        run_stage(Stage::Aggregate.name(), || {
            let mut df = aggregate_directory(
                &self.config.raw_directory(),
                &self.config.placeholder_file,
            )?;
            write_snapshot(&mut df, &self.config.raw_snapshot())?;
            Ok(df.height())
        })
    }

    /// Raw snapshot to the cleaned snapshot
    pub fn clean(&self) -> Result<CleanReport> {
        run_stage(Stage::Clean.name(), || {
            let raw = read_snapshot(&self.config.raw_snapshot())?;
            let (mut cleaned, report) = Cleaner::from_config(&self.config).clean(&raw)?;
            write_snapshot(&mut cleaned, &self.config.cleaned_snapshot())?;
            Ok(report)
        })
    }

    /// Cleaned snapshot to the enriched snapshot
    pub fn enrich(&self) -> Result<usize> {
        run_stage(Stage::Enrich.name(), || {
            let mut df = read_snapshot(&self.config.cleaned_snapshot())?;
            enrich(&mut df)?;
            write_snapshot(&mut df, &self.config.enriched_snapshot())?;
            Ok(df.height())
        })
    }

    /// Enriched snapshot to the relational table
    pub fn load(&self) -> Result<usize> {
        run_stage(Stage::Load.name(), || {
            let df = read_snapshot(&self.config.enriched_snapshot())?;
            log::info!(
                "Saving {} rows to table {}",
                df.height(),
                self.config.table_name
            );
            let mut sink =
                TableSink::open(&self.config.sink_connection_string, self.config.batch_size)?;
            sink.replace_table(&self.config.table_name, &df)
        })
    }
}
