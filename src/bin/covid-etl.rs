//! covid-etl - runs the four-stage case-count pipeline
//!
//! Reads `covid-etl.toml` from the working directory when present, otherwise
//! uses the built-in defaults (raw files under `dados/raw`).

use anyhow::Context;
use covid_etl::config::PipelineConfig;
use covid_etl::logging::init_logging;
use covid_etl::pipeline::Pipeline;
use std::path::Path;

const CONFIG_FILE: &str = "covid-etl.toml";

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = PipelineConfig::load_or_default(Path::new(CONFIG_FILE))
        .with_context(|| format!("Failed to load {}", CONFIG_FILE))?;
    let pipeline = Pipeline::new(config).context("Invalid pipeline configuration")?;

    let summary = pipeline.run().context("Pipeline run failed")?;

    if let Some(report) = &summary.clean_report {
        log::info!(
            "Run finished: {} groups cleaned, {} dropped, {} rows loaded",
            report.groups - report.failed_groups,
            report.failed_groups,
            summary.loaded_rows.unwrap_or(0)
        );
    }
    Ok(())
}
