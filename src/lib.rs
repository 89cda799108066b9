//! # covid_etl
//!
//! Batch ETL for daily municipal COVID-19 case counts.
//!
//! Raw `;`-delimited files are aggregated into one table, each
//! (municipality, state) series is cleaned of outlying daily counts with a
//! rolling mean/standard-deviation window, calendar attributes are added and
//! the result replaces a relational table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use covid_etl::prelude::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!     let pipeline = Pipeline::new(PipelineConfig::with_source_directory("dados"))?;
//!     let summary = pipeline.run()?;
//!     println!("{:?}", summary);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod calendar;
pub mod clean;
pub mod config;
pub mod enrich;
pub mod error;
pub mod frame;
pub mod logging;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod smoothing;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::calendar::{CalendarNames, DateFeatures, Portuguese, Season};
    pub use crate::clean::{CleanReport, Cleaner, GroupKey};
    pub use crate::config::{PipelineConfig, StageFiles};
    pub use crate::error::{EtlError, Result};
    pub use crate::logging::{init_logging, run_stage};
    pub use crate::pipeline::{Pipeline, RunSummary, Stage};
    pub use crate::smoothing::{smooth_series, SmoothedSeries, SmoothingParams};
}
