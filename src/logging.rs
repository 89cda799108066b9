//! Process-wide logging setup and scoped stage execution

use crate::error::Result;
use std::io::Write;
use std::time::Instant;

/// Install the global logger.
///
/// Defaults to `info`, overridable through `RUST_LOG`. Safe to call more than
/// once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

/// Run one pipeline stage, logging its start, completion and failure.
///
/// The stage's error is returned unchanged after it has been logged.
pub fn run_stage<T, F>(name: &str, stage: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    log::info!("Starting stage: {}", name);
    let started = Instant::now();

    match stage() {
        Ok(value) => {
            log::info!(
                "Stage completed successfully: {} ({:.2?})",
                name,
                started.elapsed()
            );
            Ok(value)
        }
        Err(e) => {
            log::error!(
                "Error in stage {} after {:.2?}: {}",
                name,
                started.elapsed(),
                e
            );
            Err(e)
        }
    }
}
