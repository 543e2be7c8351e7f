use anyhow::Result;
use chamados_core::tracing::{InstrumentationConfig, init_tracing};
use std::path::Path;
use tracing::Level;

/// Initialize logging for the CLI.
///
/// Command output goes to stdout, so logs are written to `cli.log` in the
/// data directory, or to stderr when `no_file_log` is set.
pub fn init_logging(log_level: Level, data_dir: &Path, no_file_log: bool, json: bool) -> Result<()> {
    let level_str = log_level.as_str().to_lowercase();
    let config = InstrumentationConfig {
        log_level: format!("chamados={level_str},chamados_http={level_str},chamados_core={level_str}"),
        json,
        log_file: (!no_file_log).then(|| data_dir.join("cli.log")),
    };

    init_tracing(&config)?;
    Ok(())
}
