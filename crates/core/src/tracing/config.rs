//! Configuration for tracing and instrumentation

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Log level filter (e.g., "info", "debug", "chamados_http=trace")
    pub log_level: String,
    /// Emit JSON lines instead of the human readable format
    #[serde(default)]
    pub json: bool,
    /// Optional log file; stderr is used when absent
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            log_file: None,
        }
    }
}

/// Default state directory used for the session file and logs
pub fn default_data_dir() -> PathBuf {
    std::env::var("CHAMADOS_STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("chamados")
        })
}
