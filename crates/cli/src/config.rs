//! CLI configuration
//!
//! Values are layered: built-in defaults, then an optional TOML/YAML file,
//! then `CHAMADOS_*` environment variables (`CHAMADOS_API_URL`,
//! `CHAMADOS_MONITOR__POLL_INTERVAL_SECS`, ...). Command line flags are
//! applied last by the caller.

use anyhow::{Context, Result};
use chamados_core::tracing::default_data_dir;
use chamados_http::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8001/api";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Base URL of the helpdesk API
    pub api_url: String,
    /// Where the session file and logs live
    pub data_dir: PathBuf,
    /// Per-request timeout; 0 disables it
    pub request_timeout_secs: u64,
    /// Origin used to resolve attachment paths; defaults to the API host
    pub media_url: Option<String>,
    pub monitor: MonitorConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: default_data_dir(),
            request_timeout_secs: 30,
            media_url: None,
            monitor: MonitorConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from defaults, `file` (if any), and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default(
                "monitor.poll_interval_secs",
                defaults.monitor.poll_interval_secs,
            )?
            .set_default(
                "monitor.warning_threshold_secs",
                defaults.monitor.warning_threshold_secs,
            )?
            .set_default("monitor.refresh_lead_secs", defaults.monitor.refresh_lead_secs)?
            .set_default("monitor.proactive_refresh", defaults.monitor.proactive_refresh)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("CHAMADOS").separator("__"))
            .build()
            .context("failed to read configuration")?;

        settings
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Origin that attachment paths such as `/media/...` are relative to
    pub fn media_base(&self) -> String {
        if let Some(media) = &self.media_url {
            return media.trim_end_matches('/').to_string();
        }
        let api = self.api_url.trim_end_matches('/');
        api.strip_suffix("/api").unwrap_or(api).to_string()
    }
}
