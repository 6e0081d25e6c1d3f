// =============================================================================
// Runtime Configuration — dashboard settings with atomic save
// =============================================================================
//
// Every tunable lives here: where to listen, where the credential table is
// stored, which market data endpoint to call, and the slider bounds exposed
// to the chart view.
//
// Persistence uses an atomic tmp + rename pattern.  All fields carry
// `#[serde(default)]` so that adding new fields never breaks loading an older
// config file.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::SliderBounds;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("users.db")
}

fn default_data_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_session_ttl_secs() -> u64 {
    8 * 60 * 60
}

fn default_ticker() -> String {
    "AAPL".to_string()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

fn default_ma_window() -> SliderBounds {
    SliderBounds::new(5, 200, 20)
}

fn default_bb_window() -> SliderBounds {
    SliderBounds::new(5, 200, 20)
}

fn default_rsi_period() -> SliderBounds {
    SliderBounds::new(2, 20, 14)
}

fn default_band_multiplier() -> f64 {
    2.0
}

// =============================================================================
// ChartDefaults
// =============================================================================

/// Slider bounds and initial values for the chart view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDefaults {
    /// Ticker pre-filled in the input box.
    #[serde(default = "default_ticker")]
    pub ticker: String,

    /// Start date pre-filled in the date picker. The end date always
    /// defaults to today.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Moving-average window slider.
    #[serde(default = "default_ma_window")]
    pub ma_window: SliderBounds,

    /// Bollinger window slider.
    #[serde(default = "default_bb_window")]
    pub bb_window: SliderBounds,

    /// RSI period slider.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: SliderBounds,

    /// Number of standard deviations between the middle and outer bands.
    #[serde(default = "default_band_multiplier")]
    pub band_multiplier: f64,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            start_date: default_start_date(),
            ma_window: default_ma_window(),
            bb_window: default_bb_window(),
            rsi_period: default_rsi_period(),
            band_multiplier: default_band_multiplier(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the dashboard backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite file holding the `users` table.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL of the historical price provider.
    #[serde(default = "default_data_base_url")]
    pub data_base_url: String,

    /// Timeout applied to every outbound data request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Idle lifetime of a browser session.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default)]
    pub chart: ChartDefaults,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            data_base_url: default_data_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            chart: ChartDefaults::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            db_path = %config.db_path.display(),
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `DASHBOARD_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(addr) = env_nonempty("DASHBOARD_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(path) = env_nonempty("DASHBOARD_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        if let Some(url) = env_nonempty("DASHBOARD_DATA_URL") {
            self.data_base_url = url.trim_end_matches('/').to_string();
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
