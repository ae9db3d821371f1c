use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, trace, warn};

pub const DEFAULT_LATENCY_THRESHOLD: f64 = 210.0;

/// Monitor configuration. Immutable once loaded.
///
/// Keys are PascalCase to stay compatible with the config file shared with the
/// optimizer tooling. Keys this crate does not know about are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Latency (ms) above which the remediation action is launched
    #[serde(default = "default_latency_threshold")]
    pub latency_threshold: f64,

    /// Pause between cycles, in seconds
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// Number of echo requests per probe
    #[serde(default = "default_probe_count")]
    pub probe_count: u32,

    /// Timeout per echo request, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,

    /// External script launched when a server breaches the threshold
    #[serde(default = "default_remediation_script")]
    pub remediation_script: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            latency_threshold: default_latency_threshold(),
            check_interval: default_check_interval(),
            probe_count: default_probe_count(),
            probe_timeout: default_probe_timeout(),
            remediation_script: default_remediation_script(),
        }
    }
}

fn default_latency_threshold() -> f64 {
    DEFAULT_LATENCY_THRESHOLD
}

fn default_check_interval() -> u64 {
    60
}

fn default_probe_count() -> u32 {
    4
}

fn default_probe_timeout() -> u64 {
    1
}

fn default_remediation_script() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("Scripts/optimize.ps1")
    } else {
        PathBuf::from("Scripts/optimize.sh")
    }
}

impl Config {
    /// Load the config, falling back to the defaults when the file is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Config {
        let path = path.as_ref();
        match read_config_file(path) {
            Ok(config) => config.validated(),
            Err(e) => {
                error!(
                    "failed to load config from {}: {e:#}, using defaults (threshold {DEFAULT_LATENCY_THRESHOLD}ms)",
                    path.display()
                );
                Config::default()
            }
        }
    }

    /// Replace out-of-range values with their defaults.
    pub fn validated(mut self) -> Config {
        if !self.latency_threshold.is_finite() || self.latency_threshold <= 0.0 {
            warn!(
                "invalid LatencyThreshold {}, using {DEFAULT_LATENCY_THRESHOLD}ms",
                self.latency_threshold
            );
            self.latency_threshold = default_latency_threshold();
        }

        if self.check_interval == 0 {
            warn!("CheckInterval must be positive, using {}s", default_check_interval());
            self.check_interval = default_check_interval();
        }

        if self.probe_count == 0 {
            warn!("ProbeCount must be positive, using {}", default_probe_count());
            self.probe_count = default_probe_count();
        }

        if self.probe_timeout == 0 {
            warn!("ProbeTimeout must be positive, using {}s", default_probe_timeout());
            self.probe_timeout = default_probe_timeout();
        }

        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
