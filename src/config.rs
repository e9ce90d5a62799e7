use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::chart::{DEFAULT_CAPACITY, MAX_CAPACITY};
use crate::cli::Cli;
use crate::error::{NetpulseError, Result};
use crate::probe::OverlapPolicy;
use crate::speedtest::{MbpsRange, SpeedProfile};
use crate::target::DEFAULT_ENDPOINT;

pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 3000;

/// Runtime settings: defaults, then the JSON file, then command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub endpoint: String,
    pub probe_interval_ms: u64,
    pub probe_timeout_ms: Option<u64>,
    pub probe_count: Option<u32>,
    pub overlap: OverlapPolicy,
    pub chart_capacity: usize,
    pub speed: SpeedProfile,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            probe_timeout_ms: None,
            probe_count: None,
            overlap: OverlapPolicy::default(),
            chart_capacity: DEFAULT_CAPACITY,
            speed: SpeedProfile::default(),
            seed: None,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Builds the effective config for a command line.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.url {
            self.endpoint = url.clone();
        }
        if let Some(period) = cli.period {
            self.probe_interval_ms = period;
        }
        if cli.timeout.is_some() {
            self.probe_timeout_ms = cli.timeout;
        }
        if cli.count.is_some() {
            self.probe_count = cli.count;
        }
        if let Some(overlap) = cli.overlap {
            self.overlap = overlap;
        }
        if let Some(capacity) = cli.capacity {
            self.chart_capacity = capacity;
        }
        if cli.seed.is_some() {
            self.seed = cli.seed;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe_interval_ms == 0 {
            return Err(NetpulseError::Config("probe interval must be positive".into()));
        }
        if self.probe_timeout_ms == Some(0) {
            return Err(NetpulseError::Config("probe timeout must be positive".into()));
        }
        if self.chart_capacity == 0 {
            return Err(NetpulseError::Config("chart capacity must be positive".into()));
        }
        if self.chart_capacity > MAX_CAPACITY {
            return Err(NetpulseError::Config(format!(
                "chart capacity must be at most {}, got {}",
                MAX_CAPACITY, self.chart_capacity
            )));
        }
        check_range("download", &self.speed.download)?;
        check_range("upload", &self.speed.upload)?;
        crate::target::ProbeTarget::parse(&self.endpoint)?;
        Ok(())
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_ms.map(Duration::from_millis)
    }
}

fn check_range(name: &str, range: &MbpsRange) -> Result<()> {
    if !(range.min.is_finite() && range.max.is_finite()) || range.min < 0.0 || range.min > range.max {
        return Err(NetpulseError::Config(format!(
            "{} range must satisfy 0 <= min <= max, got {}..{}",
            name, range.min, range.max
        )));
    }
    Ok(())
}
