use super::{duration, optional_duration};
use crate::scheduler::DEFAULT_MAX_FAILURES;
use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Deserialize)]
pub struct General {
    #[serde(default = "interval", deserialize_with = "duration")]
    interval: Duration,
    #[serde(default, deserialize_with = "optional_duration")]
    timeout: Option<Duration>,
    #[serde(default = "max_failures")]
    max_failures: u32,
    #[serde(default)]
    samples: Option<u64>,
    #[serde(default = "metrics")]
    metrics: Vec<String>,
    /// Report current values for every metric instead of rates.
    #[serde(default)]
    raw: bool,
    /// Metrics reported as current values even when `raw` is unset.
    #[serde(default)]
    raw_metrics: Vec<String>,
}

impl Default for General {
    fn default() -> Self {
        Self {
            interval: interval(),
            timeout: None,
            max_failures: max_failures(),
            samples: None,
            metrics: metrics(),
            raw: false,
            raw_metrics: Vec::new(),
        }
    }
}

impl General {
    pub fn check(&self) -> Result<()> {
        if self.interval < MIN_INTERVAL {
            return Err(Error::Config(
                "interval is too short. Minimum interval is: 1ms".into(),
            ));
        }

        if self.timeout().is_zero() {
            return Err(Error::Config("timeout must be greater than zero".into()));
        }

        if self.max_failures == 0 {
            return Err(Error::Config("max_failures must be at least 1".into()));
        }

        if self.metrics.is_empty() {
            return Err(Error::Config("no metrics selected".into()));
        }

        if let Some(metric) = self.raw_metrics.iter().find(|m| !self.metrics.contains(m)) {
            return Err(Error::Config(format!(
                "raw metric {metric} is not in the sampled metrics"
            )));
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Per-fetch timeout, the interval unless set.
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(self.interval)
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    pub fn samples(&self) -> Option<u64> {
        self.samples
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn raw(&self) -> bool {
        self.raw
    }

    pub fn raw_metrics(&self) -> &[String] {
        &self.raw_metrics
    }

    pub fn set_raw(&mut self, raw: bool) {
        self.raw = raw;
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn set_samples(&mut self, samples: Option<u64>) {
        self.samples = samples;
    }

    pub fn set_metrics(&mut self, metrics: Vec<String>) {
        self.metrics = metrics;
    }
}

fn interval() -> Duration {
    Duration::from_secs(1)
}

fn max_failures() -> u32 {
    DEFAULT_MAX_FAILURES
}

fn metrics() -> Vec<String> {
    [
        "kernel.all.cpu.user",
        "kernel.all.cpu.sys",
        "kernel.all.cpu.idle",
        "kernel.all.cpu.wait.total",
        "kernel.all.load",
        "mem.util.free",
        "mem.util.cached",
        "network.interface.in.bytes",
        "network.interface.out.bytes",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
