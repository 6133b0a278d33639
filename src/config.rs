//! Pipeline configuration.
//!
//! All durations are stored in milliseconds so the configuration can be
//! loaded from plain JSON. Durations passed in through the API are rounded up
//! to the next whole millisecond, so a non-zero duration never becomes zero.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How `submit` behaves when the ingestion queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SubmitMode {
    /// Return `QueueFull` immediately
    Reject,
    /// Wait up to `timeout_ms` for space, then return `QueueFull`.
    /// The wait is abandoned early if the pipeline begins stopping.
    Wait { timeout_ms: u64 },
}

impl SubmitMode {
    /// Bounded wait of `timeout`, rounded up to whole milliseconds
    pub fn wait(timeout: Duration) -> Self {
        SubmitMode::Wait {
            timeout_ms: millis_ceil(timeout),
        }
    }

    pub(crate) fn timeout(&self) -> Duration {
        match self {
            SubmitMode::Reject => Duration::ZERO,
            SubmitMode::Wait { timeout_ms } => Duration::from_millis(*timeout_ms),
        }
    }
}

impl Default for SubmitMode {
    fn default() -> Self {
        SubmitMode::Wait { timeout_ms: 100 }
    }
}

/// Whole milliseconds in `duration`, rounded up
pub(crate) fn millis_ceil(duration: Duration) -> u64 {
    let millis = duration.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// Configuration for a single pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Label used in logs and the processing thread name
    pub name: String,
    /// Capacity of the ingestion queue
    pub ingestion_capacity: usize,
    /// Capacity of the output queue
    pub output_capacity: usize,
    /// Behaviour of `submit` on a full ingestion queue
    pub submit_mode: SubmitMode,
    /// Longest time `poll` waits for an event
    pub poll_timeout_ms: u64,
    /// Longest time the processing loop waits on a queue before
    /// re-checking for a stop request
    pub idle_timeout_ms: u64,
    /// Longest time an in-flight event may wait on a full output queue
    /// once a stop has been requested
    pub shutdown_grace_ms: u64,
    /// Number of latency samples kept per operator
    pub latency_window: usize,
    /// Ingestion utilization (percent) that raises the saturation signal
    pub high_watermark: u32,
    /// Ingestion utilization (percent) that clears the saturation signal
    pub low_watermark: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
            ingestion_capacity: 1024,
            output_capacity: 1024,
            submit_mode: SubmitMode::default(),
            poll_timeout_ms: 10,
            idle_timeout_ms: 5,
            shutdown_grace_ms: 1000,
            latency_window: 1024,
            high_watermark: 80,
            low_watermark: 40,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from a JSON string. Missing fields take
    /// their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ingestion_capacity == 0 {
            return Err(PipelineError::Configuration(
                "ingestion capacity must be greater than zero".into(),
            ));
        }
        if self.output_capacity == 0 {
            return Err(PipelineError::Configuration(
                "output capacity must be greater than zero".into(),
            ));
        }
        if self.idle_timeout_ms == 0 {
            return Err(PipelineError::Configuration(
                "idle timeout must be greater than zero".into(),
            ));
        }
        if self.latency_window == 0 {
            return Err(PipelineError::Configuration(
                "latency window must be greater than zero".into(),
            ));
        }
        if self.high_watermark > 100 || self.low_watermark > self.high_watermark {
            return Err(PipelineError::Configuration(format!(
                "invalid watermarks: high={}%, low={}%",
                self.high_watermark, self.low_watermark
            )));
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
