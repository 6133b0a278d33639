use crate::buffer::BoundedQueue;
use crate::error::{PipelineError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Watermark-based saturation signal for a queue.
///
/// Becomes active once utilization reaches the high watermark and stays
/// active until it falls to the low watermark or below. Producers can
/// consult it to throttle before a submit would have to wait.
#[derive(Debug)]
pub struct BackpressureController {
    /// Threshold at which backpressure is raised (percentage)
    high_watermark: u32,
    /// Threshold at which backpressure is released (percentage)
    low_watermark: u32,
    is_active: AtomicBool,
}

impl BackpressureController {
    /// Default: high=80%, low=40%
    pub fn new() -> Self {
        Self {
            high_watermark: 80,
            low_watermark: 40,
            is_active: AtomicBool::new(false),
        }
    }

    /// Create a controller with custom watermark thresholds
    pub fn with_watermarks(high: u32, low: u32) -> Result<Self> {
        if high > 100 || low > high {
            return Err(PipelineError::Configuration(format!(
                "invalid watermarks: high={}%, low={}%",
                high, low
            )));
        }
        Ok(Self {
            high_watermark: high,
            low_watermark: low,
            is_active: AtomicBool::new(false),
        })
    }

    /// Check the queue and update backpressure state.
    /// Returns true if backpressure is now active.
    pub fn check_and_update<T: Send>(&self, queue: &BoundedQueue<T>) -> bool {
        let utilization = queue.utilization();
        let was_active = self.is_active.load(Ordering::Relaxed);

        let is_now_active = if was_active {
            utilization > self.low_watermark
        } else {
            utilization >= self.high_watermark
        };

        if is_now_active != was_active {
            self.is_active.store(is_now_active, Ordering::Relaxed);
        }

        is_now_active
    }

    /// Get whether backpressure is currently active
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }

    pub fn high_watermark(&self) -> u32 {
        self.high_watermark
    }

    pub fn low_watermark(&self) -> u32 {
        self.low_watermark
    }
}

impl Default for BackpressureController {
    fn default() -> Self {
        Self::new()
    }
}
