use crate::backpressure::BackpressureController;
use crate::buffer::{BoundedQueue, PushError};
use crate::config::{millis_ceil, PipelineConfig, SubmitMode};
use crate::error::{OperatorError, PipelineError, Result};
use crate::event::Event;
use crate::metrics::{MetricsCollector, MetricsSnapshot, QueueSnapshot};
use crate::operator::{Operator, OperatorSlot};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle state of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Configured, loop not started
    Idle,
    /// Processing loop is running
    Running,
    /// Stop requested, loop finishing
    Stopping,
    /// Loop has exited
    Stopped,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Idle,
            1 => LifecycleState::Running,
            2 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Builder for constructing pipelines
pub struct PipelineBuilder {
    config: PipelineConfig,
    operators: Vec<Box<dyn Operator>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default configuration
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            operators: Vec::new(),
        }
    }

    /// Start from an existing configuration
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn with_ingestion_capacity(mut self, capacity: usize) -> Self {
        self.config.ingestion_capacity = capacity;
        self
    }

    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.config.output_capacity = capacity;
        self
    }

    /// Choose between failing fast and a bounded wait on a full ingestion queue
    pub fn with_submit_mode(mut self, mode: SubmitMode) -> Self {
        self.config.submit_mode = mode;
        self
    }

    /// Timeouts have millisecond granularity; a non-zero value rounds up
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll_timeout_ms = millis_ceil(timeout);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout_ms = millis_ceil(timeout);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace_ms = millis_ceil(grace);
        self
    }

    pub fn with_latency_window(mut self, window: usize) -> Self {
        self.config.latency_window = window;
        self
    }

    /// Set the ingestion saturation thresholds (percent)
    pub fn with_watermarks(mut self, high: u32, low: u32) -> Self {
        self.config.high_watermark = high;
        self.config.low_watermark = low;
        self
    }

    /// Append an operator to the chain
    pub fn add_operator(mut self, operator: impl Operator) -> Self {
        self.operators.push(Box::new(operator));
        self
    }

    /// Append an already boxed operator to the chain
    pub fn add_boxed_operator(mut self, operator: Box<dyn Operator>) -> Self {
        self.operators.push(operator);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        let pipeline = Pipeline::new(self.config)?;
        for operator in self.operators {
            pipeline.add_operator(operator)?;
        }
        Ok(pipeline)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between the pipeline handle and its processing thread
struct Shared {
    config: PipelineConfig,
    ingestion: BoundedQueue<Event>,
    output: BoundedQueue<Event>,
    metrics: MetricsCollector,
    backpressure: BackpressureController,
    state: AtomicU8,
    stop_requested: AtomicBool,
    drain_requested: AtomicBool,
}

impl Shared {
    fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// The processing loop. Runs on its own thread until a stop is requested.
    fn run(&self, mut chain: Vec<OperatorSlot>) {
        let span = tracing::info_span!("pipeline", name = %self.config.name);
        let _enter = span.enter();

        for slot in &mut chain {
            slot.start();
        }

        let idle = self.config.idle_timeout();
        // Set once when a stop is first seen blocking delivery, shared by
        // every event delivered after that
        let mut grace_deadline: Option<Instant> = None;
        loop {
            // Stop is only observed between events, never mid-chain
            let stopping = self.stop_requested();
            let next = if stopping {
                if !self.drain_requested.load(Ordering::Acquire) {
                    break;
                }
                self.ingestion.try_pop()
            } else {
                self.ingestion.pop_timeout(idle)
            };

            match next {
                Some(event) => {
                    self.backpressure.check_and_update(&self.ingestion);
                    if !self.process(&mut chain, event, &mut grace_deadline) {
                        // Output is blocked past the grace; leave the rest queued
                        debug!(left_queued = self.ingestion.len(), "drain abandoned, output queue full");
                        break;
                    }
                }
                None if stopping => break,
                None => {}
            }
        }

        for slot in &mut chain {
            slot.shutdown();
        }
    }

    /// Thread one event through the chain and deliver it if it survives.
    /// Returns false only when a surviving event could not be delivered.
    fn process(
        &self,
        chain: &mut [OperatorSlot],
        event: Event,
        grace_deadline: &mut Option<Instant>,
    ) -> bool {
        let counters = self.metrics.pipeline();
        counters.record_ingested();

        let event_id = event.id().clone();
        let mut current = event;

        for slot in chain.iter_mut() {
            match slot.invoke(current) {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    counters.record_filtered();
                    return true;
                }
                Err(e @ OperatorError::Panicked(_)) => {
                    warn!(operator = %slot.name(), event_id = %event_id, error = %e, "operator panicked");
                    counters.record_failed();
                    return true;
                }
                Err(e) => {
                    debug!(
                        operator = %slot.name(),
                        event_id = %event_id,
                        error = %e,
                        "operator failed, event discarded"
                    );
                    counters.record_failed();
                    return true;
                }
            }
        }

        self.deliver(current, grace_deadline)
    }

    /// Enqueue a surviving event on the output queue.
    ///
    /// Waits in `idle_timeout` slices while the queue is full. Once a stop has
    /// been requested, waiting is bounded by a single `shutdown_grace`
    /// deadline for the whole stop. Returns false if the event was abandoned.
    fn deliver(&self, event: Event, grace_deadline: &mut Option<Instant>) -> bool {
        let counters = self.metrics.pipeline();
        let mut event = match self.output.try_push(event) {
            Ok(()) => {
                counters.record_processed();
                return true;
            }
            Err(event) => event,
        };

        counters.record_output_wait();
        let idle = self.config.idle_timeout();

        loop {
            let wait = if self.stop_requested() {
                let deadline = *grace_deadline
                    .get_or_insert_with(|| Instant::now() + self.config.shutdown_grace());
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    warn!(event_id = %event.id(), "output queue full at shutdown, event undelivered");
                    counters.record_undelivered();
                    return false;
                }
                remaining.min(idle)
            } else {
                idle
            };

            match self.output.push_timeout(event, wait, None) {
                Ok(()) => {
                    counters.record_processed();
                    return true;
                }
                Err(e) => event = e.into_inner(),
            }
        }
    }
}

/// Lifecycle-guarded parts of the pipeline
struct Control {
    /// Operator chain, handed to the processing thread on start
    chain: Vec<OperatorSlot>,
    worker: Option<JoinHandle<()>>,
}

/// A single-process event pipeline: an ingestion queue, an ordered operator
/// chain driven by one processing thread, and an output queue.
///
/// All methods take `&self`; share the pipeline between producer and
/// consumer threads with an `Arc`.
pub struct Pipeline {
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl Pipeline {
    /// Create an idle pipeline with an empty operator chain
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let backpressure =
            BackpressureController::with_watermarks(config.high_watermark, config.low_watermark)?;

        let shared = Shared {
            ingestion: BoundedQueue::new(config.ingestion_capacity),
            output: BoundedQueue::new(config.output_capacity),
            metrics: MetricsCollector::new(),
            backpressure,
            state: AtomicU8::new(LifecycleState::Idle as u8),
            stop_requested: AtomicBool::new(false),
            drain_requested: AtomicBool::new(false),
            config,
        };

        Ok(Self {
            shared: Arc::new(shared),
            control: Mutex::new(Control {
                chain: Vec::new(),
                worker: None,
            }),
        })
    }

    /// Configure a pipeline from an ordered operator list and two queue
    /// capacities, leaving everything else at its default
    pub fn configure(
        operators: Vec<Box<dyn Operator>>,
        ingestion_capacity: usize,
        output_capacity: usize,
    ) -> Result<Self> {
        operators
            .into_iter()
            .fold(
                PipelineBuilder::new()
                    .with_ingestion_capacity(ingestion_capacity)
                    .with_output_capacity(output_capacity),
                PipelineBuilder::add_boxed_operator,
            )
            .build()
    }

    /// Append an operator to the chain. Only allowed before `start`.
    pub fn add_operator(&self, operator: Box<dyn Operator>) -> Result<()> {
        let mut control = self.control.lock();
        if self.state() != LifecycleState::Idle {
            return Err(PipelineError::AlreadyRunning);
        }

        let name = operator.name();
        if name.is_empty() {
            return Err(PipelineError::Configuration(
                "operator name must not be empty".into(),
            ));
        }
        if control.chain.iter().any(|slot| slot.name() == name) {
            return Err(PipelineError::Configuration(format!(
                "duplicate operator name '{}'",
                name
            )));
        }

        let slot = OperatorSlot::new(operator, self.shared.config.latency_window);
        self.shared.metrics.register(slot.metrics().clone());
        control.chain.push(slot);
        Ok(())
    }

    /// Start the processing loop. Calling it again while running is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut control = self.control.lock();
        match self.state() {
            LifecycleState::Running => return Ok(()),
            LifecycleState::Idle => {}
            state => {
                return Err(PipelineError::Lifecycle {
                    operation: "start",
                    state,
                })
            }
        }

        let chain = std::mem::take(&mut control.chain);
        let operator_count = chain.len();
        let shared = Arc::clone(&self.shared);

        self.shared.set_state(LifecycleState::Running);
        self.shared.metrics.pipeline().mark_started();

        let handle = thread::Builder::new()
            .name(format!("{}-loop", self.shared.config.name))
            .spawn(move || shared.run(chain))
            .map_err(|e| {
                self.shared.set_state(LifecycleState::Stopped);
                PipelineError::ThreadError(e.to_string())
            })?;
        control.worker = Some(handle);

        info!(
            pipeline = %self.shared.config.name,
            operators = operator_count,
            "pipeline started"
        );
        Ok(())
    }

    /// Stop the pipeline.
    ///
    /// With `drain` false the loop finishes the event in flight and exits,
    /// leaving queued events in the ingestion queue. With `drain` true it
    /// first processes every event already queued, unless the output queue
    /// stays full past the shutdown grace; the remaining events then stay
    /// queued. Stopping an idle or stopped pipeline succeeds without doing
    /// anything else.
    pub fn stop(&self, drain: bool) -> Result<()> {
        let mut control = self.control.lock();
        match self.state() {
            LifecycleState::Stopped => return Ok(()),
            LifecycleState::Idle => {
                self.shared.set_state(LifecycleState::Stopped);
                self.shared.stop_requested.store(true, Ordering::Release);
                return Ok(());
            }
            LifecycleState::Running | LifecycleState::Stopping => {}
        }

        info!(pipeline = %self.shared.config.name, drain, "pipeline stop requested");
        self.shared.drain_requested.store(drain, Ordering::Release);
        self.shared.set_state(LifecycleState::Stopping);
        self.shared.stop_requested.store(true, Ordering::Release);

        let joined = match control.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PipelineError::ThreadError("processing thread panicked".into())),
            None => Ok(()),
        };
        self.shared.set_state(LifecycleState::Stopped);

        let counters = self.shared.metrics.pipeline();
        info!(
            pipeline = %self.shared.config.name,
            ingested = counters.ingested(),
            processed = counters.processed(),
            filtered = counters.filtered(),
            failed = counters.failed(),
            left_queued = self.shared.ingestion.len(),
            "pipeline stopped"
        );
        joined
    }

    /// Stop after processing every event already in the ingestion queue
    pub fn stop_after_drain(&self) -> Result<()> {
        self.stop(true)
    }

    /// Stop as soon as the event in flight completes
    pub fn stop_now(&self) -> Result<()> {
        self.stop(false)
    }

    /// Submit an event to the ingestion queue.
    ///
    /// On a full queue this either fails immediately or waits a bounded time,
    /// depending on the configured [`SubmitMode`]. A wait is cut short if the
    /// pipeline starts stopping. Events are never dropped to make room.
    pub fn submit(&self, event: Event) -> Result<()> {
        let state = self.state();
        if matches!(state, LifecycleState::Stopping | LifecycleState::Stopped) {
            return Err(PipelineError::Lifecycle {
                operation: "submit",
                state,
            });
        }

        let shared = &self.shared;
        let counters = shared.metrics.pipeline();
        let capacity = shared.ingestion.capacity();

        let result = match shared.ingestion.try_push(event) {
            Ok(()) => Ok(()),
            Err(_) if shared.config.submit_mode == SubmitMode::Reject => {
                Err(PipelineError::QueueFull { capacity })
            }
            Err(event) => {
                counters.record_submit_wait();
                let timeout = shared.config.submit_mode.timeout();
                match shared
                    .ingestion
                    .push_timeout(event, timeout, Some(&shared.stop_requested))
                {
                    Ok(()) => Ok(()),
                    Err(PushError::Timeout(_)) => Err(PipelineError::QueueFull { capacity }),
                    Err(PushError::Cancelled(_)) => Err(PipelineError::Lifecycle {
                        operation: "submit",
                        state: self.state(),
                    }),
                }
            }
        };

        match &result {
            Ok(()) => {
                counters.record_submitted();
                shared.backpressure.check_and_update(&shared.ingestion);
            }
            Err(PipelineError::QueueFull { .. }) => {
                counters.record_submit_rejected();
                debug!(pipeline = %shared.config.name, capacity, "submit rejected, ingestion queue full");
            }
            Err(_) => {}
        }
        result
    }

    /// Take the next output event, waiting at most the configured poll timeout
    pub fn poll(&self) -> Option<Event> {
        self.poll_timeout(self.shared.config.poll_timeout())
    }

    /// Take the next output event, waiting at most `timeout`
    pub fn poll_timeout(&self, timeout: Duration) -> Option<Event> {
        self.shared.output.pop_timeout(timeout)
    }

    /// Point-in-time metrics, readable while the pipeline runs
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let shared = &self.shared;
        let mut snapshot = shared.metrics.snapshot();
        snapshot.ingestion = QueueSnapshot {
            len: shared.ingestion.len(),
            capacity: shared.ingestion.capacity(),
        };
        snapshot.output = QueueSnapshot {
            len: shared.output.len(),
            capacity: shared.output.capacity(),
        };
        snapshot.saturated = shared.backpressure.check_and_update(&shared.ingestion);
        snapshot
    }

    /// Get a summary of all metrics
    pub fn metrics_summary(&self) -> String {
        self.metrics_snapshot().format()
    }

    /// Whether the ingestion queue is above its high watermark.
    /// Producers can use this to slow down before `submit` has to wait.
    ///
    /// Re-evaluated against the current queue on every call, so a flag left
    /// raised by a racing submit clears as soon as the queue has drained.
    pub fn is_saturated(&self) -> bool {
        self.shared
            .backpressure
            .check_and_update(&self.shared.ingestion)
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Check if the processing loop is running
    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.shared.config
    }

    /// Number of events waiting in the ingestion queue
    pub fn pending(&self) -> usize {
        self.shared.ingestion.len()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::Release);
        if let Some(handle) = self.control.get_mut().worker.take() {
            let _ = handle.join();
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.shared.config.name)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Payload;
    use crate::operator::{FilterOperator, FnOperator, MapOperator};

    fn event(id: &str) -> Event {
        Event::now(id, "test", Payload::new()).unwrap()
    }

    fn wait_for<F: Fn() -> bool>(condition: F) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_pipeline_builder() {
        let result = PipelineBuilder::new()
            .add_operator(FilterOperator::new("f", |_| true))
            .add_operator(MapOperator::new("m", Ok))
            .build();
        assert!(result.is_ok());
        assert_eq!(result.unwrap().state(), LifecycleState::Idle);
    }

    #[test]
    fn test_zero_capacity_error() {
        let result = PipelineBuilder::new().with_ingestion_capacity(0).build();
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_operator_name() {
        let result = PipelineBuilder::new()
            .add_operator(FilterOperator::new("same", |_| true))
            .add_operator(FilterOperator::new("same", |_| false))
            .build();
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_empty_operator_name() {
        let result = PipelineBuilder::new()
            .add_operator(FilterOperator::new("", |_| true))
            .build();
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_add_operator_after_start() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        pipeline.start().unwrap();
        let result = pipeline.add_operator(Box::new(FilterOperator::new("late", |_| true)));
        assert!(matches!(result, Err(PipelineError::AlreadyRunning)));
        pipeline.stop(false).unwrap();
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        pipeline.start().unwrap();
        pipeline.submit(event("a")).unwrap();

        wait_for(|| pipeline.metrics_snapshot().pipeline.processed == 1);
        assert_eq!(pipeline.poll().unwrap().id().as_str(), "a");
        pipeline.stop(false).unwrap();
    }

    #[test]
    fn test_stop_idle_pipeline() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        pipeline.stop(false).unwrap();
        assert_eq!(pipeline.state(), LifecycleState::Stopped);
        assert!(matches!(
            pipeline.start(),
            Err(PipelineError::Lifecycle { operation: "start", .. })
        ));
    }

    #[test]
    fn test_submit_before_start_is_buffered() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        pipeline.submit(event("early")).unwrap();
        assert_eq!(pipeline.pending(), 1);
        assert!(pipeline.poll().is_none());

        pipeline.start().unwrap();
        wait_for(|| pipeline.metrics_snapshot().pipeline.processed == 1);
        assert_eq!(pipeline.poll().unwrap().id().as_str(), "early");
        pipeline.stop(false).unwrap();
    }

    #[test]
    fn test_reject_mode_returns_queue_full() {
        let pipeline = PipelineBuilder::new()
            .with_ingestion_capacity(1)
            .with_submit_mode(SubmitMode::Reject)
            .build()
            .unwrap();

        pipeline.submit(event("a")).unwrap();
        let result = pipeline.submit(event("b"));
        assert!(matches!(result, Err(PipelineError::QueueFull { capacity: 1 })));

        let counters = pipeline.metrics_snapshot().pipeline;
        assert_eq!(counters.submitted, 1);
        assert_eq!(counters.submit_rejected, 1);
    }

    #[test]
    fn test_wait_mode_times_out() {
        let pipeline = PipelineBuilder::new()
            .with_ingestion_capacity(1)
            .with_submit_mode(SubmitMode::wait(Duration::from_millis(20)))
            .build()
            .unwrap();

        pipeline.submit(event("a")).unwrap();
        let start = Instant::now();
        let result = pipeline.submit(event("b"));
        assert!(matches!(result, Err(PipelineError::QueueFull { .. })));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(pipeline.metrics_snapshot().pipeline.submit_waits, 1);
    }

    #[test]
    fn test_failure_counts() {
        let pipeline = PipelineBuilder::new()
            .add_operator(FnOperator::new("fail_odd", |e: Event| {
                if e.id().as_str().ends_with('1') {
                    Err(OperatorError::failed("odd"))
                } else {
                    Ok(Some(e))
                }
            }))
            .build()
            .unwrap();
        pipeline.start().unwrap();
        pipeline.submit(event("e1")).unwrap();
        pipeline.submit(event("e2")).unwrap();

        wait_for(|| pipeline.metrics_snapshot().pipeline.ingested == 2);
        pipeline.stop(true).unwrap();

        let snapshot = pipeline.metrics_snapshot();
        assert_eq!(snapshot.pipeline.failed, 1);
        assert_eq!(snapshot.pipeline.processed, 1);
        assert_eq!(snapshot.operator("fail_odd").unwrap().failed, 1);
        assert_eq!(pipeline.poll().unwrap().id().as_str(), "e2");
    }

    #[test]
    fn test_undelivered_after_grace() {
        let pipeline = PipelineBuilder::new()
            .with_output_capacity(1)
            .with_shutdown_grace(Duration::from_millis(10))
            .build()
            .unwrap();
        pipeline.start().unwrap();
        pipeline.submit(event("a")).unwrap();
        pipeline.submit(event("b")).unwrap();

        // "a" fills the output queue, "b" waits on it
        wait_for(|| pipeline.metrics_snapshot().pipeline.output_waits == 1);
        pipeline.stop(false).unwrap();

        let counters = pipeline.metrics_snapshot().pipeline;
        assert_eq!(counters.processed, 1);
        assert_eq!(counters.undelivered, 1);
        assert_eq!(pipeline.poll().unwrap().id().as_str(), "a");
        assert!(pipeline.poll().is_none());
    }

    #[test]
    fn test_sub_millisecond_idle_timeout_accepted() {
        let pipeline = PipelineBuilder::new()
            .with_idle_timeout(Duration::from_micros(500))
            .with_poll_timeout(Duration::from_micros(200))
            .build()
            .unwrap();
        assert_eq!(pipeline.config().idle_timeout_ms, 1);
        assert_eq!(pipeline.config().poll_timeout_ms, 1);
    }

    #[test]
    fn test_stale_saturation_clears_on_read() {
        let pipeline = PipelineBuilder::new()
            .with_ingestion_capacity(4)
            .with_watermarks(75, 25)
            .build()
            .unwrap();
        for id in ["a", "b", "c", "d"] {
            pipeline.submit(event(id)).unwrap();
        }
        assert!(pipeline.shared.backpressure.is_active());

        // Empty the queue without going through the loop, leaving the flag raised
        while pipeline.shared.ingestion.try_pop().is_some() {}
        assert!(pipeline.shared.backpressure.is_active());

        assert!(!pipeline.is_saturated());
        assert!(!pipeline.metrics_snapshot().saturated);
    }

    #[test]
    fn test_lifecycle_display() {
        assert_eq!(LifecycleState::Running.to_string(), "running");
        assert_eq!(
            LifecycleState::from_u8(LifecycleState::Stopping as u8),
            LifecycleState::Stopping
        );
    }
}
