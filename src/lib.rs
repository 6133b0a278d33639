//! A single-process, backpressure-aware event pipeline engine.
//!
//! Producers submit [`Event`]s into a bounded ingestion queue. One processing
//! thread threads each event through an ordered chain of [`Operator`]s and
//! enqueues survivors on a bounded output queue for consumers to poll.
//!
//! # Features
//!
//! - Bounded FIFO queues on crossbeam's ArrayQueue; full queues never drop
//! - Configurable submit behaviour: fail fast or bounded, cancellable wait
//! - Filter, map and closure operators with a pass/drop/fail contract
//! - Per-event failure isolation, including operator panics
//! - Per-operator counters and latency percentiles, readable while running
//! - Watermark-based saturation signal for producers
//! - Stop immediately or after draining queued events
//!
//! # Example
//!
//! ```ignore
//! use event_pipeline::{Event, FilterOperator, MapOperator, PipelineBuilder};
//!
//! let pipeline = PipelineBuilder::new()
//!     .with_ingestion_capacity(5)
//!     .with_output_capacity(5)
//!     .add_operator(FilterOperator::new("big_orders", |e| {
//!         e.field("amount").and_then(|v| v.as_i64()).unwrap_or(0) > 100
//!     }))
//!     .add_operator(MapOperator::new("stamp", |e| {
//!         Ok(e.with_field("processed_at", chrono::Utc::now().to_rfc3339()))
//!     }))
//!     .build()?;
//!
//! pipeline.start()?;
//! pipeline.submit(event)?;
//! while let Some(out) = pipeline.poll() {
//!     // deliver downstream...
//! }
//! pipeline.stop(true)?;
//! ```

pub mod backpressure;
pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod operator;
pub mod pipeline;

// Re-exports for convenience
pub use backpressure::BackpressureController;
pub use buffer::{BoundedQueue, PushError};
pub use config::{PipelineConfig, SubmitMode};
pub use error::{OperatorError, PipelineError, Result};
pub use event::{Event, EventId, Metadata, Payload};
pub use metrics::{
    MetricsCollector, MetricsSnapshot, OperatorMetrics, OperatorSnapshot, PipelineCounters,
    QueueSnapshot,
};
pub use operator::{FilterOperator, FnOperator, MapOperator, Operator, OperatorResult};
pub use pipeline::{LifecycleState, Pipeline, PipelineBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
