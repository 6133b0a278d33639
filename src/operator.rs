use crate::error::OperatorError;
use crate::event::Event;
use crate::metrics::{OperatorMetrics, Outcome};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Result of processing one event: `Ok(Some(_))` passes downstream,
/// `Ok(None)` drops intentionally, `Err(_)` fails this event only.
pub type OperatorResult = std::result::Result<Option<Event>, OperatorError>;

/// Trait for a processing step in the pipeline
pub trait Operator: Send + 'static {
    /// Process one event and produce zero or one event
    fn process(&mut self, event: Event) -> OperatorResult;

    /// Called on the processing thread before the first event
    fn on_start(&mut self) -> Result<(), OperatorError> {
        Ok(())
    }

    /// Called on the processing thread after the last event
    fn on_shutdown(&mut self) -> Result<(), OperatorError> {
        Ok(())
    }

    /// Name used for metrics attribution; unique within a pipeline
    fn name(&self) -> &str;
}

/// An operator that passes events matching a predicate and drops the rest
#[derive(Debug)]
pub struct FilterOperator<F>
where
    F: Fn(&Event) -> bool + Send + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterOperator<F>
where
    F: Fn(&Event) -> bool + Send + 'static,
{
    /// Create a new filter operator
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Operator for FilterOperator<F>
where
    F: Fn(&Event) -> bool + Send + 'static,
{
    fn process(&mut self, event: Event) -> OperatorResult {
        if (self.predicate)(&event) {
            Ok(Some(event))
        } else {
            Ok(None)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An operator that transforms each event into a new one
#[derive(Debug)]
pub struct MapOperator<F>
where
    F: Fn(Event) -> Result<Event, OperatorError> + Send + 'static,
{
    name: String,
    transform: F,
}

impl<F> MapOperator<F>
where
    F: Fn(Event) -> Result<Event, OperatorError> + Send + 'static,
{
    /// Create a new map operator
    pub fn new(name: impl Into<String>, transform: F) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }
}

impl<F> Operator for MapOperator<F>
where
    F: Fn(Event) -> Result<Event, OperatorError> + Send + 'static,
{
    fn process(&mut self, event: Event) -> OperatorResult {
        (self.transform)(event).map(Some)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A custom operator backed by a closure with the full pass/drop/fail contract
#[derive(Debug)]
pub struct FnOperator<F>
where
    F: FnMut(Event) -> OperatorResult + Send + 'static,
{
    name: String,
    func: F,
}

impl<F> FnOperator<F>
where
    F: FnMut(Event) -> OperatorResult + Send + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Operator for FnOperator<F>
where
    F: FnMut(Event) -> OperatorResult + Send + 'static,
{
    fn process(&mut self, event: Event) -> OperatorResult {
        (self.func)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An operator in the chain together with the counters it owns.
///
/// Only the processing loop calls [`OperatorSlot::invoke`]; the counters are
/// shared read-only with the metrics collector.
pub(crate) struct OperatorSlot {
    operator: Box<dyn Operator>,
    metrics: OperatorMetrics,
}

impl OperatorSlot {
    pub(crate) fn new(operator: Box<dyn Operator>, latency_window: usize) -> Self {
        let metrics = OperatorMetrics::new(operator.name(), latency_window);
        Self { operator, metrics }
    }

    pub(crate) fn name(&self) -> &str {
        self.operator.name()
    }

    pub(crate) fn metrics(&self) -> &OperatorMetrics {
        &self.metrics
    }

    /// Run the operator on one event, timing it and recording the outcome.
    /// A panic inside the operator is reported as `OperatorError::Panicked`.
    pub(crate) fn invoke(&mut self, event: Event) -> OperatorResult {
        let operator = &mut self.operator;
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| operator.process(event)))
            .unwrap_or_else(|payload| Err(OperatorError::Panicked(panic_message(&*payload))));
        let elapsed = start.elapsed();

        let outcome = match &result {
            Ok(Some(_)) => Outcome::Passed,
            Ok(None) => Outcome::Dropped,
            Err(_) => Outcome::Failed,
        };
        self.metrics.record(outcome, elapsed);
        result
    }

    pub(crate) fn start(&mut self) {
        if let Err(e) = self.operator.on_start() {
            tracing::warn!(operator = %self.name(), error = %e, "operator start hook failed");
        }
    }

    pub(crate) fn shutdown(&mut self) {
        if let Err(e) = self.operator.on_shutdown() {
            tracing::warn!(operator = %self.name(), error = %e, "operator shutdown hook failed");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
