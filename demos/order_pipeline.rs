//! Order processing pipeline demonstrating filtering, enrichment and a
//! stateful custom operator.
//!
//! Pipeline:
//! 1. Filter: keep orders over 100
//! 2. Map: stamp each order with a processing time
//! 3. Custom: running total per customer, rejecting malformed orders
//!
//! Usage: RUST_LOG=debug cargo run --example order_pipeline

use event_pipeline::{
    Event, FilterOperator, MapOperator, Operator, OperatorError, OperatorResult, Payload,
    PipelineBuilder, SubmitMode,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Keeps a running total per customer and attaches it to each order
struct CustomerTotals {
    totals: HashMap<String, i64>,
}

impl Operator for CustomerTotals {
    fn process(&mut self, event: Event) -> OperatorResult {
        let customer = event
            .partition_key()
            .ok_or_else(|| OperatorError::failed("order has no customer"))?
            .to_string();
        let amount = event
            .field("amount")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| OperatorError::failed("order has no amount"))?;

        let total = self.totals.entry(customer).or_insert(0);
        *total += amount;
        Ok(Some(event.with_field("customer_total", *total)))
    }

    fn on_shutdown(&mut self) -> Result<(), OperatorError> {
        println!("\n=== Customer Totals ===");
        let mut customers: Vec<_> = self.totals.iter().collect();
        customers.sort();
        for (customer, total) in customers {
            println!("{}: {}", customer, total);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "customer_totals"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Order Processing Pipeline");
    println!("=========================");

    let start = Instant::now();

    let pipeline = Arc::new(
        PipelineBuilder::new()
            .with_name("orders")
            .with_ingestion_capacity(16)
            .with_output_capacity(16)
            .with_submit_mode(SubmitMode::wait(Duration::from_millis(500)))
            .add_operator(FilterOperator::new("amount_over_100", |e| {
                e.field("amount").and_then(|v| v.as_i64()).unwrap_or(0) > 100
            }))
            .add_operator(MapOperator::new("add_processed_timestamp", |e: Event| {
                Ok(e.with_field("processed_at", chrono::Utc::now().to_rfc3339()))
            }))
            .add_operator(CustomerTotals {
                totals: HashMap::new(),
            })
            .build()?,
    );

    pipeline.start()?;

    let producer = {
        let pipeline = Arc::clone(&pipeline);
        thread::spawn(move || -> event_pipeline::Result<()> {
            for i in 0..100i64 {
                let mut event = Event::now(format!("order-{}", i), "order", Payload::new())?
                    .with_field("amount", (i * 37) % 400);
                // Every 25th order arrives without a customer and fails downstream
                if i % 25 != 0 {
                    event = event.with_partition_key(format!("customer-{}", i % 4));
                }
                pipeline.submit(event)?;
            }
            Ok(())
        })
    };

    let mut delivered = 0;
    while !producer.is_finished() || pipeline.pending() > 0 {
        if let Some(event) = pipeline.poll() {
            delivered += 1;
            if delivered % 10 == 0 {
                println!(
                    "{} -> total {}",
                    event.id(),
                    event.field("customer_total").cloned().unwrap_or_default()
                );
            }
        }
    }
    producer.join().map_err(|_| "producer panicked")??;

    pipeline.stop(true)?;
    while let Some(_event) = pipeline.poll() {
        delivered += 1;
    }

    println!("\nDelivered {} orders", delivered);
    println!("{}", pipeline.metrics_summary());
    println!("Pipeline execution time: {:.3}s", start.elapsed().as_secs_f64());

    Ok(())
}
