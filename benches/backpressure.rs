use criterion::{black_box, criterion_group, criterion_main, Criterion};
use event_pipeline::{
    Event, MapOperator, Operator, Payload, PipelineBuilder, PipelineError, SubmitMode,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn make_event(i: u64) -> Event {
    Event::now(format!("e{}", i), "bench", Payload::new()).expect("valid event")
}

fn slow_operator() -> impl Operator {
    MapOperator::new("slow", |e: Event| {
        thread::sleep(Duration::from_micros(100));
        Ok(e)
    })
}

/// Producers block on a small ingestion queue in front of a slow operator
fn benchmark_wait_slow_operator(c: &mut Criterion) {
    c.bench_function("wait_mode_slow_operator_500_events", |b| {
        b.iter(|| {
            let pipeline = Arc::new(
                PipelineBuilder::new()
                    .with_ingestion_capacity(50)
                    .with_output_capacity(500)
                    .with_submit_mode(SubmitMode::wait(Duration::from_secs(10)))
                    .add_operator(slow_operator())
                    .build()
                    .expect("Build failed"),
            );
            pipeline.start().expect("Start failed");

            for i in 0..500 {
                pipeline.submit(black_box(make_event(i))).expect("Submit failed");
            }
            pipeline.stop(true).expect("Stop failed");
        });
    });
}

/// Producers fail fast and retry with a short backoff
fn benchmark_reject_with_retry(c: &mut Criterion) {
    c.bench_function("reject_mode_retry_500_events", |b| {
        b.iter(|| {
            let pipeline = Arc::new(
                PipelineBuilder::new()
                    .with_ingestion_capacity(50)
                    .with_output_capacity(500)
                    .with_submit_mode(SubmitMode::Reject)
                    .add_operator(slow_operator())
                    .build()
                    .expect("Build failed"),
            );
            pipeline.start().expect("Start failed");

            for i in 0..500 {
                let event = make_event(i);
                loop {
                    match pipeline.submit(black_box(event.clone())) {
                        Ok(()) => break,
                        Err(PipelineError::QueueFull { .. }) => {
                            thread::sleep(Duration::from_micros(50))
                        }
                        Err(e) => panic!("unexpected submit error: {}", e),
                    }
                }
            }
            pipeline.stop(true).expect("Stop failed");
        });
    });
}

/// Producers watch the saturation signal and back off before the queue fills
fn benchmark_saturation_throttled(c: &mut Criterion) {
    c.bench_function("saturation_throttled_500_events", |b| {
        b.iter(|| {
            let pipeline = Arc::new(
                PipelineBuilder::new()
                    .with_ingestion_capacity(50)
                    .with_output_capacity(500)
                    .with_watermarks(80, 40)
                    .add_operator(slow_operator())
                    .build()
                    .expect("Build failed"),
            );
            pipeline.start().expect("Start failed");

            for i in 0..500 {
                while pipeline.is_saturated() {
                    thread::sleep(Duration::from_micros(50));
                }
                pipeline.submit(black_box(make_event(i))).expect("Submit failed");
            }
            pipeline.stop(true).expect("Stop failed");
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(15))
        .sample_size(20);
    targets = benchmark_wait_slow_operator, benchmark_reject_with_retry, benchmark_saturation_throttled
);
criterion_main!(benches);
