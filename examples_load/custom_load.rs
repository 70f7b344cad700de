use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{error, subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use tracing_stackdriver_sink::formatter::FormatterConfig;
use tracing_stackdriver_sink::init::{build_layer, LayerConfig};
use tracing_stackdriver_sink::noop_sink::NoopSink;

#[tokio::main]
async fn main() {
    let sink = Arc::new(NoopSink::default());

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        enable_stdout: false,
        min_level: tracing::Level::ERROR,
        formatter: FormatterConfig::stackdriver().source_location(true),
    };

    let (layer, _handle) = build_layer(sink, &layer_config).expect("valid config");
    let dropped = Arc::clone(&layer.dropped_events);
    subscriber::set_global_default(Registry::default().with(layer)).expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: formatted {} events in {:?} (~{:.0} ev/s), dropped {}",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        dropped.load(Ordering::Relaxed)
    );

    sleep(Duration::from_secs(2)).await;
}
