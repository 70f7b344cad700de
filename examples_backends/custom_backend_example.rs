use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_stackdriver_sink::{
    init::init_tracing,
    sink::LogSink,
};

/// Example of integrating a completely custom destination by implementing
/// the `LogSink` trait directly. Imagine this forwards entries to a local
/// agent socket. For the sake of example we just print them.
struct MyAgentSink;

#[async_trait]
impl LogSink for MyAgentSink {
    async fn send(&self, entry: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("[my-agent] {}", String::from_utf8_lossy(entry));
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let sink: Arc<dyn LogSink> = Arc::new(MyAgentSink);

    let _handle = init_tracing(sink).expect("install subscriber");

    info!("custom backend example started");
    error!(db = "orders", "simulated error sent via custom backend");

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
}
