use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_stackdriver_sink::{
    env::layer_config_from_env,
    init::init_tracing_with_config,
    sink::LogSink,
    stdout_sink::StdoutSink,
    Formatter, HttpRequest, Level, LogRecord, RequestInfo,
};

/// Prints Cloud Logging entries to stdout, the way a service on GKE or
/// Cloud Run would. Set `LOG_FORMAT_PRETTY=1` to indent them.
#[tokio::main]
async fn main() {
    let sink = Arc::new(StdoutSink::new());

    let config = layer_config_from_env();
    let formatter_config = config.formatter.clone();
    let _handle = init_tracing_with_config(sink.clone(), config).expect("install subscriber");

    info!(user = "alice", "signed in");
    warn!(retries = 3u64, "upstream slow");

    // Request metadata is attached on the record directly and written
    // through the same sink.
    let request = HttpRequest {
        status: 200,
        response_size: 512,
        latency: Duration::from_millis(42),
        local_ip: "10.0.0.5".to_string(),
        ..HttpRequest::new(RequestInfo {
            method: "GET".to_string(),
            url: "/healthz".to_string(),
            user_agent: "kube-probe/1.29".to_string(),
            ..RequestInfo::default()
        })
    };
    let record = LogRecord::new(Level::Info, "request served").with_field("httpRequest", request);

    let formatter = Formatter::new(formatter_config).expect("valid config");
    let entry = formatter.format(&record).expect("format entry");
    sink.send(&entry).await.expect("write entry");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let _ = sink.flush().await;
}
