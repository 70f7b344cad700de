use crate::formatter::Formatter;
use crate::record::{FieldValue, Level as RecordLevel, LogRecord};
use crate::sink::LogSink;
use chrono::Utc;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that formats events as Cloud Logging
/// entries and forwards them to an asynchronous [`LogSink`] via a bounded
/// channel and background task.
///
/// Events at or above `min_level` become [`LogRecord`]s and are formatted
/// on the emitting thread, so a record is either fully serialized or
/// counted in `failed_events`. Only the finished bytes cross the channel;
/// sink I/O is fully decoupled from application threads.
pub struct StackdriverLayer {
    sender: mpsc::Sender<Vec<u8>>,
    formatter: Formatter,
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
    /// Dropped because formatting failed.
    pub failed_events: Arc<AtomicU64>,
    /// Dropped because the sink kept failing for `MAX_SEND_ATTEMPTS`.
    pub lost_events: Arc<AtomicU64>,
}

/// Attempts per batch before its unsent entries are given up on.
pub const MAX_SEND_ATTEMPTS: u32 = 5;

impl StackdriverLayer {
    /// Create a new layer and spawn a background task that pulls formatted
    /// entries from a bounded channel and sends them to the provided
    /// [`LogSink`].
    ///
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval` to avoid degenerate configurations.
    ///
    /// The task drains what is left and exits once the layer is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn new(
        sink: Arc<dyn LogSink>,
        formatter: Formatter,
        min_level: Level,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(buffer);

        let lost_events = Arc::new(AtomicU64::new(0));
        let lost_events_bg = Arc::clone(&lost_events);

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            let backoff = Duration::from_millis(100);
            let max_backoff = Duration::from_secs(10);
            let mut ticker = interval(flush_interval);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(entry) => {
                            batch.push(entry);
                            if batch.len() >= batch_size {
                                if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff, &lost_events_bg).await {
                                    eprintln!("error sending log batch: {}", e);
                                }
                            }
                        }
                        None => {
                            if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff, &lost_events_bg).await {
                                eprintln!("error flushing log batch: {}", e);
                            }
                            break;
                        }
                    },
                    _ = ticker.tick() => {
                        if !batch.is_empty() {
                            if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff, &lost_events_bg).await {
                                eprintln!("error flushing log batch: {}", e);
                            }
                        }
                    }
                }
            }
        });

        (Self {
            sender: tx,
            formatter,
            min_level,
            total_events: Arc::new(AtomicU64::new(0)),
            enqueued_events: Arc::new(AtomicU64::new(0)),
            dropped_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
            lost_events,
        }, handle)
    }
}

/// Send every entry in `batch`, retrying the unsent tail with exponential
/// backoff, then flush the sink.
///
/// After [`MAX_SEND_ATTEMPTS`] failed attempts the unsent entries are
/// counted in `lost` and cleared, so a dead sink cannot stall shutdown.
async fn send_batch(
    sink: &dyn LogSink,
    batch: &mut Vec<Vec<u8>>,
    mut backoff: Duration,
    max_backoff: Duration,
    lost: &AtomicU64,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut attempts = 0;
    loop {
        let mut sent = 0;
        let mut failed = false;
        for entry in batch.iter() {
            if sink.send(entry).await.is_err() {
                failed = true;
                break;
            }
            sent += 1;
        }
        // Entries already accepted are not sent twice.
        batch.drain(..sent);

        if !failed {
            return sink.flush().await;
        }

        attempts += 1;
        if attempts >= MAX_SEND_ATTEMPTS {
            let unsent = batch.len();
            lost.fetch_add(unsent as u64, Ordering::Relaxed);
            batch.clear();
            return Err(format!("log sink failed {} times, dropped {} entries", attempts, unsent).into());
        }

        eprintln!("log sink send failed, retrying in {:?}", backoff);
        sleep(backoff).await;
        backoff = std::cmp::min(backoff * 2, max_backoff);
    }
}

impl<S> Layer<S> for StackdriverLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *event.metadata().level() > self.min_level {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor { fields: &mut fields, message: &mut message };
        event.record(&mut visitor);

        let meta = event.metadata();
        let record = LogRecord {
            timestamp: Utc::now(),
            level: RecordLevel::from(*meta.level()),
            message,
            fields,
            target: Some(meta.target().to_string()),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
        };

        let entry = match self.formatter.format(&record) {
            Ok(entry) => entry,
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("failed to format log record: {}", e);
                return;
            }
        };

        match self.sender.try_send(entry) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_e) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log channel full, dropping log entry");
            }
        }
    }
}

use tracing::field::{Field, Visit};

/// Collects event fields into [`FieldValue`]s. The `message` field becomes
/// the record message.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, FieldValue>,
    pub message: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: impl Into<FieldValue>) {
        self.fields.insert(field.name().to_string(), value.into());
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.insert(field, FieldValue::error(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // Format strings of `info!("...")` arrive here as `fmt::Arguments`.
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, format!("{:?}", value));
        }
    }
}
