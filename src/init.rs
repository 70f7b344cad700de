use crate::error::FormatError;
use crate::formatter::{Formatter, FormatterConfig};
use crate::layer::StackdriverLayer;
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Конфигурация слоя логирования.
///
/// Управляет размером внутреннего буфера, максимальным размером батча
/// при отправке в sink, частотой принудительного flush, минимальным
/// уровнем событий, настройками форматтера, а также тем, нужно ли
/// дополнительно печатать логи в консоль через `fmt`‑слой.
///
/// **Поля**
/// - `channel_buffer`: максимальное число записей в очереди до начала
///   дропа новых.
/// - `batch_size`: размер батча для отправки в sink.
/// - `flush_interval`: максимальный интервал между flush’ами даже при
///   неполном батче.
/// - `enable_stdout`: если `true`, поверх `StackdriverLayer` добавляется
///   `tracing_subscriber::fmt::Layer` с человекочитаемым выводом.
/// - `min_level`: самый подробный уровень, который попадает в sink.
/// - `formatter`: [`FormatterConfig`] для записей Cloud Logging.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
    pub min_level: Level,
    pub formatter: FormatterConfig,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: false,
            min_level: Level::INFO,
            formatter: FormatterConfig::stackdriver(),
        }
    }
}

/// Error type returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Formatter(#[from] FormatError),

    #[error("failed to set global subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Build a [`StackdriverLayer`] from a [`LayerConfig`] without installing
/// it, for callers that compose their own subscriber.
///
/// **Returns**
/// - the layer and the handle of its background task.
/// - `Err(FormatError::Configuration)` if the formatter config is invalid.
pub fn build_layer(
    sink: Arc<dyn LogSink>,
    config: &LayerConfig,
) -> Result<(StackdriverLayer, JoinHandle<()>), FormatError> {
    let formatter = Formatter::new(config.formatter.clone())?;
    Ok(StackdriverLayer::new(
        sink,
        formatter,
        config.min_level,
        config.channel_buffer,
        config.batch_size,
        config.flush_interval,
    ))
}

/// Initialize global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that will receive formatted
///   entries.
/// - `config`: [`LayerConfig`] controlling formatting, buffering and
///   batching behavior of the layer.
///
/// **Effects**
///
/// This installs a [`Registry`] combined with [`StackdriverLayer`] as the
/// global default subscriber, so all `tracing` events in the process
/// are observed by the layer. Must be called from within a Tokio runtime.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: LayerConfig,
) -> Result<JoinHandle<()>, InitError> {
    let (layer, handle) = build_layer(sink, &config)?;

    // Слой, который пишет во внешний sink, подключаем всегда.
    // Дополнительно, при `enable_stdout = true`, подключаем `fmt`‑слой.
    // Для совместимости типов собираем subscriber в двух вариантах.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(handle)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`]: Cloud Logging severities, structured
/// timestamps and events from `INFO` up.
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<JoinHandle<()>, InitError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
