use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for formatted log entries.
///
/// Each entry is one serialized Cloud Logging JSON object without a
/// trailing newline. Implementations decide how to write it (stdout, file,
/// an agent socket, etc). The layer calls `send` from a background task and
/// never awaits it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Write a single formatted entry.
    ///
    /// **Parameters**
    /// - `entry`: JSON bytes produced by
    ///   [`Formatter::format`](crate::formatter::Formatter::format).
    ///
    /// **Returns**
    /// - `Ok(())` if the entry was written.
    /// - `Err(..)` if the destination failed. The layer will treat this as
    ///   a transient failure and retry the batch with backoff.
    async fn send(&self, entry: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered entries, if the sink implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
