use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Writes one entry per line to standard output.
///
/// On GKE and Cloud Run the logging agent picks up container stdout and
/// parses each line as a structured entry, so this is usually the only
/// sink a service needs. Pretty-printed entries span several lines and are
/// only suitable for local reading.
pub struct StdoutSink {
    out: Mutex<Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self { out: Mutex::new(tokio::io::stdout()) }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogSink for StdoutSink {
    async fn send(&self, entry: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut out = self.out.lock().await;
        out.write_all(entry).await?;
        out.write_all(b"\n").await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.out.lock().await.flush().await?;
        Ok(())
    }
}
