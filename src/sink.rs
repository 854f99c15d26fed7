use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogRecord`]s produced by the logging layer.
///
/// Implementations format and transport a record to a concrete chat
/// backend. The layer calls `send` from a spawned task and never awaits
/// it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a single log record.
    ///
    /// **Returns**
    /// - `Ok(())` if every destination accepted the record.
    /// - `Err(..)` on the first failure (configuration, formatting, network
    ///   or HTTP status). The layer reports the error and moves on; it
    ///   does not retry.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
