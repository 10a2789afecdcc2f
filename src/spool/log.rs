//! Simulated queue: logs the message and reports success.

use async_trait::async_trait;

use crate::spool::{SpoolError, SpoolMessage, SpoolSink};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpoolSink;

impl LogSpoolSink {
    fn emit(&self, message: &SpoolMessage) {
        tracing::warn!(
            message_id = %message.id,
            queue = message.queue.as_str(),
            reason = %message.reason,
            payload = %message.payload,
            "Spooling failed request (simulated queue)"
        );
    }
}

#[async_trait]
impl SpoolSink for LogSpoolSink {
    async fn push_to_retry_queue(&self, message: SpoolMessage) -> Result<(), SpoolError> {
        self.emit(&message);
        Ok(())
    }

    async fn push_to_dlq(&self, message: SpoolMessage) -> Result<(), SpoolError> {
        self.emit(&message);
        Ok(())
    }
}
