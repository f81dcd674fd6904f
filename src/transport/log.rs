//! Dry-run transport: accepts every message and logs it.

use async_trait::async_trait;
use tracing::info;

use crate::compiler::RawMessage;
use crate::error::TransmissionError;
use crate::transport::MailTransport;

#[derive(Debug, Default)]
pub struct LogTransport;

impl LogTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send_raw(&self, message: &RawMessage) -> Result<(), TransmissionError> {
        let envelope = message.envelope();
        let recipients: Vec<String> = envelope.to().iter().map(|a| a.to_string()).collect();
        info!(
            from = ?envelope.from().map(|a| a.to_string()),
            to = %recipients.join(", "),
            bytes = message.len(),
            "Dry run: message accepted without delivery"
        );
        Ok(())
    }
}
