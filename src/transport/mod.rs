//! Mail transmission gateway.
//!
//! One operation: hand a compiled raw message to a delivery service. No
//! batching, no partial sends; one message per call.

pub mod log;
pub mod smtp;

use async_trait::async_trait;

use crate::compiler::RawMessage;
use crate::error::TransmissionError;

pub use log::LogTransport;
pub use smtp::SmtpRelay;

/// Outbound delivery service.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &str;

    /// Submit one raw message for delivery.
    async fn send_raw(&self, message: &RawMessage) -> Result<(), TransmissionError>;
}
