//! SMTP relay transport via lettre.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use crate::compiler::RawMessage;
use crate::config::SmtpConfig;
use crate::error::TransmissionError;
use crate::transport::MailTransport;

/// Submits raw messages to an authenticated SMTP relay.
pub struct SmtpRelay {
    host: String,
    transport: SmtpTransport,
}

impl SmtpRelay {
    pub fn new(config: &SmtpConfig) -> Result<Self, TransmissionError> {
        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| TransmissionError::Setup(format!("SMTP relay error: {e}")))?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            host: config.host.clone(),
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send_raw(&self, message: &RawMessage) -> Result<(), TransmissionError> {
        let transport = self.transport.clone();
        let envelope = message.envelope().clone();
        let bytes = message.as_bytes().to_vec();

        // lettre's sync transport blocks; keep it off the runtime threads.
        tokio::task::spawn_blocking(move || transport.send_raw(&envelope, &bytes))
            .await
            .map_err(|e| TransmissionError::Task(e.to_string()))?
            .map_err(|e| TransmissionError::Rejected(format!("SMTP send failed: {e}")))?;

        info!(relay = %self.host, bytes = message.len(), "Message submitted");
        Ok(())
    }
}
