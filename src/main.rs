use std::io::Read;
use std::sync::Arc;

use anyhow::Context;

use outbox_archiver::config::{PipelineConfig, SmtpConfig, StorageConfig};
use outbox_archiver::pipeline::{Pipeline, handle_raw_event};
use outbox_archiver::storage::{FsStore, ObjectStore};
use outbox_archiver::transport::{LogTransport, MailTransport, SmtpRelay};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let event = match std::env::args().nth(1) {
        Some(path) if path != "-" => {
            std::fs::read(&path).with_context(|| format!("reading event file {path}"))?
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading event from stdin")?;
            buf
        }
    };

    let pipeline_config = PipelineConfig::from_env()?;
    let storage_config = StorageConfig::from_env();

    let transport: Arc<dyn MailTransport> = match SmtpConfig::from_env()? {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP relay");
            Arc::new(SmtpRelay::new(&smtp)?)
        }
        None => {
            tracing::warn!("OUTBOX_SMTP_HOST not set; messages will be logged, not delivered");
            Arc::new(LogTransport::new())
        }
    };

    tracing::info!(
        storage = %storage_config.root.display(),
        archive_root = %pipeline_config.archive_root,
        temp_prefix = %pipeline_config.temp_prefix,
        "Starting outbox archiver"
    );
    let store: Arc<dyn ObjectStore> = Arc::new(FsStore::new(storage_config.root));

    let pipeline = Pipeline::new(store, transport, pipeline_config);
    if handle_raw_event(&pipeline, &event).await {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
