//! Pipeline orchestrator — drives one staged message to DONE or ABORTED.
//!
//! Order is fixed: load → extract → compile → send → stage → copy →
//! delete source → delete staged copy. Nothing is retried and nothing that
//! already landed is rolled back; a failure reports which effects exist.
//!
//! The archive object is never written with `put`. The raw bytes are put
//! under the reserved temporary prefix (which the storage trigger ignores)
//! and then copied to the archive path, so the only write that fires the
//! trigger is the copy.

use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::compiler;
use crate::config::PipelineConfig;
use crate::deriver::{self, Clock, SystemClock};
use crate::error::PipelineError;
use crate::event::ObjectRef;
use crate::message::MessageDescription;
use crate::pipeline::record::{Compiled, Fresh, Loaded, ProcessingRecord, Routed, RunIdentity};
use crate::pipeline::state::{Effects, RunTracker, Stage, StateTransition};
use crate::storage::ObjectStore;
use crate::transport::MailTransport;

/// Outcome of a run that reached DONE.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub identity: RunIdentity,
    pub destination_path: String,
    pub transitions: Vec<StateTransition>,
}

/// Outcome of a run that ended in ABORTED.
#[derive(Debug, thiserror::Error)]
#[error(
    "pipeline aborted while reaching {failed_stage} for {}/{} (run {}); landed effects: {}: {error}",
    .identity.source_bucket,
    .identity.source_key,
    .identity.correlation_id,
    .effects.summary()
)]
pub struct RunFailure {
    pub identity: RunIdentity,
    /// Stage the run was trying to reach.
    pub failed_stage: Stage,
    /// Last stage that completed.
    pub completed_stage: Stage,
    /// Side effects already in place.
    pub effects: Effects,
    #[source]
    pub error: PipelineError,
    pub transitions: Vec<StateTransition>,
}

/// Sequential pipeline over one object store and one transport.
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    transport: Arc<dyn MailTransport>,
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline using the wall clock.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        transport: Arc<dyn MailTransport>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            transport,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used for archive timestamps and the Date header.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Process one staged object under a fresh correlation id.
    pub async fn run(&self, object: ObjectRef) -> Result<RunReport, RunFailure> {
        self.run_as(object, Uuid::now_v7().to_string()).await
    }

    /// Process one staged object under a caller-supplied correlation id.
    ///
    /// The id must be unique among runs whose temporary object may still exist.
    pub async fn run_as(
        &self,
        object: ObjectRef,
        correlation_id: impl Into<String>,
    ) -> Result<RunReport, RunFailure> {
        let record = ProcessingRecord::new(object, correlation_id);
        let identity = record.identity().clone();
        let span = info_span!(
            "pipeline",
            bucket = %identity.source_bucket,
            key = %identity.source_key,
            correlation_id = %identity.correlation_id,
        );

        async move {
            let mut tracker = RunTracker::new();
            match self.execute(record, &mut tracker).await {
                Ok(destination_path) => {
                    tracker.transition_to(Stage::Done);
                    info!(destination = %destination_path, "Pipeline done");
                    Ok(RunReport {
                        identity,
                        destination_path,
                        transitions: tracker.into_transitions(),
                    })
                }
                Err(error) => {
                    let completed_stage = tracker.stage();
                    let failed_stage = completed_stage.next().unwrap_or(Stage::Done);
                    let effects = Effects::after(completed_stage);
                    tracker.transition_to(Stage::Aborted);

                    error!(
                        stage = %failed_stage,
                        completed = %completed_stage,
                        effects = %effects.summary(),
                        error = %error,
                        "Pipeline aborted"
                    );
                    Err(RunFailure {
                        identity,
                        failed_stage,
                        completed_stage,
                        effects,
                        error,
                        transitions: tracker.into_transitions(),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run every stage in order, advancing `tracker` after each success.
    /// Returns the archive path.
    async fn execute(
        &self,
        record: ProcessingRecord<Fresh>,
        tracker: &mut RunTracker,
    ) -> Result<String, PipelineError> {
        let record = self.load(record).await?;
        advance(tracker, Stage::Loaded);

        let record = self.extract(record)?;
        advance(tracker, Stage::Extracted);

        let record = self.compile(record)?;
        advance(tracker, Stage::Compiled);

        self.send(&record).await?;
        advance(tracker, Stage::Sent);

        let temp_key = self.config.temp_key(record.correlation_id());

        self.stage_raw(&record, &temp_key).await?;
        advance(tracker, Stage::Staged);

        self.copy_to_archive(&record, &temp_key).await?;
        advance(tracker, Stage::Copied);

        self.delete(record.source_bucket(), record.source_key()).await?;
        advance(tracker, Stage::SourceDeleted);

        self.delete(record.source_bucket(), &temp_key).await?;
        advance(tracker, Stage::StagedDeleted);

        Ok(record.destination_path().to_string())
    }

    async fn load(
        &self,
        record: ProcessingRecord<Fresh>,
    ) -> Result<ProcessingRecord<Loaded>, PipelineError> {
        let body = self
            .store
            .get(record.source_bucket(), record.source_key())
            .await
            .map_err(|e| PipelineError::LoadFailure(e.to_string()))?;

        let description = MessageDescription::from_json(&body)
            .map_err(|e| PipelineError::LoadFailure(format!("invalid message JSON: {e}")))?;

        Ok(record.with_description(description))
    }

    fn extract(
        &self,
        record: ProcessingRecord<Loaded>,
    ) -> Result<ProcessingRecord<Routed>, PipelineError> {
        let routing = deriver::derive(record.description(), &self.config, self.clock.as_ref())?;
        debug!(destination = %routing.destination_path, "Derived archive path");
        Ok(record.with_routing(routing))
    }

    fn compile(
        &self,
        record: ProcessingRecord<Routed>,
    ) -> Result<ProcessingRecord<Compiled>, PipelineError> {
        let raw = compiler::compile(record.description(), self.clock.as_ref())?;
        debug!(bytes = raw.len(), "Compiled raw message");
        Ok(record.with_raw_message(raw))
    }

    async fn send(&self, record: &ProcessingRecord<Compiled>) -> Result<(), PipelineError> {
        debug!(transport = self.transport.name(), "Transmitting raw message");
        self.transport.send_raw(record.raw_message()).await?;
        Ok(())
    }

    async fn stage_raw(
        &self,
        record: &ProcessingRecord<Compiled>,
        temp_key: &str,
    ) -> Result<(), PipelineError> {
        self.store
            .put(record.source_bucket(), temp_key, record.raw_message().as_bytes())
            .await
            .map_err(PipelineError::StagingFailure)
    }

    async fn copy_to_archive(
        &self,
        record: &ProcessingRecord<Compiled>,
        temp_key: &str,
    ) -> Result<(), PipelineError> {
        let destination = record.destination_path();
        if self.config.is_reserved(destination) {
            // The copy would never fire the downstream trigger.
            warn!(destination, "Archive path falls inside the reserved prefix");
        }
        self.store
            .copy(record.source_bucket(), temp_key, destination)
            .await
            .map_err(PipelineError::ArchivalFailure)
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), PipelineError> {
        self.store
            .delete(bucket, key)
            .await
            .map_err(PipelineError::CleanupFailure)
    }
}

fn advance(tracker: &mut RunTracker, stage: Stage) {
    if tracker.transition_to(stage) {
        info!(stage = %stage, "Stage complete");
    } else {
        warn!(from = %tracker.stage(), to = %stage, "Ignored out-of-order stage transition");
    }
}
