//! Trigger handler — the entry point invoked once per storage event.

use futures::future::join_all;
use tracing::{error, info};

use crate::event::TriggerEvent;
use crate::pipeline::orchestrator::{Pipeline, RunFailure, RunReport};

/// Run one pipeline per record concurrently.
///
/// Each record gets its own run and its own correlation id; results are
/// returned in record order.
pub async fn process_event(
    pipeline: &Pipeline,
    event: &TriggerEvent,
) -> Vec<Result<RunReport, RunFailure>> {
    info!(records = event.records.len(), "Processing trigger event");
    join_all(
        event
            .records
            .iter()
            .cloned()
            .map(|object| pipeline.run(object)),
    )
    .await
}

/// Process a trigger event and collapse the outcome into a success flag.
///
/// `true` only when every record reached DONE.
pub async fn handle_event(pipeline: &Pipeline, event: &TriggerEvent) -> bool {
    let results = process_event(pipeline, event).await;
    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        error!(failed, total = results.len(), "Trigger event failed");
        false
    } else {
        info!(total = results.len(), "Trigger event processed");
        true
    }
}

/// Decode a raw notification document and handle it.
pub async fn handle_raw_event(pipeline: &Pipeline, raw: &[u8]) -> bool {
    match TriggerEvent::from_json(raw) {
        Ok(event) => handle_event(pipeline, &event).await,
        Err(e) => {
            error!(error = %e, "Rejected trigger event");
            false
        }
    }
}
