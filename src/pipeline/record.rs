//! Per-run processing record.
//!
//! The record is threaded through the stages by value. Each derived field
//! is added exactly once by moving the record into its next state type, so
//! nothing can be overwritten and no stage can read a field before the
//! stage that produces it has run.

use crate::compiler::RawMessage;
use crate::deriver::Routing;
use crate::event::ObjectRef;
use crate::message::MessageDescription;

/// Fields fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    pub source_bucket: String,
    pub source_key: String,
    /// Time-ordered unique token naming this run's temporary object.
    pub correlation_id: String,
}

/// Nothing derived yet.
#[derive(Debug)]
pub struct Fresh;

/// Staged JSON parsed.
#[derive(Debug)]
pub struct Loaded {
    description: MessageDescription,
}

/// Destination path derived.
#[derive(Debug)]
pub struct Routed {
    description: MessageDescription,
    routing: Routing,
}

/// Raw message compiled.
#[derive(Debug)]
pub struct Compiled {
    routing: Routing,
    raw: RawMessage,
}

#[derive(Debug)]
pub struct ProcessingRecord<S> {
    identity: RunIdentity,
    state: S,
}

impl<S> ProcessingRecord<S> {
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    pub fn source_bucket(&self) -> &str {
        &self.identity.source_bucket
    }

    pub fn source_key(&self) -> &str {
        &self.identity.source_key
    }

    pub fn correlation_id(&self) -> &str {
        &self.identity.correlation_id
    }
}

impl ProcessingRecord<Fresh> {
    pub fn new(object: ObjectRef, correlation_id: impl Into<String>) -> Self {
        Self {
            identity: RunIdentity {
                source_bucket: object.bucket,
                source_key: object.key,
                correlation_id: correlation_id.into(),
            },
            state: Fresh,
        }
    }

    pub fn with_description(self, description: MessageDescription) -> ProcessingRecord<Loaded> {
        ProcessingRecord {
            identity: self.identity,
            state: Loaded { description },
        }
    }
}

impl ProcessingRecord<Loaded> {
    pub fn description(&self) -> &MessageDescription {
        &self.state.description
    }

    pub fn with_routing(self, routing: Routing) -> ProcessingRecord<Routed> {
        ProcessingRecord {
            identity: self.identity,
            state: Routed {
                description: self.state.description,
                routing,
            },
        }
    }
}

impl ProcessingRecord<Routed> {
    pub fn description(&self) -> &MessageDescription {
        &self.state.description
    }

    /// The description is no longer needed once the raw bytes exist.
    pub fn with_raw_message(self, raw: RawMessage) -> ProcessingRecord<Compiled> {
        ProcessingRecord {
            identity: self.identity,
            state: Compiled {
                routing: self.state.routing,
                raw,
            },
        }
    }
}

impl ProcessingRecord<Compiled> {
    pub fn destination_path(&self) -> &str {
        &self.state.routing.destination_path
    }

    pub fn raw_message(&self) -> &RawMessage {
        &self.state.raw
    }
}
