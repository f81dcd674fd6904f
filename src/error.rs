//! Error types for the outbox archiver.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Trigger event decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Failed to decode trigger event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Trigger event contains no records")]
    Empty,
}

/// Object store errors. Transient and permanent failures are not distinguished.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Storage backend failed on {bucket}/{key}: {reason}")]
    Backend {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("IO error on {bucket}/{key}: {source}")]
    Io {
        bucket: String,
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Mail transmission errors.
#[derive(Debug, thiserror::Error)]
pub enum TransmissionError {
    #[error("Transport setup failed: {0}")]
    Setup(String),

    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Transmission task failed: {0}")]
    Task(String),
}

/// Routing address errors.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("Missing {field} address")]
    Missing { field: &'static str },

    #[error("Malformed {field} address: {value:?}")]
    Malformed { field: &'static str, value: String },
}

/// Raw message compilation errors.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Invalid {field} address {value:?}: {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid attachment {filename:?}: {reason}")]
    InvalidAttachment { filename: String, reason: String },

    #[error("Invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),
}

/// Orchestrator errors, one per aborting stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to load staged message: {0}")]
    LoadFailure(String),

    #[error("Malformed address: {0}")]
    MalformedAddress(#[from] AddressError),

    #[error("Compilation failed: {0}")]
    CompilationFailure(#[from] CompileError),

    #[error("Transmission failed: {0}")]
    TransmissionFailure(#[from] TransmissionError),

    #[error("Failed to stage raw message: {0}")]
    StagingFailure(#[source] StorageError),

    #[error("Failed to copy raw message to archive: {0}")]
    ArchivalFailure(#[source] StorageError),

    #[error("Cleanup failed: {0}")]
    CleanupFailure(#[source] StorageError),
}
