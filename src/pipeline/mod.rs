//! Outbound mail pipeline.
//!
//! Every trigger event record flows through:
//! 1. Load the staged JSON description
//! 2. Derive routing identities and the archive path
//! 3. Compile the raw message
//! 4. Transmit it
//! 5. Stage the raw bytes under the reserved prefix
//! 6. Copy the staged bytes to the archive path
//! 7. Delete the staged JSON, then the temporary raw copy
//!
//! **Deployment invariant:** the bucket's event notifications must exclude
//! the reserved temporary prefix. Otherwise staging re-triggers the pipeline.

pub mod handler;
pub mod orchestrator;
pub mod record;
pub mod state;

pub use handler::{handle_event, handle_raw_event, process_event};
pub use orchestrator::{Pipeline, RunFailure, RunReport};
pub use record::{ProcessingRecord, RunIdentity};
pub use state::{Effects, Stage};
