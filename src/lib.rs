//! Outbox archiver — transmits staged outbound mail and archives a raw copy
//! without re-triggering itself.

pub mod compiler;
pub mod config;
pub mod deriver;
pub mod error;
pub mod event;
pub mod message;
pub mod pipeline;
pub mod storage;
pub mod transport;
