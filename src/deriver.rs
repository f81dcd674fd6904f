//! Routing identities and archive path derivation.
//!
//! Archive layout:
//! `<root>/<to-domain>/<to-local>/<from-domain>/<from-local>/<timestamp> - <subject>/<leaf>`
//! where every `+` in the recipient local part becomes a path separator.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Local, Utc};
use regex::Regex;

use crate::config::PipelineConfig;
use crate::error::AddressError;
use crate::message::{AddressField, MessageDescription};

/// Human-readable timestamp format used in archive paths.
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const MAX_LOCAL_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;

/// An address must stand alone: bounded by the text edges, whitespace,
/// list commas or angle brackets.
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[\s<,])([A-Za-z0-9_.+\-]+)@((?:[A-Za-z0-9\-]+\.)+[A-Za-z]{2,})(?:$|[\s>,])",
    )
    .expect("address pattern is valid")
});

// ── Clock ───────────────────────────────────────────────────────────

/// Source of processing time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the host's local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    pub fn utc(at: DateTime<Utc>) -> Self {
        Self(at.fixed_offset())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

// ── Derivation ──────────────────────────────────────────────────────

/// A routing address split into its two halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAddress {
    pub local: String,
    pub domain: String,
}

impl RouteAddress {
    /// Locate the first well-formed address inside `text`.
    ///
    /// Only a whole address is accepted; a match that would cut into a
    /// longer token, or whose parts exceed their length limits, is malformed.
    pub fn find(field: &'static str, text: &str) -> Result<Self, AddressError> {
        let malformed = || AddressError::Malformed {
            field,
            value: text.to_string(),
        };
        let caps = ADDRESS_RE.captures(text).ok_or_else(malformed)?;
        let (local, domain) = (&caps[1], &caps[2]);

        if local.len() > MAX_LOCAL_LEN || domain.split('.').any(|l| l.len() > MAX_LABEL_LEN) {
            return Err(malformed());
        }

        Ok(Self {
            local: local.to_string(),
            domain: domain.to_string(),
        })
    }

    /// Local part with every `+` expanded into a path separator.
    pub fn expanded_local(&self) -> String {
        self.local.replace('+', "/")
    }
}

/// Everything derived from one message description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub recipient: RouteAddress,
    pub sender: RouteAddress,
    pub timestamp: String,
    pub destination_path: String,
}

/// Extract routing identities and compute the archive key.
///
/// Fails without partial output if either address is missing or malformed.
pub fn derive(
    desc: &MessageDescription,
    config: &PipelineConfig,
    clock: &dyn Clock,
) -> Result<Routing, AddressError> {
    let recipient = routing_address("to", desc.to.as_ref())?;
    let sender = routing_address("from", desc.from.as_ref())?;
    let timestamp = clock.now().format(TIMESTAMP_FORMAT).to_string();

    let destination_path = [
        config.archive_root.trim_matches('/').to_string(),
        recipient.domain.clone(),
        recipient.expanded_local(),
        sender.domain.clone(),
        sender.local.clone(),
        format!("{timestamp} - {}", desc.subject_or_empty()),
        config.archive_leaf.clone(),
    ]
    .join("/");

    Ok(Routing {
        recipient,
        sender,
        timestamp,
        destination_path,
    })
}

fn routing_address(
    field: &'static str,
    value: Option<&AddressField>,
) -> Result<RouteAddress, AddressError> {
    let text = value
        .and_then(AddressField::first_text)
        .ok_or(AddressError::Missing { field })?;
    RouteAddress::find(field, text)
}
