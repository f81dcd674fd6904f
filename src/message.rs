//! Structured description of an outbound message, as staged in JSON.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

/// Parsed staged message. Field names follow the composer-style JSON schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDescription {
    #[serde(default)]
    pub from: Option<AddressField>,
    #[serde(default)]
    pub to: Option<AddressField>,
    #[serde(default)]
    pub cc: Option<AddressField>,
    #[serde(default)]
    pub bcc: Option<AddressField>,
    #[serde(default)]
    pub reply_to: Option<AddressField>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub references: Option<String>,
    /// Extra headers written verbatim (name → value).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentSpec>,
}

impl MessageDescription {
    /// Parse a staged JSON blob.
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Subject, or the empty string when absent.
    pub fn subject_or_empty(&self) -> &str {
        self.subject.as_deref().unwrap_or_default()
    }
}

/// An address header value: a single entry or a list of entries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AddressField {
    One(AddressEntry),
    Many(Vec<AddressEntry>),
}

impl AddressField {
    /// All entries, in document order.
    pub fn entries(&self) -> &[AddressEntry] {
        match self {
            Self::One(entry) => std::slice::from_ref(entry),
            Self::Many(entries) => entries,
        }
    }

    /// Text of the first entry, used to locate the routing address.
    pub fn first_text(&self) -> Option<&str> {
        self.entries().first().map(AddressEntry::address_text)
    }
}

impl From<&str> for AddressField {
    fn from(value: &str) -> Self {
        Self::One(AddressEntry::Text(value.to_string()))
    }
}

/// One address entry: free text (`"Name <a@b.c>"`, possibly a comma list)
/// or an explicit `{name, address}` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AddressEntry {
    Text(String),
    Structured {
        #[serde(default)]
        name: Option<String>,
        address: String,
    },
}

impl AddressEntry {
    /// The raw text that carries the address.
    pub fn address_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Structured { address, .. } => address,
        }
    }
}

/// An attachment as described in the staged JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSpec {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: String,
    /// `base64`, or absent for UTF-8 text content.
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Content-ID for inline attachments referenced from HTML.
    #[serde(default)]
    pub cid: Option<String>,
}

impl AttachmentSpec {
    /// Name used in error messages and as the default filename.
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("attachment")
    }

    /// Decode the attachment payload.
    pub fn decode_content(&self) -> Result<Vec<u8>, String> {
        match self.encoding.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("utf8") | Some("utf-8") => Ok(self.content.as_bytes().to_vec()),
            Some("base64") => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| format!("invalid base64 content: {e}"))
            }
            Some(other) => Err(format!("unsupported encoding {other:?}")),
        }
    }
}
