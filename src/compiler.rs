//! Raw message compiler — structured description in, wire bytes out.
//!
//! Built on lettre's message builder. The resulting bytes are treated as
//! inert by every later stage: they are transmitted, staged and archived
//! without being looked at again.

use std::str::FromStr;
use std::time::SystemTime;

use lettre::Message;
use lettre::address::Envelope;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Attachment, Mailbox, Mailboxes, MessageBuilder, MultiPart, SinglePart};

use crate::deriver::Clock;
use crate::error::CompileError;
use crate::message::{AddressEntry, AddressField, AttachmentSpec, MessageDescription};

/// Content type used when an attachment does not declare one.
const DEFAULT_ATTACHMENT_TYPE: &str = "application/octet-stream";

/// A compiled, wire-ready message.
///
/// The envelope (sender plus every recipient, Bcc included) rides alongside
/// the bytes for transports that need it; Bcc is never written into `bytes`.
#[derive(Debug, Clone)]
pub struct RawMessage {
    bytes: Vec<u8>,
    envelope: Envelope,
}

impl RawMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Compile a message description into a complete raw email.
pub fn compile(desc: &MessageDescription, clock: &dyn Clock) -> Result<RawMessage, CompileError> {
    let mut builder = Message::builder()
        .subject(desc.subject_or_empty())
        .date(SystemTime::from(clock.now()))
        .message_id(desc.message_id.clone());

    // A single From mailbox; extra entries are not representable without Sender.
    if let Some(from) = parse_field("from", desc.from.as_ref())?.into_iter().next() {
        builder = builder.from(from);
    }
    for mbox in parse_field("to", desc.to.as_ref())? {
        builder = builder.to(mbox);
    }
    for mbox in parse_field("cc", desc.cc.as_ref())? {
        builder = builder.cc(mbox);
    }
    for mbox in parse_field("bcc", desc.bcc.as_ref())? {
        builder = builder.bcc(mbox);
    }
    for mbox in parse_field("replyTo", desc.reply_to.as_ref())? {
        builder = builder.reply_to(mbox);
    }
    if let Some(id) = &desc.in_reply_to {
        builder = builder.in_reply_to(id.clone());
    }
    if let Some(refs) = &desc.references {
        builder = builder.references(refs.clone());
    }
    builder = apply_headers(builder, desc)?;

    let message = match build_body(desc)? {
        Body::Single(part) => builder.singlepart(part),
        Body::Multi(part) => builder.multipart(part),
    }
    .map_err(|e| CompileError::Build(e.to_string()))?;

    Ok(RawMessage {
        bytes: message.formatted(),
        envelope: message.envelope().clone(),
    })
}

// ── Addresses ───────────────────────────────────────────────────────

fn parse_field(
    field: &'static str,
    value: Option<&AddressField>,
) -> Result<Vec<Mailbox>, CompileError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for entry in value.entries() {
        match entry {
            AddressEntry::Text(text) => {
                let mailboxes =
                    Mailboxes::from_str(text).map_err(|e| CompileError::InvalidAddress {
                        field,
                        value: text.clone(),
                        reason: e.to_string(),
                    })?;
                out.extend(mailboxes);
            }
            AddressEntry::Structured { name, address } => {
                let email = address.parse().map_err(|e: lettre::address::AddressError| {
                    CompileError::InvalidAddress {
                        field,
                        value: address.clone(),
                        reason: e.to_string(),
                    }
                })?;
                out.push(Mailbox::new(name.clone(), email));
            }
        }
    }
    Ok(out)
}

fn apply_headers(
    mut builder: MessageBuilder,
    desc: &MessageDescription,
) -> Result<MessageBuilder, CompileError> {
    for (name, value) in &desc.headers {
        let header_name =
            HeaderName::new_from_ascii(name.clone()).map_err(|e| CompileError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        builder = builder.raw_header(HeaderValue::new(header_name, value.clone()));
    }
    Ok(builder)
}

// ── Body ────────────────────────────────────────────────────────────

enum Body {
    Single(SinglePart),
    Multi(MultiPart),
}

fn build_body(desc: &MessageDescription) -> Result<Body, CompileError> {
    let (inline, regular): (Vec<&AttachmentSpec>, Vec<&AttachmentSpec>) =
        desc.attachments.iter().partition(|a| a.cid.is_some());

    let html_part = match &desc.html {
        Some(html) if !inline.is_empty() => {
            let mut related = MultiPart::related().singlepart(SinglePart::html(html.clone()));
            for att in &inline {
                related = related.singlepart(attachment_part(att)?);
            }
            Some(Body::Multi(related))
        }
        Some(html) => Some(Body::Single(SinglePart::html(html.clone()))),
        None => None,
    };

    let content = match (desc.text.as_ref(), html_part) {
        (Some(text), Some(html)) => {
            let alt = MultiPart::alternative().singlepart(SinglePart::plain(text.clone()));
            Body::Multi(match html {
                Body::Single(part) => alt.singlepart(part),
                Body::Multi(part) => alt.multipart(part),
            })
        }
        (None, Some(html)) => html,
        (Some(text), None) => Body::Single(SinglePart::plain(text.clone())),
        (None, None) => Body::Single(SinglePart::plain(String::new())),
    };

    // Inline attachments with no HTML to reference them are sent as regular ones.
    let mut attached = regular;
    if desc.html.is_none() {
        attached.extend(inline);
    }
    if attached.is_empty() {
        return Ok(content);
    }

    let mut mixed = match content {
        Body::Single(part) => MultiPart::mixed().singlepart(part),
        Body::Multi(part) => MultiPart::mixed().multipart(part),
    };
    for att in attached {
        mixed = mixed.singlepart(attachment_part(att)?);
    }
    Ok(Body::Multi(mixed))
}

fn attachment_part(att: &AttachmentSpec) -> Result<SinglePart, CompileError> {
    let invalid = |reason: String| CompileError::InvalidAttachment {
        filename: att.display_name().to_string(),
        reason,
    };

    let content = att.decode_content().map_err(invalid)?;
    let content_type = ContentType::parse(
        att.content_type
            .as_deref()
            .unwrap_or(DEFAULT_ATTACHMENT_TYPE),
    )
    .map_err(|e| invalid(format!("invalid content type: {e}")))?;

    let attachment = match &att.cid {
        Some(cid) => Attachment::new_inline(cid.trim_matches(['<', '>']).to_string()),
        None => Attachment::new(att.display_name().to_string()),
    };
    Ok(attachment.body(content, content_type))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mail_parser::{MessageParser, MimeHeaders};

    use super::*;
    use crate::deriver::FixedClock;

    fn clock() -> FixedClock {
        FixedClock::utc(Utc.with_ymd_and_hms(2026, 3, 3, 14, 5, 9).unwrap())
    }

    fn basic() -> MessageDescription {
        MessageDescription {
            to: Some("ops+alerts@acme.io".into()),
            from: Some("bot@vendor.com".into()),
            subject: Some("Nightly report".into()),
            text: Some("All jobs finished.".into()),
            ..Default::default()
        }
    }

    #[test]
    fn round_trip_preserves_routing_headers() {
        let raw = compile(&basic(), &clock()).unwrap();
        let parsed = MessageParser::default().parse(raw.as_bytes()).unwrap();

        assert_eq!(parsed.subject(), Some("Nightly report"));
        assert_eq!(
            parsed.from().and_then(|a| a.first()).and_then(|a| a.address()),
            Some("bot@vendor.com")
        );
        assert_eq!(
            parsed.to().and_then(|a| a.first()).and_then(|a| a.address()),
            Some("ops+alerts@acme.io")
        );
        assert!(parsed.body_text(0).unwrap().contains("All jobs finished."));
    }

    #[test]
    fn envelope_carries_sender_and_recipients() {
        let raw = compile(&basic(), &clock()).unwrap();
        assert_eq!(
            raw.envelope().from().map(|a| a.to_string()),
            Some("bot@vendor.com".to_string())
        );
        let to: Vec<String> = raw.envelope().to().iter().map(|a| a.to_string()).collect();
        assert_eq!(to, vec!["ops+alerts@acme.io".to_string()]);
    }

    #[test]
    fn bcc_stays_out_of_the_bytes() {
        let mut desc = basic();
        desc.bcc = Some("audit@acme.io".into());
        let raw = compile(&desc, &clock()).unwrap();

        let text = String::from_utf8_lossy(raw.as_bytes());
        assert!(!text.contains("audit@acme.io"));
        assert!(raw.envelope().to().iter().any(|a| a.to_string() == "audit@acme.io"));
    }

    #[test]
    fn display_names_and_lists_are_accepted() {
        let mut desc = basic();
        desc.from = Some("Billing Bot <bot@vendor.com>".into());
        desc.to = Some("a@acme.io, B <b@acme.io>".into());
        let raw = compile(&desc, &clock()).unwrap();
        assert_eq!(raw.envelope().to().len(), 2);
    }

    #[test]
    fn text_and_html_become_alternative() {
        let mut desc = basic();
        desc.html = Some("<p>All jobs finished.</p>".into());
        let raw = compile(&desc, &clock()).unwrap();

        let text = String::from_utf8_lossy(raw.as_bytes());
        assert!(text.contains("multipart/alternative"));
        let parsed = MessageParser::default().parse(raw.as_bytes()).unwrap();
        assert!(parsed.body_html(0).unwrap().contains("<p>All jobs finished.</p>"));
    }

    #[test]
    fn attachments_are_encoded() {
        let mut desc = basic();
        desc.attachments.push(AttachmentSpec {
            filename: Some("report.bin".into()),
            content: "AP8QgA==".into(),
            encoding: Some("base64".into()),
            content_type: Some("application/octet-stream".into()),
            cid: None,
        });
        let raw = compile(&desc, &clock()).unwrap();
        let parsed = MessageParser::default().parse(raw.as_bytes()).unwrap();

        assert_eq!(parsed.attachment_count(), 1);
        let att = parsed.attachment(0).unwrap();
        assert_eq!(att.attachment_name(), Some("report.bin"));
        assert_eq!(att.contents(), &[0x00, 0xFF, 0x10, 0x80]);
    }

    #[test]
    fn inline_attachment_goes_into_related_part() {
        let mut desc = basic();
        desc.html = Some(r#"<img src="cid:logo">"#.into());
        desc.attachments.push(AttachmentSpec {
            filename: Some("logo.png".into()),
            content: "iVBORw0KGgo=".into(),
            encoding: Some("base64".into()),
            content_type: Some("image/png".into()),
            cid: Some("logo".into()),
        });
        let raw = compile(&desc, &clock()).unwrap();
        let text = String::from_utf8_lossy(raw.as_bytes());
        assert!(text.contains("multipart/related"));
        assert!(text.contains("Content-ID: <logo>"));
    }

    #[test]
    fn custom_headers_are_written() {
        let mut desc = basic();
        desc.headers.insert("X-Campaign".into(), "nightly".into());
        let raw = compile(&desc, &clock()).unwrap();
        let text = String::from_utf8_lossy(raw.as_bytes());
        assert!(text.contains("X-Campaign: nightly"));
    }

    #[test]
    fn missing_sender_fails() {
        let mut desc = basic();
        desc.from = None;
        let err = compile(&desc, &clock()).unwrap_err();
        assert!(matches!(err, CompileError::Build(_)));
    }

    #[test]
    fn missing_recipients_fails() {
        let mut desc = basic();
        desc.to = None;
        assert!(matches!(compile(&desc, &clock()), Err(CompileError::Build(_))));
    }

    #[test]
    fn malformed_attachment_fails() {
        let mut desc = basic();
        desc.attachments.push(AttachmentSpec {
            filename: Some("broken.bin".into()),
            content: "***".into(),
            encoding: Some("base64".into()),
            ..Default::default()
        });
        let err = compile(&desc, &clock()).unwrap_err();
        assert!(
            matches!(err, CompileError::InvalidAttachment { ref filename, .. } if filename == "broken.bin")
        );
    }

    #[test]
    fn unparseable_address_fails() {
        let mut desc = basic();
        desc.to = Some("not an address".into());
        let err = compile(&desc, &clock()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidAddress { field: "to", .. }));
    }

    #[test]
    fn invalid_header_name_fails() {
        let mut desc = basic();
        desc.headers.insert("Bad:Header".into(), "x".into());
        assert!(matches!(
            compile(&desc, &clock()),
            Err(CompileError::InvalidHeader { .. })
        ));
    }
}
