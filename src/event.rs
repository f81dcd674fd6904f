//! Storage notification events that trigger a pipeline run.

use serde::Deserialize;

use crate::error::EventError;

/// A single staged object named by a trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Decoded trigger event: one or more staged objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub records: Vec<ObjectRef>,
}

impl TriggerEvent {
    /// Decode a storage notification document.
    pub fn from_json(raw: &[u8]) -> Result<Self, EventError> {
        let envelope: NotificationEnvelope = serde_json::from_slice(raw)?;
        let records: Vec<ObjectRef> = envelope
            .records
            .into_iter()
            .map(|r| ObjectRef {
                bucket: r.s3.bucket.name,
                key: r.s3.object.key,
            })
            .collect();

        if records.is_empty() {
            return Err(EventError::Empty);
        }
        Ok(Self { records })
    }
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NotificationEnvelope {
    #[serde(rename = "Records", default)]
    records: Vec<NotificationRecord>,
}

#[derive(Deserialize)]
struct NotificationRecord {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Deserialize)]
struct ObjectEntity {
    key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_record() {
        let raw = br#"{
            "Records": [{
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": "mail-bucket", "arn": "arn:aws:s3:::mail-bucket"},
                    "object": {"key": "outbox/123.json", "size": 512}
                }
            }]
        }"#;

        let event = TriggerEvent::from_json(raw).unwrap();
        assert_eq!(event.records, vec![ObjectRef::new("mail-bucket", "outbox/123.json")]);
    }

    #[test]
    fn decodes_multiple_records_in_order() {
        let raw = br#"{"Records": [
            {"s3": {"bucket": {"name": "b"}, "object": {"key": "one.json"}}},
            {"s3": {"bucket": {"name": "b"}, "object": {"key": "two.json"}}}
        ]}"#;

        let event = TriggerEvent::from_json(raw).unwrap();
        let keys: Vec<&str> = event.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["one.json", "two.json"]);
    }

    #[test]
    fn empty_records_is_an_error() {
        let err = TriggerEvent::from_json(br#"{"Records": []}"#).unwrap_err();
        assert!(matches!(err, EventError::Empty));

        let err = TriggerEvent::from_json(b"{}").unwrap_err();
        assert!(matches!(err, EventError::Empty));
    }

    #[test]
    fn record_without_key_fails_to_decode() {
        let raw = br#"{"Records": [{"s3": {"bucket": {"name": "b"}, "object": {}}}]}"#;
        let err = TriggerEvent::from_json(raw).unwrap_err();
        assert!(matches!(err, EventError::Decode(_)));
    }
}
