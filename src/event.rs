//! Event definitions — the core data model for scheduled deliveries — and
//! payload validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// A scheduled delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique id, assigned by the store (monotonic).
    pub id: i64,
    /// Serialized webhook body, stored verbatim after validation.
    pub payload: String,
    /// Destination URL, captured at creation and immutable.
    pub destination: String,
    /// When delivery should occur. Immutable; there is no reschedule.
    pub fire_at: DateTime<Utc>,
    /// Current status.
    pub status: EventStatus,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

/// Event status. `Delivered` and `Failed` are both terminal: no retries,
/// no re-arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Delivered,
    Failed,
}

impl EventStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EventStatus::Pending)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Delivered => "delivered",
            EventStatus::Failed => "failed",
        }
    }

    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "delivered" => EventStatus::Delivered,
            "failed" => EventStatus::Failed,
            _ => EventStatus::Pending,
        }
    }
}

/// Verdict of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

impl From<DeliveryOutcome> for EventStatus {
    fn from(outcome: DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Delivered => EventStatus::Delivered,
            DeliveryOutcome::Failed => EventStatus::Failed,
        }
    }
}

// ─── Input payload schema ──────────────────────────────────────
//
// Schedule requests carry a backup-export document; validation extracts
// exactly the first message body and the first target URL, failing closed
// on any missing layer.

#[derive(Debug, Deserialize)]
struct ExportDocument {
    #[serde(default)]
    backups: Vec<BackupEntry>,
}

#[derive(Debug, Deserialize)]
struct BackupEntry {
    #[serde(default)]
    messages: Vec<MessageEntry>,
    #[serde(default)]
    targets: Vec<TargetEntry>,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TargetEntry {
    url: String,
}

/// Message body and destination extracted from a schedule request.
#[derive(Debug, Clone)]
pub struct ValidatedPayload {
    /// The webhook body to POST at fire time.
    pub body: serde_json::Value,
    /// The delivery endpoint, already checked to be a valid URL.
    pub destination: String,
}

/// Validate a raw schedule payload against the export-document schema.
/// Any missing field rejects the whole request with `InvalidPayload`;
/// nothing is persisted and no timer is armed.
pub fn validate_payload(raw: &[u8]) -> Result<ValidatedPayload> {
    let doc: ExportDocument = serde_json::from_slice(raw)
        .map_err(|e| SchedulerError::InvalidPayload(format!("not a valid export document: {e}")))?;

    let backup = doc
        .backups
        .first()
        .ok_or_else(|| SchedulerError::InvalidPayload("document contains no backups".into()))?;
    let message = backup
        .messages
        .first()
        .ok_or_else(|| SchedulerError::InvalidPayload("backup contains no messages".into()))?;
    if !message.data.is_object() {
        return Err(SchedulerError::InvalidPayload(
            "message data must be a JSON object".into(),
        ));
    }
    let target = backup
        .targets
        .first()
        .ok_or_else(|| SchedulerError::InvalidPayload("backup contains no targets".into()))?;
    reqwest::Url::parse(&target.url)
        .map_err(|e| SchedulerError::InvalidPayload(format!("target url '{}': {e}", target.url)))?;

    Ok(ValidatedPayload {
        body: message.data.clone(),
        destination: target.url.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(url: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "backups": [{
                "messages": [{ "data": { "content": "hello" } }],
                "targets": [{ "url": url }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn accepts_well_formed_document() {
        let v = validate_payload(&doc("https://example.com/hook")).unwrap();
        assert_eq!(v.destination, "https://example.com/hook");
        assert_eq!(v.body["content"], "hello");
    }

    #[test]
    fn rejects_non_json() {
        let err = validate_payload(b"this is not json").unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidPayload(_)));
    }

    #[test]
    fn rejects_missing_layers() {
        for raw in [
            serde_json::json!({}),
            serde_json::json!({ "backups": [] }),
            serde_json::json!({ "backups": [{ "messages": [], "targets": [] }] }),
            serde_json::json!({ "backups": [{ "messages": [{ "data": {} }], "targets": [] }] }),
        ] {
            let err = validate_payload(&serde_json::to_vec(&raw).unwrap()).unwrap_err();
            assert!(matches!(err, SchedulerError::InvalidPayload(_)), "{raw}");
        }
    }

    #[test]
    fn rejects_non_object_message_data() {
        let raw = serde_json::json!({
            "backups": [{
                "messages": [{ "data": "just a string" }],
                "targets": [{ "url": "https://example.com" }]
            }]
        });
        let err = validate_payload(&serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidPayload(_)));
    }

    #[test]
    fn rejects_malformed_url() {
        let err = validate_payload(&doc("not a url")).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidPayload(_)));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!EventStatus::Pending.is_terminal());
        assert!(EventStatus::Delivered.is_terminal());
        assert!(EventStatus::Failed.is_terminal());
    }
}
