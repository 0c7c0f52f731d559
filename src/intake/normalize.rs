//! Webhook payload normalization.
//!
//! Providers deliver the same fields under different keys. Each field has an
//! ordered list of JSON pointer paths; the first path holding a usable value wins.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{IntakeError, Result};
use crate::model::attachment::AttachmentDescriptor;
use crate::model::inbound::InboundEmail;

pub const FROM_PATHS: &[&str] = &["/from", "/sender/email", "/data/from", "/from/email", "/data/from/email"];
pub const SUBJECT_PATHS: &[&str] = &["/subject", "/data/subject"];
pub const TEXT_PATHS: &[&str] = &["/text", "/body", "/data/text"];
pub const HTML_PATHS: &[&str] = &["/html", "/data/html"];
pub const TIMESTAMP_PATHS: &[&str] = &["/timestamp", "/created_at", "/data/created_at"];
pub const MESSAGE_ID_PATHS: &[&str] = &["/id", "/message_id", "/data/email_id"];
pub const ATTACHMENT_PATHS: &[&str] = &["/attachments", "/data/attachments"];

/// Normalize a raw webhook payload into an [`InboundEmail`].
///
/// `now` stands in for a missing timestamp and seeds a synthetic message id.
pub fn normalize(payload: &Value, now: DateTime<Utc>) -> Result<InboundEmail> {
    if !payload.is_object() {
        return Err(IntakeError::InvalidPayload(
            "expected a JSON object".to_string(),
        ));
    }

    let from = first_text(payload, FROM_PATHS);
    let subject = first_text(payload, SUBJECT_PATHS);
    let (from, subject) = match (from, subject) {
        (Some(from), Some(subject)) => (from, subject),
        (from, subject) => {
            let mut missing = Vec::new();
            if from.is_none() {
                missing.push("from");
            }
            if subject.is_none() {
                missing.push("subject");
            }
            return Err(IntakeError::MissingFields(missing));
        }
    };

    let (message_id, message_id_synthetic) = match first_id(payload, MESSAGE_ID_PATHS) {
        Some(id) => (id, false),
        None => (synthetic_message_id(now), true),
    };

    Ok(InboundEmail {
        from,
        subject,
        text_body: first_text(payload, TEXT_PATHS),
        html_body: first_text(payload, HTML_PATHS),
        timestamp: first_timestamp(payload, TIMESTAMP_PATHS).unwrap_or(now),
        message_id,
        message_id_synthetic,
        attachments: attachments(payload),
    })
}

/// First non-empty string found at any of `paths`.
pub fn first_text(payload: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| {
        payload
            .pointer(path)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}

/// First string or integer id found at any of `paths`.
fn first_id(payload: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| match payload.pointer(path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First parseable timestamp: RFC 3339 text, or unix seconds/milliseconds.
fn first_timestamp(payload: &Value, paths: &[&str]) -> Option<DateTime<Utc>> {
    paths.iter().find_map(|path| match payload.pointer(path)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            // Values past the year 5138 in seconds are taken as milliseconds.
            if raw > 100_000_000_000 {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            }
        }
        _ => None,
    })
}

fn attachments(payload: &Value) -> Vec<AttachmentDescriptor> {
    ATTACHMENT_PATHS
        .iter()
        .find_map(|path| payload.pointer(path).and_then(Value::as_array))
        .map(|items| items.iter().map(AttachmentDescriptor::from_value).collect())
        .unwrap_or_default()
}

fn synthetic_message_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("email-{}-{}", now.timestamp_millis(), &suffix[..8])
}
