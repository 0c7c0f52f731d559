//! The normalized inbound email, built once per webhook request.

use chrono::{DateTime, Utc};

use super::attachment::AttachmentDescriptor;

/// An inbound email after provider-specific payload normalization.
///
/// Consumed entirely by the intake pipeline and never persisted as-is.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    /// Raw `From` value, e.g. `"Jane Doe <jane@bigco.com>"`.
    pub from: String,

    /// Subject line as received.
    pub subject: String,

    /// Plain-text body.
    pub text_body: Option<String>,

    /// HTML body.
    pub html_body: Option<String>,

    /// When the provider received the message (falls back to request time).
    pub timestamp: DateTime<Utc>,

    /// Provider message id, or a synthetic one.
    pub message_id: String,

    /// `true` when `message_id` was generated locally rather than supplied.
    pub message_id_synthetic: bool,

    /// Attachment descriptors, untrusted.
    pub attachments: Vec<AttachmentDescriptor>,
}
