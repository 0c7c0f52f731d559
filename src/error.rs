//! Centralized error types for mailintake.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailintake library.
///
/// Every variant maps to exactly one HTTP status via [`IntakeError::status`];
/// the webhook never answers with anything outside 400/401/404/500.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// No webhook secret is configured; requests are refused (fail-closed).
    #[error("Webhook not configured")]
    NotConfigured,

    /// None of the accepted signature headers was present.
    #[error("Authentication required")]
    MissingSignature,

    /// A signature was supplied but does not match the request body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The request body is not a JSON object we can read.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Required fields were absent after normalization.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// No email address could be extracted from the `from` value.
    #[error("Invalid sender email format: '{0}'")]
    InvalidSender(String),

    /// The sender is not linked to any client and unknown senders are rejected.
    #[error("Sender '{email}' is not associated with any client")]
    UnknownSender { email: String },

    /// The content store failed.
    #[error("Content store error: {0}")]
    Store(String),

    /// A configuration file could not be read or parsed.
    #[error("Invalid configuration in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, IntakeError>`.
pub type Result<T> = std::result::Result<T, IntakeError>;

impl IntakeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::MissingSignature | Self::InvalidSignature => 401,
            Self::InvalidPayload(_) | Self::MissingFields(_) | Self::InvalidSender(_) => 400,
            Self::UnknownSender { .. } => 404,
            Self::NotConfigured | Self::Store(_) | Self::Config { .. } | Self::Io { .. } => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "webhook_not_configured",
            Self::MissingSignature => "authentication_required",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::MissingFields(_) => "missing_required_fields",
            Self::InvalidSender(_) => "invalid_sender_email",
            Self::UnknownSender { .. } => "unknown_sender",
            Self::Store(_) | Self::Config { .. } | Self::Io { .. } => "internal_error",
        }
    }

    /// Message safe to show to the webhook caller.
    ///
    /// Internal failures collapse to a generic text; their detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::UnknownSender { email } => format!(
                "Sender {email} is not associated with any client. \
                 Link this address to a client record to accept its emails."
            ),
            Self::Store(_) | Self::Config { .. } | Self::Io { .. } => {
                "Failed to process inbound email".to_string()
            }
            other => other.to_string(),
        }
    }

    /// `true` for failures the caller cannot fix by changing the request.
    pub fn is_internal(&self) -> bool {
        self.status() == 500
    }
}

impl From<serde_json::Error> for IntakeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Store(format!("serialization failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(IntakeError::NotConfigured.status(), 500);
        assert_eq!(IntakeError::MissingSignature.status(), 401);
        assert_eq!(IntakeError::InvalidSignature.status(), 401);
        assert_eq!(IntakeError::MissingFields(vec!["from"]).status(), 400);
        assert_eq!(IntakeError::InvalidSender("x".into()).status(), 400);
        let unknown = IntakeError::UnknownSender {
            email: "a@b.com".into(),
        };
        assert_eq!(unknown.status(), 404);
        assert_eq!(IntakeError::Store("down".into()).status(), 500);
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = IntakeError::Store("connection refused to 10.0.0.5".into());
        assert_eq!(err.code(), "internal_error");
        assert!(!err.public_message().contains("10.0.0.5"));
        assert!(err.is_internal());
    }

    #[test]
    fn test_missing_fields_message() {
        let err = IntakeError::MissingFields(vec!["from", "subject"]);
        assert_eq!(err.to_string(), "Missing required fields: from, subject");
    }

    #[test]
    fn test_unknown_sender_suggests_linking() {
        let err = IntakeError::UnknownSender {
            email: "who@nowhere.io".into(),
        };
        let msg = err.public_message();
        assert!(msg.contains("who@nowhere.io"));
        assert!(msg.contains("Link this address"));
    }
}
