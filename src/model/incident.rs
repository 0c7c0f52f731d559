//! Client, classification, and incident record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::{AttachmentSummary, ProcessedAttachment};

/// Ticket priority, also stored as the incident severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a sender was matched to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Domain,
    None,
}

/// Reference to another document in the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(rename = "_ref")]
    pub id: String,
}

impl Reference {
    pub fn to(id: impl Into<String>) -> Self {
        Self {
            kind: "reference".to_string(),
            id: id.into(),
        }
    }
}

/// A client as stored by the CRM. Read-only to the intake pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan: Option<Reference>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub maintenance_window: Option<String>,
}

/// Outcome of resolving a sender to a client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientLookupResult {
    pub client: Option<ClientRecord>,
    pub match_type: MatchType,
    /// Normalized sender address the lookup ran against.
    pub matched_email: Option<String>,
}

impl ClientLookupResult {
    pub fn none(email: Option<String>) -> Self {
        Self {
            client: None,
            match_type: MatchType::None,
            matched_email: email,
        }
    }
}

/// Structured ticket fields derived from an email's subject and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEmailContent {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub is_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_message: Option<String>,
}

/// Incident metadata block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentMetadata {
    pub attachment_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_summary: Option<AttachmentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// The incident document created for each processed email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    #[serde(rename = "_type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub severity: Priority,
    pub status: String,
    pub reported_at: DateTime<Utc>,
    pub source: String,
    pub tags: Vec<String>,
    pub email_message_id: String,
    pub sender_email: String,
    pub original_from: String,
    pub has_attachments: bool,
    pub is_reply: bool,
    pub match_type: MatchType,
    pub metadata: IncidentMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<ProcessedAttachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_message: Option<String>,
}

/// Document type tag for incidents.
pub const INCIDENT_TYPE: &str = "incident";
/// Document type tag for clients.
pub const CLIENT_TYPE: &str = "client";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_record_from_store_document() {
        let client: ClientRecord = serde_json::from_value(json!({
            "_id": "client-1",
            "_type": "client",
            "name": "BigCo",
            "email": "jane@bigco.com",
            "status": "active",
            "plan": { "_type": "reference", "_ref": "plan-pro" },
            "startDate": "2024-01-01",
            "maintenanceWindow": "first-monday"
        }))
        .unwrap();
        assert_eq!(client.id, "client-1");
        assert_eq!(client.plan, Some(Reference::to("plan-pro")));
        assert_eq!(client.maintenance_window.as_deref(), Some("first-monday"));
    }

    #[test]
    fn test_client_record_minimal() {
        let client: ClientRecord =
            serde_json::from_value(json!({ "_id": "c", "name": "Unknown Clients" })).unwrap();
        assert_eq!(client.email, "");
        assert!(client.plan.is_none());
    }

    #[test]
    fn test_priority_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Priority::Urgent).unwrap(), "urgent");
        assert_eq!(serde_json::to_value(MatchType::Domain).unwrap(), "domain");
        assert_eq!(Priority::High.to_string(), "high");
    }

    #[test]
    fn test_reference_shape() {
        let v = serde_json::to_value(Reference::to("abc")).unwrap();
        assert_eq!(v, json!({ "_type": "reference", "_ref": "abc" }));
    }
}
