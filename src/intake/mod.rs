//! The inbound email pipeline.
//!
//! One webhook delivery flows through:
//! authenticate → parse JSON → normalize → resolve sender → classify content
//! → screen attachments → assemble incident → create in the store.
//!
//! Any failure before the create call leaves the store untouched.

pub mod normalize;
pub mod signature;

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::config::{IntakeConfig, WebhookConfig};
use crate::error::{IntakeError, Result};
use crate::model::address::EmailAddress;
use crate::model::attachment::{AttachmentSummary, ProcessedAttachment};
use crate::model::inbound::InboundEmail;
use crate::model::incident::{
    ClientRecord, IncidentMetadata, IncidentRecord, MatchType, ParsedEmailContent, Priority,
    Reference, INCIDENT_TYPE,
};
use crate::parser::content;
use crate::resolver::SenderResolver;
use crate::screener;
use crate::store::{ContentStore, Filter};

/// Client name reported when an incident is not attached to any client.
pub const UNKNOWN_CLIENT_NAME: &str = "Unknown Client";

/// Short view of a created (or previously created) incident.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSummary {
    pub id: String,
    pub title: String,
    pub client: String,
    pub status: String,
    pub priority: Priority,
    pub is_reply: bool,
    pub attachment_count: usize,
    pub has_unsafe_attachments: bool,
}

/// Successful webhook outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeReceipt {
    pub success: bool,
    /// `true` when the message id had already produced an incident.
    pub duplicate: bool,
    pub incident: IncidentSummary,
}

/// Everything derived from an email without touching the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Parsed `From`, reused for client resolution.
    #[serde(skip)]
    pub sender: EmailAddress,
    pub sender_email: String,
    pub content: ParsedEmailContent,
    pub attachments: Vec<ProcessedAttachment>,
    pub attachment_summary: AttachmentSummary,
}

/// Classify a normalized email: sender address, ticket fields, and attachments.
pub fn classify(email: &InboundEmail) -> Result<Classification> {
    let sender = EmailAddress::parse(&email.from)
        .ok_or_else(|| IntakeError::InvalidSender(email.from.clone()))?;
    let attachments = screener::process_all(&email.attachments);
    Ok(Classification {
        sender_email: sender.normalized(),
        sender,
        content: content::parse(
            Some(&email.subject),
            email.text_body.as_deref(),
            email.html_body.as_deref(),
        ),
        attachment_summary: screener::summarize(&attachments),
        attachments,
    })
}

/// Assemble the incident document for a classified email.
pub fn build_incident(
    email: &InboundEmail,
    classification: Classification,
    client: Option<&ClientRecord>,
    match_type: MatchType,
) -> IncidentRecord {
    let Classification {
        sender_email,
        content,
        attachments,
        attachment_summary,
        ..
    } = classification;
    let has_attachments = !attachments.is_empty();

    IncidentRecord {
        kind: INCIDENT_TYPE.to_string(),
        title: content.title,
        description: content.description,
        severity: content.priority,
        status: "open".to_string(),
        reported_at: email.timestamp,
        source: "email".to_string(),
        tags: content.tags,
        email_message_id: email.message_id.clone(),
        sender_email,
        original_from: email.from.clone(),
        has_attachments,
        is_reply: content.is_reply,
        match_type,
        metadata: IncidentMetadata {
            attachment_count: attachments.len(),
            attachment_summary: has_attachments.then_some(attachment_summary),
            thread_id: content.thread_id,
        },
        attachments: has_attachments.then_some(attachments),
        client: client.map(|c| Reference::to(c.id.clone())),
        original_message: content.original_message,
    }
}

/// The webhook pipeline, with its store and settings injected at construction.
pub struct Intake {
    store: Arc<dyn ContentStore>,
    webhook: WebhookConfig,
    policy: IntakeConfig,
}

impl Intake {
    pub fn new(store: Arc<dyn ContentStore>, webhook: WebhookConfig, policy: IntakeConfig) -> Self {
        Self {
            store,
            webhook,
            policy,
        }
    }

    /// Deployment environment name.
    pub fn environment(&self) -> &str {
        &self.webhook.environment
    }

    /// Process one raw webhook delivery.
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> Result<IntakeReceipt> {
        signature::verify(self.webhook.secret.as_deref(), headers, body)?;

        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| IntakeError::InvalidPayload(e.to_string()))?;
        let email = normalize::normalize(&payload, Utc::now())?;
        tracing::debug!(message_id = %email.message_id, "Normalized inbound email");

        self.ingest(email).await
    }

    /// Process an already-authenticated, normalized email.
    pub async fn ingest(&self, email: InboundEmail) -> Result<IntakeReceipt> {
        let classification = classify(&email)?;

        let lookup = SenderResolver::new(self.store.as_ref())
            .resolve_address(&classification.sender)
            .await?;
        let (client, match_type) = match lookup.client {
            Some(client) => (Some(client), lookup.match_type),
            None if self.policy.handle_unknown_senders => (self.fallback_client().await, MatchType::None),
            None => {
                tracing::info!(sender = %classification.sender_email, "Rejecting email from unknown sender");
                return Err(IntakeError::UnknownSender {
                    email: classification.sender_email,
                });
            }
        };

        if let Some(receipt) = self.find_duplicate(&email).await? {
            return Ok(receipt);
        }

        let record = build_incident(&email, classification, client.as_ref(), match_type);
        let created = self.store.create(serde_json::to_value(&record)?).await?;

        let client_name = client
            .as_ref()
            .map_or(UNKNOWN_CLIENT_NAME, |c| c.name.as_str());
        tracing::info!(
            incident = %created.id,
            message_id = %record.email_message_id,
            client = %client_name,
            match_type = ?record.match_type,
            priority = %record.severity,
            attachments = record.metadata.attachment_count,
            "Created incident from email"
        );

        Ok(IntakeReceipt {
            success: true,
            duplicate: false,
            incident: summarize(created.id, &record, client_name),
        })
    }

    /// Previously created incident for a redelivered provider message id.
    async fn find_duplicate(&self, email: &InboundEmail) -> Result<Option<IntakeReceipt>> {
        if !self.policy.deduplicate_message_ids || email.message_id_synthetic {
            return Ok(None);
        }
        let Some(existing) = self
            .store
            .query_one(Filter::IncidentByMessageId(&email.message_id))
            .await?
        else {
            return Ok(None);
        };

        let id = existing
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let record: IncidentRecord = serde_json::from_value(existing)?;
        let client_name = match &record.client {
            Some(reference) => self
                .client_by_id(&reference.id)
                .await
                .map(|c| c.name)
                .unwrap_or_else(|| UNKNOWN_CLIENT_NAME.to_string()),
            None => UNKNOWN_CLIENT_NAME.to_string(),
        };

        tracing::info!(incident = %id, message_id = %email.message_id, "Duplicate delivery, returning existing incident");
        Ok(Some(IntakeReceipt {
            success: true,
            duplicate: true,
            incident: summarize(id, &record, &client_name),
        }))
    }

    /// The configured bucket for unknown senders, if it exists.
    async fn fallback_client(&self) -> Option<ClientRecord> {
        let id = self.policy.unknown_client_id.as_deref()?;
        let client = self.client_by_id(id).await;
        if client.is_none() {
            tracing::warn!(client = %id, "Unknown-sender client not found, filing without client");
        }
        client
    }

    async fn client_by_id(&self, id: &str) -> Option<ClientRecord> {
        match self.store.query_one(Filter::DocumentById(id)).await {
            Ok(Some(doc)) => serde_json::from_value(doc)
                .map_err(|e| tracing::warn!(client = %id, error = %e, "Malformed client document"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(client = %id, error = %e, "Client lookup failed");
                None
            }
        }
    }
}

fn summarize(id: String, record: &IncidentRecord, client_name: &str) -> IncidentSummary {
    IncidentSummary {
        id,
        title: record.title.clone(),
        client: client_name.to_string(),
        status: record.status.clone(),
        priority: record.severity,
        is_reply: record.is_reply,
        attachment_count: record.metadata.attachment_count,
        has_unsafe_attachments: record
            .metadata
            .attachment_summary
            .as_ref()
            .is_some_and(|s| s.has_unsafe),
    }
}
