//! End-to-end tests for the intake pipeline over an in-memory store.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

use mailintake::config::{IntakeConfig, WebhookConfig};
use mailintake::error::IntakeError;
use mailintake::intake::signature::sign;
use mailintake::intake::Intake;
use mailintake::model::incident::Priority;
use mailintake::parser::content;
use mailintake::store::memory::MemoryStore;

const SECRET: &str = "whsec_integration";

fn clients() -> Vec<Value> {
    vec![
        json!({ "_id": "client-bigco", "_type": "client", "name": "BigCo", "email": "jane@bigco.com" }),
        json!({ "_id": "client-acme", "_type": "client", "name": "Acme", "email": "ops@acme.com" }),
        json!({ "_id": "client-unknown", "_type": "client", "name": "Unknown Senders" }),
    ]
}

fn webhook() -> WebhookConfig {
    WebhookConfig {
        secret: Some(SECRET.to_string()),
        environment: "test".to_string(),
    }
}

fn setup(policy: IntakeConfig) -> (Arc<MemoryStore>, Intake) {
    let store = Arc::new(MemoryStore::with_documents(clients()));
    let intake = Intake::new(store.clone(), webhook(), policy);
    (store, intake)
}

fn signed(body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-webhook-signature",
        HeaderValue::from_str(&sign(SECRET, body)).unwrap(),
    );
    headers
}

async fn incidents(store: &MemoryStore) -> Vec<Value> {
    store.documents_of_type("incident").await
}

// ─── Scenario A: known sender, urgent outage ─────────────────────────

#[tokio::test]
async fn test_scenario_a_exact_client_urgent() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({
        "from": "Jane <jane@bigco.com>",
        "subject": "URGENT: site down",
        "text": "Our site is down, please help ASAP"
    })
    .to_string();

    let receipt = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert!(receipt.success);
    assert!(!receipt.duplicate);
    assert_eq!(receipt.incident.client, "BigCo");
    assert_eq!(receipt.incident.priority, Priority::Urgent);
    assert_eq!(receipt.incident.status, "open");
    assert_eq!(receipt.incident.title, "URGENT: site down");

    let stored = incidents(&store).await;
    assert_eq!(stored.len(), 1);
    let incident = &stored[0];
    assert_eq!(incident["_id"], receipt.incident.id.as_str());
    assert_eq!(incident["severity"], "urgent");
    assert_eq!(incident["matchType"], "exact");
    assert_eq!(incident["senderEmail"], "jane@bigco.com");
    assert_eq!(incident["client"]["_ref"], "client-bigco");
    assert_eq!(incident["source"], "email");
    let tags: Vec<&str> = incident["tags"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(tags.contains(&"bug"), "tags were {tags:?}");
}

// ─── Scenario B: unknown sender rejected ─────────────────────────────

#[tokio::test]
async fn test_scenario_b_unknown_sender_rejected() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({
        "from": "Jane <jane@stranger.org>",
        "subject": "URGENT: site down",
        "text": "Our site is down, please help ASAP"
    })
    .to_string();

    let err = intake
        .handle(&signed(body.as_bytes()), body.as_bytes())
        .await
        .unwrap_err();
    assert_eq!(err.status(), 404);
    assert!(matches!(err, IntakeError::UnknownSender { ref email } if email == "jane@stranger.org"));
    assert!(incidents(&store).await.is_empty());
}

// ─── Scenario C: reply with quoted history ───────────────────────────

#[tokio::test]
async fn test_scenario_c_reply_strips_quote() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({
        "from": "ops@acme.com",
        "subject": "Re: Question about billing",
        "text": "Could you send the March invoice again?\n\n> Earlier note from support\n> with more detail"
    })
    .to_string();

    let receipt = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert!(receipt.incident.is_reply);
    assert_eq!(receipt.incident.priority, Priority::Low);
    assert_eq!(receipt.incident.title, "Question about billing");

    let incident = &incidents(&store).await[0];
    let description = incident["description"].as_str().unwrap();
    assert_eq!(description, "Could you send the March invoice again?");
    assert!(!description.contains("Earlier note"));
    let tags = incident["tags"].as_array().unwrap();
    assert!(tags.contains(&json!("billing")));
    assert!(tags.contains(&json!("question")));
    assert_eq!(incident["isReply"], true);
}

// ─── Scenario D: unsafe attachment ───────────────────────────────────

#[tokio::test]
async fn test_scenario_d_executable_flagged() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({
        "from": "jane@bigco.com",
        "subject": "Installer",
        "text": "Please run the attached tool",
        "attachments": [
            { "filename": "setup.exe", "contentType": "application/octet-stream", "size": 1024 },
            { "filename": "screen.png", "contentType": "image/png", "size": 2048 }
        ]
    })
    .to_string();

    let receipt = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert_eq!(receipt.incident.attachment_count, 2);
    assert!(receipt.incident.has_unsafe_attachments);

    let incident = &incidents(&store).await[0];
    assert_eq!(incident["hasAttachments"], true);
    let summary = &incident["metadata"]["attachmentSummary"];
    assert_eq!(summary["hasUnsafe"], true);
    assert_eq!(summary["safeCount"], 1);
    assert_eq!(summary["imageCount"], 1);
    assert_eq!(summary["totalSize"], "3 KB");
    let files = summary["fileList"].as_array().unwrap();
    assert_eq!(files[0], "setup.exe (1 KB) [FLAGGED]");
    assert_eq!(files[1], "screen.png (2 KB)");
    assert_eq!(incident["attachments"][0]["isSafe"], false);
    assert_eq!(incident["metadata"]["attachmentCount"], 2);
}

#[tokio::test]
async fn test_broken_attachment_does_not_fail_request() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({
        "from": "jane@bigco.com",
        "subject": "Files",
        "text": "two files",
        "attachments": [{ "contentType": "text/plain" }, { "filename": "ok.txt", "size": 5 }]
    })
    .to_string();

    let receipt = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert_eq!(receipt.incident.attachment_count, 2);
    let incident = &incidents(&store).await[0];
    assert_eq!(incident["attachments"][0]["filename"], "attachment-0");
    assert!(incident["attachments"][0]["processingError"].is_string());
    assert!(incident["attachments"][1].get("processingError").is_none());
}

// ─── Matching ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_domain_match_recorded() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({ "from": "Random <random@ACME.com>", "subject": "How do I export?", "text": "how do I export data" })
        .to_string();

    let receipt = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert_eq!(receipt.incident.client, "Acme");
    let incident = &incidents(&store).await[0];
    assert_eq!(incident["matchType"], "domain");
    assert_eq!(incident["senderEmail"], "random@acme.com");
}

#[tokio::test]
async fn test_unknown_sender_filed_under_fallback_client() {
    let (store, intake) = setup(IntakeConfig {
        handle_unknown_senders: true,
        unknown_client_id: Some("client-unknown".to_string()),
        ..IntakeConfig::default()
    });
    let body = json!({ "from": "who@nowhere.io", "subject": "Hello", "text": "hi" }).to_string();

    let receipt = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert_eq!(receipt.incident.client, "Unknown Senders");
    let incident = &incidents(&store).await[0];
    assert_eq!(incident["matchType"], "none");
    assert_eq!(incident["client"]["_ref"], "client-unknown");
}

#[tokio::test]
async fn test_unknown_sender_without_bucket_has_no_client() {
    let (store, intake) = setup(IntakeConfig {
        handle_unknown_senders: true,
        unknown_client_id: Some("missing-bucket".to_string()),
        ..IntakeConfig::default()
    });
    let body = json!({ "from": "who@nowhere.io", "subject": "Hello", "text": "hi" }).to_string();

    let receipt = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert_eq!(receipt.incident.client, "Unknown Client");
    let incident = &incidents(&store).await[0];
    assert_eq!(incident["matchType"], "none");
    assert!(incident.get("client").is_none());
}

// ─── Rejections ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_authentication_failures() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({ "from": "jane@bigco.com", "subject": "s", "text": "t" }).to_string();

    let err = intake.handle(&HeaderMap::new(), body.as_bytes()).await.unwrap_err();
    assert!(matches!(err, IntakeError::MissingSignature));

    let mut forged = HeaderMap::new();
    forged.insert("x-webhook-signature", HeaderValue::from_static("deadbeef"));
    let err = intake.handle(&forged, body.as_bytes()).await.unwrap_err();
    assert!(matches!(err, IntakeError::InvalidSignature));
    assert_eq!(err.status(), 401);

    assert!(incidents(&store).await.is_empty());
}

#[tokio::test]
async fn test_missing_secret_refuses_everything() {
    let store = Arc::new(MemoryStore::with_documents(clients()));
    let intake = Intake::new(
        store.clone(),
        WebhookConfig {
            secret: None,
            environment: "development".to_string(),
        },
        IntakeConfig::default(),
    );
    let body = json!({ "from": "jane@bigco.com", "subject": "s" }).to_string();

    let err = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap_err();
    assert!(matches!(err, IntakeError::NotConfigured));
    assert_eq!(err.status(), 500);
    assert!(incidents(&store).await.is_empty());
}

#[tokio::test]
async fn test_validation_failures() {
    let (store, intake) = setup(IntakeConfig::default());

    let body = br#"{"from": "jane@bigco.com""#;
    let err = intake.handle(&signed(body), body).await.unwrap_err();
    assert!(matches!(err, IntakeError::InvalidPayload(_)));

    let body = json!({ "text": "no headers" }).to_string();
    let err = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap_err();
    assert!(matches!(err, IntakeError::MissingFields(_)));

    let body = json!({ "from": "Jane Doe", "subject": "hi" }).to_string();
    let err = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap_err();
    assert!(matches!(err, IntakeError::InvalidSender(_)));
    assert_eq!(err.status(), 400);

    assert!(incidents(&store).await.is_empty());
}

// ─── Deduplication ───────────────────────────────────────────────────

#[tokio::test]
async fn test_redelivery_returns_existing_incident() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({ "id": "evt-1", "from": "jane@bigco.com", "subject": "Broken page", "text": "page is broken" })
        .to_string();

    let first = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    let second = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();

    assert!(!first.duplicate);
    assert!(second.duplicate);
    assert_eq!(first.incident, second.incident);
    assert_eq!(incidents(&store).await.len(), 1);
}

#[tokio::test]
async fn test_dedup_disabled_or_synthetic_ids_create_again() {
    let (store, intake) = setup(IntakeConfig {
        deduplicate_message_ids: false,
        ..IntakeConfig::default()
    });
    let body = json!({ "id": "evt-2", "from": "jane@bigco.com", "subject": "s", "text": "t" }).to_string();
    intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert_eq!(incidents(&store).await.len(), 2);

    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({ "from": "jane@bigco.com", "subject": "s", "text": "t" }).to_string();
    intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert_eq!(incidents(&store).await.len(), 2);
}

// ─── Properties ──────────────────────────────────────────────────────

#[test]
fn test_parsing_is_deterministic() {
    let run = || {
        content::parse(
            Some("Fwd: Ticket #A-1042 login error"),
            Some("Login fails with error 500.\n\nThanks,\nJane"),
            Some("<p>Login fails with <b>error</b> 500.</p><p>Thanks</p>"),
        )
    };
    let a = serde_json::to_string(&run()).unwrap();
    let b = serde_json::to_string(&run()).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_provider_nested_payload() {
    let (store, intake) = setup(IntakeConfig::default());
    let body = json!({
        "type": "email.received",
        "created_at": "2025-04-01T09:00:00Z",
        "data": {
            "email_id": "re_123",
            "from": "Jane <jane@bigco.com>",
            "subject": "Need help",
            "html": "<div>Can you help with <b>permissions</b>?</div>"
        }
    })
    .to_string();

    let receipt = intake.handle(&signed(body.as_bytes()), body.as_bytes()).await.unwrap();
    assert_eq!(receipt.incident.client, "BigCo");
    let incident = &incidents(&store).await[0];
    assert_eq!(incident["emailMessageId"], "re_123");
    assert_eq!(incident["reportedAt"], "2025-04-01T09:00:00Z");
    assert_eq!(incident["description"], "Can you help with permissions?");
}
