//! In-process document store.
//!
//! Backs the `serve` command and the test suite. Documents are kept in
//! insertion order, which is the order queries return them in.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ContentStore, CreatedDocument, Filter};
use crate::error::{IntakeError, Result};
use crate::model::address::domain_of;
use crate::model::incident::{CLIENT_TYPE, INCIDENT_TYPE};

/// A document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `documents`.
    ///
    /// Documents without an `_id` get one assigned.
    pub fn with_documents(documents: Vec<Value>) -> Self {
        let documents = documents.into_iter().map(ensure_id).collect();
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Load seed documents from a JSON array file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| IntakeError::io(path, e))?;
        let parsed: Value = serde_json::from_str(&contents).map_err(|e| IntakeError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let Value::Array(documents) = parsed else {
            return Err(IntakeError::Config {
                path: path.to_path_buf(),
                reason: "expected a JSON array of documents".to_string(),
            });
        };
        tracing::info!(path = %path.display(), count = documents.len(), "Loaded seed documents");
        Ok(Self::with_documents(documents))
    }

    /// Snapshot of every document of the given `_type`.
    pub async fn documents_of_type(&self, kind: &str) -> Vec<Value> {
        self.documents
            .read()
            .await
            .iter()
            .filter(|d| type_of(d) == Some(kind))
            .cloned()
            .collect()
    }

    /// Number of documents held.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn query(&self, filter: Filter<'_>) -> Result<Vec<Value>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|d| filter_matches(d, filter))
            .cloned()
            .collect())
    }

    async fn create(&self, document: Value) -> Result<CreatedDocument> {
        if !document.is_object() {
            return Err(IntakeError::Store(
                "documents must be JSON objects".to_string(),
            ));
        }
        let document = ensure_id(document);
        let id = document
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.documents.write().await.push(document.clone());
        tracing::debug!(id = %id, "Created document");
        Ok(CreatedDocument { id, document })
    }
}

/// Email and domain filters compare full Unicode lowercase forms.
fn filter_matches(document: &Value, filter: Filter<'_>) -> bool {
    match filter {
        Filter::ClientByEmail(email) => {
            let wanted = email.trim().to_lowercase();
            type_of(document) == Some(CLIENT_TYPE)
                && client_email(document).is_some_and(|e| e.to_lowercase() == wanted)
        }
        Filter::ClientsByDomain(domain) => {
            let wanted = domain.trim().to_lowercase();
            type_of(document) == Some(CLIENT_TYPE)
                && client_email(document)
                    .and_then(domain_of)
                    .is_some_and(|d| d == wanted)
        }
        Filter::DocumentById(id) => document.get("_id").and_then(Value::as_str) == Some(id),
        Filter::IncidentByMessageId(message_id) => {
            type_of(document) == Some(INCIDENT_TYPE)
                && document.get("emailMessageId").and_then(Value::as_str) == Some(message_id)
        }
    }
}

fn type_of(document: &Value) -> Option<&str> {
    document.get("_type").and_then(Value::as_str)
}

fn client_email(document: &Value) -> Option<&str> {
    document
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
}

fn ensure_id(mut document: Value) -> Value {
    if let Some(obj) = document.as_object_mut() {
        let missing = obj.get("_id").and_then(Value::as_str).is_none();
        if missing {
            obj.insert(
                "_id".to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
    }
    document
}
