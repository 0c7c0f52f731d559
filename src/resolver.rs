//! Resolves an email sender to a known client.
//!
//! Strategies run in a fixed order and stop at the first hit:
//! 1. exact address match
//! 2. same email domain as a stored client
//! 3. no match

use serde_json::Value;

use crate::error::{IntakeError, Result};
use crate::model::address::EmailAddress;
use crate::model::incident::{ClientLookupResult, ClientRecord, MatchType};
use crate::store::{ContentStore, Filter};

/// Sender → client resolution over a content store.
pub struct SenderResolver<'a, S: ContentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ContentStore + ?Sized> SenderResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve a raw `From` value.
    ///
    /// Fails with [`IntakeError::InvalidSender`] when no address can be
    /// extracted. A failing exact lookup propagates; a failing domain lookup
    /// only downgrades the result to no match.
    pub async fn resolve(&self, raw_from: &str) -> Result<ClientLookupResult> {
        let sender = EmailAddress::parse(raw_from)
            .ok_or_else(|| IntakeError::InvalidSender(raw_from.to_string()))?;
        self.resolve_address(&sender).await
    }

    /// Resolve an already-parsed sender address.
    pub async fn resolve_address(&self, sender: &EmailAddress) -> Result<ClientLookupResult> {
        let email = sender.normalized();

        if let Some(client) = self.exact_match(&email).await? {
            tracing::debug!(email = %email, client = %client.id, "Exact client match");
            return Ok(ClientLookupResult {
                client: Some(client),
                match_type: MatchType::Exact,
                matched_email: Some(email),
            });
        }

        if let Some(client) = self.domain_match(sender).await {
            tracing::debug!(email = %email, client = %client.id, "Domain client match");
            return Ok(ClientLookupResult {
                client: Some(client),
                match_type: MatchType::Domain,
                matched_email: Some(email),
            });
        }

        tracing::debug!(email = %email, "No client match");
        Ok(ClientLookupResult::none(Some(email)))
    }

    async fn exact_match(&self, email: &str) -> Result<Option<ClientRecord>> {
        let documents = self.store.query(Filter::ClientByEmail(email)).await?;
        Ok(first_client(documents))
    }

    async fn domain_match(&self, sender: &EmailAddress) -> Option<ClientRecord> {
        let domain = sender.domain()?;
        match self.store.query(Filter::ClientsByDomain(&domain)).await {
            Ok(documents) => first_client(documents),
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "Domain lookup failed, treating as no match");
                None
            }
        }
    }
}

/// First document that deserializes as a client, in store order.
fn first_client(documents: Vec<Value>) -> Option<ClientRecord> {
    documents.into_iter().find_map(|doc| {
        serde_json::from_value::<ClientRecord>(doc)
            .map_err(|e| tracing::warn!(error = %e, "Skipping malformed client document"))
            .ok()
    })
}
