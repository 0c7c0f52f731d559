//! Content store interface.
//!
//! The document store owns clients and incidents. The intake pipeline only
//! needs typed lookups and a single create call, so the surface stays small.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A typed query predicate. Parameters are bound values, never spliced text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<'a> {
    /// Clients whose email equals the address, ignoring case and surrounding whitespace.
    ClientByEmail(&'a str),
    /// Clients whose email domain equals the domain, ignoring case.
    ClientsByDomain(&'a str),
    /// Any document with this `_id`.
    DocumentById(&'a str),
    /// Incidents created from this provider message id.
    IncidentByMessageId(&'a str),
}

/// A freshly created document and the id the store assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedDocument {
    pub id: String,
    pub document: Value,
}

/// Read/create access to the document store.
///
/// Implementations must return matches in a stable order so that the same
/// store state always resolves the same way.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All documents matching `filter`, in store order.
    async fn query(&self, filter: Filter<'_>) -> Result<Vec<Value>>;

    /// Persist a new document and return it with its assigned `_id`.
    async fn create(&self, document: Value) -> Result<CreatedDocument>;

    /// First document matching `filter`, if any.
    async fn query_one(&self, filter: Filter<'_>) -> Result<Option<Value>> {
        Ok(self.query(filter).await?.into_iter().next())
    }
}
