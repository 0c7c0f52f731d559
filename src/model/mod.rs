//! Core data model types: addresses, attachments, inbound emails, and incidents.

pub mod address;
pub mod attachment;
pub mod inbound;
pub mod incident;
