//! `mailintake`: turns inbound client support email into incident records.
//!
//! A webhook delivery is authenticated, normalized across provider payload
//! shapes, matched to a client, classified by priority and tags, screened for
//! unsafe attachments, and filed in a document store.

pub mod config;
pub mod error;
pub mod intake;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod screener;
pub mod server;
pub mod store;
