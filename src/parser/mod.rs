//! Email content parsing: HTML flattening, ticket field extraction, and keyword classification.

pub mod classify;
pub mod content;
pub mod html;
