//! Attachment metadata.
//!
//! Descriptors arrive untrusted from the webhook provider. The binary content
//! is never fetched; only the metadata is screened and cataloged.

use serde::{Deserialize, Serialize};

/// An attachment as described by the webhook payload.
///
/// Every field is optional because providers omit or mangle them; the screener
/// decides what is usable.
///
/// Built only through [`AttachmentDescriptor::from_value`], which owns the
/// accepted key spellings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentDescriptor {
    /// Filename as sent (may be missing).
    pub filename: Option<String>,

    /// MIME content type (e.g. `"image/png"`).
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size: Option<u64>,

    /// Download URL offered by the provider.
    pub url: Option<String>,

    /// Inline (base64) content, when the provider embeds it.
    pub content: Option<String>,
}

impl AttachmentDescriptor {
    /// Read a descriptor from an arbitrary JSON value.
    ///
    /// Never fails: values that are not objects, or fields of the wrong type,
    /// simply come back as `None`.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
                .map(String::from)
        };
        Self {
            filename: text(&["filename", "name"]),
            content_type: text(&["contentType", "content_type", "mimeType"]),
            size: value.get("size").and_then(|v| v.as_u64()),
            url: text(&["url"]),
            content: text(&["content"]),
        }
    }
}

/// Screening result for a single attachment. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedAttachment {
    /// Original filename, or `attachment-{index}` when it had none.
    pub filename: String,
    /// MIME content type (`application/octet-stream` when missing).
    pub content_type: String,
    /// Size in bytes (0 when processing failed before it was known).
    pub size: u64,
    /// Provider download URL, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Human-readable size (`"1.5 KB"`).
    pub size_formatted: String,
    /// Content type is an allow-listed image type.
    pub is_image: bool,
    /// Content type is an allow-listed document type.
    pub is_document: bool,
    /// Passed every safety check.
    pub is_safe: bool,
    /// Why this item could not be processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
}

/// Aggregate over a batch of processed attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSummary {
    pub total_count: usize,
    pub safe_count: usize,
    pub image_count: usize,
    pub document_count: usize,
    /// Formatted sum of all sizes.
    pub total_size: String,
    pub has_unsafe: bool,
    /// One `"{filename} ({size})"` line per item, unsafe ones suffixed `[FLAGGED]`.
    pub file_list: Vec<String>,
}
