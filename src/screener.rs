//! Attachment screening: type classification, safety checks, and summaries.
//!
//! Each descriptor is screened independently. A descriptor that cannot be
//! processed yields a flagged entry carrying the reason; it never fails the batch.

use crate::model::attachment::{AttachmentDescriptor, AttachmentSummary, ProcessedAttachment};

/// Largest attachment considered safe: 10 MiB.
pub const MAX_SAFE_SIZE: u64 = 10 * 1024 * 1024;

/// Content types treated as images. Exact matches only.
pub const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

/// Content types treated as documents.
pub const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
    "text/csv",
];

/// Extensions that are never safe, compared case-insensitively.
pub const DANGEROUS_EXTENSIONS: &[&str] = &[
    ".exe", ".bat", ".cmd", ".scr", ".pif", ".com", ".js", ".jar", ".vbs", ".wsf", ".msi",
];

/// Content types that are never safe, compared case-insensitively.
pub const DANGEROUS_CONTENT_TYPES: &[&str] = &[
    "application/x-executable",
    "application/x-msdownload",
    "application/x-msdos-program",
];

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Why a descriptor could not be screened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScreenError {
    #[error("attachment has no filename")]
    MissingFilename,
    #[error("attachment size is missing or not a byte count")]
    MissingSize,
}

/// Screen every descriptor, in order.
pub fn process_all(descriptors: &[AttachmentDescriptor]) -> Vec<ProcessedAttachment> {
    descriptors
        .iter()
        .enumerate()
        .map(|(index, descriptor)| match process_one(descriptor) {
            Ok(processed) => processed,
            Err(e) => {
                let filename = descriptor
                    .filename
                    .clone()
                    .filter(|f| !f.is_empty())
                    .unwrap_or_else(|| format!("attachment-{index}"));
                tracing::warn!(filename = %filename, error = %e, "Failed to screen attachment");
                failed(descriptor, filename, &e)
            }
        })
        .collect()
}

/// Screen a single descriptor.
pub fn process_one(descriptor: &AttachmentDescriptor) -> Result<ProcessedAttachment, ScreenError> {
    let filename = descriptor
        .filename
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or(ScreenError::MissingFilename)?;
    let size = descriptor.size.ok_or(ScreenError::MissingSize)?;
    let content_type = descriptor
        .content_type
        .as_deref()
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    Ok(ProcessedAttachment {
        filename: filename.to_string(),
        content_type: content_type.to_string(),
        size,
        url: descriptor.url.clone(),
        size_formatted: format_file_size(size),
        is_image: is_image(content_type),
        is_document: is_document(content_type),
        is_safe: is_safe(filename, content_type, size),
        processing_error: None,
    })
}

fn failed(descriptor: &AttachmentDescriptor, filename: String, error: &ScreenError) -> ProcessedAttachment {
    let size = descriptor.size.unwrap_or(0);
    ProcessedAttachment {
        filename,
        content_type: descriptor
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        size,
        url: descriptor.url.clone(),
        size_formatted: format_file_size(size),
        is_image: false,
        is_document: false,
        is_safe: false,
        processing_error: Some(error.to_string()),
    }
}

pub fn is_image(content_type: &str) -> bool {
    let ct = content_type.trim().to_ascii_lowercase();
    IMAGE_TYPES.contains(&ct.as_str())
}

pub fn is_document(content_type: &str) -> bool {
    let ct = content_type.trim().to_ascii_lowercase();
    DOCUMENT_TYPES.contains(&ct.as_str())
}

/// Size, extension, and content type must all pass.
pub fn is_safe(filename: &str, content_type: &str, size: u64) -> bool {
    if size > MAX_SAFE_SIZE {
        return false;
    }
    if let Some(ext) = extension(filename) {
        if DANGEROUS_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }
    }
    let ct = content_type.trim().to_ascii_lowercase();
    !DANGEROUS_CONTENT_TYPES.contains(&ct.as_str())
}

/// Lowercased extension including the dot, from the last `.` in the name.
fn extension(filename: &str) -> Option<String> {
    filename
        .rfind('.')
        .map(|dot| filename[dot..].to_ascii_lowercase())
}

/// Format a byte count with binary units.
///
/// Bytes have no decimals; larger units carry one decimal, dropped when it is zero
/// (`1024` → `"1 KB"`, `1536` → `"1.5 KB"`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    let mut threshold = 1024u64;
    while exponent < UNITS.len() - 1 && bytes >= threshold {
        exponent += 1;
        threshold = threshold.saturating_mul(1024);
    }
    if exponent == 0 {
        return format!("{bytes} B");
    }

    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = format!("{value:.1}");
    let rounded = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{rounded} {}", UNITS[exponent])
}

/// Aggregate counts and a human-readable file list.
pub fn summarize(processed: &[ProcessedAttachment]) -> AttachmentSummary {
    // Sizes are caller-supplied; saturate rather than overflow.
    let total_bytes = processed
        .iter()
        .fold(0u64, |total, a| total.saturating_add(a.size));
    AttachmentSummary {
        total_count: processed.len(),
        safe_count: processed.iter().filter(|a| a.is_safe).count(),
        image_count: processed.iter().filter(|a| a.is_image).count(),
        document_count: processed.iter().filter(|a| a.is_document).count(),
        total_size: format_file_size(total_bytes),
        has_unsafe: processed.iter().any(|a| !a.is_safe),
        file_list: processed
            .iter()
            .map(|a| {
                let line = format!("{} ({})", a.filename, a.size_formatted);
                if a.is_safe {
                    line
                } else {
                    format!("{line} [FLAGGED]")
                }
            })
            .collect(),
    }
}
