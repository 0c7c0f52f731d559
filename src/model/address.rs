//! Sender address extraction and validation.

use std::sync::LazyLock;

use regex::Regex;

/// Permissive shape check: something, an `@`, something, a dot, something.
static VALID_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// An RFC-shaped address embedded anywhere in a string.
static EMBEDDED_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex")
});

/// A parsed `From` value.
///
/// # Examples
/// - `"Jane Doe <jane@bigco.com>"` → `display_name = "Jane Doe"`, `address = "jane@bigco.com"`
/// - `"jane@bigco.com"` → `display_name = ""`, `address = "jane@bigco.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`), as written by the sender.
    pub address: String,
}

impl EmailAddress {
    /// Parse a raw `From` header value.
    ///
    /// Returns `None` when no usable address can be found. See
    /// [`extract_email_address`] for the accepted shapes.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let address = extract_email_address(trimmed)?;

        let display_name = match trimmed.rfind('<') {
            Some(angle_start) => strip_quotes(&trimmed[..angle_start]),
            None => String::new(),
        };

        Some(Self {
            display_name,
            address,
        })
    }

    /// Lowercased, trimmed address used for lookups.
    pub fn normalized(&self) -> String {
        self.address.trim().to_lowercase()
    }

    /// Domain part of the address, lowercased.
    pub fn domain(&self) -> Option<String> {
        domain_of(&self.address)
    }
}

/// Extract the bare address from a raw `From` value.
///
/// Shapes are tried in priority order:
/// 1. `"Display Name <addr@domain>"`: the angle-bracket content
/// 2. an address embedded anywhere in the string
/// 3. the whole trimmed string, if it validates on its own
pub fn extract_email_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let (Some(angle_start), Some(angle_end)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
        if angle_end > angle_start {
            let inner = trimmed[angle_start + 1..angle_end].trim();
            if is_valid_email(inner) {
                return Some(inner.to_string());
            }
        }
    }

    if let Some(m) = EMBEDDED_EMAIL.find(trimmed) {
        return Some(m.as_str().to_string());
    }

    if is_valid_email(trimmed) {
        return Some(trimmed.to_string());
    }

    None
}

/// Lenient address check. False positives are acceptable, false negatives are not.
pub fn is_valid_email(s: &str) -> bool {
    VALID_EMAIL.is_match(s)
}

/// Lowercased domain after the last `@`, if any.
pub fn domain_of(address: &str) -> Option<String> {
    let (_, domain) = address.trim().rsplit_once('@')?;
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_lowercase())
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}
