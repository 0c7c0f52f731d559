//! Keyword rule tables for priority and topic classification.
//!
//! Rules are plain ordered lists so precedence is visible at a glance.
//! Keywords are searched as substrings of the lowercased text, so `shutdown`
//! hits `down` and `debug` hits `bug`.

use crate::model::incident::Priority;

/// Priority rules, checked in order. First match wins; no match means `Medium`.
pub const PRIORITY_RULES: &[(Priority, &[&str])] = &[
    (
        Priority::Urgent,
        &[
            "urgent",
            "emergency",
            "critical",
            "asap",
            "immediately",
            "broken",
            "down",
            "not working",
        ],
    ),
    (
        Priority::High,
        &[
            "important",
            "priority",
            "issue",
            "problem",
            "error",
            "bug",
            "help",
            "support",
        ],
    ),
    (
        Priority::Low,
        &[
            "question",
            "inquiry",
            "suggestion",
            "feature",
            "enhancement",
            "when you can",
        ],
    ),
];

/// Topic tag rules. Every rule is tested; an email can carry several tags.
pub const TAG_RULES: &[(&str, &[&str])] = &[
    ("bot", &["bot", "discord", "command", "slash"]),
    (
        "infrastructure",
        &["server", "hosting", "deployment", "infrastructure"],
    ),
    (
        "permissions",
        &["permission", "role", "access", "login", "auth"],
    ),
    ("feature-request", &["feature", "enhancement", "improvement"]),
    ("bug", &["bug", "error", "broken", "not working", "issue", "down"]),
    ("question", &["question", "how to", "help", "support"]),
    ("billing", &["billing", "payment", "invoice", "subscription"]),
];

fn mentions_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

/// Classify priority from the combined subject and body text.
pub fn classify_priority(text: &str) -> Priority {
    let lowered = text.to_lowercase();
    PRIORITY_RULES
        .iter()
        .find(|(_, keywords)| mentions_any(&lowered, keywords))
        .map(|(priority, _)| *priority)
        .unwrap_or(Priority::Medium)
}

/// Collect every topic tag whose keywords appear in `text`, in rule order.
pub fn extract_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TAG_RULES
        .iter()
        .filter(|(_, keywords)| mentions_any(&lowered, keywords))
        .map(|(tag, _)| tag.to_string())
        .collect()
}
