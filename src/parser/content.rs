//! Turns a raw subject and body into structured ticket fields.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::incident::ParsedEmailContent;
use crate::parser::classify::{classify_priority, extract_tags};
use crate::parser::html::{html_to_text, looks_like_html};

/// Title used when the subject is absent.
pub const NO_SUBJECT_TITLE: &str = "No Subject";
/// Title used when the subject is blank after cleaning.
pub const EMPTY_SUBJECT_TITLE: &str = "Email Inquiry";
/// Body used when neither a text nor an HTML part exists.
pub const NO_CONTENT: &str = "No content provided";
/// Description used when cleaning leaves nothing.
pub const NO_DESCRIPTION: &str = "No description provided";

const MAX_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 2000;

static REPLY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:re|fwd|fw):\s*").expect("valid regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// A closing: the phrase at a line start or right after a sentence end, then
/// at most a short sign-off before the line ends. Group 1 is the closing itself.
///
/// The 30-character tail keeps sentences that merely open with "Thanks".
static CLOSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)(?:^|[.!?][ \t]+)[ \t]*((?:best regards|kind regards|warm regards|regards|many thanks|thanks|thank you|cheers)\b[^\n]{0,30})$",
    )
    .expect("valid regex")
});

/// Separators between new content and the quoted original, in precedence order.
static REPLY_SEPARATORS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?im)^[ \t]*-*[ \t]*original message[ \t]*-*[ \t]*$").expect("valid regex"),
        Regex::new(r"(?m)^[ \t]*From:[ \t]").expect("valid regex"),
        Regex::new(r"(?m)^[ \t]*On [^\n]+wrote:[ \t]*$").expect("valid regex"),
    ]
});

/// `ticket`/`ref` keyword or a bare `#`, then the identifier in group 1.
static THREAD_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:ticket|ref)\b\s*[:#-]?\s*|#)([A-Za-z0-9][A-Za-z0-9-]*)")
        .expect("valid regex")
});

/// Words that follow `ticket`/`ref` in prose rather than naming an identifier.
const THREAD_ID_STOP_WORDS: &[&str] = &[
    "about", "for", "from", "is", "number", "of", "on", "re", "regarding", "the", "to",
];

/// Parse an email's subject and bodies into ticket fields.
///
/// `html_body` wins over `text_body` when both are present. The result is a
/// pure function of the inputs.
pub fn parse(
    subject: Option<&str>,
    text_body: Option<&str>,
    html_body: Option<&str>,
) -> ParsedEmailContent {
    let raw_subject = subject.unwrap_or("");
    let is_reply = is_reply_subject(raw_subject);

    let title = match subject {
        Some(s) => clean_title(s),
        None => NO_SUBJECT_TITLE.to_string(),
    };

    let body = html_body
        .filter(|b| !b.trim().is_empty())
        .or(text_body.filter(|b| !b.trim().is_empty()))
        .unwrap_or(NO_CONTENT);
    let mut description = clean_body(body);
    let mut original_message = None;

    if is_reply {
        let reply = extract_reply(&description);
        description = reply.new_content;
        original_message = reply.original;
    }
    if description.is_empty() {
        description = NO_DESCRIPTION.to_string();
    }

    let classified_text = format!("{raw_subject} {description}");

    ParsedEmailContent {
        title,
        priority: classify_priority(&classified_text),
        tags: extract_tags(&classified_text),
        description,
        is_reply,
        thread_id: extract_thread_id(raw_subject),
        original_message,
    }
}

/// `true` if the subject starts with `re:`, `fwd:` or `fw:` (any case).
pub fn is_reply_subject(subject: &str) -> bool {
    REPLY_PREFIX.is_match(subject)
}

/// Strip one reply/forward prefix, collapse whitespace, and cap the length.
pub fn clean_title(subject: &str) -> String {
    let stripped = REPLY_PREFIX.replace(subject, "");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        return EMPTY_SUBJECT_TITLE.to_string();
    }
    truncate_chars(trimmed, MAX_TITLE_CHARS)
}

/// Reduce a body to the text worth keeping on a ticket.
///
/// Markup is converted first. Signature separators and "Sent from" lines are
/// dropped, and a closing ends the text.
pub fn clean_body(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    let text = if looks_like_html(&normalized) {
        html_to_text(&normalized)
    } else {
        normalized
    };

    let kept: Vec<&str> = text
        .lines()
        .filter(|line| line.trim_end() != "--")
        .filter(|line| !line.trim_start().starts_with("Sent from"))
        .collect();
    let mut joined = kept.join("\n");

    if let Some(closing) = CLOSING.captures(&joined).and_then(|caps| caps.get(1)) {
        joined.truncate(closing.start());
    }

    let collapsed = EXCESS_NEWLINES.replace_all(&joined, "\n\n");
    truncate_chars(collapsed.trim(), MAX_DESCRIPTION_CHARS)
}

/// New content of a reply, split from whatever it quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySplit {
    pub new_content: String,
    /// The quoted portion, when an explicit separator was found.
    pub original: Option<String>,
}

/// Separate a reply's new content from the quoted original.
///
/// Explicit separators are tried first. Without one, only the leading lines
/// up to the first `>`-quoted line are kept; this can over-strip content that
/// legitimately starts with `>`, such as a pasted diff.
pub fn extract_reply(body: &str) -> ReplySplit {
    for separator in REPLY_SEPARATORS.iter() {
        if let Some(m) = separator.find(body) {
            let original = body[m.start()..].trim();
            return ReplySplit {
                new_content: body[..m.start()].trim().to_string(),
                original: (!original.is_empty()).then(|| original.to_string()),
            };
        }
    }

    let leading: Vec<&str> = body
        .lines()
        .take_while(|line| !line.trim_start().starts_with('>'))
        .collect();
    ReplySplit {
        new_content: leading.join("\n").trim().to_string(),
        original: None,
    }
}

/// Ticket/reference identifier from the raw subject, e.g. `Ticket #1042`.
pub fn extract_thread_id(subject: &str) -> Option<String> {
    THREAD_ID
        .captures_iter(subject)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|id| {
            !THREAD_ID_STOP_WORDS
                .iter()
                .any(|stop| stop.eq_ignore_ascii_case(id))
        })
        .map(str::to_string)
}

/// Cap `s` at `max` characters, ending in `...` when cut.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max - 3).collect();
    out.push_str("...");
    out
}
