//! HTML-to-text conversion for email bodies.

use std::sync::LazyLock;

use regex::Regex;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

static PARAGRAPH_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</p\s*>").expect("valid regex"));

static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// `true` if the body looks like it contains markup.
pub fn looks_like_html(body: &str) -> bool {
    ANY_TAG.is_match(body)
}

/// Convert an HTML body to plain text.
///
/// - Removes `<script>` and `<style>` blocks entirely
/// - `<br>` becomes a newline, `</p>` a blank line
/// - Strips every remaining tag
/// - Decodes `&nbsp; &amp; &lt; &gt; &quot; &#39;`
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    text = LINE_BREAK.replace_all(&text, "\n").into_owned();
    text = PARAGRAPH_END.replace_all(&text, "\n\n").into_owned();

    // Strip all remaining HTML tags
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    let decoded = decode_entities(&result);

    decoded
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode the standard entities. `&amp;` goes last so `&amp;lt;` stays `&lt;`.
fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Remove an entire tag block (e.g. `<script>…</script>`), case-insensitively.
///
/// An unclosed block swallows the rest of the document.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    // ASCII lowercasing keeps byte offsets aligned with the original.
    while let Some(start) = remaining.to_ascii_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        match after.to_ascii_lowercase().find(&close) {
            Some(end) => remaining = &after[end + close.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_paragraphs() {
        let text = html_to_text("<p>Hello <b>world</b></p><p>Second paragraph</p>");
        assert_eq!(text.trim_end(), "Hello world\n\nSecond paragraph");
    }

    #[test]
    fn test_html_to_text_line_breaks() {
        let text = html_to_text("one<br>two<BR/>three<br />four");
        assert_eq!(text, "one\ntwo\nthree\nfour");
    }

    #[test]
    fn test_html_to_text_entities() {
        let text = html_to_text("Tom &amp; Jerry &lt;3&gt; &quot;hi&quot; it&#39;s&nbsp;ok");
        assert_eq!(text, "Tom & Jerry <3> \"hi\" it's ok");
    }

    #[test]
    fn test_double_encoded_entity_decodes_once() {
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_html_to_text_removes_scripts_and_styles() {
        let text = html_to_text(
            "Before<script>alert('xss')</script><STYLE>p{color:red}</STYLE>After",
        );
        assert_eq!(text, "BeforeAfter");
    }

    #[test]
    fn test_unclosed_script_drops_rest() {
        assert_eq!(html_to_text("keep<script>evil()"), "keep");
    }

    #[test]
    fn test_non_ascii_before_block() {
        let text = html_to_text("Größe<style>x</style> ok");
        assert_eq!(text, "Größe ok");
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<div>hi</div>"));
        assert!(!looks_like_html("if a < b then"));
        assert!(!looks_like_html("plain text"));
    }
}
