//! Message rendering: escaping plus a constrained rich-text transform.
//!
//! Everything user-authored is escaped before insertion, so literal markup
//! characters never execute as markup. Agent answers get a small,
//! fixed set of transforms (headings, bold spans, bullets, autolinks)
//! or, when the answer already carries markup, only line-break and bullet
//! normalization to avoid double-escaping pre-formatted content.

use once_cell::sync::Lazy;
use pagebot_core::{Message, Sender};
use regex::Regex;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("static regex"));

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,4}\s+(.*)$").expect("static regex"));

static BOLD_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("static regex"));

static BOLD_UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__(.+?)__").expect("static regex"));

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-•*]\s+(.*)$").expect("static regex"));

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s<]+").expect("static regex"));

fn looks_like_markup(text: &str) -> bool {
    MARKUP_RE.is_match(text)
}

fn autolink(text: &str) -> String {
    URL_RE
        .replace_all(text, r#"<a href="$0" target="_blank" rel="noopener">$0</a>"#)
        .to_string()
}

fn bold(text: &str) -> String {
    let text = BOLD_STAR_RE.replace_all(text, "<b>$1</b>");
    BOLD_UNDER_RE.replace_all(&text, "<b>$1</b>").to_string()
}

/// Join rendered lines: block-level pieces stand alone, plain runs are
/// separated by line breaks.
fn join_lines(lines: Vec<(bool, String)>) -> String {
    let mut out = String::new();
    let mut prev_inline = false;
    for (is_block, line) in lines {
        if is_block {
            out.push_str(&line);
            prev_inline = false;
        } else {
            if prev_inline {
                out.push_str("<br>");
            }
            out.push_str(&line);
            prev_inline = true;
        }
    }
    out
}

/// Render an agent answer. Pre-formatted answers (already containing
/// markup) get only normalization; plain answers are escaped and then
/// transformed.
pub fn render_agent_text(text: &str) -> String {
    if looks_like_markup(text) {
        let lines = text
            .lines()
            .map(|line| match BULLET_RE.captures(line) {
                Some(caps) => (true, format!(r#"<div class="chat-bullet">• {}</div>"#, &caps[1])),
                None => (false, line.to_string()),
            })
            .collect();
        return join_lines(lines);
    }

    let escaped = escape_html(text);
    let lines = escaped
        .lines()
        .map(|line| {
            if let Some(caps) = HEADING_RE.captures(line) {
                let content = autolink(&bold(&caps[1]));
                (true, format!(r#"<div class="chat-heading"><strong>{}</strong></div>"#, content))
            } else if let Some(caps) = BULLET_RE.captures(line) {
                let content = autolink(&bold(&caps[1]));
                (true, format!(r#"<div class="chat-bullet">• {}</div>"#, content))
            } else {
                (false, autolink(&bold(line)))
            }
        })
        .collect();
    join_lines(lines)
}

/// Render user input: escaped verbatim, line breaks preserved.
pub fn render_user_text(text: &str) -> String {
    escape_html(text).lines().collect::<Vec<_>>().join("<br>")
}

/// Render one log entry. An attached image renders as an inline preview
/// preceding any accompanying text.
pub fn render_message(message: &Message) -> String {
    let sender_class = match message.sender {
        Sender::User => "chat-user",
        Sender::Bot => "chat-bot",
    };
    let mut inner = String::new();
    if let Some(image) = &message.image {
        inner.push_str(&format!(
            r#"<img class="chat-image" src="{}" alt="attachment">"#,
            escape_html(image)
        ));
    }
    if let Some(text) = &message.text {
        let body = match message.sender {
            Sender::User => render_user_text(text),
            Sender::Bot => render_agent_text(text),
        };
        inner.push_str(&format!(r#"<div class="chat-text">{}</div>"#, body));
    }
    format!(r#"<div class="chat-message {}">{}</div>"#, sender_class, inner)
}

/// Distinctly styled inline error, clearly marked apart from answers.
pub fn render_error(text: &str) -> String {
    format!(
        r#"<div class="chat-message chat-error">⚠ {}</div>"#,
        escape_html(text)
    )
}
