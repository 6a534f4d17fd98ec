//! Text extraction over a parsed host page.
//!
//! The host page is arbitrary, uncontrolled HTML. Everything here works on
//! `scraper`'s immutable tree, so "remove this element, then read the rest"
//! becomes "read everything except this element's subtree".

use scraper::{ElementRef, Html, Selector};

/// Elements whose text content is never user-visible.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate at a char boundary, never mid-codepoint.
pub fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn is_skipped(el: ElementRef) -> bool {
    SKIPPED_TAGS.contains(&el.value().name())
}

/// Text from an element's direct text-node children only, collapsed.
pub fn own_text(el: ElementRef) -> String {
    let mut out = String::new();
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_ws(&out)
}

/// Full descendant text of an element, collapsed, skipping non-visible tags.
pub fn element_text(el: ElementRef) -> String {
    let mut out = String::new();
    push_element_text(el, &mut out);
    collapse_ws(&out)
}

fn push_element_text(el: ElementRef, out: &mut String) {
    if is_skipped(el) {
        return;
    }
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            push_element_text(child_el, out);
        }
    }
}

/// The visible text lines of a container, in document order, with the
/// excluded element's entire subtree left out. Each descendant element
/// contributes its direct text as one line, close enough to how the
/// rendered page breaks lines.
pub fn text_lines_excluding<'a>(container: ElementRef<'a>, excluded: ElementRef<'a>) -> Vec<String> {
    let mut lines = Vec::new();
    if container.id() != excluded.id() {
        let first = own_text(container);
        if !first.is_empty() {
            lines.push(first);
        }
        collect_lines(container, excluded, &mut lines);
    }
    lines
}

fn collect_lines<'a>(el: ElementRef<'a>, excluded: ElementRef<'a>, out: &mut Vec<String>) {
    for child in el.children() {
        if child.id() == excluded.id() {
            continue;
        }
        if let Some(child_el) = ElementRef::wrap(child) {
            if is_skipped(child_el) {
                continue;
            }
            let line = own_text(child_el);
            if !line.is_empty() {
                out.push(line);
            }
            collect_lines(child_el, excluded, out);
        }
    }
}

/// The page's visible text, capped at `limit` bytes. This is what rides
/// along with each question so the backend can answer in page context.
pub fn page_text(html: &str, limit: usize) -> String {
    let doc = Html::parse_document(html);
    let body = Selector::parse("body").ok();
    let text = match body.as_ref().and_then(|sel| doc.select(sel).next()) {
        Some(body_el) => element_text(body_el),
        None => doc
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .map(element_text)
            .collect::<Vec<_>>()
            .join(" "),
    };
    safe_truncate(&text, limit).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        let sel = Selector::parse(css).unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn test_collapse_ws() {
        assert_eq!(collapse_ws("  a \n\t b  "), "a b");
        assert_eq!(collapse_ws(""), "");
    }

    #[test]
    fn test_safe_truncate_multibyte() {
        let s = "नमस्ते दुनिया";
        let cut = safe_truncate(s, 7);
        assert!(cut.len() <= 7);
        assert!(s.starts_with(cut));
    }

    #[test]
    fn test_own_text_direct_children_only() {
        let doc = Html::parse_fragment("<div>Anita <span>logout</span> Desai</div>");
        let div = first_match(&doc, "div");
        assert_eq!(own_text(div), "Anita Desai");
    }

    #[test]
    fn test_element_text_skips_script() {
        let doc = Html::parse_fragment("<div>hello<script>var x = 1;</script> world</div>");
        let div = first_match(&doc, "div");
        assert_eq!(element_text(div), "hello world");
    }

    #[test]
    fn test_text_lines_excluding_subtree() {
        let doc = Html::parse_fragment(
            r#"<div class="user-menu">
                 <span class="name">Anita Desai</span>
                 <a class="exit" href="/logout">Logout <i>icon</i></a>
                 <span>Settings</span>
               </div>"#,
        );
        let container = first_match(&doc, ".user-menu");
        let logout = first_match(&doc, ".exit");
        let lines = text_lines_excluding(container, logout);
        assert_eq!(lines, vec!["Anita Desai".to_string(), "Settings".to_string()]);
    }

    #[test]
    fn test_page_text_capped() {
        let html = "<html><body><p>one two three four five</p></body></html>";
        assert_eq!(page_text(html, 7), "one two");
        assert_eq!(page_text(html, 4096), "one two three four five");
    }
}
