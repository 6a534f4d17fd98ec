//! Heuristic identity detection over a host page.
//!
//! The widget has no hook into the host site's authentication, so the
//! signed-in user's display name is inferred from the rendered page: first
//! from a fixed list of likely name locations, then by working backwards
//! from a logout affordance. Neither pass is guaranteed to fire; the
//! caller falls back to a generic guest identity after a bounded wait
//! (see `observe`), which is normal behavior, not a failure.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::dom::{collapse_ws, element_text, text_lines_excluding};

/// Where a resolved identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Selector,
    Heuristic,
    Fallback,
}

/// Priority-ordered locations where host sites commonly render the
/// signed-in user's name: header user-name regions first, then welcome
/// banners, then profile links. First acceptable match wins.
const NAME_SELECTOR_LIST: &[&str] = &[
    "header .user-name",
    "header .username",
    ".navbar .user-name",
    ".navbar .username",
    ".user-name",
    ".username",
    "#user-name",
    "#username",
    ".user-info .name",
    ".profile-name",
    ".account-name",
    ".welcome-user",
    ".welcome-message",
    ".user-greeting",
    "a[href*=\"profile\"]",
    "a[href*=\"account\"] .name",
];

static NAME_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    NAME_SELECTOR_LIST
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .collect()
});

/// Interactive or icon-bearing elements worth checking for a logout
/// affordance.
static CLICKABLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a, button, i, span, [role=\"button\"]").expect("static selector")
});

const LOGOUT_TEXT_PATTERNS: &[&str] = &["logout", "log out", "sign out", "sign-out", "signout"];

const LOGOUT_CLASS_PATTERNS: &[&str] = &["logout", "log-out", "signout", "sign-out", "power"];

/// Lines that are navigation chrome rather than a person's name.
const NOISE_LINES: &[&str] = &[
    "settings",
    "setting",
    "language",
    "english",
    "hindi",
    "home",
    "help",
    "admin",
    "user",
    "profile",
    "my profile",
    "account",
    "my account",
    "dashboard",
    "menu",
    "search",
    "notifications",
    "support",
    "contact",
    "sign in",
];

const MAX_NAME_LINE_CHARS: usize = 30;

/// How many ancestor containers to inspect above a logout affordance.
const ANCESTOR_LEVELS: usize = 3;

static GREETING_LEAD_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(welcome|hello|hi|mr\.?|ms\.?|mrs\.?|user:)([\s,!:]+|$)")
        .expect("static regex")
});

/// Strip greeting/honorific lead-ins ("Welcome, ", "Mr. ", "user:") and
/// surrounding punctuation so "Welcome, Anita!" compares and displays as
/// "Anita".
pub fn clean_display_name(raw: &str) -> String {
    let mut name = collapse_ws(raw);
    loop {
        let stripped = GREETING_LEAD_IN.replace(&name, "").to_string();
        if stripped == name {
            break;
        }
        name = stripped;
    }
    name.trim_matches(|c: char| c.is_whitespace() || ",.!:;|".contains(c))
        .to_string()
}

fn acceptable_name(name: &str) -> bool {
    name.len() > 2 && !name.to_lowercase().contains("log")
}

/// Pass 1: fixed selector list, in priority order.
pub fn scan_selectors(doc: &Html) -> Option<String> {
    for selector in NAME_SELECTORS.iter() {
        for el in doc.select(selector) {
            let name = clean_display_name(&element_text(el));
            if acceptable_name(&name) {
                return Some(name);
            }
        }
    }
    None
}

fn looks_like_logout(el: ElementRef) -> bool {
    let text = element_text(el).to_lowercase();
    if !text.is_empty()
        && text.len() <= 40
        && LOGOUT_TEXT_PATTERNS.iter().any(|p| text.contains(p))
    {
        return true;
    }
    el.value().classes().any(|class| {
        let class = class.to_lowercase();
        LOGOUT_CLASS_PATTERNS.iter().any(|p| class.contains(p))
    })
}

fn is_noise_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.chars().count() > MAX_NAME_LINE_CHARS {
        return true;
    }
    let lower = line.to_lowercase();
    if lower.contains("log") {
        return true;
    }
    NOISE_LINES.iter().any(|w| lower == *w)
}

/// Pass 2: find a logout affordance, then read the text around it.
///
/// For each match, inspect up to three ancestor containers. At each level
/// the matched element's own subtree is excluded (a logout link must not
/// donate its own label as the user's name) and the remaining lines are
/// filtered for navigation noise. First surviving line wins.
pub fn scan_logout_heuristic(doc: &Html) -> Option<String> {
    for el in doc.select(&CLICKABLE) {
        if !looks_like_logout(el) {
            continue;
        }
        let mut levels = 0;
        for ancestor in el.ancestors() {
            let Some(container) = ElementRef::wrap(ancestor) else {
                continue;
            };
            if matches!(container.value().name(), "body" | "html") {
                break;
            }
            levels += 1;
            if levels > ANCESTOR_LEVELS {
                break;
            }
            for line in text_lines_excluding(container, el) {
                if is_noise_line(&line) {
                    continue;
                }
                let name = clean_display_name(&line);
                if acceptable_name(&name) {
                    return Some(name);
                }
            }
        }
    }
    None
}

/// Run both synchronous passes over one page revision. Pass 1 always wins
/// over pass 2.
pub fn scan_page(html: &str) -> Option<(String, IdentitySource)> {
    let doc = Html::parse_document(html);
    if let Some(name) = scan_selectors(&doc) {
        return Some((name, IdentitySource::Selector));
    }
    scan_logout_heuristic(&doc).map(|name| (name, IdentitySource::Heuristic))
}
