//! Contact-field extraction from a rendered company page.
//!
//! Phone and email work on page text with ordered pattern families; the
//! person field relies on class-name hints in the DOM. All three return the
//! empty string on a miss.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::contact::ContactRecord;
use crate::render::RenderedPage;

// Taiwan telephone formats, tried in order: international prefix,
// parenthesized area code, hyphenated landline, mobile, toll-free.
static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\+886[-\s]?[29][-\s]?[0-9]{4}[-\s]?[0-9]{4}",
        r"\(0[2-9]\)[-\s]?[0-9]{4}[-\s]?[0-9]{4}",
        r"0[2-9][-\s]?[0-9]{4}[-\s]?[0-9]{4}",
        r"09[0-9]{2}[-\s]?[0-9]{3}[-\s]?[0-9]{3}",
        r"0800[-\s]?[0-9]{3}[-\s]?[0-9]{3}",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.%+-]+@[\w.-]+\.[A-Za-z]{2,}").unwrap());

static NOREPLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)noreply|no-reply|donotreply").unwrap());

static ROLE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)info|contact|hr|service|support|sales|hello|admin|customer|marketing|recruit|招募|人才")
        .unwrap()
});

const PLACEHOLDER_DOMAINS: &[&str] = &["example.com", "test.com"];
const ASSET_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".css", ".js", ".woff",
];

// Class-name hints for a contact person node, most specific first.
const PERSON_SELECTORS: &[&str] = &[
    r#"[class*="contact"] [class*="name"]"#,
    r#"[class*="recruiter"]"#,
    r#"[class*="hr"]"#,
    r#"[class*="人資"]"#,
    r#"[class*="聯絡人"]"#,
];

/// Extract whatever contact fields this page yields.
pub fn extract_contact(page: &RenderedPage) -> ContactRecord {
    let text = page.text();

    let phone = find_phone(&text)
        // Decorative headers often hide the real number in the footer.
        .or_else(|| page.footer_text().and_then(|footer| find_phone(&footer)))
        .unwrap_or_default();

    let email = pick_mailto(&page.mailto_addresses())
        .or_else(|| find_email_in_text(&text))
        .unwrap_or_default();

    let person = PERSON_SELECTORS
        .iter()
        .find_map(|css| page.select_first_text(css))
        .unwrap_or_default();

    ContactRecord {
        person,
        phone,
        email,
    }
}

/// First phone-pattern match that survives validation.
pub fn find_phone(text: &str) -> Option<String> {
    for pattern in PHONE_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
            if plausible_phone_digits(&digits) {
                let cleaned = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
                return Some(cleaned);
            }
        }
    }
    None
}

/// Digit-length and anti-placeholder validation: 9-12 digits, not
/// zero-padded, no run of 7+ identical digits.
pub fn plausible_phone_digits(digits: &str) -> bool {
    if !(9..=12).contains(&digits.len()) {
        return false;
    }
    if digits.starts_with("00000") {
        return false;
    }
    !has_digit_run(digits, 7)
}

fn has_digit_run(digits: &str, run: usize) -> bool {
    let mut count = 0;
    let mut last = None;
    for c in digits.chars() {
        if Some(c) == last {
            count += 1;
        } else {
            last = Some(c);
            count = 1;
        }
        if count >= run {
            return true;
        }
    }
    false
}

/// Choose among mailto addresses: first one that is not a no-reply alias.
pub fn pick_mailto(addresses: &[String]) -> Option<String> {
    addresses
        .iter()
        .find(|a| !NOREPLY.is_match(a))
        .cloned()
}

/// General email scan over page text. Placeholder domains, asset-like
/// suffixes and no-reply aliases are excluded; an address carrying a role
/// token beats the first plain survivor.
pub fn find_email_in_text(text: &str) -> Option<String> {
    let candidates: Vec<&str> = EMAIL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|a| acceptable_email(a))
        .collect();

    candidates
        .iter()
        .find(|a| ROLE_TOKEN.is_match(a))
        .or_else(|| candidates.first())
        .map(|a| a.to_string())
}

fn acceptable_email(address: &str) -> bool {
    let lower = address.to_lowercase();
    if NOREPLY.is_match(&lower) {
        return false;
    }
    if ASSET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }
    let domain = match lower.split_once('@') {
        Some((_, domain)) => domain,
        None => return false,
    };
    if PLACEHOLDER_DOMAINS.contains(&domain) || domain.contains("sentry") {
        return false;
    }
    true
}
