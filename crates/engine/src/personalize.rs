//! Per-recipient content personalization.
//!
//! Variable substitution, subject sanitization, and footer injection. The
//! subject sanitizer enforces the outbound safety rule: no production
//! recipient may ever see an internal test marker.

use mailpress_core::types::Settings;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// Fallback when a contact has no first name.
const FALLBACK_FIRST_NAME: &str = "there";

/// Leading internal test markers: `[TEST]`, `[Test: ...]`, `[test|...]`,
/// and bare prefixes like `TEST -`, `Test:`, `test|`. Case-insensitive,
/// anchored at the start, repeated markers all stripped.
static TEST_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:\[\s*test[^\]]*\]\s*|test\s*[:|-]\s*)+")
        .expect("test marker pattern is valid")
});

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static BREAK_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</p>|</h[1-6]>|</div>|</li>").expect("break tag pattern is valid")
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

/// Replace every `{{first_name}}` occurrence. Single pass — substituted
/// values are never re-scanned.
pub fn substitute_variables(text: &str, first_name: Option<&str>) -> String {
    let name = match first_name {
        Some(name) if !name.trim().is_empty() => name,
        _ => FALLBACK_FIRST_NAME,
    };
    text.replace("{{first_name}}", name)
}

/// Strip leading test markers and normalize whitespace. Idempotent.
pub fn sanitize_subject(subject: &str) -> String {
    let stripped = TEST_MARKER_RE.replace(subject, "");
    normalize_whitespace(&stripped)
}

/// Collapse internal whitespace runs to one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Deep link that resolves to the unsubscribe endpoint for one recipient.
pub fn unsubscribe_link(base_url: &str, email: &str, campaign_id: Uuid) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("email", email)
        .append_pair("campaign", &campaign_id.to_string())
        .finish();
    format!("{}/unsubscribe?{}", base_url.trim_end_matches('/'), query)
}

/// Append the standardized unsubscribe footer to outbound content. Applied
/// to the content used for the send, never the stored snapshot.
pub fn append_footer(
    content: &str,
    settings: &Settings,
    base_url: &str,
    email: &str,
    campaign_id: Uuid,
) -> String {
    let link = unsubscribe_link(base_url, email, campaign_id);
    let mut footer = format!(
        "<div style=\"margin-top:24px;padding-top:12px;border-top:1px solid #ddd;font-size:12px;color:#666\">\
         <p>You are receiving this email because you subscribed to updates from {}.</p>\
         <p><a href=\"{}\">Unsubscribe</a></p>",
        settings.from_name, link
    );
    if let Some(address) = &settings.company_address {
        footer.push_str(&format!("<p>{}</p>", address.replace('\n', "<br>")));
    }
    footer.push_str("</div>");
    format!("{}{}", content, footer)
}

/// Derive the text-only alternative by stripping all markup tags.
pub fn strip_tags(html: &str) -> String {
    let with_breaks = BREAK_TAG_RE.replace_all(html, "\n");
    let text = TAG_RE.replace_all(&with_breaks, "");
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
