//! Structure-preserving HTML sanitizer for reasoning-service prompts

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static INLINE_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
});
static SVG_PATH_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s+d\s*=\s*"[^"]*""#).expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static BETWEEN_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r">\s+<").expect("valid regex"));

/// Strip scripts, styles, comments and inline handlers while keeping the
/// element structure, then cap the result at `max_chars` characters.
pub fn sanitize_html(raw: &str, max_chars: usize) -> String {
    let cleaned = SCRIPT_BLOCK.replace_all(raw, "");
    let cleaned = STYLE_BLOCK.replace_all(&cleaned, "");
    let cleaned = COMMENT.replace_all(&cleaned, "");
    let cleaned = INLINE_HANDLER.replace_all(&cleaned, "");
    let cleaned = SVG_PATH_DATA.replace_all(&cleaned, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = BETWEEN_TAGS.replace_all(&cleaned, "><");
    let cleaned = cleaned.trim();

    match cleaned.char_indices().nth(max_chars) {
        Some((cut, _)) => cleaned[..cut].to_string(),
        None => cleaned.to_string(),
    }
}
