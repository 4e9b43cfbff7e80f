//! Pattern helpers for prompt detection.

use regex::bytes::Regex;

/// Default prompt used when a platform defines no privilege levels.
pub const FALLBACK_PROMPT: &str = r"(?m)^[\w.\-@()/:\[\]~ ]{1,63}[$#>%]\s?$";

/// Combine several prompt patterns into one alternation.
///
/// An empty pattern list yields [`FALLBACK_PROMPT`].
pub fn combine_patterns<'a>(
    patterns: impl IntoIterator<Item = &'a Regex>,
) -> Result<Regex, regex::Error> {
    let parts: Vec<String> = patterns
        .into_iter()
        .map(|p| format!("(?:{})", p.as_str()))
        .collect();

    if parts.is_empty() {
        return Regex::new(FALLBACK_PROMPT);
    }
    Regex::new(&parts.join("|"))
}
