//! Coarse triage signal: how often a response says "major" / "moderate".

use once_cell::sync::Lazy;
use regex::Regex;

static MAJOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmajor\b").unwrap());
static MODERATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmoderate\b").unwrap());

/// Count word-bounded, case-insensitive occurrences of "major" and
/// "moderate". "minor" is not counted.
pub fn count_severities(text: &str) -> (usize, usize) {
    (
        MAJOR_RE.find_iter(text).count(),
        MODERATE_RE.find_iter(text).count(),
    )
}
