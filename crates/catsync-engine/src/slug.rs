//! URL slugs and comparison normalization.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s_-]").expect("valid disallowed-chars regex"));
static SEPARATOR_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]+").expect("valid separator regex"));

/// Converts a title into a URL-safe slug.
///
/// Lowercases and trims, drops everything outside `[a-z0-9\s_-]`, collapses
/// runs of whitespace, underscores and hyphens into a single hyphen, and
/// strips hyphens from both ends. Total: any input, including the empty
/// string, yields a (possibly empty) slug.
///
/// ```
/// use catsync_engine::slug::slugify;
/// assert_eq!(slugify("Men's Wear"), "mens-wear");
/// ```
#[must_use]
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let kept = DISALLOWED_RE.replace_all(&lowered, "");
    let collapsed = SEPARATOR_RUN_RE.replace_all(&kept, "-");
    collapsed.trim_matches('-').to_owned()
}

/// Canonical form of an optional value for change detection: missing, empty
/// and `"0"` all mean "absent". Never used for values that get written.
#[must_use]
pub fn normalize_for_compare(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != "0")
}
