//! Project, extra and group name normalization (PEP 503 / PEP 685)

use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

/// Normalize a distribution, extra or dependency-group name
///
/// `Scikit_Learn`, `scikit.learn` and `scikit-learn` all normalize to
/// `scikit-learn`.
pub fn canonicalize_name(name: &str) -> String {
    SEPARATOR_RE
        .replace_all(name.trim(), "-")
        .to_ascii_lowercase()
}

/// True if two names are equal after normalization
pub fn names_match(a: &str, b: &str) -> bool {
    canonicalize_name(a) == canonicalize_name(b)
}
