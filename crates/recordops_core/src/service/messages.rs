//! User-facing message formatting for record errors.

use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z]+)").expect("valid camel boundary regex"));

/// Splits camel-case boundaries and lowercases: `UserProfile` → `user profile`.
///
/// Runs of capitals after a lowercase letter stay together, so
/// `ApiURLToken` becomes `api urltoken`.
pub fn humanize_type_name(type_name: &str) -> String {
    CAMEL_BOUNDARY_RE
        .replace_all(type_name, "${1} ${2}")
        .to_lowercase()
}

pub(crate) fn not_found_message(type_name: &str) -> String {
    format!("{} not found", humanize_type_name(type_name))
}

/// `Project cannot be deleted because it has related Task(s), Milestone(s)`.
pub(crate) fn delete_blocked_message(type_name: &str, blocking: &[&str]) -> String {
    let related = blocking
        .iter()
        .map(|name| format!("{name}(s)"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{type_name} cannot be deleted because it has related {related}")
}
