//! Canonical URL matching.
//!
//! A canonical URL may carry a business version after a `|`. Matching always
//! ignores that suffix on the candidate side.

use serde_json::Value;

/// Separator between a canonical URL and its version
pub const VERSION_SEPARATOR: char = '|';

/// Split a canonical into its URL and optional version part
pub fn split(url: &str) -> (&str, Option<&str>) {
    match url.split_once(VERSION_SEPARATOR) {
        Some((base, version)) => (base, Some(version)),
        None => (url, None),
    }
}

/// The canonical without its version suffix
pub fn unversioned(url: &str) -> &str {
    split(url).0
}

/// The version suffix of a canonical, if any
pub fn version_of(url: &str) -> Option<&str> {
    split(url).1.filter(|v| !v.is_empty())
}

/// Append a version suffix
pub fn with_version(url: &str, version: &str) -> String {
    format!("{}{}{}", unversioned(url), VERSION_SEPARATOR, version)
}

/// Does `candidate` name the same artifact as `claim`, ignoring the version suffix?
pub fn matches(claim: &str, candidate: &str) -> bool {
    unversioned(candidate) == claim
}

/// True if any claim matches the candidate
pub fn matches_any<S: AsRef<str>>(claims: &[S], candidate: &str) -> bool {
    claims.iter().any(|claim| matches(claim.as_ref(), candidate))
}

/// Namespace test: does the unversioned candidate contain the claim?
pub fn within_namespace(claim: &str, candidate: &str) -> bool {
    unversioned(candidate).contains(claim)
}

/// Apply [`matches`] to an Identifier's `system`
pub fn matches_identifier(claim: &str, identifier: &Value) -> bool {
    identifier
        .get("system")
        .and_then(Value::as_str)
        .is_some_and(|system| matches(claim, system))
}

/// Apply [`matches`] to a Coding's `system`
pub fn matches_coding(claim: &str, coding: &Value) -> bool {
    matches_identifier(claim, coding)
}

/// Apply [`matches`] to every declared `meta.profile` of a resource
pub fn matches_profile(claim: &str, resource: &Value) -> bool {
    declared_profiles(resource)
        .into_iter()
        .any(|profile| matches(claim, profile))
}

/// The non-empty `meta.profile` values of a resource.
///
/// Accepts an array, a single string (XML-derived trees) or `{ "value": .. }` objects.
pub fn declared_profiles(resource: &Value) -> Vec<&str> {
    fn as_profile(value: &Value) -> Option<&str> {
        match value {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("value").and_then(Value::as_str),
            _ => None,
        }
    }

    let Some(profile) = resource.get("meta").and_then(|m| m.get("profile")) else {
        return Vec::new();
    };
    let profiles: Vec<&str> = match profile {
        Value::Array(items) => items.iter().filter_map(as_profile).collect(),
        other => as_profile(other).into_iter().collect(),
    };
    profiles.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
