//! Content profile extraction
//!
//! Finds the profile a document claims to conform to without decoding it into
//! a typed resource. Works on JSON and XML input alike.

use erx_models::BundleType;
use erx_profiles::canonical;
use serde_json::Value;

/// The container type of a document; `None` for non-bundles or unknown codes
pub fn container_type(resource: &Value) -> Option<BundleType> {
    if erx_format::resource_type(resource) != Some("Bundle") {
        return None;
    }
    match resource.get("type")? {
        Value::String(code) => BundleType::from_code(code),
        Value::Object(obj) => obj
            .get("value")
            .and_then(Value::as_str)
            .and_then(BundleType::from_code),
        _ => None,
    }
}

/// First declared root profile
fn root_profile(resource: &Value) -> Option<String> {
    canonical::declared_profiles(resource)
        .first()
        .map(|p| p.to_string())
}

/// First entry resource, in document order, declaring a profile
fn first_entry_profile(resource: &Value) -> Option<String> {
    let entries = match resource.get("entry")? {
        Value::Array(entries) => entries.iter().collect::<Vec<_>>(),
        single => vec![single],
    };
    entries
        .into_iter()
        .filter_map(|entry| entry.get("resource"))
        .find_map(root_profile)
}

/// The profile of an already decoded document.
///
/// Collections fall back to the profile of their first profiled entry when the
/// bundle itself declares none.
pub fn extract_profile_from_value(resource: &Value) -> Option<String> {
    let profile = match container_type(resource) {
        Some(BundleType::Collection) => {
            root_profile(resource).or_else(|| first_entry_profile(resource))
        }
        _ => root_profile(resource),
    };

    if profile.is_none() {
        tracing::debug!(
            resource_type = erx_format::resource_type(resource).unwrap_or("<none>"),
            "No profile found in content"
        );
    }
    profile
}

/// The profile of serialized content; decode failures yield `None`
pub fn extract_profile(content: &str) -> Option<String> {
    match erx_format::parse_resource(content) {
        Ok(resource) => extract_profile_from_value(&resource),
        Err(e) => {
            tracing::warn!(error = %e, "Unable to decode content for profile extraction");
            None
        }
    }
}

/// A searchset without a root profile. Such bundles legitimately mix entry
/// types and need per-entry validation.
pub fn is_unprofiled_searchset_value(resource: &Value) -> bool {
    container_type(resource) == Some(BundleType::Searchset) && root_profile(resource).is_none()
}

pub fn is_unprofiled_searchset(content: &str) -> bool {
    match erx_format::parse_resource(content) {
        Ok(resource) => is_unprofiled_searchset_value(&resource),
        Err(e) => {
            tracing::warn!(error = %e, "Unable to decode content for searchset detection");
            false
        }
    }
}
