//! Instance validation engine
//!
//! Validates one resource tree against the structural contracts it declares in
//! `meta.profile` (or its base definition when it declares none):
//! - Element cardinality
//! - Fixed values and patterns
//! - Required bindings and coding systems (through the support chain)
//! - Bundle entries, recursively
//!
//! Sliced elements are not evaluated individually. The engine caches an element
//! index per contract, so it needs `&mut self`; the orchestrator serializes
//! access to it.

use crate::error::SnapshotError;
use crate::outcome::{IssueCode, ValidationIssue};
use crate::support::{CodeValidation, SupportChain, BASE_PREFIX};
use erx_models::{BindingStrength, ElementDefinition, StructureDefinition, StructureDefinitionKind};
use erx_profiles::{canonical, catalog::resource_type_hint};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot elements by parent path, slices excluded
struct ElementIndex {
    sd: Arc<StructureDefinition>,
    children: HashMap<String, Vec<usize>>,
}

impl ElementIndex {
    fn new(sd: Arc<StructureDefinition>) -> Self {
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, element) in sd.snapshot_elements().iter().enumerate() {
            if element.is_slice() {
                continue;
            }
            if let Some(parent) = element.parent_path() {
                children.entry(parent).or_default().push(i);
            }
        }
        Self { sd, children }
    }

    fn root(&self) -> Option<&ElementDefinition> {
        self.sd.snapshot_elements().first()
    }

    fn children_of<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a ElementDefinition> + 'a {
        let elements = self.sd.snapshot_elements();
        self.children
            .get(path)
            .into_iter()
            .flatten()
            .filter_map(move |&i| elements.get(i))
    }

    fn has_children(&self, path: &str) -> bool {
        self.children.contains_key(path)
    }
}

/// The entry resources of a bundle with their entry index
pub fn entry_resources(bundle: &Value) -> Vec<(usize, &Value)> {
    let entries: Vec<&Value> = match bundle.get("entry") {
        Some(Value::Array(entries)) => entries.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| entry.get("resource").filter(|r| r.is_object()).map(|r| (i, r)))
        .collect()
}

pub struct InstanceValidator {
    chain: Arc<SupportChain>,
    indices: HashMap<String, Arc<ElementIndex>>,
}

impl InstanceValidator {
    pub fn new(chain: Arc<SupportChain>) -> Self {
        Self {
            chain,
            indices: HashMap::new(),
        }
    }

    pub fn chain(&self) -> &Arc<SupportChain> {
        &self.chain
    }

    /// Number of contracts with a cached element index
    pub fn cached_contracts(&self) -> usize {
        self.indices.len()
    }

    /// Drop all cached state
    pub fn reset(&mut self) {
        self.indices.clear();
    }

    /// Validate a resource. With `recurse_entries`, entries of a Bundle are
    /// validated too and reported below `Bundle.entry[i].resource`.
    pub fn validate(&mut self, resource: &Value, recurse_entries: bool) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.validate_resource(resource, recurse_entries, &mut issues);
        issues
    }

    fn validate_resource(
        &mut self,
        resource: &Value,
        recurse_entries: bool,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let Some(resource_type) = erx_format::resource_type(resource) else {
            issues.push(ValidationIssue::error(
                IssueCode::Structure,
                "Resource has no resourceType".to_string(),
            ));
            return;
        };

        let base_url = format!("{}{}", BASE_PREFIX, resource_type);
        let base = match self.chain.fetch_structure_definition(&base_url) {
            Some(sd) if sd.kind == StructureDefinitionKind::Resource => sd,
            _ => {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::Invalid,
                        format!("Unknown resource type '{}'", resource_type),
                    )
                    .at(resource_type),
                );
                return;
            }
        };

        let profiles = canonical::declared_profiles(resource);
        if profiles.is_empty() {
            self.validate_against(resource, resource_type, &base_url, &base, issues);
        } else {
            for url in profiles {
                self.validate_profile(resource, resource_type, url, issues);
            }
        }

        if recurse_entries && resource_type == "Bundle" {
            self.validate_entries(resource, issues);
        }
    }

    fn validate_entries(&mut self, bundle: &Value, issues: &mut Vec<ValidationIssue>) {
        for (i, resource) in entry_resources(bundle) {
            let prefix = format!("Bundle.entry[{}].resource", i);
            let mut nested = Vec::new();
            self.validate_resource(resource, true, &mut nested);
            issues.extend(nested.into_iter().map(|issue| issue.nested_under(&prefix)));
        }
    }

    fn validate_profile(
        &mut self,
        resource: &Value,
        resource_type: &str,
        url: &str,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let location = format!("{}.meta.profile", resource_type);
        let mismatch = |expected: &str| {
            ValidationIssue::error(
                IssueCode::Invalid,
                format!(
                    "Profile '{}' is for type '{}' but resourceType is '{}'",
                    url, expected, resource_type
                ),
            )
            .at(&location)
        };

        if let Some(expected) = resource_type_hint(url).filter(|t| *t != resource_type) {
            issues.push(mismatch(expected));
            return;
        }

        let Some(sd) = self.chain.fetch_structure_definition(url) else {
            issues.push(
                ValidationIssue::error(
                    IssueCode::NotFound,
                    format!("Profile StructureDefinition not found: '{}'", url),
                )
                .at(&location),
            );
            return;
        };

        if sd.type_ != resource_type {
            issues.push(mismatch(&sd.type_));
            return;
        }

        self.validate_against(resource, resource_type, url, &sd, issues);
    }

    fn validate_against(
        &mut self,
        resource: &Value,
        resource_type: &str,
        url: &str,
        sd: &Arc<StructureDefinition>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let index = match self.index_for(sd) {
            Ok(index) => index,
            Err(e) => {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::Processing,
                        format!("Unable to generate snapshot for '{}': {}", url, e),
                    )
                    .at(&format!("{}.meta.profile", resource_type)),
                );
                return;
            }
        };

        let Some(root) = index.root() else {
            return;
        };
        self.walk(resource, &root.path, resource_type, &index, issues);
    }

    fn index_for(&mut self, sd: &Arc<StructureDefinition>) -> Result<Arc<ElementIndex>, SnapshotError> {
        let key = sd.versioned_url();
        if let Some(hit) = self.indices.get(&key) {
            return Ok(Arc::clone(hit));
        }
        let index = Arc::new(ElementIndex::new(self.chain.snapshot(sd)?));
        self.indices.insert(key, Arc::clone(&index));
        Ok(index)
    }

    fn walk(
        &self,
        value: &Value,
        path: &str,
        location: &str,
        index: &ElementIndex,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let Some(obj) = value.as_object() else {
            return;
        };

        for child in index.children_of(path) {
            let name = child.name();
            let (key, child_value) = if child.is_choice_type() {
                match choice_entry(obj, name) {
                    Some((key, value)) => (key, Some(value)),
                    None => (name, None),
                }
            } else {
                (name, obj.get(name))
            };

            let child_location = format!("{}.{}", location, key);
            let count = match child_value {
                None | Some(Value::Null) => 0,
                Some(Value::Array(items)) => items.len(),
                Some(_) => 1,
            };
            validate_cardinality(count, key, &child_location, child, issues);

            let items: Vec<(String, &Value)> = match child_value {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (format!("{}[{}]", child_location, i), item))
                    .collect(),
                Some(single) => vec![(child_location.clone(), single)],
            };

            for (item_location, item) in &items {
                if let Some((_, fixed)) = child.fixed_value() {
                    if !fixed_matches(item, fixed) {
                        issues.push(
                            ValidationIssue::error(
                                IssueCode::Value,
                                format!("Element '{}' must have fixed value {}", key, render(fixed)),
                            )
                            .at(item_location),
                        );
                    }
                }

                if let Some((_, pattern)) = child.pattern_value() {
                    if !matches_pattern(item, pattern) {
                        issues.push(
                            ValidationIssue::error(
                                IssueCode::Value,
                                format!("Element '{}' does not match required pattern", key),
                            )
                            .at(item_location),
                        );
                    }
                }

                let descends = index.has_children(&child.path);
                self.check_terminology(item, child, descends, item_location, issues);

                if item.is_object() {
                    self.walk(item, &child.path, item_location, index, issues);
                }
            }
        }
    }

    fn check_terminology(
        &self,
        item: &Value,
        element: &ElementDefinition,
        descends: bool,
        location: &str,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let required = element
            .binding
            .as_ref()
            .filter(|b| b.strength == BindingStrength::Required)
            .and_then(|b| b.value_set.as_deref());

        match required {
            Some(value_set) => {
                let codes = coded_values(item, true);
                if codes.is_empty() {
                    return;
                }
                let results: Vec<CodeValidation> = codes
                    .iter()
                    .map(|(system, code)| self.chain.validate_code(*system, code, Some(value_set)))
                    .collect();
                if results.iter().any(CodeValidation::is_valid) {
                    return;
                }
                let worst = results
                    .iter()
                    .find(|r| matches!(r, CodeValidation::Invalid { .. }))
                    .or_else(|| results.iter().find(|r| matches!(r, CodeValidation::Unchecked { .. })))
                    .or_else(|| results.first());
                if let Some(result) = worst {
                    report(result, true, location, issues);
                }
            }
            None => {
                // Codings below a CodeableConcept are visited on their own when
                // the contract defines them
                let direct_only = descends && item.get("coding").is_some();
                if direct_only {
                    return;
                }
                for (system, code) in coded_values(item, false) {
                    let Some(system) = system else {
                        continue;
                    };
                    let result = self.chain.validate_code(Some(system), code, None);
                    report(&result, false, location, issues);
                }
            }
        }
    }
}

fn report(result: &CodeValidation, bound: bool, location: &str, issues: &mut Vec<ValidationIssue>) {
    let issue = match result {
        CodeValidation::Valid => return,
        CodeValidation::Invalid { message } => {
            ValidationIssue::error(IssueCode::CodeInvalid, message.clone())
        }
        CodeValidation::Unchecked { message } => {
            ValidationIssue::information(IssueCode::Informational, message.clone())
        }
        CodeValidation::Unresolvable { message } if bound => {
            ValidationIssue::warning(IssueCode::NotFound, message.clone())
        }
        CodeValidation::Unresolvable { .. } => return,
    };
    issues.push(issue.at(location));
}

/// `(system, code)` pairs of a code, Coding or CodeableConcept value. Plain
/// strings count only when `include_plain` is set.
fn coded_values(item: &Value, include_plain: bool) -> Vec<(Option<&str>, &str)> {
    fn coding(value: &Value) -> Option<(Option<&str>, &str)> {
        let code = value.get("code").and_then(Value::as_str)?;
        Some((value.get("system").and_then(Value::as_str), code))
    }

    match item {
        Value::String(code) if include_plain => vec![(None, code.as_str())],
        Value::Object(obj) => match obj.get("coding") {
            Some(Value::Array(codings)) => codings.iter().filter_map(coding).collect(),
            Some(single @ Value::Object(_)) => coding(single).into_iter().collect(),
            _ => coding(item).into_iter().collect(),
        },
        _ => Vec::new(),
    }
}

/// The `valueXxx` entry of a choice element named `value`
fn choice_entry<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<(&'a str, &'a Value)> {
    obj.iter()
        .find(|(k, _)| {
            k.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
        })
        .map(|(k, v)| (k.as_str(), v))
}

fn validate_cardinality(
    count: usize,
    name: &str,
    location: &str,
    element: &ElementDefinition,
    issues: &mut Vec<ValidationIssue>,
) {
    let min = element.min.unwrap_or(0) as usize;
    let message = || {
        format!(
            "Element '{}' has cardinality {}, but found {} occurrence(s)",
            name,
            element.cardinality_string(),
            count
        )
    };

    if count < min {
        issues.push(ValidationIssue::error(IssueCode::Required, message()).at(location));
    }
    if let Some(max) = element.max_cardinality() {
        if count > max as usize {
            issues.push(ValidationIssue::error(IssueCode::Structure, message()).at(location));
        }
    }
}

/// Text of a primitive; XML-derived trees carry numbers and booleans as strings
fn primitive_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn render(value: &Value) -> String {
    primitive_text(value).unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default())
}

fn primitives_equal(a: &Value, b: &Value) -> bool {
    match (primitive_text(a), primitive_text(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Exact match; single values and one-element arrays are interchangeable
fn fixed_matches(value: &Value, fixed: &Value) -> bool {
    match (value, fixed) {
        (Value::Object(v), Value::Object(f)) => {
            v.len() == f.len()
                && f.iter()
                    .all(|(k, fv)| v.get(k).is_some_and(|vv| fixed_matches(vv, fv)))
        }
        (Value::Array(v), Value::Array(f)) => {
            v.len() == f.len() && v.iter().zip(f).all(|(vv, fv)| fixed_matches(vv, fv))
        }
        (Value::Array(v), f) if v.len() == 1 => v.first().is_some_and(|vv| fixed_matches(vv, f)),
        (v, Value::Array(f)) if f.len() == 1 => f.first().is_some_and(|fv| fixed_matches(v, fv)),
        _ => primitives_equal(value, fixed),
    }
}

/// Containment: every pattern property must be matched, every pattern array
/// item must be matched by some value item
fn matches_pattern(value: &Value, pattern: &Value) -> bool {
    match (value, pattern) {
        (Value::Object(v), Value::Object(p)) => p
            .iter()
            .all(|(k, pv)| v.get(k).is_some_and(|vv| matches_pattern(vv, pv))),
        (_, Value::Array(p)) => {
            let values: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                single => vec![single],
            };
            p.iter()
                .all(|pv| values.iter().any(|vv| matches_pattern(vv, pv)))
        }
        (Value::Array(v), p) => v.iter().any(|vv| matches_pattern(vv, p)),
        _ => primitives_equal(value, pattern),
    }
}
