//! Code validation against CodeSystems and ValueSets the chain can resolve
//!
//! Answers only when membership can be decided from enumerated content:
//! expansions, explicit concept lists and complete CodeSystems. Filters and
//! unresolvable includes leave the question to later members.

use super::{CodeValidation, SupportChain, ValidationSupport};
use erx_models::{ValueSet, ValueSetInclude};
use erx_profiles::canonical;

/// Nesting limit for value sets importing other value sets
const MAX_IMPORT_DEPTH: usize = 8;

#[derive(Debug, Default)]
pub struct InMemoryTerminologySupport;

impl InMemoryTerminologySupport {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationSupport for InMemoryTerminologySupport {
    fn name(&self) -> String {
        "in-memory terminology".to_string()
    }

    fn validate_code(
        &self,
        chain: &SupportChain,
        system: Option<&str>,
        code: &str,
        value_set: Option<&str>,
    ) -> Option<CodeValidation> {
        if let Some(vs_url) = value_set {
            let vs = chain.fetch_value_set(vs_url)?;
            let member = value_set_contains(chain, &vs, system, code, 0)?;
            return Some(if member {
                CodeValidation::Valid
            } else {
                CodeValidation::Invalid {
                    message: match system {
                        Some(system) => format!(
                            "Code '{}' from system '{}' is not in value set '{}'",
                            code, system, vs_url
                        ),
                        None => format!("Code '{}' is not in value set '{}'", code, vs_url),
                    },
                }
            });
        }

        let system = system?;
        let cs = chain.fetch_code_system(system)?;
        if !cs.is_enumerated() {
            return None;
        }
        Some(if cs.contains_code(code) {
            CodeValidation::Valid
        } else {
            CodeValidation::Invalid {
                message: format!("Unknown code '{}' in code system '{}'", code, system),
            }
        })
    }
}

/// `Some(membership)` when decidable
fn value_set_contains(
    chain: &SupportChain,
    vs: &ValueSet,
    system: Option<&str>,
    code: &str,
    depth: usize,
) -> Option<bool> {
    if depth > MAX_IMPORT_DEPTH {
        tracing::debug!(url = %vs.url, "Value set import depth exceeded");
        return None;
    }
    if vs.expansion_contains(system, code) {
        return Some(true);
    }
    if vs.compose.is_none() {
        return vs.expansion.as_ref().map(|_| false);
    }

    for exclude in vs.excludes() {
        if include_contains(chain, exclude, system, code, depth) == Some(true) {
            return Some(false);
        }
    }

    let mut undecided = false;
    for include in vs.includes() {
        match include_contains(chain, include, system, code, depth) {
            Some(true) => return Some(true),
            Some(false) => {}
            None => undecided = true,
        }
    }
    if undecided {
        None
    } else {
        Some(false)
    }
}

fn include_contains(
    chain: &SupportChain,
    include: &ValueSetInclude,
    system: Option<&str>,
    code: &str,
    depth: usize,
) -> Option<bool> {
    if let (Some(wanted), Some(included)) = (system, include.system.as_deref()) {
        if canonical::unversioned(wanted) != canonical::unversioned(included) {
            return Some(false);
        }
    }

    if !include.concept.is_empty() {
        return Some(include.lists_code(code));
    }
    if !include.filter.is_empty() {
        return None;
    }

    for imported in &include.value_set {
        let vs = chain.fetch_value_set(imported)?;
        if value_set_contains(chain, &vs, system, code, depth + 1)? {
            return Some(true);
        }
    }
    if !include.value_set.is_empty() && include.system.is_none() {
        return Some(false);
    }

    let cs = chain.fetch_code_system(include.system.as_deref()?)?;
    if cs.is_enumerated() {
        Some(cs.contains_code(code))
    } else {
        None
    }
}
