//! Validation support chain
//!
//! The engine never talks to a store directly. It asks a [`SupportChain`], an
//! ordered list of [`ValidationSupport`] members where the first member that
//! answers wins:
//!
//! 1. one [`ProfileResourceStore`](erx_context::ProfileResourceStore) per
//!    configured profile, in configuration order
//! 2. [`DefaultProfileSupport`]: R4 base definitions
//! 3. [`InMemoryTerminologySupport`]: codes against resolvable CodeSystems and ValueSets
//! 4. [`SnapshotGeneratingSupport`]: differential to snapshot
//! 5. [`UncheckedCodeSystemSupport`]: allow-listed code systems

mod default;
mod snapshot;
mod store;
mod terminology;
mod unchecked;

pub use default::{is_base_resource_type, DefaultProfileSupport, BASE_PREFIX};
pub use snapshot::SnapshotGeneratingSupport;
pub use terminology::InMemoryTerminologySupport;
pub use unchecked::UncheckedCodeSystemSupport;

use crate::error::SnapshotError;
use erx_context::ProfileResourceStore;
use erx_models::{CodeSystem, StructureDefinition, ValueSet};
use std::fmt;
use std::sync::Arc;

/// Answer of a terminology check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeValidation {
    Valid,
    /// The code is not part of the system or value set
    Invalid { message: String },
    /// The system is deliberately not checked
    Unchecked { message: String },
    /// Nothing in the chain could decide
    Unresolvable { message: String },
}

impl CodeValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid { message }
            | Self::Unchecked { message }
            | Self::Unresolvable { message } => Some(message),
        }
    }
}

/// One member of the support chain. Every method has a "not answered" default.
pub trait ValidationSupport: Send + Sync {
    fn name(&self) -> String;

    fn fetch_structure_definition(&self, _url: &str) -> Option<Arc<StructureDefinition>> {
        None
    }

    fn fetch_code_system(&self, _url: &str) -> Option<Arc<CodeSystem>> {
        None
    }

    fn fetch_value_set(&self, _url: &str) -> Option<Arc<ValueSet>> {
        None
    }

    fn is_code_system_supported(&self, url: &str) -> bool {
        self.fetch_code_system(url).is_some()
    }

    /// Validate a code, optionally against a value set. `None` passes the
    /// question on to the next member.
    fn validate_code(
        &self,
        _chain: &SupportChain,
        _system: Option<&str>,
        _code: &str,
        _value_set: Option<&str>,
    ) -> Option<CodeValidation> {
        None
    }

    /// Derive a snapshot for a StructureDefinition that only has a differential
    fn generate_snapshot(
        &self,
        _chain: &SupportChain,
        _sd: &Arc<StructureDefinition>,
    ) -> Option<Result<Arc<StructureDefinition>, SnapshotError>> {
        None
    }
}

/// Ordered support members; the first answer wins
#[derive(Default, Clone)]
pub struct SupportChain {
    members: Vec<Arc<dyn ValidationSupport>>,
}

impl fmt::Debug for SupportChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl SupportChain {
    pub fn new(members: Vec<Arc<dyn ValidationSupport>>) -> Self {
        Self { members }
    }

    /// The standard chain: stores first, then the built-in members
    pub fn assemble(
        stores: &[Arc<ProfileResourceStore>],
        unchecked_code_systems: &[String],
    ) -> Self {
        let mut chain = Self::default();
        for store in stores {
            chain.push(store.clone());
        }
        chain.push(Arc::new(DefaultProfileSupport::new()));
        chain.push(Arc::new(InMemoryTerminologySupport::new()));
        chain.push(Arc::new(SnapshotGeneratingSupport::new()));
        chain.push(Arc::new(UncheckedCodeSystemSupport::new(
            unchecked_code_systems.iter().cloned(),
        )));
        chain
    }

    pub fn push(&mut self, member: Arc<dyn ValidationSupport>) {
        self.members.push(member);
    }

    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn fetch_structure_definition(&self, url: &str) -> Option<Arc<StructureDefinition>> {
        let found = self
            .members
            .iter()
            .find_map(|m| m.fetch_structure_definition(url));
        if found.is_none() {
            tracing::debug!(url, "No StructureDefinition in support chain");
        }
        found
    }

    pub fn fetch_code_system(&self, url: &str) -> Option<Arc<CodeSystem>> {
        self.members.iter().find_map(|m| m.fetch_code_system(url))
    }

    pub fn fetch_value_set(&self, url: &str) -> Option<Arc<ValueSet>> {
        self.members.iter().find_map(|m| m.fetch_value_set(url))
    }

    pub fn is_code_system_supported(&self, url: &str) -> bool {
        self.members.iter().any(|m| m.is_code_system_supported(url))
    }

    /// Always answers; falls back to [`CodeValidation::Unresolvable`]
    pub fn validate_code(
        &self,
        system: Option<&str>,
        code: &str,
        value_set: Option<&str>,
    ) -> CodeValidation {
        if let Some(answer) = self
            .members
            .iter()
            .find_map(|m| m.validate_code(self, system, code, value_set))
        {
            return answer;
        }

        let message = match (value_set, system) {
            (Some(vs), _) => format!("Unable to resolve value set '{}' to validate code '{}'", vs, code),
            (None, Some(system)) => {
                format!("Unable to validate code '{}' from unknown code system '{}'", code, system)
            }
            (None, None) => format!("Unable to validate code '{}' without a code system", code),
        };
        CodeValidation::Unresolvable { message }
    }

    /// The StructureDefinition itself when it carries a snapshot, otherwise
    /// the first generated one
    pub fn snapshot(
        &self,
        sd: &Arc<StructureDefinition>,
    ) -> Result<Arc<StructureDefinition>, SnapshotError> {
        if sd.has_snapshot() {
            return Ok(Arc::clone(sd));
        }
        self.members
            .iter()
            .find_map(|m| m.generate_snapshot(self, sd))
            .unwrap_or_else(|| Err(SnapshotError::NoGenerator(sd.versioned_url())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Option<CodeValidation>);

    impl ValidationSupport for Fixed {
        fn name(&self) -> String {
            self.0.to_string()
        }

        fn validate_code(
            &self,
            _chain: &SupportChain,
            _system: Option<&str>,
            _code: &str,
            _value_set: Option<&str>,
        ) -> Option<CodeValidation> {
            self.1.clone()
        }
    }

    #[test]
    fn test_first_answer_wins() {
        let chain = SupportChain::new(vec![
            Arc::new(Fixed("silent", None)),
            Arc::new(Fixed("first", Some(CodeValidation::Valid))),
            Arc::new(Fixed(
                "second",
                Some(CodeValidation::Invalid {
                    message: "nope".to_string(),
                }),
            )),
        ]);
        assert_eq!(chain.names(), vec!["silent", "first", "second"]);
        assert!(chain.validate_code(Some("urn:x"), "a", None).is_valid());
    }

    #[test]
    fn test_unanswered_is_unresolvable() {
        let chain = SupportChain::new(vec![Arc::new(Fixed("silent", None))]);
        let answer = chain.validate_code(None, "a", Some("http://example.org/ValueSet/x"));
        assert!(matches!(answer, CodeValidation::Unresolvable { .. }));
        assert!(answer.message().unwrap_or_default().contains("ValueSet/x"));
    }

    #[test]
    fn test_missing_generator() {
        let chain = SupportChain::default();
        let sd: StructureDefinition = serde_json::from_value(serde_json::json!({
            "url": "http://example.org/StructureDefinition/p",
            "kind": "resource",
            "type": "Task"
        }))
        .unwrap();
        assert!(matches!(
            chain.snapshot(&Arc::new(sd)),
            Err(SnapshotError::NoGenerator(_))
        ));
    }
}
