use super::{CodeValidation, SupportChain, ValidationSupport};
use erx_profiles::canonical;

/// Accepts every code of the configured systems with an informational note.
///
/// Placed last in the chain, so it only answers when no CodeSystem or ValueSet
/// content could decide.
#[derive(Debug, Default)]
pub struct UncheckedCodeSystemSupport {
    systems: Vec<String>,
}

impl UncheckedCodeSystemSupport {
    pub fn new<I, S>(systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            systems: systems
                .into_iter()
                .map(|s| {
                    let system: String = s.into();
                    canonical::unversioned(&system).to_string()
                })
                .collect(),
        }
    }

    pub fn is_unchecked(&self, system: &str) -> bool {
        canonical::matches_any(&self.systems, system)
    }
}

impl ValidationSupport for UncheckedCodeSystemSupport {
    fn name(&self) -> String {
        "unchecked code systems".to_string()
    }

    fn is_code_system_supported(&self, url: &str) -> bool {
        self.is_unchecked(url)
    }

    fn validate_code(
        &self,
        _chain: &SupportChain,
        system: Option<&str>,
        code: &str,
        _value_set: Option<&str>,
    ) -> Option<CodeValidation> {
        let system = system.filter(|s| self.is_unchecked(s))?;
        tracing::trace!(system, code, "Code of unchecked code system accepted");
        Some(CodeValidation::Unchecked {
            message: format!(
                "Code system '{}' is not validated, code '{}' accepted without check",
                system, code
            ),
        })
    }
}
