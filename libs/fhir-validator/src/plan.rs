use crate::config::ValidatorKind;
use crate::mode::ValidatorMode;
use erx_profiles::VersionedProfile;
use regex::Regex;

/// Compiled configuration: resolved profiles and compiled message filters
#[derive(Debug, Clone)]
pub struct ValidationPlan {
    pub kind: ValidatorKind,
    pub mode: ValidatorMode,
    pub max_issues: usize,
    /// In configuration order; this is the order stores are consulted in
    pub profiles: Vec<ProfilePlan>,
    pub unchecked_code_systems: Vec<String>,
    pub message_filters: Vec<Regex>,
}

#[derive(Debug, Clone)]
pub struct ProfilePlan {
    pub profile: VersionedProfile,
    pub files: Vec<String>,
}

impl ValidationPlan {
    /// Does any message filter match the diagnostics?
    pub fn is_ignored(&self, diagnostics: &str) -> bool {
        self.message_filters.iter().any(|re| re.is_match(diagnostics))
    }
}

impl Default for ValidationPlan {
    fn default() -> Self {
        Self {
            kind: ValidatorKind::Profile,
            mode: ValidatorMode::Normal,
            max_issues: crate::config::DEFAULT_MAX_ISSUES,
            profiles: Vec::new(),
            unchecked_code_systems: Vec::new(),
            message_filters: Vec::new(),
        }
    }
}
