//! Validator configuration
//!
//! Configuration is plain data (YAML or builder). [`ValidatorConfig::compile`]
//! resolves profile names and versions and compiles message filters into a
//! [`ValidationPlan`]; every configuration defect surfaces there.

use crate::error::ConfigError;
use crate::mode::ValidatorMode;
use crate::plan::{ProfilePlan, ValidationPlan};
use chrono::{Local, NaiveDate};
use erx_profiles::VersionedProfile;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_MAX_ISSUES: usize = 1000;

/// Which validator to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// Validate against the configured profile stores
    #[default]
    Profile,
    /// Accept every document without looking at it
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    /// Family short name, e.g. `de.gematik.erezept-workflow.r4`
    pub name: String,
    /// Omitted: the version valid today. `1.4` may be written unquoted.
    #[serde(
        default,
        deserialize_with = "erx_models::serde_helpers::opt_string_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    /// Source payload locations, resolved by the payload loader
    #[serde(default)]
    pub files: Vec<String>,
}

impl ProfileConfig {
    pub fn new(name: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            name: name.into(),
            version: version.map(str::to_string),
            files: Vec::new(),
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub kind: ValidatorKind,
    #[serde(default)]
    pub mode: ValidatorMode,
    #[serde(default = "default_max_issues")]
    pub max_issues: usize,
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
    /// Code systems accepted without checking codes
    #[serde(default)]
    pub unchecked_code_systems: Vec<String>,
    /// Regular expressions; matching issues are dropped
    #[serde(default)]
    pub ignored_messages: Vec<String>,
}

fn default_max_issues() -> usize {
    DEFAULT_MAX_ISSUES
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            kind: ValidatorKind::Profile,
            mode: ValidatorMode::Normal,
            max_issues: DEFAULT_MAX_ISSUES,
            profiles: Vec::new(),
            unchecked_code_systems: Vec::new(),
            ignored_messages: Vec::new(),
        }
    }
}

impl ValidatorConfig {
    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::default()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Compile against today's date
    pub fn compile(&self) -> Result<ValidationPlan, ConfigError> {
        self.compile_on(Local::now().date_naive())
    }

    /// Compile, choosing default versions valid on `date`
    pub fn compile_on(&self, date: NaiveDate) -> Result<ValidationPlan, ConfigError> {
        if self.max_issues == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_issues must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(self.profiles.len());
        for cfg in &self.profiles {
            let profile = VersionedProfile::resolve(&cfg.name, cfg.version.as_deref(), date)?;
            if !seen.insert(profile) {
                return Err(ConfigError::DuplicateProfile(profile.to_string()));
            }
            profiles.push(ProfilePlan {
                profile,
                files: cfg.files.iter().map(|f| f.replace('\\', "/")).collect(),
            });
        }

        let message_filters = self
            .ignored_messages
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidFilter {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidationPlan {
            kind: self.kind,
            mode: self.mode,
            max_issues: self.max_issues,
            profiles,
            unchecked_code_systems: self.unchecked_code_systems.clone(),
            message_filters,
        })
    }
}

#[derive(Debug, Default)]
pub struct ValidatorConfigBuilder {
    config: ValidatorConfig,
}

impl ValidatorConfigBuilder {
    pub fn kind(mut self, kind: ValidatorKind) -> Self {
        self.config.kind = kind;
        self
    }

    pub fn mode(mut self, mode: ValidatorMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn max_issues(mut self, max: usize) -> Self {
        self.config.max_issues = max;
        self
    }

    pub fn profile(mut self, profile: ProfileConfig) -> Self {
        self.config.profiles.push(profile);
        self
    }

    pub fn unchecked_code_system(mut self, url: impl Into<String>) -> Self {
        self.config.unchecked_code_systems.push(url.into());
        self
    }

    pub fn ignore_message(mut self, pattern: impl Into<String>) -> Self {
        self.config.ignored_messages.push(pattern.into());
        self
    }

    pub fn build(self) -> ValidatorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erx_profiles::{ProfileError, ProfileFamily, ProfileVersion};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const YAML: &str = r#"
kind: profile
mode: strict
max_issues: 50
profiles:
  - name: de.gematik.erezept-workflow.r4
    version: 1.4.0
    files:
      - fhir\erp\StructureDefinition-GEM_ERP_PR_Task.json
  - name: kbv.ita.erp
  - name: kbv.ita.for
    version: 1.1
unchecked_code_systems:
  - http://fhir.de/CodeSystem/ifa/pzn
ignored_messages:
  - "^Unknown extension .*"
"#;

    #[test]
    fn test_yaml_compiles_to_plan() {
        let plan = ValidatorConfig::from_yaml(YAML)
            .unwrap()
            .compile_on(day(2024, 1, 1))
            .unwrap();

        assert_eq!(plan.mode, ValidatorMode::Strict);
        assert_eq!(plan.max_issues, 50);
        assert_eq!(plan.profiles.len(), 3);
        assert_eq!(plan.profiles[0].profile.family, ProfileFamily::ErpWorkflow);
        assert_eq!(plan.profiles[0].profile.version, ProfileVersion::new(1, 4, 0));
        assert_eq!(
            plan.profiles[0].files,
            vec!["fhir/erp/StructureDefinition-GEM_ERP_PR_Task.json"]
        );
        // default version on the compile date
        assert_eq!(plan.profiles[1].profile.version, ProfileVersion::new(1, 1, 0));
        assert_eq!(plan.profiles[2].profile.family, ProfileFamily::KbvItaFor);
        assert_eq!(plan.profiles[2].profile.version, ProfileVersion::new(1, 1, 0));
        assert!(plan.is_ignored("Unknown extension http://example.org"));
        assert!(!plan.is_ignored("Something else"));
    }

    #[test]
    fn test_defaults() {
        let cfg = ValidatorConfig::from_yaml("profiles: []").unwrap();
        assert_eq!(cfg.kind, ValidatorKind::Profile);
        assert_eq!(cfg.mode, ValidatorMode::Normal);
        assert_eq!(cfg.max_issues, DEFAULT_MAX_ISSUES);
    }

    #[test]
    fn test_configuration_errors() {
        let unknown = ValidatorConfig::builder()
            .profile(ProfileConfig::new("totally-unknown-namespace", None))
            .build();
        assert!(matches!(
            unknown.compile(),
            Err(ConfigError::Profile(ProfileError::UnknownProfile(_)))
        ));

        let bad_version = ValidatorConfig::builder()
            .profile(ProfileConfig::new("kbv.ita.for", Some("7.0.0")))
            .build();
        assert!(matches!(
            bad_version.compile(),
            Err(ConfigError::Profile(ProfileError::UnknownVersion { .. }))
        ));

        let bad_filter = ValidatorConfig::builder().ignore_message("(unclosed").build();
        assert!(matches!(
            bad_filter.compile(),
            Err(ConfigError::InvalidFilter { .. })
        ));

        let twice = ValidatorConfig::builder()
            .profile(ProfileConfig::new("kbv.ita.for", Some("1.1.0")))
            .profile(ProfileConfig::new("kbv.ita.for", Some("1.1")))
            .build();
        assert!(matches!(twice.compile(), Err(ConfigError::DuplicateProfile(_))));

        assert!(matches!(
            ValidatorConfig::from_yaml("mode: lenient"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_yaml_export() {
        let cfg = ValidatorConfig::builder()
            .mode(ValidatorMode::Pedantic)
            .profile(ProfileConfig::new("kbv.ita.erp", Some("1.1.0")).with_files(["a.json"]))
            .build();
        let yaml = cfg.to_yaml().unwrap();
        assert_eq!(ValidatorConfig::from_yaml(&yaml).unwrap(), cfg);
    }
}
