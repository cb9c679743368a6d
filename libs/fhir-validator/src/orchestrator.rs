//! Validation orchestrator
//!
//! Owns one resource store per configured versioned profile, the support chain
//! assembled over them and the instance engine. Every validation call returns
//! an outcome; failures inside the call become a single ERROR issue.

use crate::config::ValidatorKind;
use crate::engine::{entry_resources, InstanceValidator};
use crate::error::{ConfigError, ValidatorError};
use crate::extractor;
use crate::outcome::{ValidationIssue, ValidationOutcome};
use crate::plan::ValidationPlan;
use crate::support::SupportChain;
use erx_context::{PayloadLoader, ProfileResourceStore};
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// Anything that turns documents into validation outcomes
pub trait ResourceValidator: Send + Sync {
    fn validate(&self, content: &str) -> ValidationOutcome;

    fn validate_value(&self, resource: &Value) -> ValidationOutcome;

    fn is_valid(&self, content: &str) -> bool {
        self.validate(content).valid
    }
}

/// Build the validator the plan asks for
pub fn build_validator(
    plan: ValidationPlan,
    loader: &dyn PayloadLoader,
) -> Result<Box<dyn ResourceValidator>, ConfigError> {
    match plan.kind {
        ValidatorKind::Profile => Ok(Box::new(ProfileValidator::new(plan, loader)?)),
        ValidatorKind::None => Ok(Box::new(AcceptAllValidator)),
    }
}

/// Accepts every document without looking at it
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllValidator;

impl ResourceValidator for AcceptAllValidator {
    fn validate(&self, _content: &str) -> ValidationOutcome {
        ValidationOutcome::success(None)
    }

    fn validate_value(&self, _resource: &Value) -> ValidationOutcome {
        ValidationOutcome::success(None)
    }
}

pub struct ProfileValidator {
    plan: ValidationPlan,
    stores: Vec<Arc<ProfileResourceStore>>,
    chain: Arc<SupportChain>,
    engine: Mutex<InstanceValidator>,
}

impl ProfileValidator {
    /// Load one store per configured profile and assemble the chain
    pub fn new(plan: ValidationPlan, loader: &dyn PayloadLoader) -> Result<Self, ConfigError> {
        let stores = plan
            .profiles
            .iter()
            .map(|p| {
                ProfileResourceStore::load(p.profile, &p.files, loader)
                    .map(Arc::new)
                    .map_err(|source| ConfigError::Store {
                        profile: p.profile.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_stores(plan, stores))
    }

    /// Use already built stores, consulted in the given order
    pub fn with_stores(plan: ValidationPlan, stores: Vec<Arc<ProfileResourceStore>>) -> Self {
        let chain = SupportChain::assemble(&stores, &plan.unchecked_code_systems);
        Self::with_chain(plan, stores, chain)
    }

    /// Use a custom support chain. `stores` are only reported, the chain is
    /// what validation consults.
    pub fn with_chain(
        plan: ValidationPlan,
        stores: Vec<Arc<ProfileResourceStore>>,
        chain: SupportChain,
    ) -> Self {
        tracing::debug!(
            profiles = ?stores.iter().map(|s| s.profile().to_string()).collect::<Vec<_>>(),
            chain = ?chain.names(),
            mode = %plan.mode,
            "Assembled profile validator"
        );
        let chain = Arc::new(chain);
        Self {
            plan,
            stores,
            engine: Mutex::new(InstanceValidator::new(Arc::clone(&chain))),
            chain,
        }
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }

    pub fn stores(&self) -> &[Arc<ProfileResourceStore>] {
        &self.stores
    }

    pub fn chain(&self) -> &Arc<SupportChain> {
        &self.chain
    }

    pub fn validate(&self, content: &str) -> ValidationOutcome {
        match erx_format::parse_resource(content) {
            Ok(resource) => self.validate_value(&resource),
            Err(e) => {
                let error = ValidatorError::from(e);
                tracing::warn!(error = %error, "Unable to decode content for validation");
                ValidationOutcome::failure(None, error.to_string())
            }
        }
    }

    pub fn validate_bytes(&self, bytes: &[u8]) -> ValidationOutcome {
        match erx_format::decode_bytes(bytes) {
            Ok(content) => self.validate(&content),
            Err(e) => ValidationOutcome::failure(None, ValidatorError::from(e).to_string()),
        }
    }

    pub fn validate_value(&self, resource: &Value) -> ValidationOutcome {
        let resource_type = erx_format::resource_type(resource).map(str::to_string);
        let profile = extractor::extract_profile_from_value(resource);
        tracing::debug!(
            resource_type = resource_type.as_deref().unwrap_or("<none>"),
            profile = profile.as_deref().unwrap_or("<none>"),
            "Validating resource"
        );

        let issues = if extractor::is_unprofiled_searchset_value(resource) {
            self.run_engine(|engine| {
                let mut issues = engine.validate(resource, false);
                for (i, entry) in entry_resources(resource) {
                    let prefix = format!("Bundle.entry[{}].resource", i);
                    issues.extend(
                        engine
                            .validate(entry, true)
                            .into_iter()
                            .map(|issue| issue.nested_under(&prefix)),
                    );
                }
                issues
            })
        } else {
            self.run_engine(|engine| engine.validate(resource, true))
        };

        match issues {
            Ok(issues) => self.finish(resource_type, issues),
            Err(e) => {
                tracing::error!(error = %e, "Validation failed");
                ValidationOutcome::failure(resource_type, e.to_string())
            }
        }
    }

    pub fn is_valid(&self, content: &str) -> bool {
        self.validate(content).valid
    }

    /// Run `f` on the engine under the lock. Panics are caught and reset the
    /// engine state.
    fn run_engine<F>(&self, f: F) -> Result<Vec<ValidationIssue>, ValidatorError>
    where
        F: FnOnce(&mut InstanceValidator) -> Vec<ValidationIssue>,
    {
        let mut engine = match self.engine.lock() {
            Ok(engine) => engine,
            Err(poisoned) => {
                let mut engine = poisoned.into_inner();
                engine.reset();
                self.engine.clear_poison();
                tracing::error!("Validation engine lock was poisoned, engine state reset");
                return Err(ValidatorError::LockPoisoned);
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| f(&mut *engine))) {
            Ok(issues) => Ok(issues),
            Err(payload) => {
                engine.reset();
                Err(ValidatorError::Panic(panic_message(payload.as_ref())))
            }
        }
    }

    fn finish(&self, resource_type: Option<String>, mut issues: Vec<ValidationIssue>) -> ValidationOutcome {
        self.plan.mode.apply(&mut issues);
        issues.retain(|issue| !self.plan.is_ignored(&issue.diagnostics));

        // validity is decided before the cap; the cap keeps the most severe issues
        let valid = !issues.iter().any(ValidationIssue::is_error);
        if issues.len() > self.plan.max_issues {
            tracing::debug!(
                reported = issues.len(),
                max_issues = self.plan.max_issues,
                "Truncating validation issues"
            );
            issues.sort_by(|a, b| b.severity.cmp(&a.severity));
            issues.truncate(self.plan.max_issues);
        }

        let outcome = ValidationOutcome {
            resource_type,
            valid,
            issues,
        };
        tracing::debug!(
            valid = outcome.valid,
            errors = outcome.error_count(),
            warnings = outcome.warning_count(),
            "Validation finished"
        );
        outcome
    }
}

impl ResourceValidator for ProfileValidator {
    fn validate(&self, content: &str) -> ValidationOutcome {
        ProfileValidator::validate(self, content)
    }

    fn validate_value(&self, resource: &Value) -> ValidationOutcome {
        ProfileValidator::validate_value(self, resource)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
