//! Property-based tests using QuickCheck

use erx_validator::{IssueSeverity, ProfileValidator, ValidationPlan};
use quickcheck::{QuickCheck, TestResult};

fn empty_validator() -> ProfileValidator {
    ProfileValidator::with_stores(ValidationPlan::default(), Vec::new())
}

/// Property: arbitrary bytes never escape as a panic and never validate
#[test]
fn prop_malformed_bytes_fail_validation() {
    fn prop(bytes: Vec<u8>) -> TestResult {
        let outcome = empty_validator().validate_bytes(&bytes);
        TestResult::from_bool(
            !outcome.valid
                && outcome
                    .issues
                    .iter()
                    .any(|i| i.severity == IssueSeverity::Error),
        )
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(Vec<u8>) -> TestResult);
}

/// Property: validating the same text twice gives the same outcome
#[test]
fn prop_validation_is_deterministic() {
    fn prop(text: String) -> bool {
        let validator = empty_validator();
        validator.validate(&text) == validator.validate(&text)
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(String) -> bool);
}
