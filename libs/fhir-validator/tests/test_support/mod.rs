#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::NaiveDate;
use erx_context::FileSystemLoader;
use erx_validator::{ProfileConfig, ProfileValidator, ValidationPlan, ValidatorConfig, ValidatorConfigBuilder};

static TRACING: OnceLock<()> = OnceLock::new();

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn fixtures_loader() -> FileSystemLoader {
    FileSystemLoader::new(fixtures_dir())
}

pub fn instance(name: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join("instances").join(name))
        .unwrap_or_else(|e| panic!("fixture {} unreadable: {}", name, e))
}

pub const WORKFLOW: &str = "de.gematik.erezept-workflow.r4";
pub const TASK: &str = "https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Task";
pub const FLOW_TYPE: &str = "https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_FlowType";
pub const PZN: &str = "http://fhir.de/CodeSystem/ifa/pzn";

pub const ERP_14_FILES: &[&str] = &[
    "erp-1.4/StructureDefinition-GEM_ERP_PR_Task.json",
    "erp-1.4/CodeSystem-GEM_ERP_CS_FlowType.xml",
    "erp-1.4/ValueSet-GEM_ERP_VS_FlowType.json",
];

pub const ERP_13_FILES: &[&str] = &["erp-1.3/StructureDefinition-GEM_ERP_PR_Task.json"];

pub fn workflow_14() -> ProfileConfig {
    ProfileConfig::new(WORKFLOW, Some("1.4.0")).with_files(ERP_14_FILES.iter().copied())
}

pub fn workflow_13() -> ProfileConfig {
    ProfileConfig::new(WORKFLOW, Some("1.3.0")).with_files(ERP_13_FILES.iter().copied())
}

/// A configuration with the 1.4 workflow profile and PZN left unchecked
pub fn base_config() -> ValidatorConfigBuilder {
    ValidatorConfig::builder()
        .profile(workflow_14())
        .unchecked_code_system(PZN)
}

pub fn compile(config: &ValidatorConfig) -> ValidationPlan {
    let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    config.compile_on(day).expect("configuration compiles")
}

pub fn validator(config: ValidatorConfig) -> ProfileValidator {
    init_tracing();
    ProfileValidator::new(compile(&config), &fixtures_loader()).expect("stores load")
}
