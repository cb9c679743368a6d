#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::OnceLock;

use erx_context::FileSystemLoader;
use erx_profiles::{ProfileFamily, ProfileVersion, VersionedProfile};

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

pub fn workflow(major: u16, minor: u16, patch: u16) -> VersionedProfile {
    VersionedProfile::new(
        ProfileFamily::ErpWorkflow,
        ProfileVersion::new(major, minor, patch),
    )
}

pub fn patient_billing(major: u16, minor: u16, patch: u16) -> VersionedProfile {
    VersionedProfile::new(
        ProfileFamily::PatientBilling,
        ProfileVersion::new(major, minor, patch),
    )
}

pub const ERP_FILES: &[&str] = &[
    "erp/StructureDefinition-GEM_ERP_PR_Task.json",
    "erp/CodeSystem-GEM_ERP_CS_FlowType.xml",
    "erp/ValueSet-GEM_ERP_VS_FlowType.json",
];

pub const TASK: &str = "https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Task";
pub const FLOW_TYPE: &str = "https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_FlowType";
pub const FLOW_TYPE_VS: &str = "https://gematik.de/fhir/erp/ValueSet/GEM_ERP_VS_FlowType";
pub const CHARGE_ITEM: &str =
    "https://gematik.de/fhir/erpchrg/StructureDefinition/GEM_ERPCHRG_PR_ChargeItem";
