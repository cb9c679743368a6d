use erx_context::{
    Error, FileSystemLoader, InMemoryLoader, MatchPrecision, ProfileResourceStore, ResourceKind,
};
use erx_profiles::{ProfileFamily, VersionedProfile};

mod test_support;

use test_support::*;

fn erp_store(major: u16, minor: u16, patch: u16) -> ProfileResourceStore {
    init_tracing();
    ProfileResourceStore::load(workflow(major, minor, patch), ERP_FILES, &fixtures_loader())
        .expect("workflow store loads")
}

#[test]
fn loads_json_and_xml_payloads() {
    let store = erp_store(1, 4, 0);

    assert_eq!(store.count(ResourceKind::StructureDefinition), 1);
    assert_eq!(store.count(ResourceKind::CodeSystem), 1);
    assert_eq!(store.count(ResourceKind::ValueSet), 1);
    assert_eq!(store.count(ResourceKind::NamingSystem), 0);

    let cs = store.fetch_code_system(FLOW_TYPE).unwrap().resource;
    assert!(cs.contains_code("160"));
    assert!(!cs.contains_code("169"));

    let sd = store.fetch_structure_definition(TASK).unwrap().resource;
    assert_eq!(sd.type_, "Task");
    assert!(!sd.has_snapshot());
}

#[test]
fn exact_version_precedence() {
    let store = erp_store(1, 4, 0);

    let exact = store.fetch_structure_definition(&format!("{}|1.4.0", TASK)).unwrap();
    assert_eq!(exact.precision, MatchPrecision::ExactVersion);

    // the two-part form names the same version
    let cropped = store.fetch_structure_definition(&format!("{}|1.4", TASK)).unwrap();
    assert_eq!(cropped.precision, MatchPrecision::ExactVersion);

    // same URL under another version is never answered
    assert!(store.fetch_structure_definition(&format!("{}|1.1.1", TASK)).is_none());
    assert!(store.fetch_structure_definition(&format!("{}|1.3", TASK)).is_none());
}

#[test]
fn unversioned_requests_are_greedy() {
    let store = erp_store(1, 3, 0);

    let greedy = store.fetch_value_set(FLOW_TYPE_VS).unwrap();
    assert_eq!(greedy.precision, MatchPrecision::VersionAgnostic);
    assert!(store.is_value_set_supported(FLOW_TYPE_VS));
    assert!(store.is_code_system_supported(FLOW_TYPE));
    assert!(!store.is_code_system_supported(&format!("{}|1.4", FLOW_TYPE)));
}

#[test]
fn family_isolation() {
    init_tracing();
    let erp = erp_store(1, 4, 0);
    let chrg = ProfileResourceStore::load(
        patient_billing(1, 1, 0),
        &["chrg/StructureDefinition-GEM_ERPCHRG_PR_ChargeItem.json"],
        &fixtures_loader(),
    )
    .unwrap();

    assert!(chrg.fetch_structure_definition(CHARGE_ITEM).is_some());
    assert!(erp.fetch_structure_definition(CHARGE_ITEM).is_none());
    assert!(chrg.fetch_structure_definition(TASK).is_none());
    assert!(chrg.fetch(ResourceKind::CodeSystem, FLOW_TYPE).is_none());
}

#[test]
fn family_claim_wins_over_stored_payload() {
    init_tracing();
    // a payload stored under a foreign namespace is unreachable
    let loader = InMemoryLoader::new().with(
        "foreign.json",
        r#"{"resourceType":"CodeSystem","url":"https://gematik.de/fhir/erpchrg/CodeSystem/Foo","content":"complete"}"#,
    );
    let store =
        ProfileResourceStore::load(workflow(1, 4, 0), &["foreign.json"], &loader).unwrap();

    assert_eq!(store.count(ResourceKind::CodeSystem), 1);
    assert!(store
        .fetch_code_system("https://gematik.de/fhir/erpchrg/CodeSystem/Foo")
        .is_none());
}

#[test]
fn undecodable_payload_fails_construction() {
    init_tracing();
    let err = ProfileResourceStore::load(workflow(1, 4, 0), &["broken.json"], &fixtures_loader())
        .unwrap_err();
    assert!(matches!(err, Error::UndecodablePayload { .. }));

    let err = ProfileResourceStore::load(workflow(1, 4, 0), &["missing.json"], &fixtures_loader())
        .unwrap_err();
    assert!(matches!(err, Error::PayloadNotFound(_)));
}

#[test]
fn loads_from_temporary_directory() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("kbv")).unwrap();
    std::fs::write(
        dir.path().join("kbv").join("cs.json"),
        r#"{"resourceType":"CodeSystem","url":"https://fhir.kbv.de/CodeSystem/KBV_CS_ERP_Medication_Category","content":"complete","concept":[{"code":"00"},{"code":"01"}]}"#,
    )
    .unwrap();

    let profile = VersionedProfile::parse("kbv.ita.erp", "1.1.0").unwrap();
    assert_eq!(profile.family, ProfileFamily::KbvItaErp);

    let store =
        ProfileResourceStore::load(profile, &["kbv\\cs.json"], &FileSystemLoader::new(dir.path()))
            .unwrap();
    let cs = store
        .fetch_code_system("https://fhir.kbv.de/CodeSystem/KBV_CS_ERP_Medication_Category|1.1.0")
        .unwrap();
    assert_eq!(cs.precision, MatchPrecision::ExactVersion);
    assert_eq!(cs.resource.concept_count(), 2);
}

#[test]
fn conformance_resources_lists_everything() {
    let store = erp_store(1, 4, 0);
    let all = store.conformance_resources();

    assert_eq!(all.len(), store.len());
    assert_eq!(all[0].kind(), ResourceKind::StructureDefinition);
    assert_eq!(all[0].canonical_url(), TASK);
}
