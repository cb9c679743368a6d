use std::sync::Arc;

use erx_context::InMemoryLoader;
use erx_models::StructureDefinition;
use erx_validator::support::{
    DefaultProfileSupport, InMemoryTerminologySupport, SnapshotGeneratingSupport,
};
use erx_validator::{
    build_validator, extract_profile, is_unprofiled_searchset, ConfigError, IssueCode,
    IssueSeverity, ProfileConfig, ProfileValidator, ResourceValidator, SupportChain,
    ValidationOutcome, ValidationSupport, ValidatorConfig, ValidatorKind, ValidatorMode,
};
use serde_json::{json, Value};

mod test_support;

use test_support::*;

fn task_json() -> Value {
    serde_json::from_str(&instance("Task-160.json")).unwrap()
}

fn with_profile(mut task: Value, profile: &str) -> Value {
    task["meta"]["profile"] = json!([profile]);
    task
}

fn locations(outcome: &ValidationOutcome) -> Vec<&str> {
    outcome
        .issues
        .iter()
        .filter_map(|i| i.location.as_deref())
        .collect()
}

#[test]
fn both_serializations_claim_the_same_profile() {
    let expected = Some(format!("{}|1.4", TASK));
    assert_eq!(extract_profile(&instance("Task-160.json")), expected);
    assert_eq!(extract_profile(&instance("Task-160.xml")), expected);

    // collection bundles without a profile of their own fall back to the entries
    assert_eq!(extract_profile(&instance("Bundle-collection.json")), expected);

    assert!(is_unprofiled_searchset(&instance("Bundle-searchset.json")));
    assert!(!is_unprofiled_searchset(&instance("Bundle-collection.json")));
}

#[test]
fn validates_json_and_xml_alike() {
    let validator = validator(base_config().build());

    let json = validator.validate(&instance("Task-160.json"));
    assert!(json.valid, "{:?}", json.issues);
    assert!(json.issues.is_empty());
    assert_eq!(json.resource_type.as_deref(), Some("Task"));

    let xml = validator.validate(&instance("Task-160.xml"));
    assert!(xml.valid, "{:?}", xml.issues);
    assert_eq!(xml, json);
}

#[test]
fn validation_is_idempotent() {
    let validator = validator(base_config().build());
    let mut task = task_json();
    task.as_object_mut().unwrap().remove("intent");
    task["code"]["coding"][0]["code"] = json!("999");
    let content = task.to_string();

    let first = validator.validate(&content);
    let second = validator.validate(&content);
    assert!(!first.valid);
    assert_eq!(first.error_count(), 2);
    assert_eq!(first, second);
}

#[test]
fn validator_is_shared_between_threads() {
    let validator = validator(base_config().build());
    let content = instance("Task-160.json");
    let (validator, content) = (&validator, content.as_str());

    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(move || validator.validate(content)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(outcomes.iter().all(|o| o.valid && o.issues.is_empty()));
}

#[test]
fn exact_version_contract_is_used() {
    let mut task = task_json();
    let identifier = task["identifier"][0].clone();
    task["identifier"] = json!([identifier.clone(), identifier]);

    let validator = validator(
        ValidatorConfig::builder()
            .profile(workflow_13())
            .profile(workflow_14())
            .build(),
    );

    let v14 = validator.validate_value(&with_profile(task.clone(), &format!("{}|1.4", TASK)));
    assert!(v14.valid, "{:?}", v14.issues);

    let v13 = validator.validate_value(&with_profile(task.clone(), &format!("{}|1.3", TASK)));
    assert!(!v13.valid);
    assert_eq!(locations(&v13), vec!["Task.identifier"]);
    assert_eq!(v13.issues[0].code, IssueCode::Structure);

    // unversioned claims go to the first configured store
    let unversioned = validator.validate_value(&with_profile(task.clone(), TASK));
    assert!(!unversioned.valid);

    let reordered = test_support::validator(
        ValidatorConfig::builder()
            .profile(workflow_14())
            .profile(workflow_13())
            .build(),
    );
    assert!(reordered.validate_value(&with_profile(task, TASK)).valid);
}

#[test]
fn unknown_profile_is_an_error() {
    let validator = validator(base_config().build());
    let task = with_profile(task_json(), "https://example.org/StructureDefinition/Unknown");

    let outcome = validator.validate_value(&task);
    assert!(!outcome.valid);
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, IssueCode::NotFound);
    assert!(outcome.issues[0].diagnostics.contains("not found"));
    assert_eq!(outcome.issues[0].location.as_deref(), Some("Task.meta.profile"));

    // a version no store provides cannot be answered either
    let task = with_profile(task_json(), &format!("{}|1.2", TASK));
    let outcome = validator.validate_value(&task);
    assert!(!outcome.valid);
    assert_eq!(outcome.issues[0].code, IssueCode::NotFound);
}

#[test]
fn unchecked_code_systems_are_informational() {
    let mut task = task_json();
    task["performerType"] = json!([{ "coding": [{ "system": PZN, "code": "06313728" }] }]);
    let content = task.to_string();

    let normal = validator(base_config().build()).validate(&content);
    assert!(normal.valid);
    assert_eq!(normal.information_count(), 1);
    assert_eq!(normal.issues[0].code, IssueCode::Informational);
    assert_eq!(normal.issues[0].location.as_deref(), Some("Task.performerType[0]"));

    let strict = validator(base_config().mode(ValidatorMode::Strict).build()).validate(&content);
    assert!(strict.valid);
    assert_eq!(strict.issues[0].severity, IssueSeverity::Warning);

    let pedantic =
        validator(base_config().mode(ValidatorMode::Pedantic).build()).validate(&content);
    assert!(!pedantic.valid);
    assert_eq!(pedantic.issues[0].severity, IssueSeverity::Error);

    // without the allow-list nothing decides the coding and nothing is reported
    let plain = validator(ValidatorConfig::builder().profile(workflow_14()).build());
    assert!(plain.validate(&content).issues.is_empty());
}

#[test]
fn message_filters_drop_issues() {
    let mut task = task_json();
    task.as_object_mut().unwrap().remove("intent");
    let content = task.to_string();

    let unfiltered = validator(base_config().build()).validate(&content);
    assert!(!unfiltered.valid);
    assert!(unfiltered.issues[0]
        .diagnostics
        .starts_with("Element 'intent' has cardinality 1..1"));

    let filtered = validator(
        base_config()
            .ignore_message("^Element 'intent' has cardinality")
            .build(),
    )
    .validate(&content);
    assert!(filtered.valid);
    assert!(filtered.issues.is_empty());
}

#[test]
fn issues_are_capped() {
    let task = json!({
        "resourceType": "Task",
        "meta": { "profile": [format!("{}|1.4", TASK)] }
    });

    let all = validator(base_config().build()).validate_value(&task);
    assert_eq!(all.error_count(), 3);
    assert_eq!(locations(&all), vec!["Task.status", "Task.intent", "Task.code"]);

    let capped = validator(base_config().max_issues(2).build()).validate_value(&task);
    assert_eq!(capped.issues.len(), 2);
    assert!(!capped.valid);
}

#[test]
fn capping_keeps_errors_and_validity() {
    let mut searchset: Value = serde_json::from_str(&instance("Bundle-searchset.json")).unwrap();
    searchset["entry"][0]["resource"]["performerType"] =
        json!([{ "coding": [{ "system": PZN, "code": "06313728" }] }]);

    let all = validator(base_config().build()).validate_value(&searchset);
    assert!(!all.valid);
    assert_eq!(
        all.issues.iter().map(|i| i.severity).collect::<Vec<_>>(),
        vec![IssueSeverity::Information, IssueSeverity::Error]
    );

    let capped = validator(base_config().max_issues(1).build()).validate_value(&searchset);
    assert!(!capped.valid, "{:?}", capped.issues);
    assert_eq!(capped.issues.len(), 1);
    assert_eq!(capped.issues[0].severity, IssueSeverity::Error);
    assert_eq!(
        capped.issues[0].location.as_deref(),
        Some("Bundle.entry[1].resource.code")
    );
}

#[test]
fn bundles_are_validated_per_entry() {
    let validator = validator(base_config().build());

    let collection = validator.validate(&instance("Bundle-collection.json"));
    assert!(!collection.valid);
    assert_eq!(locations(&collection), vec!["Bundle.entry[0].resource.intent"]);
    assert_eq!(collection.resource_type.as_deref(), Some("Bundle"));

    let searchset = validator.validate(&instance("Bundle-searchset.json"));
    assert!(!searchset.valid);
    assert_eq!(searchset.issues.len(), 1);
    assert_eq!(searchset.issues[0].code, IssueCode::CodeInvalid);
    assert_eq!(
        searchset.issues[0].location.as_deref(),
        Some("Bundle.entry[1].resource.code")
    );
    assert!(searchset.issues[0].diagnostics.contains("'999'"));
}

#[test]
fn undecodable_content_fails_without_panicking() {
    let validator = validator(base_config().build());

    for content in ["", "not a resource", "[1, 2, 3]", "<Task"] {
        let outcome = validator.validate(content);
        assert!(!outcome.valid, "{:?}", content);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].code, IssueCode::Exception);
    }

    let outcome = validator.validate_bytes(&[0xff, 0xfe, 0x00, 0x7b]);
    assert!(!outcome.valid);

    assert!(!validator.is_valid(r#"{"id": "no-type"}"#));
}

#[test]
fn deeply_nested_content_fails_without_panicking() {
    let validator = validator(base_config().build());

    let xml = format!(
        r#"<Task xmlns="http://hl7.org/fhir">{}{}</Task>"#,
        r#"<extension url="http://example.org/ext">"#.repeat(5_000),
        "</extension>".repeat(5_000)
    );
    let outcome = validator.validate(&xml);
    assert!(!outcome.valid);
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, IssueCode::Exception);
    assert!(outcome.issues[0].diagnostics.contains("nesting"));

    let json = format!(
        r#"{{"resourceType":"Task",{}"x":1{}}}"#,
        r#""extension":{"#.repeat(5_000),
        "}".repeat(5_000)
    );
    let outcome = validator.validate(&json);
    assert!(!outcome.valid);
    assert_eq!(outcome.issues[0].code, IssueCode::Exception);
}

struct FailingSupport;

impl ValidationSupport for FailingSupport {
    fn name(&self) -> String {
        "failing".to_string()
    }

    fn fetch_structure_definition(&self, url: &str) -> Option<Arc<StructureDefinition>> {
        if url.ends_with("/Exploding") {
            panic!("support member exploded on {}", url);
        }
        None
    }
}

#[test]
fn panics_become_failed_outcomes() {
    let plan = compile(&base_config().build());
    let store = erx_context::ProfileResourceStore::load(
        plan.profiles[0].profile,
        &plan.profiles[0].files,
        &fixtures_loader(),
    )
    .map(Arc::new)
    .unwrap();
    let chain = SupportChain::new(vec![
        Arc::new(FailingSupport),
        store.clone(),
        Arc::new(DefaultProfileSupport::new()),
        Arc::new(InMemoryTerminologySupport::new()),
        Arc::new(SnapshotGeneratingSupport::new()),
    ]);
    let validator = ProfileValidator::with_chain(plan, vec![store], chain);

    let exploding = with_profile(task_json(), "https://example.org/StructureDefinition/Exploding");
    let outcome = validator.validate_value(&exploding);
    assert!(!outcome.valid);
    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].code, IssueCode::Exception);
    assert!(outcome.issues[0].diagnostics.contains("exploded"));

    // the validator stays usable
    let outcome = validator.validate(&instance("Task-160.json"));
    assert!(outcome.valid, "{:?}", outcome.issues);
}

#[test]
fn validator_kind_none_accepts_everything() {
    let plan = compile(&ValidatorConfig::builder().kind(ValidatorKind::None).build());
    let validator = build_validator(plan, &InMemoryLoader::new()).unwrap();

    assert!(validator.is_valid("not a resource"));
    let outcome = validator.validate_value(&json!({ "resourceType": "Prescription" }));
    assert!(outcome.valid);
    assert!(outcome.issues.is_empty());
}

#[test]
fn stores_load_through_any_loader() {
    init_tracing();
    let sd = std::fs::read(fixtures_dir().join(ERP_14_FILES[0])).unwrap();
    let loader = InMemoryLoader::new().with("Task.json", sd);

    let plan = compile(
        &ValidatorConfig::builder()
            .profile(ProfileConfig::new(WORKFLOW, Some("1.4")).with_files(["Task.json"]))
            .build(),
    );
    let validator = build_validator(plan, &loader).unwrap();

    // without the value set the required binding cannot be decided
    let outcome = validator.validate(&instance("Task-160.json"));
    assert!(outcome.valid, "{:?}", outcome.issues);
    assert_eq!(outcome.warning_count(), 1);
    assert_eq!(outcome.issues[0].code, IssueCode::NotFound);
    assert_eq!(outcome.issues[0].location.as_deref(), Some("Task.code"));

    let missing = compile(&base_config().build());
    assert!(matches!(
        build_validator(missing, &loader),
        Err(ConfigError::Store { .. })
    ));
}

#[test]
fn yaml_configuration_end_to_end() {
    let yaml = format!(
        r#"
mode: strict
profiles:
  - name: {}
    version: 1.4
    files:
{}
unchecked_code_systems:
  - {}
"#,
        WORKFLOW,
        ERP_14_FILES
            .iter()
            .map(|f| format!("      - {}", f))
            .collect::<Vec<_>>()
            .join("\n"),
        PZN
    );
    let config = ValidatorConfig::from_yaml(&yaml).unwrap();
    let validator = validator(config);

    assert_eq!(validator.plan().mode, ValidatorMode::Strict);
    assert_eq!(validator.stores().len(), 1);
    assert_eq!(
        validator.chain().names(),
        vec![
            format!("store {}|1.4.0", WORKFLOW),
            "default profiles".to_string(),
            "in-memory terminology".to_string(),
            "snapshot generator".to_string(),
            "unchecked code systems".to_string(),
        ]
    );
    assert!(validator.is_valid(&instance("Task-160.xml")));
}

#[test]
fn backslash_locations_resolve_on_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("fhir").join("erp")).unwrap();
    for file in ERP_14_FILES {
        let name = file.rsplit('/').next().unwrap();
        std::fs::copy(fixtures_dir().join(file), dir.path().join("fhir").join("erp").join(name))
            .unwrap();
    }

    let config = ValidatorConfig::builder()
        .profile(ProfileConfig::new(WORKFLOW, Some("1.4.0")).with_files([
            "fhir\\erp\\StructureDefinition-GEM_ERP_PR_Task.json",
            "fhir\\erp\\CodeSystem-GEM_ERP_CS_FlowType.xml",
            "fhir\\erp\\ValueSet-GEM_ERP_VS_FlowType.json",
        ]))
        .build();
    let plan = compile(&config);
    assert_eq!(
        plan.profiles[0].files[0],
        "fhir/erp/StructureDefinition-GEM_ERP_PR_Task.json"
    );

    let loader = erx_context::FileSystemLoader::new(dir.path());
    let validator = ProfileValidator::new(plan, &loader).unwrap();
    assert_eq!(validator.stores()[0].len(), 3);
    assert!(validator.is_valid(&instance("Task-160.json")));
}
