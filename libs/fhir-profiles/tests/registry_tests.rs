use chrono::NaiveDate;
use erx_profiles::{
    canonical, resource_type_hint, CanonicalEntry, ErpWorkflowLegacyStructDef,
    ErpWorkflowStructDef, FixedStructDef, KbvItaErpStructDef, ProfileError, ProfileFamily,
    ProfileVersion, VersionedProfile,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn resolves_configured_profile_list() {
    let configured = [
        ("de.gematik.erezept-workflow.r4", Some("1.3.0")),
        ("kbv.ita.erp", Some("1.1")),
        ("de.basisprofil.r4", None),
        ("hl7.fhir.r4.core", None),
    ];

    let resolved: Vec<VersionedProfile> = configured
        .iter()
        .map(|(name, version)| VersionedProfile::resolve(name, *version, day(2024, 1, 1)).unwrap())
        .collect();

    assert_eq!(resolved[0].family, ProfileFamily::ErpWorkflow);
    assert_eq!(resolved[0].version, ProfileVersion::new(1, 3, 0));
    assert_eq!(resolved[1].version, ProfileVersion::new(1, 1, 0));
    assert_eq!(resolved[2].version, ProfileVersion::new(1, 3, 2));
    assert_eq!(resolved[3].version, ProfileVersion::new(4, 0, 1));
    assert_eq!(resolved[0].to_string(), "de.gematik.erezept-workflow.r4|1.3.0");
}

#[test]
fn rejects_unknown_names_and_versions() {
    assert!(matches!(
        VersionedProfile::resolve("totally-unknown-namespace", None, day(2024, 1, 1)),
        Err(ProfileError::UnknownProfile(_))
    ));
    assert!(matches!(
        VersionedProfile::parse("kbv.ita.for", "9.9.9"),
        Err(ProfileError::UnknownVersion { .. })
    ));
    assert!(matches!(
        VersionedProfile::parse("kbv.ita.for", "latest"),
        Err(ProfileError::MissingVersion(_))
    ));
}

#[test]
fn default_version_follows_release_calendar() {
    let wf = ProfileFamily::ErpWorkflow;
    assert_eq!(wf.default_version(day(2022, 6, 1)).unwrap(), ProfileVersion::new(1, 1, 1));
    assert_eq!(wf.default_version(day(2024, 10, 31)).unwrap(), ProfileVersion::new(1, 3, 0));
    assert_eq!(wf.default_version(day(2024, 11, 1)).unwrap(), ProfileVersion::new(1, 4, 0));
    assert_eq!(wf.default_version(day(2030, 1, 1)).unwrap(), ProfileVersion::new(1, 5, 0));

    // before the first release there is nothing to choose from
    assert!(matches!(
        wf.default_version(day(2019, 1, 1)),
        Err(ProfileError::NoDefaultVersion { .. })
    ));

    // single-version families ignore the date
    assert_eq!(
        ProfileFamily::Hl7.default_version(day(2000, 1, 1)).unwrap(),
        ProfileVersion::new(4, 0, 1)
    );
}

#[test]
fn catalog_urls_for_a_profile_generation() {
    let profile = VersionedProfile::parse("de.gematik.erezept-workflow.r4", "1.4.0").unwrap();
    let url = ErpWorkflowStructDef::Task.versioned_url(&profile.version, true);

    assert_eq!(ProfileFamily::owning(&url), Some(profile.family));
    assert_eq!(canonical::version_of(&url), Some("1.4"));
    assert!(profile.is_version(canonical::version_of(&url).unwrap()));
    assert_eq!(ErpWorkflowStructDef::from_url(&url), Some(ErpWorkflowStructDef::Task));
    assert_eq!(ErpWorkflowLegacyStructDef::from_url(&url), None);
}

#[test]
fn fixed_and_floating_entries_name_the_same_contract() {
    let fixed = FixedStructDef::KbvErpBundle;
    let floating = KbvItaErpStructDef::Bundle;

    assert_eq!(fixed.unversioned_url(), floating.unversioned_url());
    assert_eq!(fixed.family(), floating.family());
    assert_eq!(
        resource_type_hint(fixed.canonical_url()),
        resource_type_hint(floating.canonical_url())
    );
}
