use super::ValidationSupport;
use erx_context::ProfileResourceStore;
use erx_models::{CodeSystem, StructureDefinition, ValueSet};
use std::sync::Arc;

impl ValidationSupport for ProfileResourceStore {
    fn name(&self) -> String {
        format!("store {}", self.profile())
    }

    fn fetch_structure_definition(&self, url: &str) -> Option<Arc<StructureDefinition>> {
        ProfileResourceStore::fetch_structure_definition(self, url).map(|m| m.resource)
    }

    fn fetch_code_system(&self, url: &str) -> Option<Arc<CodeSystem>> {
        ProfileResourceStore::fetch_code_system(self, url).map(|m| m.resource)
    }

    fn fetch_value_set(&self, url: &str) -> Option<Arc<ValueSet>> {
        ProfileResourceStore::fetch_value_set(self, url).map(|m| m.resource)
    }

    fn is_code_system_supported(&self, url: &str) -> bool {
        ProfileResourceStore::is_code_system_supported(self, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erx_profiles::VersionedProfile;
    use serde_json::json;

    #[test]
    fn test_store_answers_within_its_family() {
        let store = ProfileResourceStore::from_resources(
            VersionedProfile::parse("de.gematik.erezept-workflow.r4", "1.4.0").unwrap(),
            [json!({
                "resourceType": "CodeSystem",
                "url": "https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_FlowType",
                "content": "complete",
                "concept": [{ "code": "160" }]
            })],
        )
        .unwrap();
        let support: &dyn ValidationSupport = &store;

        assert!(support
            .fetch_code_system("https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_FlowType|1.4")
            .is_some());
        assert!(support
            .fetch_code_system("https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_FlowType|1.3")
            .is_none());
        assert!(support.is_code_system_supported(
            "https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_FlowType"
        ));
        assert_eq!(support.name(), "store de.gematik.erezept-workflow.r4|1.4.0");
    }
}
