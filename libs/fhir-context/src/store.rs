//! Version-aware conformance resource store.
//!
//! A [`ProfileResourceStore`] holds the StructureDefinitions, CodeSystems,
//! NamingSystems and ValueSets published by one [`VersionedProfile`]. It is
//! populated once on construction and only read afterwards, so a store can be
//! shared between threads behind an `Arc` without locking.
//!
//! Lookups follow three rules:
//! - a URL outside the owning family's namespaces never matches,
//! - an unversioned URL matches whatever is stored under it,
//! - a versioned URL matches only if the suffix equals the store's version.

use crate::error::{Error, Result};
use crate::loader::PayloadLoader;
use erx_models::{Bundle, CodeSystem, NamingSystem, StructureDefinition, ValueSet};
use erx_profiles::{canonical, VersionedProfile};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The payload kinds a store keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    StructureDefinition,
    CodeSystem,
    NamingSystem,
    ValueSet,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        Self::StructureDefinition,
        Self::CodeSystem,
        Self::NamingSystem,
        Self::ValueSet,
    ];

    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        match resource_type {
            "StructureDefinition" => Some(Self::StructureDefinition),
            "CodeSystem" => Some(Self::CodeSystem),
            "NamingSystem" => Some(Self::NamingSystem),
            "ValueSet" => Some(Self::ValueSet),
            _ => None,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::StructureDefinition => "StructureDefinition",
            Self::CodeSystem => "CodeSystem",
            Self::NamingSystem => "NamingSystem",
            Self::ValueSet => "ValueSet",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

/// How a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPrecision {
    /// The requested version suffix equals the store's version
    ExactVersion,
    /// The request carried no version suffix
    VersionAgnostic,
}

/// A payload held by a store
#[derive(Debug, Clone)]
pub enum ConformanceResource {
    StructureDefinition(Arc<StructureDefinition>),
    CodeSystem(Arc<CodeSystem>),
    NamingSystem(Arc<NamingSystem>),
    ValueSet(Arc<ValueSet>),
}

impl ConformanceResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::StructureDefinition(_) => ResourceKind::StructureDefinition,
            Self::CodeSystem(_) => ResourceKind::CodeSystem,
            Self::NamingSystem(_) => ResourceKind::NamingSystem,
            Self::ValueSet(_) => ResourceKind::ValueSet,
        }
    }

    pub fn canonical_url(&self) -> &str {
        match self {
            Self::StructureDefinition(sd) => &sd.url,
            Self::CodeSystem(cs) => &cs.url,
            Self::NamingSystem(ns) => ns.canonical_url().unwrap_or_default(),
            Self::ValueSet(vs) => &vs.url,
        }
    }

    pub fn as_structure_definition(&self) -> Option<&Arc<StructureDefinition>> {
        match self {
            Self::StructureDefinition(sd) => Some(sd),
            _ => None,
        }
    }

    pub fn as_code_system(&self) -> Option<&Arc<CodeSystem>> {
        match self {
            Self::CodeSystem(cs) => Some(cs),
            _ => None,
        }
    }

    pub fn as_naming_system(&self) -> Option<&Arc<NamingSystem>> {
        match self {
            Self::NamingSystem(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn as_value_set(&self) -> Option<&Arc<ValueSet>> {
        match self {
            Self::ValueSet(vs) => Some(vs),
            _ => None,
        }
    }
}

/// A successful lookup together with its precision
#[derive(Debug, Clone)]
pub struct StoreMatch<T = ConformanceResource> {
    pub resource: T,
    pub precision: MatchPrecision,
}

impl<T> StoreMatch<T> {
    fn map<U>(self, f: impl FnOnce(T) -> Option<U>) -> Option<StoreMatch<U>> {
        let precision = self.precision;
        f(self.resource).map(|resource| StoreMatch {
            resource,
            precision,
        })
    }
}

/// Conformance resources of one versioned profile
#[derive(Debug)]
pub struct ProfileResourceStore {
    profile: VersionedProfile,
    structure_definitions: HashMap<String, Arc<StructureDefinition>>,
    code_systems: HashMap<String, Arc<CodeSystem>>,
    naming_systems: HashMap<String, Arc<NamingSystem>>,
    value_sets: HashMap<String, Arc<ValueSet>>,
}

impl ProfileResourceStore {
    /// Read every location through the loader and register its payload.
    ///
    /// Payloads may be JSON or XML. Bundles are unpacked; resources of other
    /// types are skipped.
    pub fn load<S: AsRef<str>>(
        profile: VersionedProfile,
        files: &[S],
        loader: &dyn PayloadLoader,
    ) -> Result<Self> {
        let mut store = Self::empty(profile);
        for location in files {
            let location = location.as_ref();
            let bytes = loader.load(location)?;
            let value = erx_format::decode_bytes(&bytes)
                .and_then(|content| erx_format::parse_resource(&content))
                .map_err(|e| Error::UndecodablePayload {
                    location: location.to_string(),
                    message: e.to_string(),
                })?;
            store.register(location, value)?;
        }
        tracing::debug!(
            profile = %store.profile,
            files = files.len(),
            resources = store.len(),
            "Loaded profile resource store"
        );
        Ok(store)
    }

    /// Build a store from already decoded resources
    pub fn from_resources<I>(profile: VersionedProfile, resources: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut store = Self::empty(profile);
        for (index, value) in resources.into_iter().enumerate() {
            store.register(&format!("resource[{}]", index), value)?;
        }
        Ok(store)
    }

    fn empty(profile: VersionedProfile) -> Self {
        Self {
            profile,
            structure_definitions: HashMap::new(),
            code_systems: HashMap::new(),
            naming_systems: HashMap::new(),
            value_sets: HashMap::new(),
        }
    }

    fn register(&mut self, location: &str, value: Value) -> Result<()> {
        let resource_type = erx_format::resource_type(&value).unwrap_or_default();

        if resource_type == "Bundle" {
            let bundle = Bundle::from_value(&value).map_err(|source| Error::InvalidResource {
                location: location.to_string(),
                source,
            })?;
            for (index, entry) in bundle.resources().enumerate() {
                self.register(&format!("{}#entry[{}]", location, index), entry.clone())?;
            }
            return Ok(());
        }

        let Some(kind) = ResourceKind::from_resource_type(resource_type) else {
            tracing::debug!(
                profile = %self.profile,
                location,
                resource_type,
                "Skipping payload that is not a conformance resource"
            );
            return Ok(());
        };

        let invalid = |source| Error::InvalidResource {
            location: location.to_string(),
            source,
        };
        let resource = match kind {
            ResourceKind::StructureDefinition => ConformanceResource::StructureDefinition(
                Arc::new(StructureDefinition::from_value(&value).map_err(invalid)?),
            ),
            ResourceKind::CodeSystem => ConformanceResource::CodeSystem(Arc::new(
                CodeSystem::from_value(&value).map_err(invalid)?,
            )),
            ResourceKind::NamingSystem => ConformanceResource::NamingSystem(Arc::new(
                NamingSystem::from_value(&value).map_err(invalid)?,
            )),
            ResourceKind::ValueSet => {
                ConformanceResource::ValueSet(Arc::new(ValueSet::from_value(&value).map_err(invalid)?))
            }
        };

        let key = canonical::unversioned(resource.canonical_url()).to_string();
        if key.is_empty() {
            tracing::debug!(
                profile = %self.profile,
                location,
                kind = %kind,
                "Skipping conformance resource without canonical URL"
            );
            return Ok(());
        }

        tracing::trace!(profile = %self.profile, url = %key, kind = %kind, "Registered conformance resource");
        match resource {
            ConformanceResource::StructureDefinition(sd) => {
                self.structure_definitions.insert(key, sd);
            }
            ConformanceResource::CodeSystem(cs) => {
                self.code_systems.insert(key, cs);
            }
            ConformanceResource::NamingSystem(ns) => {
                self.naming_systems.insert(key, ns);
            }
            ConformanceResource::ValueSet(vs) => {
                self.value_sets.insert(key, vs);
            }
        }
        Ok(())
    }

    pub fn profile(&self) -> &VersionedProfile {
        &self.profile
    }

    /// Does the URL lie in the namespaces of this store's family?
    pub fn claims(&self, url: &str) -> bool {
        self.profile.family.matches_claim(url)
    }

    pub fn fetch(&self, kind: ResourceKind, url: &str) -> Option<StoreMatch> {
        if !self.claims(url) {
            return None;
        }

        let (base, requested) = canonical::split(url);
        let precision = match requested.filter(|v| !v.is_empty()) {
            None => MatchPrecision::VersionAgnostic,
            Some(requested) if self.profile.is_version(requested) => MatchPrecision::ExactVersion,
            Some(requested) => {
                tracing::debug!(
                    profile = %self.profile,
                    url,
                    requested,
                    "Requested version does not match store version"
                );
                return None;
            }
        };

        let Some(resource) = self.lookup(kind, base) else {
            tracing::debug!(profile = %self.profile, url, kind = %kind, "No conformance resource in store");
            return None;
        };

        tracing::debug!(
            profile = %self.profile,
            url,
            kind = %kind,
            precision = ?precision,
            "Store match"
        );
        Some(StoreMatch {
            resource,
            precision,
        })
    }

    fn lookup(&self, kind: ResourceKind, base: &str) -> Option<ConformanceResource> {
        match kind {
            ResourceKind::StructureDefinition => self
                .structure_definitions
                .get(base)
                .cloned()
                .map(ConformanceResource::StructureDefinition),
            ResourceKind::CodeSystem => self
                .code_systems
                .get(base)
                .cloned()
                .map(ConformanceResource::CodeSystem),
            ResourceKind::NamingSystem => self
                .naming_systems
                .get(base)
                .cloned()
                .map(ConformanceResource::NamingSystem),
            ResourceKind::ValueSet => self
                .value_sets
                .get(base)
                .cloned()
                .map(ConformanceResource::ValueSet),
        }
    }

    pub fn fetch_structure_definition(&self, url: &str) -> Option<StoreMatch<Arc<StructureDefinition>>> {
        self.fetch(ResourceKind::StructureDefinition, url)?
            .map(|r| r.as_structure_definition().cloned())
    }

    pub fn fetch_code_system(&self, url: &str) -> Option<StoreMatch<Arc<CodeSystem>>> {
        self.fetch(ResourceKind::CodeSystem, url)?
            .map(|r| r.as_code_system().cloned())
    }

    pub fn fetch_naming_system(&self, url: &str) -> Option<StoreMatch<Arc<NamingSystem>>> {
        self.fetch(ResourceKind::NamingSystem, url)?
            .map(|r| r.as_naming_system().cloned())
    }

    pub fn fetch_value_set(&self, url: &str) -> Option<StoreMatch<Arc<ValueSet>>> {
        self.fetch(ResourceKind::ValueSet, url)?
            .map(|r| r.as_value_set().cloned())
    }

    pub fn is_code_system_supported(&self, url: &str) -> bool {
        self.fetch(ResourceKind::CodeSystem, url).is_some()
    }

    pub fn is_value_set_supported(&self, url: &str) -> bool {
        self.fetch(ResourceKind::ValueSet, url).is_some()
    }

    /// Every stored resource, ordered by kind and URL
    pub fn conformance_resources(&self) -> Vec<ConformanceResource> {
        fn sorted<T>(
            map: &HashMap<String, Arc<T>>,
            wrap: fn(Arc<T>) -> ConformanceResource,
        ) -> Vec<ConformanceResource> {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries.into_iter().map(|(_, r)| wrap(r.clone())).collect()
        }

        let mut all = sorted(&self.structure_definitions, ConformanceResource::StructureDefinition);
        all.extend(sorted(&self.code_systems, ConformanceResource::CodeSystem));
        all.extend(sorted(&self.naming_systems, ConformanceResource::NamingSystem));
        all.extend(sorted(&self.value_sets, ConformanceResource::ValueSet));
        all
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::StructureDefinition => self.structure_definitions.len(),
            ResourceKind::CodeSystem => self.code_systems.len(),
            ResourceKind::NamingSystem => self.naming_systems.len(),
            ResourceKind::ValueSet => self.value_sets.len(),
        }
    }

    pub fn len(&self) -> usize {
        ResourceKind::ALL.iter().map(|kind| self.count(*kind)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erx_profiles::{ProfileFamily, ProfileVersion};
    use serde_json::json;

    const FLOW_TYPE: &str = "https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_FlowType";

    fn workflow(minor: u16) -> VersionedProfile {
        VersionedProfile::new(ProfileFamily::ErpWorkflow, ProfileVersion::new(1, minor, 0))
    }

    fn flow_type() -> Value {
        json!({
            "resourceType": "CodeSystem",
            "url": FLOW_TYPE,
            "version": "1.4",
            "content": "complete",
            "concept": [{ "code": "160" }, { "code": "200" }]
        })
    }

    #[test]
    fn test_classifies_by_resource_type() {
        let store = ProfileResourceStore::from_resources(
            workflow(4),
            vec![
                flow_type(),
                json!({ "resourceType": "Patient", "id": "p1" }),
                json!({
                    "resourceType": "NamingSystem",
                    "name": "PrescriptionID",
                    "uniqueId": [{ "type": "uri", "value": "https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_PrescriptionId" }]
                }),
            ],
        )
        .unwrap();

        assert_eq!(store.count(ResourceKind::CodeSystem), 1);
        assert_eq!(store.count(ResourceKind::NamingSystem), 1);
        assert_eq!(store.count(ResourceKind::StructureDefinition), 0);
        assert_eq!(store.len(), 2);
        assert!(store
            .fetch_naming_system("https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_PrescriptionId")
            .is_some());
    }

    #[test]
    fn test_versioned_requests() {
        let store = ProfileResourceStore::from_resources(workflow(4), vec![flow_type()]).unwrap();

        let exact = store.fetch_code_system(&format!("{}|1.4.0", FLOW_TYPE)).unwrap();
        assert_eq!(exact.precision, MatchPrecision::ExactVersion);
        let cropped = store.fetch_code_system(&format!("{}|1.4", FLOW_TYPE)).unwrap();
        assert_eq!(cropped.precision, MatchPrecision::ExactVersion);
        let any = store.fetch_code_system(FLOW_TYPE).unwrap();
        assert_eq!(any.precision, MatchPrecision::VersionAgnostic);

        assert!(store.fetch_code_system(&format!("{}|1.1.1", FLOW_TYPE)).is_none());
        assert!(store.is_code_system_supported(FLOW_TYPE));
        assert!(!store.is_value_set_supported(FLOW_TYPE));
    }

    #[test]
    fn test_bundles_are_unpacked() {
        let bundle = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [{ "resource": flow_type() }]
        });
        let store = ProfileResourceStore::from_resources(workflow(4), vec![bundle]).unwrap();
        assert_eq!(store.conformance_resources().len(), 1);
        assert_eq!(store.conformance_resources()[0].kind(), ResourceKind::CodeSystem);
    }

    #[test]
    fn test_invalid_conformance_resource_is_an_error() {
        let broken = json!({ "resourceType": "CodeSystem", "url": 42 });
        let err = ProfileResourceStore::from_resources(workflow(4), vec![broken]).unwrap_err();
        assert!(matches!(err, Error::InvalidResource { .. }));
    }
}
