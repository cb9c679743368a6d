//! Built-in R4 base definitions
//!
//! Synthesizes a vanilla StructureDefinition (with snapshot) for every R4
//! resource type and the handful of complex types profiles commonly build on.
//! Only the structural rules the engine evaluates are present: the common
//! resource elements and the mandatory elements of the resource types the
//! e-prescription workflow exchanges.

use super::ValidationSupport;
use erx_models::{
    ElementDefinition, ElementDefinitionType, Snapshot, StructureDefinition,
    StructureDefinitionKind, TypeDerivationRule,
};
use erx_profiles::canonical;
use phf::phf_map;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Canonical prefix of the R4 base definitions
pub const BASE_PREFIX: &str = "http://hl7.org/fhir/StructureDefinition/";

const R4_VERSION: &str = "4.0.1";

/// Base types by name. Resources that are not domain resources are `Resource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseKind {
    Resource,
    DomainResource,
    ComplexType,
}

static BASE_TYPES: phf::Map<&'static str, BaseKind> = phf_map! {
    "Account" => BaseKind::DomainResource,
    "ActivityDefinition" => BaseKind::DomainResource,
    "AdverseEvent" => BaseKind::DomainResource,
    "AllergyIntolerance" => BaseKind::DomainResource,
    "Appointment" => BaseKind::DomainResource,
    "AppointmentResponse" => BaseKind::DomainResource,
    "AuditEvent" => BaseKind::DomainResource,
    "Basic" => BaseKind::DomainResource,
    "Binary" => BaseKind::Resource,
    "BiologicallyDerivedProduct" => BaseKind::DomainResource,
    "BodyStructure" => BaseKind::DomainResource,
    "Bundle" => BaseKind::Resource,
    "CapabilityStatement" => BaseKind::DomainResource,
    "CarePlan" => BaseKind::DomainResource,
    "CareTeam" => BaseKind::DomainResource,
    "CatalogEntry" => BaseKind::DomainResource,
    "ChargeItem" => BaseKind::DomainResource,
    "ChargeItemDefinition" => BaseKind::DomainResource,
    "Claim" => BaseKind::DomainResource,
    "ClaimResponse" => BaseKind::DomainResource,
    "ClinicalImpression" => BaseKind::DomainResource,
    "CodeSystem" => BaseKind::DomainResource,
    "Communication" => BaseKind::DomainResource,
    "CommunicationRequest" => BaseKind::DomainResource,
    "CompartmentDefinition" => BaseKind::DomainResource,
    "Composition" => BaseKind::DomainResource,
    "ConceptMap" => BaseKind::DomainResource,
    "Condition" => BaseKind::DomainResource,
    "Consent" => BaseKind::DomainResource,
    "Contract" => BaseKind::DomainResource,
    "Coverage" => BaseKind::DomainResource,
    "CoverageEligibilityRequest" => BaseKind::DomainResource,
    "CoverageEligibilityResponse" => BaseKind::DomainResource,
    "DetectedIssue" => BaseKind::DomainResource,
    "Device" => BaseKind::DomainResource,
    "DeviceDefinition" => BaseKind::DomainResource,
    "DeviceMetric" => BaseKind::DomainResource,
    "DeviceRequest" => BaseKind::DomainResource,
    "DeviceUseStatement" => BaseKind::DomainResource,
    "DiagnosticReport" => BaseKind::DomainResource,
    "DocumentManifest" => BaseKind::DomainResource,
    "DocumentReference" => BaseKind::DomainResource,
    "EffectEvidenceSynthesis" => BaseKind::DomainResource,
    "Encounter" => BaseKind::DomainResource,
    "Endpoint" => BaseKind::DomainResource,
    "EnrollmentRequest" => BaseKind::DomainResource,
    "EnrollmentResponse" => BaseKind::DomainResource,
    "EpisodeOfCare" => BaseKind::DomainResource,
    "EventDefinition" => BaseKind::DomainResource,
    "Evidence" => BaseKind::DomainResource,
    "EvidenceVariable" => BaseKind::DomainResource,
    "ExampleScenario" => BaseKind::DomainResource,
    "ExplanationOfBenefit" => BaseKind::DomainResource,
    "FamilyMemberHistory" => BaseKind::DomainResource,
    "Flag" => BaseKind::DomainResource,
    "Goal" => BaseKind::DomainResource,
    "GraphDefinition" => BaseKind::DomainResource,
    "Group" => BaseKind::DomainResource,
    "GuidanceResponse" => BaseKind::DomainResource,
    "HealthcareService" => BaseKind::DomainResource,
    "ImagingStudy" => BaseKind::DomainResource,
    "Immunization" => BaseKind::DomainResource,
    "ImmunizationEvaluation" => BaseKind::DomainResource,
    "ImmunizationRecommendation" => BaseKind::DomainResource,
    "ImplementationGuide" => BaseKind::DomainResource,
    "InsurancePlan" => BaseKind::DomainResource,
    "Invoice" => BaseKind::DomainResource,
    "Library" => BaseKind::DomainResource,
    "Linkage" => BaseKind::DomainResource,
    "List" => BaseKind::DomainResource,
    "Location" => BaseKind::DomainResource,
    "Measure" => BaseKind::DomainResource,
    "MeasureReport" => BaseKind::DomainResource,
    "Media" => BaseKind::DomainResource,
    "Medication" => BaseKind::DomainResource,
    "MedicationAdministration" => BaseKind::DomainResource,
    "MedicationDispense" => BaseKind::DomainResource,
    "MedicationKnowledge" => BaseKind::DomainResource,
    "MedicationRequest" => BaseKind::DomainResource,
    "MedicationStatement" => BaseKind::DomainResource,
    "MedicinalProduct" => BaseKind::DomainResource,
    "MedicinalProductAuthorization" => BaseKind::DomainResource,
    "MedicinalProductContraindication" => BaseKind::DomainResource,
    "MedicinalProductIndication" => BaseKind::DomainResource,
    "MedicinalProductIngredient" => BaseKind::DomainResource,
    "MedicinalProductInteraction" => BaseKind::DomainResource,
    "MedicinalProductManufactured" => BaseKind::DomainResource,
    "MedicinalProductPackaged" => BaseKind::DomainResource,
    "MedicinalProductPharmaceutical" => BaseKind::DomainResource,
    "MedicinalProductUndesirableEffect" => BaseKind::DomainResource,
    "MessageDefinition" => BaseKind::DomainResource,
    "MessageHeader" => BaseKind::DomainResource,
    "MolecularSequence" => BaseKind::DomainResource,
    "NamingSystem" => BaseKind::DomainResource,
    "NutritionOrder" => BaseKind::DomainResource,
    "Observation" => BaseKind::DomainResource,
    "ObservationDefinition" => BaseKind::DomainResource,
    "OperationDefinition" => BaseKind::DomainResource,
    "OperationOutcome" => BaseKind::DomainResource,
    "Organization" => BaseKind::DomainResource,
    "OrganizationAffiliation" => BaseKind::DomainResource,
    "Parameters" => BaseKind::Resource,
    "Patient" => BaseKind::DomainResource,
    "PaymentNotice" => BaseKind::DomainResource,
    "PaymentReconciliation" => BaseKind::DomainResource,
    "Person" => BaseKind::DomainResource,
    "PlanDefinition" => BaseKind::DomainResource,
    "Practitioner" => BaseKind::DomainResource,
    "PractitionerRole" => BaseKind::DomainResource,
    "Procedure" => BaseKind::DomainResource,
    "Provenance" => BaseKind::DomainResource,
    "Questionnaire" => BaseKind::DomainResource,
    "QuestionnaireResponse" => BaseKind::DomainResource,
    "RelatedPerson" => BaseKind::DomainResource,
    "RequestGroup" => BaseKind::DomainResource,
    "ResearchDefinition" => BaseKind::DomainResource,
    "ResearchElementDefinition" => BaseKind::DomainResource,
    "ResearchStudy" => BaseKind::DomainResource,
    "ResearchSubject" => BaseKind::DomainResource,
    "RiskAssessment" => BaseKind::DomainResource,
    "RiskEvidenceSynthesis" => BaseKind::DomainResource,
    "Schedule" => BaseKind::DomainResource,
    "SearchParameter" => BaseKind::DomainResource,
    "ServiceRequest" => BaseKind::DomainResource,
    "Slot" => BaseKind::DomainResource,
    "Specimen" => BaseKind::DomainResource,
    "SpecimenDefinition" => BaseKind::DomainResource,
    "StructureDefinition" => BaseKind::DomainResource,
    "StructureMap" => BaseKind::DomainResource,
    "Subscription" => BaseKind::DomainResource,
    "Substance" => BaseKind::DomainResource,
    "SubstanceNucleicAcid" => BaseKind::DomainResource,
    "SubstancePolymer" => BaseKind::DomainResource,
    "SubstanceProtein" => BaseKind::DomainResource,
    "SubstanceReferenceInformation" => BaseKind::DomainResource,
    "SubstanceSourceMaterial" => BaseKind::DomainResource,
    "SubstanceSpecification" => BaseKind::DomainResource,
    "SupplyDelivery" => BaseKind::DomainResource,
    "SupplyRequest" => BaseKind::DomainResource,
    "Task" => BaseKind::DomainResource,
    "TerminologyCapabilities" => BaseKind::DomainResource,
    "TestReport" => BaseKind::DomainResource,
    "TestScript" => BaseKind::DomainResource,
    "ValueSet" => BaseKind::DomainResource,
    "VerificationResult" => BaseKind::DomainResource,
    "VisionPrescription" => BaseKind::DomainResource,
    "Address" => BaseKind::ComplexType,
    "Annotation" => BaseKind::ComplexType,
    "Attachment" => BaseKind::ComplexType,
    "CodeableConcept" => BaseKind::ComplexType,
    "Coding" => BaseKind::ComplexType,
    "ContactPoint" => BaseKind::ComplexType,
    "Extension" => BaseKind::ComplexType,
    "HumanName" => BaseKind::ComplexType,
    "Identifier" => BaseKind::ComplexType,
    "Meta" => BaseKind::ComplexType,
    "Money" => BaseKind::ComplexType,
    "Narrative" => BaseKind::ComplexType,
    "Period" => BaseKind::ComplexType,
    "Quantity" => BaseKind::ComplexType,
    "Reference" => BaseKind::ComplexType,
};

/// Is `name` an R4 resource type?
pub fn is_base_resource_type(name: &str) -> bool {
    matches!(
        BASE_TYPES.get(name),
        Some(BaseKind::Resource | BaseKind::DomainResource)
    )
}

/// Mandatory elements beyond the common ones: (name, min, max, type)
fn mandatory_elements(type_name: &str) -> &'static [(&'static str, u32, &'static str, &'static str)] {
    match type_name {
        "AuditEvent" => &[
            ("type", 1, "1", "Coding"),
            ("recorded", 1, "1", "instant"),
            ("agent", 1, "*", "BackboneElement"),
            ("source", 1, "1", "BackboneElement"),
        ],
        "Binary" => &[("contentType", 1, "1", "code")],
        "Bundle" => &[
            ("identifier", 0, "1", "Identifier"),
            ("type", 1, "1", "code"),
            ("timestamp", 0, "1", "instant"),
            ("entry", 0, "*", "BackboneElement"),
        ],
        "ChargeItem" => &[
            ("status", 1, "1", "code"),
            ("code", 1, "1", "CodeableConcept"),
            ("subject", 1, "1", "Reference"),
        ],
        "Communication" => &[("status", 1, "1", "code")],
        "Composition" => &[
            ("status", 1, "1", "code"),
            ("type", 1, "1", "CodeableConcept"),
            ("date", 1, "1", "dateTime"),
            ("author", 1, "*", "Reference"),
            ("title", 1, "1", "string"),
        ],
        "Consent" => &[
            ("status", 1, "1", "code"),
            ("scope", 1, "1", "CodeableConcept"),
            ("category", 1, "*", "CodeableConcept"),
        ],
        "MedicationDispense" => &[
            ("status", 1, "1", "code"),
            ("medication[x]", 1, "1", "CodeableConcept"),
        ],
        "MedicationRequest" => &[
            ("status", 1, "1", "code"),
            ("intent", 1, "1", "code"),
            ("medication[x]", 1, "1", "CodeableConcept"),
            ("subject", 1, "1", "Reference"),
        ],
        "Task" => &[
            ("identifier", 0, "*", "Identifier"),
            ("status", 1, "1", "code"),
            ("intent", 1, "1", "code"),
        ],
        "Extension" => &[("url", 1, "1", "uri"), ("value[x]", 0, "1", "Element")],
        "Coding" => &[
            ("system", 0, "1", "uri"),
            ("version", 0, "1", "string"),
            ("code", 0, "1", "code"),
            ("display", 0, "1", "string"),
        ],
        "CodeableConcept" => &[("coding", 0, "*", "Coding"), ("text", 0, "1", "string")],
        "Identifier" => &[("system", 0, "1", "uri"), ("value", 0, "1", "string")],
        _ => &[],
    }
}

fn element(path: String, min: u32, max: &str, type_code: Option<&str>) -> ElementDefinition {
    let mut element = ElementDefinition::new(path, min, max);
    if let Some(code) = type_code {
        element.types.push(ElementDefinitionType {
            code: code.to_string(),
            profile: Vec::new(),
            target_profile: Vec::new(),
        });
    }
    element
}

fn base_snapshot(type_name: &str, kind: BaseKind) -> Snapshot {
    let mut elements = vec![element(type_name.to_string(), 0, "*", None)];
    let child = |name: &str, min, max, type_code| {
        element(format!("{}.{}", type_name, name), min, max, Some(type_code))
    };

    match kind {
        BaseKind::Resource | BaseKind::DomainResource => {
            elements.push(child("id", 0, "1", "id"));
            elements.push(child("meta", 0, "1", "Meta"));
            elements.push(child("implicitRules", 0, "1", "uri"));
            elements.push(child("language", 0, "1", "code"));
            if kind == BaseKind::DomainResource {
                elements.push(child("text", 0, "1", "Narrative"));
                elements.push(child("contained", 0, "*", "Resource"));
                elements.push(child("extension", 0, "*", "Extension"));
                elements.push(child("modifierExtension", 0, "*", "Extension"));
            }
        }
        BaseKind::ComplexType => {
            elements.push(child("id", 0, "1", "string"));
            elements.push(child("extension", 0, "*", "Extension"));
        }
    }

    for (name, min, max, type_code) in mandatory_elements(type_name) {
        elements.push(child(name, *min, *max, *type_code));
    }
    if type_name == "Bundle" {
        elements.push(child("entry.fullUrl", 0, "1", "uri"));
        elements.push(child("entry.resource", 0, "1", "Resource"));
    }

    Snapshot { element: elements }
}

fn synthesize(type_name: &str, kind: BaseKind) -> StructureDefinition {
    let base_definition = match kind {
        BaseKind::Resource => "Resource",
        BaseKind::DomainResource => "DomainResource",
        BaseKind::ComplexType => "Element",
    };
    StructureDefinition {
        resource_type: "StructureDefinition".to_string(),
        id: Some(type_name.to_string()),
        url: format!("{}{}", BASE_PREFIX, type_name),
        version: Some(R4_VERSION.to_string()),
        name: type_name.to_string(),
        status: Some("active".to_string()),
        kind: match kind {
            BaseKind::ComplexType => StructureDefinitionKind::ComplexType,
            _ => StructureDefinitionKind::Resource,
        },
        is_abstract: Some(false),
        type_: type_name.to_string(),
        base_definition: Some(format!("{}{}", BASE_PREFIX, base_definition)),
        derivation: Some(TypeDerivationRule::Specialization),
        snapshot: Some(base_snapshot(type_name, kind)),
        differential: None,
        extensions: HashMap::new(),
    }
}

/// Base definitions of the R4 core types, built on first use
#[derive(Debug, Default)]
pub struct DefaultProfileSupport {
    cache: RwLock<HashMap<&'static str, Arc<StructureDefinition>>>,
}

impl DefaultProfileSupport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValidationSupport for DefaultProfileSupport {
    fn name(&self) -> String {
        "default profiles".to_string()
    }

    fn fetch_structure_definition(&self, url: &str) -> Option<Arc<StructureDefinition>> {
        let (base, version) = canonical::split(url);
        if version.is_some_and(|v| !v.is_empty() && v != R4_VERSION) {
            return None;
        }
        let type_name = base.strip_prefix(BASE_PREFIX)?;
        let (name, kind) = BASE_TYPES.get_entry(type_name)?;

        if let Some(hit) = self.cache.read().ok().and_then(|c| c.get(name).cloned()) {
            return Some(hit);
        }

        let sd = Arc::new(synthesize(name, *kind));
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(*name, Arc::clone(&sd));
        }
        tracing::trace!(url, "Synthesized base StructureDefinition");
        Some(sd)
    }
}
