//! Declarative catalog of the structural contracts, code systems and naming
//! systems of each profile family.
//!
//! Each entry resolves to its canonical URL. Floating entries receive their
//! version at lookup time; frozen entries ([`FixedStructDef`]) embed it.

use crate::canonical;
use crate::family::ProfileFamily;
use crate::version::ProfileVersion;
use serde_json::Value;

/// A catalog entry identified by a canonical URL
pub trait CanonicalEntry {
    /// The canonical URL, including an embedded version for frozen entries
    fn canonical_url(&self) -> &'static str;

    /// The family owning the entry
    fn family(&self) -> ProfileFamily;

    /// The URL without any embedded version, usable as a matching claim
    fn unversioned_url(&self) -> &'static str {
        canonical::unversioned(self.canonical_url())
    }

    /// The version embedded in the canonical URL of a frozen entry
    fn embedded_version(&self) -> Option<&'static str> {
        canonical::version_of(self.canonical_url())
    }

    /// `url|major.minor.patch`, or `url|major.minor` when cropping.
    /// Frozen entries ignore the requested version.
    fn versioned_url(&self, version: &ProfileVersion, crop_to_minor: bool) -> String {
        if self.embedded_version().is_some() {
            return self.canonical_url().to_string();
        }
        let version = if crop_to_minor {
            version.cropped()
        } else {
            version.to_string()
        };
        canonical::with_version(self.canonical_url(), &version)
    }

    fn matches(&self, candidate: &str) -> bool {
        canonical::matches(self.unversioned_url(), candidate)
    }

    fn matches_coding(&self, coding: &Value) -> bool {
        canonical::matches_coding(self.unversioned_url(), coding)
    }

    fn matches_identifier(&self, identifier: &Value) -> bool {
        canonical::matches_identifier(self.unversioned_url(), identifier)
    }

    fn matches_profile(&self, resource: &Value) -> bool {
        canonical::matches_profile(self.unversioned_url(), resource)
    }
}

/// A structural contract: additionally knows the resource type it constrains
pub trait StructureEntry: CanonicalEntry {
    fn resource_type(&self) -> &'static str;
}

macro_rules! catalog_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $family:expr, {
            $($variant:ident => $url:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Look up the entry whose unversioned URL matches the candidate
            pub fn from_url(candidate: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|e| e.matches(candidate))
            }
        }

        impl CanonicalEntry for $name {
            fn canonical_url(&self) -> &'static str {
                match self {
                    $($name::$variant => $url),+
                }
            }

            fn family(&self) -> ProfileFamily {
                $family
            }
        }
    };
}

macro_rules! structure_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $family:expr, {
            $($variant:ident => ($url:expr, $rt:expr)),+ $(,)?
        }
    ) => {
        catalog_enum!(
            $(#[$meta])*
            $name, $family, {
                $($variant => $url),+
            }
        );

        impl StructureEntry for $name {
            fn resource_type(&self) -> &'static str {
                match self {
                    $($name::$variant => $rt),+
                }
            }
        }
    };
}

structure_enum!(
    /// Structural contracts of the workflow profiles from 1.2 on
    ErpWorkflowStructDef, ProfileFamily::ErpWorkflow, {
        Task => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Task", "Task"),
        Binary => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Binary", "Binary"),
        Composition => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Composition", "Composition"),
        Receipt => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Bundle", "Bundle"),
        Device => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Device", "Device"),
        Digest => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Digest", "Binary"),
        MedicationDispense => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_MedicationDispense", "MedicationDispense"),
        Medication => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Medication", "Medication"),
        CloseOperationInput => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_PAR_CloseOperation_Input", "Parameters"),
        AuditEvent => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_AuditEvent", "AuditEvent"),
        CommunicationDispReq => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Communication_DispReq", "Communication"),
        CommunicationInfoReq => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Communication_InfoReq", "Communication"),
        CommunicationReply => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Communication_Reply", "Communication"),
        CommunicationRepresentative => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Communication_Representative", "Communication"),
        PrescriptionType => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_EX_PrescriptionType", "Extension"),
        AcceptDate => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_EX_AcceptDate", "Extension"),
        ExpiryDate => ("https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_EX_ExpiryDate", "Extension"),
    }
);

structure_enum!(
    /// Structural contracts of the 1.1.1 workflow profiles (legacy namespace)
    ErpWorkflowLegacyStructDef, ProfileFamily::ErpWorkflow, {
        Task => ("https://gematik.de/fhir/StructureDefinition/ErxTask", "Task"),
        Binary => ("https://gematik.de/fhir/StructureDefinition/ErxBinary", "Binary"),
        Receipt => ("https://gematik.de/fhir/StructureDefinition/ErxReceipt", "Bundle"),
        AuditEvent => ("https://gematik.de/fhir/StructureDefinition/ErxAuditEvent", "AuditEvent"),
        ChargeItem => ("https://gematik.de/fhir/StructureDefinition/ErxChargeItem", "ChargeItem"),
        Consent => ("https://gematik.de/fhir/StructureDefinition/ErxConsent", "Consent"),
        PrescriptionType => ("https://gematik.de/fhir/StructureDefinition/PrescriptionType", "Extension"),
        SupplyOptionsType => ("https://gematik.de/fhir/StructureDefinition/SupplyOptionsType", "Extension"),
        InsuranceProvider => ("https://gematik.de/fhir/StructureDefinition/InsuranceProvider", "Extension"),
        MarkingFlag => ("https://gematik.de/fhir/StructureDefinition/MarkingFlag", "Extension"),
    }
);

catalog_enum!(
    /// Code systems of the workflow profiles
    ErpWorkflowCodeSystem, ProfileFamily::ErpWorkflow, {
        FlowType => "https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_FlowType",
        DocumentType => "https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_DocumentType",
        AvailabilityStatus => "https://gematik.de/fhir/erp/CodeSystem/GEM_ERP_CS_AvailabilityState",
        LegacyFlowType => "https://gematik.de/fhir/CodeSystem/Flowtype",
        LegacyDocumentType => "https://gematik.de/fhir/CodeSystem/Documenttype",
    }
);

catalog_enum!(
    /// Naming systems of the workflow profiles
    ErpWorkflowNamingSystem, ProfileFamily::ErpWorkflow, {
        PrescriptionId => "https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_PrescriptionId",
        AccessCode => "https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_AccessCode",
        Secret => "https://gematik.de/fhir/erp/NamingSystem/GEM_ERP_NS_Secret",
        LegacyPrescriptionId => "https://gematik.de/fhir/NamingSystem/PrescriptionID",
        LegacyAccessCode => "https://gematik.de/fhir/NamingSystem/AccessCode",
        LegacySecret => "https://gematik.de/fhir/NamingSystem/Secret",
    }
);

structure_enum!(
    /// KBV e-prescription bundle contracts
    KbvItaErpStructDef, ProfileFamily::KbvItaErp, {
        Bundle => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Bundle", "Bundle"),
        Composition => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Composition", "Composition"),
        Prescription => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Prescription", "MedicationRequest"),
        MedicationPzn => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Medication_PZN", "Medication"),
        MedicationFreeText => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Medication_FreeText", "Medication"),
        MedicationCompounding => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Medication_Compounding", "Medication"),
        MedicationIngredient => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Medication_Ingredient", "Medication"),
        PracticeSupply => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_PracticeSupply", "SupplyRequest"),
        DosageFlag => ("https://fhir.kbv.de/StructureDefinition/KBV_EX_ERP_DosageFlag", "Extension"),
        StatusCoPayment => ("https://fhir.kbv.de/StructureDefinition/KBV_EX_ERP_StatusCoPayment", "Extension"),
        MultiplePrescription => ("https://fhir.kbv.de/StructureDefinition/KBV_EX_ERP_Multiple_Prescription", "Extension"),
    }
);

structure_enum!(
    /// KBV prescription form contracts
    KbvItaForStructDef, ProfileFamily::KbvItaFor, {
        Patient => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_Patient", "Patient"),
        Practitioner => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_Practitioner", "Practitioner"),
        PractitionerRole => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_PractitionerRole", "PractitionerRole"),
        Organization => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_Organization", "Organization"),
        Coverage => ("https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_Coverage", "Coverage"),
        LegalBasis => ("https://fhir.kbv.de/StructureDefinition/KBV_EX_FOR_Legal_basis", "Extension"),
    }
);

structure_enum!(
    /// Patient billing contracts for private insurance
    PatientBillingStructDef, ProfileFamily::PatientBilling, {
        ChargeItem => ("https://gematik.de/fhir/erpchrg/StructureDefinition/GEM_ERPCHRG_PR_ChargeItem", "ChargeItem"),
        Consent => ("https://gematik.de/fhir/erpchrg/StructureDefinition/GEM_ERPCHRG_PR_Consent", "Consent"),
        CommunicationChargChangeReq => ("https://gematik.de/fhir/erpchrg/StructureDefinition/GEM_ERPCHRG_PR_Communication_ChargChangeReq", "Communication"),
        CommunicationChargChangeReply => ("https://gematik.de/fhir/erpchrg/StructureDefinition/GEM_ERPCHRG_PR_Communication_ChargChangeReply", "Communication"),
        MarkingFlag => ("https://gematik.de/fhir/erpchrg/StructureDefinition/GEM_ERPCHRG_EX_MarkingFlag", "Extension"),
    }
);

catalog_enum!(
    /// Code systems of the patient billing profiles
    PatientBillingCodeSystem, ProfileFamily::PatientBilling, {
        ConsentType => "https://gematik.de/fhir/erpchrg/CodeSystem/GEM_ERPCHRG_CS_ConsentType",
    }
);

structure_enum!(
    /// ABDA dispensation data contracts for private insurance
    AbdaErpPkvStructDef, ProfileFamily::AbdaErpPkv, {
        AbgabedatenBundle => ("http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-AbgabedatenBundle", "Bundle"),
        AbgabedatenComposition => ("http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-AbgabedatenComposition", "Composition"),
        Abgabeinformationen => ("http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-Abgabeinformationen", "MedicationDispense"),
        Abrechnungszeilen => ("http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-Abrechnungszeilen", "Invoice"),
        Apotheke => ("http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-Apotheke", "Organization"),
    }
);

catalog_enum!(
    /// Identifier systems of the German base profiles
    DeBasisNamingSystem, ProfileFamily::DeBasis, {
        KvidGkv => "http://fhir.de/sid/gkv/kvid-10",
        KvidPkv => "http://fhir.de/sid/pkv/kvid-10",
        Iknr => "http://fhir.de/sid/arge-ik/iknr",
        Vknr => "http://fhir.de/sid/kbv/vknr",
    }
);

catalog_enum!(
    /// Code systems of the German base profiles
    DeBasisCodeSystem, ProfileFamily::DeBasis, {
        Pzn => "http://fhir.de/CodeSystem/ifa/pzn",
        Atc => "http://fhir.de/CodeSystem/bfarm/atc",
        IdentifierType => "http://fhir.de/CodeSystem/identifier-type-de-basis",
    }
);

/// Frozen contracts: their URLs embed the version they were published with and
/// never change across profile generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedStructDef {
    KbvErpBundle,
    KbvErpPrescription,
    KbvErpComposition,
    KbvErpMedicationPzn,
    KbvErpMedicationFreeText,
    KbvForPractitioner,
    KbvForPatient,
    KbvForOrganization,
    KbvForCoverage,
    KbvBasePatient,
    ErxMedicationDispense,
    ErxCommunicationDispReq,
    ErxCommunicationInfoReq,
    ErxCommunicationReply,
    ErxCommunicationRepresentative,
    ErpChargChangeReq,
    ErpChargChangeReply,
    DavPkvAbgabedaten,
    DavPkvAbgabeinformationen,
    DavPkvAbrechnungszeilen,
    DavPkvApotheke,
    DavPkvAbgabedatenComposition,
}

impl FixedStructDef {
    pub const ALL: &'static [FixedStructDef] = &[
        Self::KbvErpBundle,
        Self::KbvErpPrescription,
        Self::KbvErpComposition,
        Self::KbvErpMedicationPzn,
        Self::KbvErpMedicationFreeText,
        Self::KbvForPractitioner,
        Self::KbvForPatient,
        Self::KbvForOrganization,
        Self::KbvForCoverage,
        Self::KbvBasePatient,
        Self::ErxMedicationDispense,
        Self::ErxCommunicationDispReq,
        Self::ErxCommunicationInfoReq,
        Self::ErxCommunicationReply,
        Self::ErxCommunicationRepresentative,
        Self::ErpChargChangeReq,
        Self::ErpChargChangeReply,
        Self::DavPkvAbgabedaten,
        Self::DavPkvAbgabeinformationen,
        Self::DavPkvAbrechnungszeilen,
        Self::DavPkvApotheke,
        Self::DavPkvAbgabedatenComposition,
    ];

    /// Look up the frozen entry naming the same contract as the candidate
    pub fn from_url(candidate: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.matches(candidate))
    }
}

impl CanonicalEntry for FixedStructDef {
    fn canonical_url(&self) -> &'static str {
        match self {
            Self::KbvErpBundle => "https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Bundle|1.0.2",
            Self::KbvErpPrescription => "https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Prescription|1.0.2",
            Self::KbvErpComposition => "https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Composition|1.0.2",
            Self::KbvErpMedicationPzn => "https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Medication_PZN|1.0.2",
            Self::KbvErpMedicationFreeText => "https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP_Medication_FreeText|1.0.2",
            Self::KbvForPractitioner => "https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_Practitioner|1.0.3",
            Self::KbvForPatient => "https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_Patient|1.0.3",
            Self::KbvForOrganization => "https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_Organization|1.0.3",
            Self::KbvForCoverage => "https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR_Coverage|1.0.3",
            Self::KbvBasePatient => "https://fhir.kbv.de/StructureDefinition/KBV_PR_Base_Patient|1.1.3",
            Self::ErxMedicationDispense => "https://gematik.de/fhir/StructureDefinition/ErxMedicationDispense|1.1.1",
            Self::ErxCommunicationDispReq => "https://gematik.de/fhir/StructureDefinition/ErxCommunicationDispReq|1.1.1",
            Self::ErxCommunicationInfoReq => "https://gematik.de/fhir/StructureDefinition/ErxCommunicationInfoReq|1.1.1",
            Self::ErxCommunicationReply => "https://gematik.de/fhir/StructureDefinition/ErxCommunicationReply|1.1.1",
            Self::ErxCommunicationRepresentative => "https://gematik.de/fhir/StructureDefinition/ErxCommunicationRepresentative|1.1.1",
            Self::ErpChargChangeReq => "https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Communication_ChargChangeReq|1.2",
            Self::ErpChargChangeReply => "https://gematik.de/fhir/erp/StructureDefinition/GEM_ERP_PR_Communication_ChargChangeReply|1.2",
            Self::DavPkvAbgabedaten => "http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-AbgabedatenBundle|1.1",
            Self::DavPkvAbgabeinformationen => "http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-Abgabeinformationen|1.1",
            Self::DavPkvAbrechnungszeilen => "http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-Abrechnungszeilen|1.1",
            Self::DavPkvApotheke => "http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-Apotheke|1.1",
            Self::DavPkvAbgabedatenComposition => "http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV-PR-ERP-AbgabedatenComposition|1.1",
        }
    }

    fn family(&self) -> ProfileFamily {
        match self {
            Self::KbvErpBundle
            | Self::KbvErpPrescription
            | Self::KbvErpComposition
            | Self::KbvErpMedicationPzn
            | Self::KbvErpMedicationFreeText => ProfileFamily::KbvItaErp,
            Self::KbvForPractitioner
            | Self::KbvForPatient
            | Self::KbvForOrganization
            | Self::KbvForCoverage => ProfileFamily::KbvItaFor,
            Self::KbvBasePatient => ProfileFamily::KbvBasis,
            Self::ErxMedicationDispense
            | Self::ErxCommunicationDispReq
            | Self::ErxCommunicationInfoReq
            | Self::ErxCommunicationReply
            | Self::ErxCommunicationRepresentative
            | Self::ErpChargChangeReq
            | Self::ErpChargChangeReply => ProfileFamily::ErpWorkflow,
            Self::DavPkvAbgabedaten
            | Self::DavPkvAbgabeinformationen
            | Self::DavPkvAbrechnungszeilen
            | Self::DavPkvApotheke
            | Self::DavPkvAbgabedatenComposition => ProfileFamily::AbdaErpPkv,
        }
    }
}

impl StructureEntry for FixedStructDef {
    fn resource_type(&self) -> &'static str {
        match self {
            Self::KbvErpBundle | Self::DavPkvAbgabedaten => "Bundle",
            Self::KbvErpPrescription => "MedicationRequest",
            Self::KbvErpComposition | Self::DavPkvAbgabedatenComposition => "Composition",
            Self::KbvErpMedicationPzn | Self::KbvErpMedicationFreeText => "Medication",
            Self::KbvForPractitioner => "Practitioner",
            Self::KbvForPatient | Self::KbvBasePatient => "Patient",
            Self::KbvForOrganization | Self::DavPkvApotheke => "Organization",
            Self::KbvForCoverage => "Coverage",
            Self::ErxMedicationDispense | Self::DavPkvAbgabeinformationen => "MedicationDispense",
            Self::ErxCommunicationDispReq
            | Self::ErxCommunicationInfoReq
            | Self::ErxCommunicationReply
            | Self::ErxCommunicationRepresentative
            | Self::ErpChargChangeReq
            | Self::ErpChargChangeReply => "Communication",
            Self::DavPkvAbrechnungszeilen => "Invoice",
        }
    }
}

/// The resource type a known structural contract constrains.
///
/// Lets a profile/resource-type mismatch be reported even when the contract
/// body is not loaded.
pub fn resource_type_hint(url: &str) -> Option<&'static str> {
    fn find<E: StructureEntry + Copy>(all: &[E], url: &str) -> Option<&'static str> {
        all.iter().find(|e| e.matches(url)).map(|e| e.resource_type())
    }

    find(ErpWorkflowStructDef::ALL, url)
        .or_else(|| find(ErpWorkflowLegacyStructDef::ALL, url))
        .or_else(|| find(KbvItaErpStructDef::ALL, url))
        .or_else(|| find(KbvItaForStructDef::ALL, url))
        .or_else(|| find(PatientBillingStructDef::ALL, url))
        .or_else(|| find(AbdaErpPkvStructDef::ALL, url))
        .or_else(|| find(FixedStructDef::ALL, url))
}
