//! Profile families: the namespaces profile generations are published under.

use crate::canonical;
use crate::error::{ProfileError, Result};
use crate::version::{KnownVersion, ProfileVersion};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named namespace owning canonical URL claims and a closed list of versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProfileFamily {
    /// HL7 FHIR R4 core
    Hl7,
    /// HL7 Germany base profiles
    DeBasis,
    /// KBV base profiles
    KbvBasis,
    /// KBV prescription form data (patient, practitioner, coverage)
    KbvItaFor,
    /// KBV e-prescription bundle
    KbvItaErp,
    /// gematik e-prescription workflow
    ErpWorkflow,
    /// gematik patient billing information for private insurance
    PatientBilling,
    /// ABDA dispensation data (statutory insurance)
    AbdaErpBasis,
    /// ABDA dispensation data (private insurance)
    AbdaErpPkv,
    /// Code systems and value sets shared between DAV and KBV
    DavKbvCsVs,
}

const fn v(major: u16, minor: u16, patch: u16) -> ProfileVersion {
    ProfileVersion::new(major, minor, patch)
}

const OPEN_END: (i32, u32, u32) = (9999, 12, 31);

const HL7_VERSIONS: &[KnownVersion] = &[KnownVersion::new(v(4, 0, 1), (2019, 10, 30), OPEN_END)];

const DE_BASIS_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(0, 9, 13), (2020, 1, 1), (2023, 6, 30)),
    KnownVersion::new(v(1, 3, 2), (2023, 7, 1), (2024, 10, 31)),
    KnownVersion::new(v(1, 4, 0), (2024, 11, 1), OPEN_END),
];

const KBV_BASIS_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(1, 1, 3), (2020, 1, 1), (2023, 6, 30)),
    KnownVersion::new(v(1, 3, 0), (2023, 7, 1), (2025, 6, 30)),
    KnownVersion::new(v(1, 7, 0), (2025, 7, 1), OPEN_END),
];

const KBV_ITA_FOR_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(1, 0, 3), (2020, 1, 1), (2023, 6, 30)),
    KnownVersion::new(v(1, 1, 0), (2023, 7, 1), (2025, 6, 30)),
    KnownVersion::new(v(1, 2, 0), (2025, 7, 1), OPEN_END),
];

const KBV_ITA_ERP_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(1, 0, 2), (2020, 1, 1), (2023, 6, 30)),
    KnownVersion::new(v(1, 1, 0), (2023, 7, 1), (2025, 6, 30)),
    KnownVersion::new(v(1, 3, 0), (2025, 7, 1), OPEN_END),
];

const ERP_WORKFLOW_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(1, 1, 1), (2020, 1, 1), (2022, 12, 31)),
    KnownVersion::new(v(1, 2, 0), (2023, 1, 1), (2023, 6, 30)),
    KnownVersion::new(v(1, 3, 0), (2023, 7, 1), (2024, 10, 31)),
    KnownVersion::new(v(1, 4, 0), (2024, 11, 1), (2025, 6, 30)),
    KnownVersion::new(v(1, 5, 0), (2025, 7, 1), OPEN_END),
];

const PATIENT_BILLING_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(1, 0, 0), (2023, 1, 1), (2024, 10, 31)),
    KnownVersion::new(v(1, 1, 0), (2024, 11, 1), OPEN_END),
];

const ABDA_ERP_BASIS_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(1, 1, 0), (2020, 1, 1), (2024, 10, 31)),
    KnownVersion::new(v(1, 2, 0), (2024, 11, 1), OPEN_END),
];

const ABDA_ERP_PKV_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(1, 1, 0), (2020, 1, 1), (2023, 6, 30)),
    KnownVersion::new(v(1, 2, 0), (2023, 7, 1), (2024, 10, 31)),
    KnownVersion::new(v(1, 3, 0), (2024, 11, 1), OPEN_END),
];

const DAV_KBV_CS_VS_VERSIONS: &[KnownVersion] = &[
    KnownVersion::new(v(1, 0, 2), (2020, 1, 1), (2023, 6, 30)),
    KnownVersion::new(v(1, 0, 3), (2023, 7, 1), OPEN_END),
];

impl ProfileFamily {
    /// Every known family, in name-resolution order
    pub const ALL: [ProfileFamily; 10] = [
        Self::ErpWorkflow,
        Self::PatientBilling,
        Self::KbvItaErp,
        Self::KbvItaFor,
        Self::KbvBasis,
        Self::DeBasis,
        Self::AbdaErpBasis,
        Self::AbdaErpPkv,
        Self::DavKbvCsVs,
        Self::Hl7,
    ];

    /// Short (package) name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hl7 => "hl7.fhir.r4.core",
            Self::DeBasis => "de.basisprofil.r4",
            Self::KbvBasis => "kbv.basis",
            Self::KbvItaFor => "kbv.ita.for",
            Self::KbvItaErp => "kbv.ita.erp",
            Self::ErpWorkflow => "de.gematik.erezept-workflow.r4",
            Self::PatientBilling => "de.gematik.erezept-patientenrechnung.r4",
            Self::AbdaErpBasis => "de.abda.erezeptabgabedatenbasis",
            Self::AbdaErpPkv => "de.abda.erezeptabgabedatenpkv",
            Self::DavKbvCsVs => "dav.kbv.sfhir.cs.vs",
        }
    }

    /// Canonical URL namespaces owned by this family
    pub fn claims(&self) -> &'static [&'static str] {
        match self {
            Self::Hl7 => &["http://hl7.org/fhir", "http://terminology.hl7.org"],
            Self::DeBasis => &[
                "http://fhir.de/StructureDefinition",
                "http://fhir.de/CodeSystem",
                "http://fhir.de/NamingSystem",
                "http://fhir.de/ValueSet",
                "http://fhir.de/sid",
            ],
            Self::KbvBasis => &[
                "https://fhir.kbv.de/StructureDefinition/KBV_PR_Base",
                "https://fhir.kbv.de/StructureDefinition/KBV_EX_Base",
                "https://fhir.kbv.de/CodeSystem/KBV_CS_Base",
                "https://fhir.kbv.de/ValueSet/KBV_VS_Base",
                "https://fhir.kbv.de/NamingSystem/KBV_NS_Base",
            ],
            Self::KbvItaFor => &[
                "https://fhir.kbv.de/StructureDefinition/KBV_PR_FOR",
                "https://fhir.kbv.de/StructureDefinition/KBV_EX_FOR",
                "https://fhir.kbv.de/CodeSystem/KBV_CS_FOR",
                "https://fhir.kbv.de/ValueSet/KBV_VS_FOR",
                "https://fhir.kbv.de/NamingSystem/KBV_NS_FOR",
            ],
            Self::KbvItaErp => &[
                "https://fhir.kbv.de/StructureDefinition/KBV_PR_ERP",
                "https://fhir.kbv.de/StructureDefinition/KBV_EX_ERP",
                "https://fhir.kbv.de/CodeSystem/KBV_CS_ERP",
                "https://fhir.kbv.de/ValueSet/KBV_VS_ERP",
            ],
            Self::ErpWorkflow => &[
                "https://gematik.de/fhir/erp/",
                "https://gematik.de/fhir/StructureDefinition/",
                "https://gematik.de/fhir/CodeSystem/",
                "https://gematik.de/fhir/NamingSystem/",
                "https://gematik.de/fhir/ValueSet/",
            ],
            Self::PatientBilling => &["https://gematik.de/fhir/erpchrg/"],
            Self::AbdaErpBasis => &[
                "http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-EX-ERP",
                "http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PR-ERP",
                "http://fhir.abda.de/eRezeptAbgabedaten/CodeSystem/DAV-CS-ERP",
                "http://fhir.abda.de/eRezeptAbgabedaten/ValueSet/DAV-VS-ERP",
            ],
            Self::AbdaErpPkv => &[
                "http://fhir.abda.de/eRezeptAbgabedaten/StructureDefinition/DAV-PKV",
                "http://fhir.abda.de/eRezeptAbgabedaten/CodeSystem/DAV-PKV",
            ],
            Self::DavKbvCsVs => &[
                "https://fhir.kbv.de/CodeSystem/KBV_CS_SFHIR",
                "https://fhir.kbv.de/ValueSet/KBV_VS_SFHIR",
                "http://fhir.abda.de/CodeSystem/DAV",
            ],
        }
    }

    /// Closed list of versions, oldest first
    pub fn known_versions(&self) -> &'static [KnownVersion] {
        match self {
            Self::Hl7 => HL7_VERSIONS,
            Self::DeBasis => DE_BASIS_VERSIONS,
            Self::KbvBasis => KBV_BASIS_VERSIONS,
            Self::KbvItaFor => KBV_ITA_FOR_VERSIONS,
            Self::KbvItaErp => KBV_ITA_ERP_VERSIONS,
            Self::ErpWorkflow => ERP_WORKFLOW_VERSIONS,
            Self::PatientBilling => PATIENT_BILLING_VERSIONS,
            Self::AbdaErpBasis => ABDA_ERP_BASIS_VERSIONS,
            Self::AbdaErpPkv => ABDA_ERP_PKV_VERSIONS,
            Self::DavKbvCsVs => DAV_KBV_CS_VS_VERSIONS,
        }
    }

    /// First family whose short name is contained in `text`
    pub fn resolve_by_name(text: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|family| text.contains(family.name()))
            .ok_or_else(|| ProfileError::UnknownProfile(text.to_string()))
    }

    /// Does the (possibly versioned) URL lie in one of this family's namespaces?
    pub fn matches_claim(&self, url: &str) -> bool {
        self.claims()
            .iter()
            .any(|claim| canonical::within_namespace(claim, url))
    }

    /// The family owning the URL, if any
    pub fn owning(url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.matches_claim(url))
    }

    /// Extract a version from `text` and require it to be known for this family
    pub fn parse_version(&self, text: &str) -> Result<ProfileVersion> {
        let version = ProfileVersion::find_in(text)?;
        if self.is_known_version(&version) {
            Ok(version)
        } else {
            Err(ProfileError::UnknownVersion {
                family: self.name().to_string(),
                version: version.to_string(),
            })
        }
    }

    pub fn is_known_version(&self, version: &ProfileVersion) -> bool {
        self.known_versions().iter().any(|k| k.version == *version)
    }

    /// The only version, or the first one whose validity window contains `on`
    pub fn default_version(&self, on: NaiveDate) -> Result<ProfileVersion> {
        let versions = self.known_versions();
        if let [only] = versions {
            return Ok(only.version);
        }
        versions
            .iter()
            .find(|k| k.is_valid_on(on))
            .map(|k| k.version)
            .ok_or_else(|| ProfileError::NoDefaultVersion {
                family: self.name().to_string(),
                date: on,
            })
    }

    /// Newest known version
    pub fn latest_version(&self) -> ProfileVersion {
        self.known_versions()
            .iter()
            .map(|k| k.version)
            .max()
            .unwrap_or(ProfileVersion::new(0, 0, 0))
    }
}

impl fmt::Display for ProfileFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfileFamily {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self> {
        Self::resolve_by_name(s)
    }
}

impl TryFrom<String> for ProfileFamily {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self> {
        Self::resolve_by_name(&value)
    }
}

impl From<ProfileFamily> for String {
    fn from(value: ProfileFamily) -> Self {
        value.name().to_string()
    }
}

/// A (family, concrete version) pair; the unit a resource store is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedProfile {
    pub family: ProfileFamily,
    pub version: ProfileVersion,
}

impl VersionedProfile {
    pub fn new(family: ProfileFamily, version: ProfileVersion) -> Self {
        Self { family, version }
    }

    /// Resolve the family by name and the version against it
    pub fn parse(name: &str, version: &str) -> Result<Self> {
        let family = ProfileFamily::resolve_by_name(name)?;
        let version = family.parse_version(version)?;
        Ok(Self { family, version })
    }

    /// Like [`VersionedProfile::parse`], falling back to the default version on `on`
    pub fn resolve(name: &str, version: Option<&str>, on: NaiveDate) -> Result<Self> {
        match version {
            Some(version) => Self::parse(name, version),
            None => {
                let family = ProfileFamily::resolve_by_name(name)?;
                let version = family.default_version(on)?;
                Ok(Self { family, version })
            }
        }
    }

    /// Does the requested version string denote this profile's version?
    pub fn is_version(&self, requested: &str) -> bool {
        self.version.is_equal(requested)
    }
}

impl fmt::Display for VersionedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.family.name(), self.version)
    }
}
