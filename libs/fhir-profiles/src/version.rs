//! Profile versions and their validity windows

use crate::error::{ProfileError, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

// fixed pattern, checked by `version_pattern_compiles`
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}\.\d+(?:\.\d+)?)").expect("version regex must compile"));

/// A `MAJOR.MINOR.PATCH` profile version. Two-part versions carry patch 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfileVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ProfileVersion {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse exactly `MAJOR.MINOR` or `MAJOR.MINOR.PATCH`
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || ProfileError::InvalidVersion(input.to_string());
        let parts: Vec<&str> = input.trim().split('.').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid());
        }
        let mut numbers = [0u16; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }

    /// Find the first `MAJOR.MINOR[.PATCH]` occurring anywhere in `text`
    pub fn find_in(text: &str) -> Result<Self> {
        let found = VERSION_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .ok_or_else(|| ProfileError::MissingVersion(text.to_string()))?;
        Self::parse(found.as_str())
    }

    /// `MAJOR.MINOR`, the form used by newer profile generations in canonical suffixes
    pub fn cropped(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// Compare with a version string; `1.4` equals `1.4.0`
    pub fn is_equal(&self, other: &str) -> bool {
        Self::parse(other).is_ok_and(|v| v == *self)
    }
}

impl fmt::Display for ProfileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ProfileVersion {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ProfileVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProfileVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A version known for a profile family, with the window in which it is the
/// default for newly created resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownVersion {
    pub version: ProfileVersion,
    valid_from: (i32, u32, u32),
    valid_until: (i32, u32, u32),
}

impl KnownVersion {
    pub(crate) const fn new(
        version: ProfileVersion,
        valid_from: (i32, u32, u32),
        valid_until: (i32, u32, u32),
    ) -> Self {
        Self {
            version,
            valid_from,
            valid_until,
        }
    }

    pub fn valid_from(&self) -> Option<NaiveDate> {
        let (y, m, d) = self.valid_from;
        NaiveDate::from_ymd_opt(y, m, d)
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        let (y, m, d) = self.valid_until;
        NaiveDate::from_ymd_opt(y, m, d)
    }

    /// Both window bounds are inclusive
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        match (self.valid_from(), self.valid_until()) {
            (Some(from), Some(until)) => from <= date && date <= until,
            _ => false,
        }
    }
}
