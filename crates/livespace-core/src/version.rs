// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Versions and version ranges.
//!
//! A version has the form `major[.minor[.micro]][.qualifier]` where the numeric
//! sections are digits and the qualifier starts with a letter or digit followed
//! by letters, digits or underscores. Missing numeric sections are zero.
//!
//! Ordering and equality only consider the numeric sections; the qualifier is
//! carried along for display.
//!
//! Ranges use interval notation: `[1.0,2.0)` is inclusive of `1.0` and
//! exclusive of `2.0`, `[1.0,2.0]` is inclusive of both. A bare version is a
//! range containing exactly that version.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A dotted version number.
#[derive(Debug, Clone)]
pub struct Version {
    major: u32,
    minor: u32,
    micro: u32,
    qualifier: Option<String>,
}

impl Version {
    /// Version `0.0.0`.
    pub const ZERO: Version = Version::new(0, 0, 0);

    /// Create a version with no qualifier.
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: None,
        }
    }

    /// Create a version with a qualifier.
    pub fn with_qualifier(major: u32, minor: u32, micro: u32, qualifier: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: Some(qualifier.into()),
        }
    }

    /// Parse a version from text.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let illegal = || Error::InvalidVersion(text.to_string());

        if text.is_empty() {
            return Err(illegal());
        }

        let mut numbers = [0u32; 3];
        let mut numeric_sections = 0;
        let mut qualifier = None;

        for section in text.split('.') {
            if qualifier.is_some() {
                // Nothing may follow the qualifier.
                return Err(illegal());
            }

            let all_digits = !section.is_empty() && section.bytes().all(|b| b.is_ascii_digit());
            if all_digits && numeric_sections < 3 {
                numbers[numeric_sections] = section.parse().map_err(|_| illegal())?;
                numeric_sections += 1;
            } else if numeric_sections > 0 && is_legal_qualifier(section) {
                qualifier = Some(section.to_string());
            } else {
                return Err(illegal());
            }
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier,
        })
    }

    /// Major version number.
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Minor version number.
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Micro version number.
    pub fn micro(&self) -> u32 {
        self.micro
    }

    /// Version qualifier, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    fn numeric(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.micro)
    }
}

fn is_legal_qualifier(section: &str) -> bool {
    let mut chars = section.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.numeric() == other.numeric()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numeric().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric().cmp(&other.numeric())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, ".{}", qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Version::parse(&text).map_err(D::Error::custom)
    }
}

/// A range of versions between a minimum and a maximum.
///
/// The minimum is always inclusive. The maximum is inclusive only when
/// [`is_inclusive`](Self::is_inclusive) is true.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    minimum: Version,
    maximum: Version,
    inclusive: bool,
}

impl VersionRange {
    /// Create a range. Bounds given in the wrong order are swapped, and a range
    /// whose bounds are equal is always inclusive.
    pub fn new(minimum: Version, maximum: Version, inclusive: bool) -> Self {
        if minimum == maximum {
            Self {
                minimum,
                maximum,
                inclusive: true,
            }
        } else if maximum < minimum {
            Self {
                minimum: maximum,
                maximum: minimum,
                inclusive,
            }
        } else {
            Self {
                minimum,
                maximum,
                inclusive,
            }
        }
    }

    /// A range containing exactly one version.
    pub fn exact(version: Version) -> Self {
        Self::new(version.clone(), version, true)
    }

    /// Parse a range in interval notation, or a bare version for an exact range.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let illegal = |reason| Error::InvalidVersionRange {
            range: text.to_string(),
            reason,
        };

        let Some(body) = text.strip_prefix('[') else {
            return Ok(Self::exact(Version::parse(text)?));
        };

        let (body, inclusive) = if let Some(body) = body.strip_suffix(']') {
            (body, true)
        } else if let Some(body) = body.strip_suffix(')') {
            (body, false)
        } else {
            return Err(illegal("does not end with ] or )"));
        };

        let (minimum, maximum) = body.split_once(',').ok_or(illegal("missing comma"))?;

        Ok(Self::new(
            Version::parse(minimum)?,
            Version::parse(maximum)?,
            inclusive,
        ))
    }

    /// Lower bound (inclusive).
    pub fn minimum(&self) -> &Version {
        &self.minimum
    }

    /// Upper bound.
    pub fn maximum(&self) -> &Version {
        &self.maximum
    }

    /// Whether the upper bound is part of the range.
    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    /// Whether the range contains exactly one version.
    pub fn is_exact(&self) -> bool {
        self.minimum == self.maximum
    }

    /// Check if a version falls inside the range.
    pub fn contains(&self, version: &Version) -> bool {
        if *version < self.minimum {
            return false;
        }

        match version.cmp(&self.maximum) {
            Ordering::Less => true,
            Ordering::Equal => self.inclusive,
            Ordering::Greater => false,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            write!(f, "{}", self.minimum)
        } else {
            write!(
                f,
                "[{},{}{}",
                self.minimum,
                self.maximum,
                if self.inclusive { ']' } else { ')' }
            )
        }
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        VersionRange::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        VersionRange::parse(&text).map_err(D::Error::custom)
    }
}
