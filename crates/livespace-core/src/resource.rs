// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Named, versioned resources used for dependency negotiation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::{Version, VersionRange};

/// A concrete resource: a name at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedVersionedResource {
    /// Resource name.
    pub name: String,
    /// Resource version.
    pub version: Version,
}

impl NamedVersionedResource {
    /// Create a new resource reference.
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for NamedVersionedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// A dependency on any version of a named resource within a range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceDependencyReference {
    /// Resource name.
    pub name: String,
    /// Acceptable versions.
    pub version_range: VersionRange,
}

impl ResourceDependencyReference {
    /// Create a new dependency reference.
    pub fn new(name: impl Into<String>, version_range: VersionRange) -> Self {
        Self {
            name: name.into(),
            version_range,
        }
    }

    /// Check whether a concrete resource satisfies this dependency.
    pub fn is_satisfied_by(&self, resource: &NamedVersionedResource) -> bool {
        resource.name == self.name && self.version_range.contains(&resource.version)
    }
}

impl fmt::Display for ResourceDependencyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version_range)
    }
}
