// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Activity wrapper factory registry.
//!
//! Factories are keyed by lower-cased activity type and version. A factory
//! without a version is stored under `0.0.0`, so it loses to any versioned
//! factory of the same type and can still be addressed explicitly with
//! `type;0.0.0`.
//!
//! Type specs resolve as follows:
//!
//! | Spec | Result |
//! |------|--------|
//! | `type` | highest registered version |
//! | `type;1.2.3` | exactly `1.2.3` |
//! | `type;[1.0,2.0)` | highest version inside the range |
//!
//! Registering a second factory with the same type and version replaces the
//! first one.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use livespace_core::{Version, VersionRange};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::wrapper::ActivityWrapperFactory;

/// Separates the activity type from its version qualifier in a type spec.
pub const VERSION_RANGE_SEPARATOR: char = ';';

/// Registry of activity wrapper factories.
#[derive(Default)]
pub struct ActivityWrapperRegistry {
    factories: DashMap<String, BTreeMap<Version, Arc<dyn ActivityWrapperFactory>>>,
}

fn factory_version(factory: &dyn ActivityWrapperFactory) -> Version {
    factory.version().cloned().unwrap_or(Version::ZERO)
}

impl ActivityWrapperRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its activity type and version.
    ///
    /// Returns the factory it replaced, if one was registered with the same
    /// type and version.
    pub fn register_activity_wrapper_factory(
        &self,
        factory: Arc<dyn ActivityWrapperFactory>,
    ) -> Option<Arc<dyn ActivityWrapperFactory>> {
        let activity_type = factory.activity_type().to_lowercase();
        let version = factory_version(factory.as_ref());

        let previous = self
            .factories
            .entry(activity_type.clone())
            .or_default()
            .insert(version.clone(), factory);

        if previous.is_some() {
            warn!(
                activity_type = %activity_type,
                version = %version,
                "Activity wrapper factory was already registered, the previous one has been replaced"
            );
        } else {
            info!(
                activity_type = %activity_type,
                version = %version,
                "Registered activity wrapper factory"
            );
        }

        previous
    }

    /// Unregister a factory.
    ///
    /// Only removes the entry for the factory's type and version if it is this
    /// very factory. Returns whether anything was removed.
    pub fn unregister_activity_wrapper_factory(
        &self,
        factory: &Arc<dyn ActivityWrapperFactory>,
    ) -> bool {
        let activity_type = factory.activity_type().to_lowercase();
        let version = factory_version(factory.as_ref());

        let removed = match self.factories.get_mut(&activity_type) {
            Some(mut versions) => {
                let same = versions
                    .get(&version)
                    .is_some_and(|registered| Arc::ptr_eq(registered, factory));
                if same {
                    versions.remove(&version);
                }
                same
            }
            None => false,
        };

        if removed {
            self.factories
                .remove_if(&activity_type, |_, versions| versions.is_empty());
            info!(
                activity_type = %activity_type,
                version = %version,
                "Unregistered activity wrapper factory"
            );
        } else {
            debug!(
                activity_type = %activity_type,
                version = %version,
                "Activity wrapper factory not registered, nothing to unregister"
            );
        }

        removed
    }

    /// Resolve the factory for a type spec (`type`, `type;version` or `type;[min,max)`).
    pub fn resolve_factory(&self, type_spec: &str) -> Result<Arc<dyn ActivityWrapperFactory>> {
        let (bare_type, qualifier) = match type_spec.split_once(VERSION_RANGE_SEPARATOR) {
            Some((bare_type, qualifier)) => (bare_type.trim(), Some(qualifier.trim())),
            None => (type_spec.trim(), None),
        };
        let range = qualifier.map(VersionRange::parse).transpose()?;

        let versions = self
            .factories
            .get(&bare_type.to_lowercase())
            .filter(|versions| !versions.is_empty())
            .ok_or_else(|| Error::UnknownActivityType(bare_type.to_string()))?;

        let factory = match &range {
            None => versions.values().next_back().cloned(),
            Some(range) => versions
                .range(range.minimum().clone()..=range.maximum().clone())
                .rev()
                .find(|(version, _)| range.contains(version))
                .map(|(_, factory)| factory.clone()),
        };

        factory.ok_or_else(|| Error::UnresolvableVersion {
            activity_type: bare_type.to_string(),
            version: qualifier.unwrap_or_default().to_string(),
        })
    }

    /// Registered versions of an activity type, lowest first.
    pub fn registered_versions(&self, activity_type: &str) -> Vec<Version> {
        self.factories
            .get(&activity_type.to_lowercase())
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrapper::MockActivityWrapperFactory;

    fn factory(activity_type: &str, version: Option<Version>) -> Arc<dyn ActivityWrapperFactory> {
        match version {
            Some(version) => Arc::new(MockActivityWrapperFactory::versioned(activity_type, version)),
            None => Arc::new(MockActivityWrapperFactory::new(activity_type)),
        }
    }

    #[test]
    fn test_resolution_scenario() {
        let registry = ActivityWrapperRegistry::new();
        let f1 = factory("foo", Some(Version::new(1, 2, 3)));
        let f0 = factory("foo", None);
        registry.register_activity_wrapper_factory(f1.clone());
        registry.register_activity_wrapper_factory(f0.clone());

        assert!(Arc::ptr_eq(&registry.resolve_factory("foo").unwrap(), &f1));
        assert!(Arc::ptr_eq(&registry.resolve_factory("foo;0.0.0").unwrap(), &f0));
        assert!(matches!(
            registry.resolve_factory("foo;[5,6)"),
            Err(Error::UnresolvableVersion { .. })
        ));
    }

    #[test]
    fn test_exact_version() {
        let registry = ActivityWrapperRegistry::new();
        let versions = [
            Version::new(1, 0, 0),
            Version::new(1, 1, 0),
            Version::new(2, 0, 0),
        ];
        let factories: Vec<_> = versions
            .iter()
            .map(|v| factory("bar", Some(v.clone())))
            .collect();
        for f in &factories {
            registry.register_activity_wrapper_factory(f.clone());
        }

        for (version, f) in versions.iter().zip(&factories) {
            let resolved = registry.resolve_factory(&format!("bar;{}", version)).unwrap();
            assert!(Arc::ptr_eq(&resolved, f));
        }
        assert!(registry.resolve_factory("bar;1.0.1").is_err());
    }

    #[test]
    fn test_range_picks_highest_in_range() {
        let registry = ActivityWrapperRegistry::new();
        let f10 = factory("bar", Some(Version::new(1, 0, 0)));
        let f12 = factory("bar", Some(Version::new(1, 2, 0)));
        let f13 = factory("bar", Some(Version::new(1, 3, 0)));
        for f in [&f10, &f12, &f13] {
            registry.register_activity_wrapper_factory(f.clone());
        }

        assert!(Arc::ptr_eq(&registry.resolve_factory("bar;[1.0,1.3)").unwrap(), &f12));
        assert!(Arc::ptr_eq(&registry.resolve_factory("bar;[1.0,1.3]").unwrap(), &f13));
        assert!(Arc::ptr_eq(&registry.resolve_factory("bar").unwrap(), &f13));
    }

    #[test]
    fn test_unknown_type() {
        let registry = ActivityWrapperRegistry::new();
        registry.register_activity_wrapper_factory(factory("foo", None));

        assert!(matches!(
            registry.resolve_factory("nope"),
            Err(Error::UnknownActivityType(t)) if t == "nope"
        ));
        assert!(matches!(
            registry.resolve_factory("nope;1.0"),
            Err(Error::UnknownActivityType(_))
        ));
    }

    #[test]
    fn test_type_is_case_insensitive() {
        let registry = ActivityWrapperRegistry::new();
        let f = factory("Native", None);
        registry.register_activity_wrapper_factory(f.clone());

        assert!(Arc::ptr_eq(&registry.resolve_factory("NATIVE").unwrap(), &f));
        assert!(Arc::ptr_eq(&registry.resolve_factory("native;0.0.0").unwrap(), &f));
    }

    #[test]
    fn test_malformed_qualifier() {
        let registry = ActivityWrapperRegistry::new();
        registry.register_activity_wrapper_factory(factory("foo", None));

        assert!(matches!(
            registry.resolve_factory("foo;[1.0"),
            Err(Error::Version(_))
        ));
        assert!(matches!(
            registry.resolve_factory("foo;latest"),
            Err(Error::Version(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_replaces() {
        let registry = ActivityWrapperRegistry::new();
        let first = factory("foo", Some(Version::new(1, 0, 0)));
        let second = factory("foo", Some(Version::new(1, 0, 0)));

        assert!(registry.register_activity_wrapper_factory(first.clone()).is_none());
        let replaced = registry
            .register_activity_wrapper_factory(second.clone())
            .unwrap();

        assert!(Arc::ptr_eq(&replaced, &first));
        assert!(Arc::ptr_eq(&registry.resolve_factory("foo;1.0.0").unwrap(), &second));
        assert_eq!(registry.registered_versions("foo"), vec![Version::new(1, 0, 0)]);
    }

    #[test]
    fn test_unregister_only_same_factory() {
        let registry = ActivityWrapperRegistry::new();
        let registered = factory("foo", Some(Version::new(1, 0, 0)));
        let other = factory("foo", Some(Version::new(1, 0, 0)));
        registry.register_activity_wrapper_factory(registered.clone());

        assert!(!registry.unregister_activity_wrapper_factory(&other));
        assert!(registry.resolve_factory("foo").is_ok());

        assert!(registry.unregister_activity_wrapper_factory(&registered));
        assert!(matches!(
            registry.resolve_factory("foo"),
            Err(Error::UnknownActivityType(_))
        ));
    }
}
