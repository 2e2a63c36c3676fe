//! Domain registry.
//!
//! Process-wide mapping from domain name to profile. Profiles are declared
//! statically and registered at startup; there is no runtime discovery.
//! Unknown names raise from [`DomainRegistry::get`]; public entry points
//! degrade them to a logged warning plus the configured default domain via
//! [`DomainRegistry::resolve`].

pub mod auto;
pub mod medicare;
mod profile;

pub use profile::{ChunkOverride, DomainProfile};

use crate::config::RetrievalConfig;
use crate::error::{DomainError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Static table of domain profiles, keyed by name.
pub struct DomainRegistry {
    profiles: BTreeMap<String, Arc<DomainProfile>>,
}

impl DomainRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Creates the registry with the built-in profiles (`medicare`, `auto`).
    ///
    /// # Errors
    ///
    /// Returns an error when a profile fails to construct (pattern or
    /// topic-pack failure is fatal at startup).
    pub fn builtin(config: &RetrievalConfig) -> Result<Self> {
        let mut registry = Self::empty();
        registry.register(medicare::profile(config)?)?;
        registry.register(auto::profile(config)?)?;
        Ok(registry)
    }

    /// Registers a profile.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Duplicate` when the name or collection name
    /// collides with an already-registered profile.
    pub fn register(&mut self, profile: DomainProfile) -> Result<()> {
        if self.profiles.contains_key(&profile.name) {
            return Err(DomainError::Duplicate {
                field: "name",
                value: profile.name,
            }
            .into());
        }
        if let Some(existing) = self
            .profiles
            .values()
            .find(|p| p.collection_name == profile.collection_name)
        {
            return Err(DomainError::Duplicate {
                field: "collection_name",
                value: existing.collection_name.clone(),
            }
            .into());
        }
        self.profiles.insert(profile.name.clone(), Arc::new(profile));
        Ok(())
    }

    /// Looks up a profile by name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Unknown` when the name is not registered.
    pub fn get(&self, name: &str) -> Result<Arc<DomainProfile>> {
        self.profiles.get(name).cloned().ok_or_else(|| {
            DomainError::Unknown {
                name: name.to_string(),
                available: self.names().join(", "),
            }
            .into()
        })
    }

    /// Resolves an optional requested name, falling back to
    /// `default_domain` with a logged warning when the name is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error only when the default domain itself is missing
    /// (a configuration failure).
    pub fn resolve(&self, requested: Option<&str>, default_domain: &str) -> Result<Arc<DomainProfile>> {
        match requested {
            None => self.get(default_domain),
            Some(name) => self.get(name).or_else(|_| {
                tracing::warn!(
                    domain = name,
                    fallback = default_domain,
                    "unknown domain, falling back to default"
                );
                self.get(default_domain)
            }),
        }
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn registry() -> DomainRegistry {
        DomainRegistry::builtin(&RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn test_builtin_registry() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["auto", "medicare"]);
        assert_eq!(registry.get("medicare").unwrap().collection_name, "medicare");
        assert_eq!(registry.get("auto").unwrap().collection_name, "auto_insurance");
    }

    #[test]
    fn test_get_unknown_raises() {
        let err = registry().get("dental").unwrap_err();
        match err {
            Error::Domain(DomainError::Unknown { name, available }) => {
                assert_eq!(name, "dental");
                assert_eq!(available, "auto, medicare");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_falls_back() {
        let registry = registry();
        let profile = registry.resolve(Some("dental"), "medicare").unwrap();
        assert_eq!(profile.name, "medicare");

        let profile = registry.resolve(None, "auto").unwrap();
        assert_eq!(profile.name, "auto");

        let profile = registry.resolve(Some("auto"), "medicare").unwrap();
        assert_eq!(profile.name, "auto");
    }

    #[test]
    fn test_resolve_missing_default_is_error() {
        let registry = DomainRegistry::empty();
        assert!(registry.resolve(Some("anything"), "medicare").is_err());
    }

    #[test]
    fn test_register_duplicate_name() {
        let mut registry = registry();
        let dup = medicare::profile(&RetrievalConfig::default()).unwrap();
        let err = registry.register(dup).unwrap_err();
        assert!(matches!(
            err,
            Error::Domain(DomainError::Duplicate { field: "name", .. })
        ));
    }

    #[test]
    fn test_register_duplicate_collection() {
        let mut registry = registry();
        let mut clash = medicare::profile(&RetrievalConfig::default()).unwrap();
        clash.name = "medicare2".to_string();
        let err = registry.register(clash).unwrap_err();
        assert!(matches!(
            err,
            Error::Domain(DomainError::Duplicate {
                field: "collection_name",
                ..
            })
        ));
    }
}
