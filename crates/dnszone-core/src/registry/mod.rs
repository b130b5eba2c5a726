//! Plugin-based backend registry
//!
//! The registry lets control-plane and cloud DNS backends be registered at
//! runtime and instantiated from configuration by type name.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnszone_core::registry::BackendRegistry;
//! use dnszone_core::config::CloudConfig;
//!
//! let registry = BackendRegistry::with_memory_backends();
//! dnszone_provider_gcp::register(&registry);
//!
//! let cloud = registry.create_cloud(&CloudConfig::Gcp { .. })?;
//! ```

use crate::config::{CloudConfig, ControlPlaneConfig};
use crate::error::{Error, Result};
use crate::memory::{InMemoryCloudDnsFactory, InMemoryControlPlaneFactory};
use crate::traits::{CloudDns, CloudDnsFactory, ControlPlane, ControlPlaneFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Backend registry
///
/// Maps backend type names to factory objects.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. Every write is a single map insert, so a
/// poisoned lock still guards a consistent map and is used as is.
#[derive(Default)]
pub struct BackendRegistry {
    /// Registered control-plane factories
    control_planes: RwLock<HashMap<String, Box<dyn ControlPlaneFactory>>>,

    /// Registered cloud DNS factories
    clouds: RwLock<HashMap<String, Box<dyn CloudDnsFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-memory backends registered as `memory`
    pub fn with_memory_backends() -> Self {
        let registry = Self::new();
        registry.register_control_plane("memory", Box::new(InMemoryControlPlaneFactory));
        registry.register_cloud("memory", Box::new(InMemoryCloudDnsFactory));
        registry
    }

    /// Register a control-plane factory
    ///
    /// # Parameters
    ///
    /// - `name`: Backend type name (e.g., "ocm", "memory")
    /// - `factory`: Factory object for creating backend instances
    pub fn register_control_plane(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ControlPlaneFactory>,
    ) {
        let mut factories = self
            .control_planes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        factories.insert(name.into(), factory);
    }

    /// Register a cloud DNS factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "gcp", "memory")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_cloud(&self, name: impl Into<String>, factory: Box<dyn CloudDnsFactory>) {
        let mut factories = self.clouds.write().unwrap_or_else(PoisonError::into_inner);
        factories.insert(name.into(), factory);
    }

    /// Create a control plane from configuration
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the backend type is not registered
    pub fn create_control_plane(&self, config: &ControlPlaneConfig) -> Result<Box<dyn ControlPlane>> {
        let backend_type = config.type_name();
        let factories = self
            .control_planes
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = factories.get(backend_type).ok_or_else(|| {
            Error::config(format!("Unknown control plane type: {}", backend_type))
        })?;

        factory.create(config)
    }

    /// Create a cloud DNS backend from configuration
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the provider type is not registered
    pub fn create_cloud(&self, config: &CloudConfig) -> Result<Box<dyn CloudDns>> {
        let provider_type = config.type_name();
        let factories = self.clouds.read().unwrap_or_else(PoisonError::into_inner);

        let factory = factories
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown cloud provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered control-plane types
    pub fn list_control_planes(&self) -> Vec<String> {
        let factories = self
            .control_planes
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all registered cloud provider types
    pub fn list_clouds(&self) -> Vec<String> {
        let factories = self.clouds.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a control-plane type is registered
    pub fn has_control_plane(&self, name: &str) -> bool {
        self.control_planes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if a cloud provider type is registered
    pub fn has_cloud(&self, name: &str) -> bool {
        self.clouds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnavailableCloudFactory;

    impl CloudDnsFactory for UnavailableCloudFactory {
        fn create(&self, _config: &CloudConfig) -> Result<Box<dyn CloudDns>> {
            Err(Error::config("Mock cloud not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = BackendRegistry::new();

        // Initially empty
        assert!(!registry.has_cloud("mock"));

        registry.register_cloud("mock", Box::new(UnavailableCloudFactory));

        assert!(registry.has_cloud("mock"));
        assert_eq!(registry.list_clouds(), vec!["mock".to_string()]);
    }

    #[test]
    fn test_memory_backends_are_registered() {
        let registry = BackendRegistry::with_memory_backends();

        let control_plane = registry
            .create_control_plane(&ControlPlaneConfig::Memory)
            .unwrap();
        let cloud = registry.create_cloud(&CloudConfig::Memory).unwrap();

        assert_eq!(control_plane.backend_name(), "memory");
        assert_eq!(cloud.provider_name(), "memory");
    }

    #[test]
    fn test_poisoned_lock_keeps_serving() {
        let registry = BackendRegistry::with_memory_backends();

        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = registry.clouds.write().unwrap();
            panic!("writer panicked");
        }));
        assert!(poisoned.is_err());
        assert!(registry.clouds.is_poisoned());

        assert!(registry.create_cloud(&CloudConfig::Memory).is_ok());
        assert!(registry.has_cloud("memory"));
        registry.register_cloud("mock", Box::new(UnavailableCloudFactory));
        assert_eq!(registry.list_clouds(), vec!["memory".to_string(), "mock".to_string()]);
    }

    #[test]
    fn test_unknown_type_is_a_config_error() {
        let registry = BackendRegistry::new();
        let result = registry.create_control_plane(&ControlPlaneConfig::Ocm {
            url: "https://api.openshift.com".to_string(),
            token: "token".to_string(),
        });

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
