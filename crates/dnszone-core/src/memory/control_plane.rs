// # In-Memory Control Plane
//
// In-process implementation of ControlPlane.
//
// ## Purpose
//
// Provides a registry that behaves like the real one at the trait boundary
// without any network access. Useful for tests and local dry runs.
//
// ## Behavior
//
// - Identifiers are assigned here, never by the caller. Tests can queue the
//   identifiers to hand out with `with_ids`.
// - Deleting a missing record returns `Error::NotFound`.
// - All state is lost when the last handle is dropped.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::ControlPlaneConfig;
use crate::traits::{ControlPlane, ControlPlaneFactory, DnsDomain, DnsDomainSpec};

#[derive(Debug, Default)]
struct Registry {
    records: BTreeMap<String, DnsDomain>,
    queued_ids: VecDeque<String>,
    issued: u64,
}

impl Registry {
    fn next_id(&mut self) -> String {
        self.issued += 1;
        self.queued_ids
            .pop_front()
            .unwrap_or_else(|| format!("{:08x}", self.issued))
    }
}

/// In-memory control plane
///
/// Clones share the same records, so a test can keep one handle for
/// inspection and give another to the saga.
///
/// # Example
///
/// ```rust,no_run
/// use dnszone_core::memory::InMemoryControlPlane;
/// use dnszone_core::traits::{ControlPlane, DnsDomainSpec};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let control_plane = InMemoryControlPlane::with_ids(["abc123"]);
///
///     let spec = DnsDomainSpec::gcp("my-domain", "my-project", "my-network");
///     let record = control_plane.create_dns_domain(&spec).await?;
///     assert_eq!(record.id, "abc123");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryControlPlane {
    inner: Arc<RwLock<Registry>>,
}

impl InMemoryControlPlane {
    /// Create a new empty control plane
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a control plane that hands out `ids` (in order) before falling
    /// back to generated identifiers
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Registry {
            queued_ids: ids.into_iter().map(Into::into).collect(),
            ..Registry::default()
        };
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Get the number of records
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Check if there are no records
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// Check whether a record with this id exists
    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.records.contains_key(id)
    }
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn create_dns_domain(&self, spec: &DnsDomainSpec) -> Result<DnsDomain, Error> {
        let mut guard = self.inner.write().await;
        let id = guard.next_id();
        if guard.records.contains_key(&id) {
            return Err(Error::control_plane(format!(
                "dns-domain '{}' already exists",
                id
            )));
        }

        let mut record = DnsDomain::from_spec(id.clone(), spec);
        record.reserved_at = Some(chrono::Utc::now());
        guard.records.insert(id, record.clone());
        Ok(record)
    }

    async fn get_dns_domain(&self, id_or_key: &str) -> Result<DnsDomain, Error> {
        let guard = self.inner.read().await;
        if let Some(record) = guard.records.get(id_or_key) {
            return Ok(record.clone());
        }

        // Fall back to the derived names a user is likely to paste in
        let key = id_or_key.trim_end_matches('.');
        let mut matches = guard
            .records
            .values()
            .filter(|r| r.zone_name() == key || r.dns_name().trim_end_matches('.') == key);

        match (matches.next(), matches.next()) {
            (Some(record), None) => Ok(record.clone()),
            (Some(_), Some(_)) => Err(Error::validation(format!(
                "dns-zone key '{}' matches more than one record",
                id_or_key
            ))),
            (None, _) => Err(Error::not_found(format!(
                "dns-zone '{}' not found",
                id_or_key
            ))),
        }
    }

    async fn delete_dns_domain(&self, id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("dns-domain '{}' not found", id)))
    }

    async fn list_dns_domains(&self, page: usize, size: usize) -> Result<Vec<DnsDomain>, Error> {
        if page == 0 || size == 0 {
            return Err(Error::validation("page and size must be > 0"));
        }
        let guard = self.inner.read().await;
        Ok(guard
            .records
            .values()
            .skip((page - 1) * size)
            .take(size)
            .cloned()
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for in-memory control planes
pub struct InMemoryControlPlaneFactory;

impl ControlPlaneFactory for InMemoryControlPlaneFactory {
    fn create(&self, config: &ControlPlaneConfig) -> Result<Box<dyn ControlPlane>, Error> {
        match config {
            ControlPlaneConfig::Memory => Ok(Box::new(InMemoryControlPlane::new())),
            _ => Err(Error::config("Invalid config for in-memory control plane")),
        }
    }
}
