// # In-Memory Cloud DNS
//
// In-process implementation of CloudDns. Zones are keyed by
// (project, zone name), the same address the real API uses.
//
// - Creating a zone whose name is taken fails with `Conflict`
// - Deleting a missing zone fails with `NotFound`; the saga maps that to
//   success

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::CloudConfig;
use crate::error::CloudErrorKind;
use crate::Error;
use crate::traits::{CloudDns, CloudDnsFactory, ManagedZone, ZoneRequest};

const PROVIDER: &str = "memory";

#[derive(Debug, Default)]
struct Zones {
    by_key: BTreeMap<(String, String), ManagedZone>,
    issued: u64,
}

/// In-memory cloud DNS
///
/// Clones share the same zones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCloudDns {
    inner: Arc<RwLock<Zones>>,
}

impl InMemoryCloudDns {
    /// Create a new cloud with no zones
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of zones across all projects
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_key.len()
    }

    /// Check if there are no zones
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_key.is_empty()
    }

    /// Look up a zone by its address
    pub async fn zone(&self, project_id: &str, zone_name: &str) -> Option<ManagedZone> {
        self.inner
            .read()
            .await
            .by_key
            .get(&(project_id.to_string(), zone_name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl CloudDns for InMemoryCloudDns {
    async fn create_zone(&self, request: &ZoneRequest) -> Result<ManagedZone, Error> {
        let mut guard = self.inner.write().await;
        let key = (request.project_id.clone(), request.zone_name.clone());
        if guard.by_key.contains_key(&key) {
            return Err(Error::cloud(
                PROVIDER,
                CloudErrorKind::Conflict,
                format!(
                    "zone '{}' already exists in project '{}'",
                    request.zone_name, request.project_id
                ),
            ));
        }

        guard.issued += 1;
        let mut zone = ManagedZone::from_request(request);
        zone.id = Some(guard.issued.to_string());
        guard.by_key.insert(key, zone.clone());
        Ok(zone)
    }

    async fn delete_zone(&self, project_id: &str, zone_name: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard
            .by_key
            .remove(&(project_id.to_string(), zone_name.to_string()))
            .map(|_| ())
            .ok_or_else(|| {
                Error::cloud(
                    PROVIDER,
                    CloudErrorKind::NotFound,
                    format!("zone '{}' not found in project '{}'", zone_name, project_id),
                )
            })
    }

    async fn list_zones(&self, project_id: &str, dns_name: &str) -> Result<Vec<ManagedZone>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .by_key
            .iter()
            .filter(|((project, _), zone)| {
                project == project_id && (dns_name.is_empty() || zone.dns_name == dns_name)
            })
            .map(|(_, zone)| zone.clone())
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for in-memory cloud DNS backends
pub struct InMemoryCloudDnsFactory;

impl CloudDnsFactory for InMemoryCloudDnsFactory {
    fn create(&self, config: &CloudConfig) -> Result<Box<dyn CloudDns>, Error> {
        match config {
            CloudConfig::Memory => Ok(Box::new(InMemoryCloudDns::new())),
            _ => Err(Error::config("Invalid config for in-memory cloud DNS")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(project: &str, zone: &str, dns: &str) -> ZoneRequest {
        ZoneRequest {
            project_id: project.to_string(),
            zone_name: zone.to_string(),
            dns_name: dns.to_string(),
            network_url: "net".to_string(),
            description: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let cloud = InMemoryCloudDns::new();
        let req = request("p", "my-domain-abc123", "my-domain.abc123.");

        cloud.create_zone(&req).await.unwrap();
        let err = cloud.create_zone(&req).await.unwrap_err();

        assert_eq!(err.cloud_kind(), Some(CloudErrorKind::Conflict));
        assert_eq!(cloud.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_zone_reports_not_found() {
        let cloud = InMemoryCloudDns::new();
        let err = cloud.delete_zone("p", "missing").await.unwrap_err();
        assert!(err.is_cloud_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_project_and_dns_name() {
        let cloud = InMemoryCloudDns::new();
        cloud.create_zone(&request("p", "a-1", "a.1.")).await.unwrap();
        cloud.create_zone(&request("p", "b-1", "b.1.")).await.unwrap();
        cloud.create_zone(&request("q", "a-1", "a.1.")).await.unwrap();

        let zones = cloud.list_zones("p", "a.1.").await.unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "a-1");

        assert_eq!(cloud.list_zones("p", "").await.unwrap().len(), 2);
        assert!(cloud.list_zones("r", "a.1.").await.unwrap().is_empty());
    }
}
