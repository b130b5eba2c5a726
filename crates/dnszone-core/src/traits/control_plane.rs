// # Control Plane Trait
//
// Defines the interface to the cluster-management registry that holds
// `DnsDomain` records, the logical half of a provisioned zone.
//
// ## Implementations
//
// - In-memory: `crate::memory::InMemoryControlPlane`
// - HTTP: `dnszone-control-plane-ocm` crate
//
// ## Delete Semantics
//
// Deleting a record that does not exist is an error here. The cloud side
// treats the same condition as success. The asymmetry mirrors the upstream
// APIs and callers rely on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::naming;

/// Cloud provider tag stamped on every record this tool creates
pub const PROVIDER_GCP: &str = "gcp";

/// Cluster architecture a DNS domain is reserved for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterArch {
    /// Classic clusters
    #[default]
    Classic,
    /// Hosted control plane clusters
    Hcp,
}

/// GCP-specific payload of a DNS domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpDnsDomain {
    /// User-chosen prefix, fixed for the record's lifetime
    pub domain_prefix: String,
    /// Project that hosts the managed zone
    pub project_id: String,
    /// Shared VPC network the zone is visible to
    pub network_id: String,
}

/// Create payload for a DNS domain; carries no identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsDomainSpec {
    /// Cloud provider tag
    pub cloud_provider: String,
    /// Cluster architecture tag
    pub cluster_arch: ClusterArch,
    /// Provider-specific payload
    pub gcp: GcpDnsDomain,
}

impl DnsDomainSpec {
    /// Build a classic-architecture GCP spec
    pub fn gcp(
        domain_prefix: impl Into<String>,
        project_id: impl Into<String>,
        network_id: impl Into<String>,
    ) -> Self {
        Self {
            cloud_provider: PROVIDER_GCP.to_string(),
            cluster_arch: ClusterArch::Classic,
            gcp: GcpDnsDomain {
                domain_prefix: domain_prefix.into(),
                project_id: project_id.into(),
                network_id: network_id.into(),
            },
        }
    }
}

/// A DNS domain record as stored by the control plane
///
/// The `id` is always assigned by the control plane; clients never choose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsDomain {
    /// Control-plane-assigned identifier
    pub id: String,
    /// Cloud provider tag
    pub cloud_provider: String,
    /// Cluster architecture tag
    pub cluster_arch: ClusterArch,
    /// Provider-specific payload
    pub gcp: GcpDnsDomain,
    /// When the control plane reserved the domain, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
}

impl DnsDomain {
    /// Attach a control-plane-issued id to a spec
    pub fn from_spec(id: impl Into<String>, spec: &DnsDomainSpec) -> Self {
        Self {
            id: id.into(),
            cloud_provider: spec.cloud_provider.clone(),
            cluster_arch: spec.cluster_arch,
            gcp: spec.gcp.clone(),
            reserved_at: None,
        }
    }

    /// Name of the managed zone backing this record
    pub fn zone_name(&self) -> String {
        naming::zone_name(&self.gcp.domain_prefix, &self.id)
    }

    /// Fully-qualified DNS name served by the managed zone
    pub fn dns_name(&self) -> String {
        naming::dns_name(&self.gcp.domain_prefix, &self.id)
    }
}

/// Trait for control-plane implementations
///
/// Implementations must be thread-safe. Like cloud backends, they execute a
/// single request per call and never retry on their own.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create a record; the returned record carries the assigned id
    async fn create_dns_domain(&self, spec: &DnsDomainSpec) -> Result<DnsDomain, crate::Error>;

    /// Fetch a record by id or lookup key
    ///
    /// # Returns
    ///
    /// - `Err(Error::NotFound)` when no record matches
    async fn get_dns_domain(&self, id_or_key: &str) -> Result<DnsDomain, crate::Error>;

    /// Delete a record by id
    ///
    /// # Returns
    ///
    /// - `Err(Error::NotFound)` when the record does not exist; this call is
    ///   not idempotent
    async fn delete_dns_domain(&self, id: &str) -> Result<(), crate::Error>;

    /// Fetch one page of records (pages start at 1)
    async fn list_dns_domains(&self, page: usize, size: usize)
    -> Result<Vec<DnsDomain>, crate::Error>;

    /// Get the backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}

/// Helper trait for constructing control planes from configuration
pub trait ControlPlaneFactory: Send + Sync {
    /// Create a ControlPlane instance from configuration
    fn create(
        &self,
        config: &crate::config::ControlPlaneConfig,
    ) -> Result<Box<dyn ControlPlane>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_names_follow_naming_contract() {
        let spec = DnsDomainSpec::gcp("my-domain", "my-project", "my-network");
        let record = DnsDomain::from_spec("abc123", &spec);

        assert_eq!(record.zone_name(), "my-domain-abc123");
        assert_eq!(record.dns_name(), "my-domain.abc123.");
        assert_eq!(record.cloud_provider, PROVIDER_GCP);
        assert_eq!(record.cluster_arch, ClusterArch::Classic);
    }

    #[test]
    fn test_record_json_shape() {
        let record = DnsDomain::from_spec(
            "abc123",
            &DnsDomainSpec::gcp("my-domain", "my-project", "my-network"),
        );
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], "abc123");
        assert_eq!(value["cluster_arch"], "classic");
        assert_eq!(value["gcp"]["domain_prefix"], "my-domain");
        assert!(value.get("reserved_at").is_none());
    }
}
