// # Cloud DNS Trait
//
// Defines the interface to the cloud provider's managed DNS service, which
// owns the physical zone backing a `DnsDomain`.
//
// ## Implementations
//
// - In-memory: `crate::memory::InMemoryCloudDns`
// - Google Cloud DNS: `dnszone-provider-gcp` crate
//
// ## Usage
//
// ```rust,ignore
// use dnszone_core::CloudDns;
//
// let zones = cloud.list_zones("my-project", "my-domain.abc123.").await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Zone visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneVisibility {
    /// Resolvable only from the attached networks
    #[default]
    Private,
    /// Resolvable from the internet
    Public,
}

/// Request to create a managed zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRequest {
    /// Project that will own the zone
    pub project_id: String,
    /// Zone name (no dots)
    pub zone_name: String,
    /// Fully-qualified DNS name, trailing dot included
    pub dns_name: String,
    /// Network locator the private zone is attached to
    pub network_url: String,
    /// Human-readable description
    pub description: String,
}

/// A managed zone as reported by the cloud provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedZone {
    /// Zone name
    pub name: String,
    /// Fully-qualified DNS name
    pub dns_name: String,
    /// Visibility scope
    pub visibility: ZoneVisibility,
    /// Attached networks (private zones)
    #[serde(default)]
    pub networks: Vec<String>,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Provider-assigned id, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ManagedZone {
    /// The zone a successful create of `request` would produce
    pub fn from_request(request: &ZoneRequest) -> Self {
        Self {
            name: request.zone_name.clone(),
            dns_name: request.dns_name.clone(),
            visibility: ZoneVisibility::Private,
            networks: vec![request.network_url.clone()],
            description: request.description.clone(),
            id: None,
        }
    }
}

/// Trait for cloud DNS implementations
///
/// Implementations execute one API call per invocation and never retry; the
/// provisioning saga owns retry policy.
#[async_trait]
pub trait CloudDns: Send + Sync {
    /// Create a private managed zone
    async fn create_zone(&self, request: &ZoneRequest) -> Result<ManagedZone, crate::Error>;

    /// Delete a managed zone
    ///
    /// # Returns
    ///
    /// - `Err(Error::CloudProvider { kind: NotFound, .. })` when the zone does
    ///   not exist. Callers decide whether that counts as success.
    async fn delete_zone(&self, project_id: &str, zone_name: &str) -> Result<(), crate::Error>;

    /// List zones in a project whose DNS name equals `dns_name`
    async fn list_zones(
        &self,
        project_id: &str,
        dns_name: &str,
    ) -> Result<Vec<ManagedZone>, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing cloud DNS backends from configuration
pub trait CloudDnsFactory: Send + Sync {
    /// Create a CloudDns instance from configuration
    fn create(&self, config: &crate::config::CloudConfig)
    -> Result<Box<dyn CloudDns>, crate::Error>;
}
