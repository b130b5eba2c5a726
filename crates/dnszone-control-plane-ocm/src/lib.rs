//! Cluster-management control plane
//!
//! `ControlPlane` implementation for the `dns_domains` collection of the
//! clusters_mgmt v1 REST API. The service assigns record ids; this client
//! only ever reads them back.
//!
//! Calls are single-shot. A 404 on get or delete becomes `Error::NotFound`;
//! every other failure is an `Error::ControlPlane`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dnszone_core::config::ControlPlaneConfig;
use dnszone_core::traits::{
    ClusterArch, ControlPlane, ControlPlaneFactory, DnsDomain, DnsDomainSpec, GcpDnsDomain,
};
use dnszone_core::{BackendRegistry, Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the dns_domains collection
const DNS_DOMAINS_PATH: &str = "/api/clusters_mgmt/v1/dns_domains";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CloudProviderLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default)]
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    cloud_provider: CloudProviderLink,
    cluster_arch: ClusterArch,
    gcp: &'a GcpDnsDomain,
}

impl<'a> From<&'a DnsDomainSpec> for CreateBody<'a> {
    fn from(spec: &'a DnsDomainSpec) -> Self {
        Self {
            cloud_provider: CloudProviderLink {
                kind: Some("CloudProviderLink".to_string()),
                id: spec.cloud_provider.clone(),
            },
            cluster_arch: spec.cluster_arch,
            gcp: &spec.gcp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DnsDomainResource {
    id: String,
    #[serde(default)]
    cloud_provider: Option<CloudProviderLink>,
    #[serde(default)]
    cluster_arch: Option<ClusterArch>,
    #[serde(default)]
    gcp: Option<GcpDnsDomain>,
    #[serde(default)]
    reserved_at_timestamp: Option<DateTime<Utc>>,
}

impl From<DnsDomainResource> for DnsDomain {
    // Domains reserved for other clouds carry no gcp block; they still list
    fn from(resource: DnsDomainResource) -> Self {
        Self {
            id: resource.id,
            cloud_provider: resource.cloud_provider.unwrap_or_default().id,
            cluster_arch: resource.cluster_arch.unwrap_or_default(),
            gcp: resource.gcp.unwrap_or_else(|| GcpDnsDomain {
                domain_prefix: String::new(),
                project_id: String::new(),
                network_id: String::new(),
            }),
            reserved_at: resource.reserved_at_timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DnsDomainList {
    #[serde(default)]
    items: Vec<DnsDomainResource>,
}

/// HTTP control plane
pub struct OcmControlPlane {
    /// API base URL, without trailing slash
    url: String,

    /// Bearer token
    token: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for OcmControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcmControlPlane")
            .field("url", &self.url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl OcmControlPlane {
    /// Create a new control-plane client
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::config("Control plane token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}{}", self.url, DNS_DOMAINS_PATH)
    }

    fn item_url(&self, id: &str) -> Result<String> {
        if id.is_empty() || id.contains('/') || id.contains('?') {
            return Err(Error::validation(format!("invalid dns-domain id '{}'", id)));
        }
        Ok(format!("{}/{}", self.collection_url(), id))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
        key: Option<&str>,
    ) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::control_plane(format!("can't send {} request: {}", action, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        Err(status_error(status, action, key, &body))
    }
}

fn status_error(status: StatusCode, action: &str, key: Option<&str>, body: &str) -> Error {
    match (status.as_u16(), key) {
        (404, Some(key)) => Error::not_found(format!("dns-zone '{}' not found", key)),
        (401 | 403, _) => Error::control_plane(format!(
            "{} rejected: invalid token or insufficient permissions. Status: {}",
            action, status
        )),
        _ => Error::control_plane(format!("{} failed with status {}: {}", action, status, body)),
    }
}

async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response, action: &str) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::control_plane(format!("failed to parse {} response: {}", action, e)))
}

#[async_trait]
impl ControlPlane for OcmControlPlane {
    async fn create_dns_domain(&self, spec: &DnsDomainSpec) -> Result<DnsDomain> {
        tracing::debug!("Reserving dns-domain with prefix '{}'", spec.gcp.domain_prefix);

        let body = CreateBody::from(spec);
        let response = self
            .send(
                self.client.post(self.collection_url()).json(&body),
                "dns-domain create",
                None,
            )
            .await?;

        let resource: DnsDomainResource = parse(response, "dns-domain create").await?;
        Ok(resource.into())
    }

    async fn get_dns_domain(&self, id_or_key: &str) -> Result<DnsDomain> {
        let url = self.item_url(id_or_key)?;
        let response = self
            .send(self.client.get(url), "dns-domain get", Some(id_or_key))
            .await?;

        let resource: DnsDomainResource = parse(response, "dns-domain get").await?;
        Ok(resource.into())
    }

    async fn delete_dns_domain(&self, id: &str) -> Result<()> {
        let url = self.item_url(id)?;
        self.send(self.client.delete(url), "dns-domain delete", Some(id))
            .await?;
        Ok(())
    }

    async fn list_dns_domains(&self, page: usize, size: usize) -> Result<Vec<DnsDomain>> {
        if page == 0 || size == 0 {
            return Err(Error::validation("page and size must be > 0"));
        }

        let request = self
            .client
            .get(self.collection_url())
            .query(&[("page", page), ("size", size)]);
        let response = self.send(request, "dns-domain list", None).await?;

        let list: DnsDomainList = parse(response, "dns-domain list").await?;
        Ok(list.items.into_iter().map(DnsDomain::from).collect())
    }

    fn backend_name(&self) -> &'static str {
        "ocm"
    }
}

/// Factory for HTTP control planes
pub struct OcmControlPlaneFactory;

impl ControlPlaneFactory for OcmControlPlaneFactory {
    fn create(&self, config: &ControlPlaneConfig) -> Result<Box<dyn ControlPlane>> {
        match config {
            ControlPlaneConfig::Ocm { url, token } => {
                Ok(Box::new(OcmControlPlane::new(url.clone(), token.clone())?))
            }
            _ => Err(Error::config("Invalid config for OCM control plane")),
        }
    }
}

/// Register the HTTP control plane as `ocm`
pub fn register(registry: &BackendRegistry) {
    registry.register_control_plane("ocm", Box::new(OcmControlPlaneFactory));
}
