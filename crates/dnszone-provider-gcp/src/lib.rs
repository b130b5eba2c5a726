// # Google Cloud DNS Backend
//
// CloudDns implementation backed by the Cloud DNS v1 REST API.
//
// ## Behavior
//
// - One HTTP request per call; retries and backoff belong to the saga
// - Every zone is created private and attached to a single network
// - HTTP status codes are classified into `CloudErrorKind` so the saga can
//   tell transient failures and "zone does not exist" apart
// - The access token never appears in logs or Debug output
//
// ## API Reference
//
// - Create: POST `/projects/{project}/managedZones`
// - Delete: DELETE `/projects/{project}/managedZones/{zone}`
// - List:   GET `/projects/{project}/managedZones?dnsName=...`

use async_trait::async_trait;
use dnszone_core::config::CloudConfig;
use dnszone_core::error::CloudErrorKind;
use dnszone_core::traits::{CloudDns, CloudDnsFactory, ManagedZone, ZoneRequest, ZoneVisibility};
use dnszone_core::{BackendRegistry, Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider name used in errors and logs
const PROVIDER: &str = "gcp";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Map an HTTP status to a cloud failure classification
pub fn classify_status(status: StatusCode) -> CloudErrorKind {
    match status.as_u16() {
        401 | 403 => CloudErrorKind::Unauthorized,
        404 => CloudErrorKind::NotFound,
        409 => CloudErrorKind::Conflict,
        429 => CloudErrorKind::RateLimited,
        500..=599 => CloudErrorKind::Unavailable,
        _ => CloudErrorKind::Other,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateZoneBody<'a> {
    name: &'a str,
    description: &'a str,
    dns_name: &'a str,
    visibility: ZoneVisibility,
    private_visibility_config: PrivateVisibilityConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivateVisibilityConfig {
    #[serde(default)]
    networks: Vec<NetworkRef>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkRef {
    network_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagedZoneResource {
    name: String,
    dns_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    visibility: ZoneVisibility,
    #[serde(default)]
    private_visibility_config: Option<PrivateVisibilityConfig>,
    #[serde(default)]
    id: Option<String>,
}

impl From<ManagedZoneResource> for ManagedZone {
    fn from(resource: ManagedZoneResource) -> Self {
        Self {
            name: resource.name,
            dns_name: resource.dns_name,
            visibility: resource.visibility,
            networks: resource
                .private_visibility_config
                .unwrap_or_default()
                .networks
                .into_iter()
                .map(|n| n.network_url)
                .collect(),
            description: resource.description,
            id: resource.id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListZonesResponse {
    #[serde(default)]
    managed_zones: Vec<ManagedZoneResource>,
}

/// Google Cloud DNS backend
///
/// # Security
///
/// The Debug implementation does NOT expose the access token.
pub struct GcpCloudDns {
    /// OAuth2 access token
    access_token: String,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for GcpCloudDns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpCloudDns")
            .field("access_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GcpCloudDns {
    /// Create a new Cloud DNS backend
    ///
    /// # Parameters
    ///
    /// - `access_token`: OAuth2 token with `dns.managedZones.*` permissions
    /// - `api_base`: API base URL, e.g. `https://dns.googleapis.com/dns/v1`
    pub fn new(access_token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(Error::config("GCP access token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            access_token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn zones_url(&self, project_id: &str) -> String {
        format!("{}/projects/{}/managedZones", self.api_base, project_id)
    }

    async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        Err(Error::cloud(
            PROVIDER,
            classify_status(status),
            format!("{} failed: {} - {}", action, status, body),
        ))
    }
}

#[async_trait]
impl CloudDns for GcpCloudDns {
    async fn create_zone(&self, request: &ZoneRequest) -> Result<ManagedZone> {
        tracing::debug!(
            "Creating managed zone '{}' ({}) in project '{}'",
            request.zone_name,
            request.dns_name,
            request.project_id
        );

        let body = CreateZoneBody {
            name: &request.zone_name,
            description: &request.description,
            dns_name: &request.dns_name,
            visibility: ZoneVisibility::Private,
            private_visibility_config: PrivateVisibilityConfig {
                networks: vec![NetworkRef {
                    network_url: request.network_url.clone(),
                }],
            },
        };

        let response = self
            .send(
                self.client.post(self.zones_url(&request.project_id)).json(&body),
                "Zone create",
            )
            .await?;

        let zone: ManagedZoneResource = response.json().await.map_err(|e| {
            Error::cloud(
                PROVIDER,
                CloudErrorKind::Other,
                format!("Failed to parse zone: {}", e),
            )
        })?;
        Ok(zone.into())
    }

    async fn delete_zone(&self, project_id: &str, zone_name: &str) -> Result<()> {
        tracing::debug!("Deleting managed zone '{}' in project '{}'", zone_name, project_id);

        let url = format!("{}/{}", self.zones_url(project_id), zone_name);
        self.send(self.client.delete(url), "Zone delete").await?;
        Ok(())
    }

    async fn list_zones(&self, project_id: &str, dns_name: &str) -> Result<Vec<ManagedZone>> {
        let mut request = self.client.get(self.zones_url(project_id));
        if !dns_name.is_empty() {
            request = request.query(&[("dnsName", dns_name)]);
        }

        let response = self.send(request, "Zone list").await?;
        let list: ListZonesResponse = response.json().await.map_err(|e| {
            Error::cloud(
                PROVIDER,
                CloudErrorKind::Other,
                format!("Failed to parse zone list: {}", e),
            )
        })?;

        Ok(list.managed_zones.into_iter().map(ManagedZone::from).collect())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for Cloud DNS backends
pub struct GcpCloudDnsFactory;

impl CloudDnsFactory for GcpCloudDnsFactory {
    fn create(&self, config: &CloudConfig) -> Result<Box<dyn CloudDns>> {
        match config {
            CloudConfig::Gcp {
                access_token,
                api_base,
            } => Ok(Box::new(GcpCloudDns::new(access_token.clone(), api_base.clone())?)),
            _ => Err(Error::config("Invalid config for GCP cloud DNS")),
        }
    }
}

/// Register the Cloud DNS backend as `gcp`
///
/// # Example
///
/// ```rust
/// use dnszone_core::BackendRegistry;
///
/// let registry = BackendRegistry::new();
/// dnszone_provider_gcp::register(&registry);
/// assert!(registry.has_cloud("gcp"));
/// ```
pub fn register(registry: &BackendRegistry) {
    registry.register_cloud(PROVIDER, Box::new(GcpCloudDnsFactory));
}
