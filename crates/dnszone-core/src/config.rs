//! Configuration types for DNS zone provisioning
//!
//! This module defines the backend and saga configuration, plus the
//! per-invocation [`CreateZoneRequest`] passed into the saga.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::naming;
use crate::retry::RetryPolicy;
use crate::traits::DnsDomainSpec;

/// Maximum length of a domain prefix
pub const MAX_DOMAIN_PREFIX_LEN: usize = 15;

/// Upper bound of the cloud retry deadline (in seconds)
pub const MAX_CLOUD_RETRY_TIMEOUT_SECS: u64 = 3600;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsZoneConfig {
    /// Control-plane backend configuration
    pub control_plane: ControlPlaneConfig,

    /// Cloud DNS backend configuration
    pub cloud: CloudConfig,

    /// Optional saga settings
    #[serde(default)]
    pub saga: SagaConfig,
}

impl DnsZoneConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.control_plane.validate()?;
        self.cloud.validate()?;
        self.saga.validate()?;
        Ok(())
    }
}

/// Control-plane backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPlaneConfig {
    /// Cluster-management REST API
    Ocm {
        /// API base URL (e.g., "https://api.openshift.com")
        url: String,
        /// Bearer token
        token: String,
    },

    /// In-process registry (not persistent)
    #[default]
    Memory,
}

impl ControlPlaneConfig {
    /// Validate the control-plane configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ControlPlaneConfig::Ocm { url, token } => {
                if url.is_empty() {
                    return Err(Error::config("Control plane URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(Error::config(format!(
                        "Control plane URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if token.is_empty() {
                    return Err(Error::config("Control plane token cannot be empty"));
                }
                Ok(())
            }
            ControlPlaneConfig::Memory => Ok(()),
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &str {
        match self {
            ControlPlaneConfig::Ocm { .. } => "ocm",
            ControlPlaneConfig::Memory => "memory",
        }
    }
}

/// Cloud DNS backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CloudConfig {
    /// Google Cloud DNS
    Gcp {
        /// OAuth2 access token
        access_token: String,
        /// API base URL
        #[serde(default = "default_gcp_api_base")]
        api_base: String,
    },

    /// In-process zones (not persistent)
    #[default]
    Memory,
}

impl CloudConfig {
    /// Validate the cloud configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            CloudConfig::Gcp {
                access_token,
                api_base,
            } => {
                if access_token.is_empty() {
                    return Err(Error::config("GCP access token cannot be empty"));
                }
                if api_base.is_empty() {
                    return Err(Error::config("GCP API base URL cannot be empty"));
                }
                Ok(())
            }
            CloudConfig::Memory => Ok(()),
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &str {
        match self {
            CloudConfig::Gcp { .. } => "gcp",
            CloudConfig::Memory => "memory",
        }
    }
}

/// Default Cloud DNS API base
pub fn default_gcp_api_base() -> String {
    "https://dns.googleapis.com/dns/v1".to_string()
}

/// Saga configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaConfig {
    /// Deadline for retrying a transient cloud failure (in seconds)
    #[serde(default = "default_cloud_retry_timeout_secs")]
    pub cloud_retry_timeout_secs: u64,

    /// First backoff interval (in seconds); doubles on every retry
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    /// Upper bound of the random delay added to each backoff (in milliseconds)
    #[serde(default = "default_max_jitter_millis")]
    pub max_jitter_millis: u64,

    /// Log each retry
    #[serde(default = "default_log_retries")]
    pub log_retries: bool,

    /// Capacity of the saga event channel
    ///
    /// When full, events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SagaConfig {
    /// Validate the saga configuration
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Saga event channel capacity must be > 0"));
        }
        if self.initial_backoff_secs == 0 {
            return Err(Error::config("Initial backoff must be > 0"));
        }
        if !(1..=MAX_CLOUD_RETRY_TIMEOUT_SECS).contains(&self.cloud_retry_timeout_secs) {
            return Err(Error::config(format!(
                "Cloud retry timeout must be between 1 and {} seconds, got {}",
                MAX_CLOUD_RETRY_TIMEOUT_SECS, self.cloud_retry_timeout_secs
            )));
        }
        Ok(())
    }

    /// Retry policy for cloud calls
    pub fn cloud_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.cloud_retry_timeout_secs))
            .with_initial_backoff(Duration::from_secs(self.initial_backoff_secs))
            .with_max_jitter(Duration::from_millis(self.max_jitter_millis))
            .with_logging(self.log_retries)
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            cloud_retry_timeout_secs: default_cloud_retry_timeout_secs(),
            initial_backoff_secs: default_initial_backoff_secs(),
            max_jitter_millis: default_max_jitter_millis(),
            log_retries: default_log_retries(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_cloud_retry_timeout_secs() -> u64 {
    60
}

fn default_initial_backoff_secs() -> u64 {
    1
}

fn default_max_jitter_millis() -> u64 {
    250
}

fn default_log_retries() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    64
}

/// Input of the create operation
///
/// Built once from caller arguments and never mutated. Construct with
/// [`CreateZoneRequest::new`], which validates every field before any
/// external call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateZoneRequest {
    domain_prefix: String,
    project_id: String,
    network_id: String,
    network_project_id: String,
}

impl CreateZoneRequest {
    /// Validate and build a create request
    ///
    /// # Parameters
    ///
    /// - `domain_prefix`: 1-15 lowercase alphanumerics or `-`, starting with a
    ///   letter and ending with an alphanumeric
    /// - `project_id`: Project that will own the zone
    /// - `network_id`: Network id, or a full network locator whose project
    ///   must equal `network_project_id`
    /// - `network_project_id`: Project that owns the shared VPC network
    pub fn new(
        domain_prefix: impl Into<String>,
        project_id: impl Into<String>,
        network_id: impl Into<String>,
        network_project_id: impl Into<String>,
    ) -> Result<Self> {
        let domain_prefix = domain_prefix.into();
        let project_id = project_id.into();
        let network_id = network_id.into();
        let network_project_id = network_project_id.into();

        validate_domain_prefix(&domain_prefix)?;
        require("project-id", &project_id)?;
        require("network-project-id", &network_project_id)?;
        let network_id = resolve_network_id(&network_id, &network_project_id)?;

        Ok(Self {
            domain_prefix,
            project_id,
            network_id,
            network_project_id,
        })
    }

    /// Domain prefix
    pub fn domain_prefix(&self) -> &str {
        &self.domain_prefix
    }

    /// Project that will own the zone
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Bare network id
    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Project that owns the network
    pub fn network_project_id(&self) -> &str {
        &self.network_project_id
    }

    /// Control-plane payload for this request
    pub fn to_spec(&self) -> DnsDomainSpec {
        DnsDomainSpec::gcp(&self.domain_prefix, &self.project_id, &self.network_id)
    }

    /// Network locator for the zone's private visibility config
    pub fn network_url(&self) -> String {
        naming::network_resource_id(&self.network_project_id, &self.network_id)
    }
}

fn require(flag: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("flag '{}' is required", flag)));
    }
    Ok(())
}

/// Check a domain prefix against the zone naming rules
pub fn validate_domain_prefix(prefix: &str) -> Result<()> {
    require("domain-prefix", prefix)?;

    if prefix.len() > MAX_DOMAIN_PREFIX_LEN {
        return Err(Error::validation(format!(
            "domain prefix '{}' is too long: {} chars (max {})",
            prefix,
            prefix.len(),
            MAX_DOMAIN_PREFIX_LEN
        )));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(Error::validation(format!(
            "domain prefix '{}' may only contain lowercase alphanumeric characters or '-'",
            prefix
        )));
    }

    if !prefix.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(Error::validation(format!(
            "domain prefix '{}' must start with an alphabetic character",
            prefix
        )));
    }

    if prefix.ends_with('-') {
        return Err(Error::validation(format!(
            "domain prefix '{}' must end with an alphanumeric character",
            prefix
        )));
    }

    Ok(())
}

fn resolve_network_id(network_id: &str, network_project_id: &str) -> Result<String> {
    require("network-id", network_id)?;

    if !network_id.contains('/') {
        return Ok(network_id.to_string());
    }

    let (project, network) = naming::parse_network_resource_id(network_id).ok_or_else(|| {
        Error::validation(format!("unparsable network reference '{}'", network_id))
    })?;

    if project != network_project_id {
        return Err(Error::validation(format!(
            "network '{}' belongs to project '{}', not network project '{}'",
            network_id, project, network_project_id
        )));
    }

    Ok(network.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DnsZoneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control_plane.type_name(), "memory");
        assert_eq!(config.cloud.type_name(), "memory");
    }

    #[test]
    fn test_ocm_config_requires_token_and_url() {
        let config = ControlPlaneConfig::Ocm {
            url: "https://api.openshift.com".to_string(),
            token: String::new(),
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ControlPlaneConfig::Ocm {
            url: "api.openshift.com".to_string(),
            token: "token".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gcp_config_deserializes_with_default_base() {
        let config: CloudConfig =
            serde_json::from_str(r#"{"type": "gcp", "access_token": "ya29.token"}"#).unwrap();

        match config {
            CloudConfig::Gcp { api_base, .. } => assert_eq!(api_base, default_gcp_api_base()),
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_saga_retry_policy() {
        let saga = SagaConfig {
            cloud_retry_timeout_secs: 30,
            initial_backoff_secs: 2,
            max_jitter_millis: 0,
            log_retries: false,
            event_channel_capacity: 8,
        };

        let policy = saga.cloud_retry_policy();
        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.initial_backoff, Duration::from_secs(2));
        assert_eq!(policy.max_jitter, Duration::ZERO);
        assert!(!policy.log_retries);
    }

    #[test]
    fn test_saga_config_bounds_retry_timeout() {
        for secs in [0, MAX_CLOUD_RETRY_TIMEOUT_SECS + 1, u64::MAX] {
            let saga = SagaConfig {
                cloud_retry_timeout_secs: secs,
                ..SagaConfig::default()
            };
            assert!(matches!(saga.validate(), Err(Error::Config(_))), "accepted {}", secs);
        }

        let saga = SagaConfig {
            cloud_retry_timeout_secs: MAX_CLOUD_RETRY_TIMEOUT_SECS,
            ..SagaConfig::default()
        };
        assert!(saga.validate().is_ok());
    }

    #[test]
    fn test_saga_config_rejects_zero_capacity() {
        let saga = SagaConfig {
            event_channel_capacity: 0,
            ..SagaConfig::default()
        };
        assert!(saga.validate().is_err());
    }

    #[test]
    fn test_domain_prefix_rules() {
        assert!(validate_domain_prefix("my-domain").is_ok());
        assert!(validate_domain_prefix("a").is_ok());
        assert!(validate_domain_prefix("abcdefghij12345").is_ok());

        for bad in ["", "My-domain", "1domain", "domain-", "my.domain", "abcdefghij123456"] {
            assert!(
                matches!(validate_domain_prefix(bad), Err(Error::Validation(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_create_request_accepts_bare_network_id() {
        let request =
            CreateZoneRequest::new("my-domain", "my-project", "my-network", "host-project")
                .unwrap();

        assert_eq!(request.network_id(), "my-network");
        assert_eq!(
            request.network_url(),
            "https://compute.googleapis.com/compute/v1/projects/host-project/global/networks/my-network"
        );
        assert_eq!(request.to_spec().gcp.project_id, "my-project");
    }

    #[test]
    fn test_create_request_accepts_matching_network_locator() {
        let request = CreateZoneRequest::new(
            "my-domain",
            "my-project",
            "https://compute.googleapis.com/compute/v1/projects/host-project/global/networks/vpc",
            "host-project",
        )
        .unwrap();

        assert_eq!(request.network_id(), "vpc");
    }

    #[test]
    fn test_create_request_rejects_bad_network_references() {
        let err = CreateZoneRequest::new("my-domain", "p", "projects/x/networks/y", "host")
            .unwrap_err();
        assert!(err.to_string().contains("unparsable network reference"));

        let err = CreateZoneRequest::new(
            "my-domain",
            "p",
            "https://compute.googleapis.com/compute/v1/projects/other/global/networks/vpc",
            "host",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_create_request_requires_all_fields() {
        assert!(CreateZoneRequest::new("my-domain", "", "net", "host").is_err());
        assert!(CreateZoneRequest::new("my-domain", "p", "", "host").is_err());
        assert!(CreateZoneRequest::new("my-domain", "p", "net", " ").is_err());
    }
}
