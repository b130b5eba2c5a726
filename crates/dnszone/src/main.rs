// # dnszone - DNS Zone Provisioning Tool
//
// Thin integration layer over dnszone-core. It is responsible for:
// 1. Parsing the subcommand and its arguments
// 2. Reading backend configuration from environment variables
// 3. Initializing logging and the runtime
// 4. Registering backends and dispatching to the provisioning saga
//
// Provisioning logic, retries and rollback all live in dnszone-core.
//
// ## Configuration
//
// ### Control plane
// - `DNSZONE_CONTROL_PLANE`: Backend type (ocm, memory). Default: ocm
// - `OCM_URL`: API base URL. Default: https://api.openshift.com
// - `OCM_TOKEN`: Bearer token (required for ocm)
//
// ### Cloud
// - `DNSZONE_CLOUD`: Backend type (gcp, memory). Default: gcp
// - `GOOGLE_OAUTH_ACCESS_TOKEN`: OAuth2 access token (required for gcp)
// - `DNSZONE_GCP_API_BASE`: Cloud DNS API base URL
//
// ### Saga
// - `DNSZONE_RETRY_TIMEOUT_SECS`: Deadline for retrying transient cloud
//   failures (1-3600). Default: 60
//
// ### Logging
// - `DNSZONE_LOG_LEVEL`: trace, debug, info, warn, error. Default: info
//
// ## Example
//
// ```bash
// export OCM_TOKEN=...
// export GOOGLE_OAUTH_ACCESS_TOKEN=$(gcloud auth print-access-token)
//
// dnszone create --domain-prefix my-domain --project-id my-project \
//     --network-id my-network --network-project-id my-host-project
// dnszone delete <ID>
// ```

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dnszone_core::config::{MAX_CLOUD_RETRY_TIMEOUT_SECS, default_gcp_api_base};
use dnszone_core::{
    BackendRegistry, CloudConfig, ControlPlaneConfig, CreateOutcome, CreateZoneRequest,
    DnsZoneConfig, ProvisioningSaga, SagaConfig, SagaEvent,
};
use std::env;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_OCM_URL: &str = "https://api.openshift.com";

/// Exit codes
///
/// - 0: Operation succeeded
/// - 1: Configuration error
/// - 2: Operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsZoneExitCode {
    Success = 0,
    ConfigError = 1,
    OperationFailed = 2,
}

impl From<DnsZoneExitCode> for ExitCode {
    fn from(code: DnsZoneExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Provision private Cloud DNS zones backed by control-plane records
#[derive(Debug, Parser)]
#[command(name = "dnszone", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a DNS domain record and its private Cloud DNS zone
    Create {
        /// User-defined prefix for the zone: lowercase alphanumerics or '-',
        /// starting with a letter and ending alphanumeric, at most 15 characters
        #[arg(long, default_value = "")]
        domain_prefix: String,
        /// Project that will host the zone
        #[arg(long, default_value = "")]
        project_id: String,
        /// Shared VPC network the zone is visible to
        #[arg(long, default_value = "")]
        network_id: String,
        /// Project that owns the shared VPC network
        #[arg(long, default_value = "")]
        network_project_id: String,
    },

    /// Delete a DNS zone and then its record
    Delete {
        /// Record ID or base domain
        id: String,
    },

    /// Show details of a DNS zone
    Describe {
        /// Record ID or base domain
        id: String,
    },

    /// Print raw record data as JSON; all records when no ID is given
    Get {
        /// Record ID or base domain
        id: Option<String>,
        /// Print the output on a single line
        #[arg(long)]
        single: bool,
    },

    /// List DNS zones
    List {
        /// Comma-separated columns, as dotted paths into the record
        #[arg(long, default_value = output::DEFAULT_COLUMNS)]
        columns: String,
        /// Don't print the header row
        #[arg(long)]
        no_headers: bool,
    },
}

/// Application configuration
struct Config {
    control_plane_type: String,
    ocm_url: String,
    ocm_token: Option<String>,
    cloud_type: String,
    gcp_access_token: Option<String>,
    gcp_api_base: String,
    retry_timeout_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let retry_timeout_secs = get("DNSZONE_RETRY_TIMEOUT_SECS")
            .map(|s| {
                s.trim().parse::<u64>().map_err(|_| {
                    anyhow::anyhow!(
                        "DNSZONE_RETRY_TIMEOUT_SECS must be a whole number of seconds. Got: {}",
                        s
                    )
                })
            })
            .transpose()?;

        Ok(Self {
            control_plane_type: get("DNSZONE_CONTROL_PLANE").unwrap_or_else(|| "ocm".to_string()),
            ocm_url: get("OCM_URL").unwrap_or_else(|| DEFAULT_OCM_URL.to_string()),
            ocm_token: get("OCM_TOKEN"),
            cloud_type: get("DNSZONE_CLOUD").unwrap_or_else(|| "gcp".to_string()),
            gcp_access_token: get("GOOGLE_OAUTH_ACCESS_TOKEN"),
            gcp_api_base: get("DNSZONE_GCP_API_BASE").unwrap_or_else(default_gcp_api_base),
            retry_timeout_secs,
            log_level: get("DNSZONE_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.control_plane_type.as_str() {
            "ocm" => {
                if self.ocm_token.is_none() {
                    anyhow::bail!(
                        "OCM_TOKEN is required when DNSZONE_CONTROL_PLANE=ocm. \
                        Set it via: export OCM_TOKEN=your_token"
                    );
                }
                if !self.ocm_url.starts_with("https://") && !self.ocm_url.starts_with("http://") {
                    anyhow::bail!("OCM_URL must use HTTP or HTTPS scheme. Got: {}", self.ocm_url);
                }
            }
            "memory" => {}
            other => anyhow::bail!(
                "DNSZONE_CONTROL_PLANE '{}' is not supported. Supported types: ocm, memory",
                other
            ),
        }

        match self.cloud_type.as_str() {
            "gcp" => {
                if self.gcp_access_token.is_none() {
                    anyhow::bail!(
                        "GOOGLE_OAUTH_ACCESS_TOKEN is required when DNSZONE_CLOUD=gcp. \
                        Set it via: export GOOGLE_OAUTH_ACCESS_TOKEN=$(gcloud auth print-access-token)"
                    );
                }
            }
            "memory" => {}
            other => anyhow::bail!(
                "DNSZONE_CLOUD '{}' is not supported. Supported types: gcp, memory",
                other
            ),
        }

        if let Some(timeout) = self.retry_timeout_secs
            && !(1..=MAX_CLOUD_RETRY_TIMEOUT_SECS).contains(&timeout)
        {
            anyhow::bail!(
                "DNSZONE_RETRY_TIMEOUT_SECS must be between 1 and {} seconds. Got: {}",
                MAX_CLOUD_RETRY_TIMEOUT_SECS,
                timeout
            );
        }

        parse_log_level(&self.log_level)?;

        self.to_core()
            .validate()
            .context("invalid backend configuration")?;
        Ok(())
    }

    /// Build the library configuration
    fn to_core(&self) -> DnsZoneConfig {
        let control_plane = match self.control_plane_type.as_str() {
            "ocm" => ControlPlaneConfig::Ocm {
                url: self.ocm_url.clone(),
                token: self.ocm_token.clone().unwrap_or_default(),
            },
            _ => ControlPlaneConfig::Memory,
        };

        let cloud = match self.cloud_type.as_str() {
            "gcp" => CloudConfig::Gcp {
                access_token: self.gcp_access_token.clone().unwrap_or_default(),
                api_base: self.gcp_api_base.clone(),
            },
            _ => CloudConfig::Memory,
        };

        let mut saga = SagaConfig::default();
        if let Some(timeout) = self.retry_timeout_secs {
            saga.cloud_retry_timeout_secs = timeout;
        }

        DnsZoneConfig {
            control_plane,
            cloud,
            saga,
        }
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DNSZONE_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Map a failed run to an exit code
fn exit_code_for(err: &anyhow::Error) -> DnsZoneExitCode {
    match err.downcast_ref::<dnszone_core::Error>() {
        Some(dnszone_core::Error::Config(_)) => DnsZoneExitCode::ConfigError,
        _ => DnsZoneExitCode::OperationFailed,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DnsZoneExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DnsZoneExitCode::ConfigError.into();
    }

    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsZoneExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsZoneExitCode::OperationFailed.into();
        }
    };

    let code = rt.block_on(async {
        match run(cli.command, config.to_core()).await {
            Ok(()) => DnsZoneExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                exit_code_for(&e)
            }
        }
    });

    code.into()
}

/// Build the saga and run one subcommand
async fn run(command: Command, config: DnsZoneConfig) -> Result<()> {
    let registry = BackendRegistry::with_memory_backends();

    #[cfg(feature = "gcp")]
    dnszone_provider_gcp::register(&registry);

    #[cfg(feature = "ocm")]
    dnszone_control_plane_ocm::register(&registry);

    let control_plane = registry.create_control_plane(&config.control_plane)?;
    let cloud = registry.create_cloud(&config.cloud)?;
    debug!(
        "Using control plane '{}' and cloud '{}'",
        control_plane.backend_name(),
        cloud.provider_name()
    );

    let (saga, events) = ProvisioningSaga::new(control_plane, cloud, &config.saga)?;
    let drain = tokio::spawn(log_events(events));

    let result = dispatch(&saga, command).await;

    // Dropping the saga closes the event channel and ends the drain task
    drop(saga);
    if let Err(e) = drain.await {
        debug!("Event drain task failed: {}", e);
    }

    result
}

async fn log_events(mut events: mpsc::Receiver<SagaEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Saga event: {:?}", event);
    }
}

async fn dispatch(saga: &ProvisioningSaga, command: Command) -> Result<()> {
    match command {
        Command::Create {
            domain_prefix,
            project_id,
            network_id,
            network_project_id,
        } => {
            let request =
                CreateZoneRequest::new(domain_prefix, project_id, network_id, network_project_id)?;

            let record = match saga.create_outcome(&request).await {
                CreateOutcome::Done { record, .. } => record,
                CreateOutcome::Failed(e) => {
                    return Err(anyhow::Error::new(e).context("failed to create dns-domain"));
                }
                CreateOutcome::Clean { cause } => {
                    return Err(anyhow::Error::new(cause).context("failed to create dns-zone"));
                }
                orphaned @ CreateOutcome::Orphaned { .. } => {
                    return orphaned.into_result().map(|_| ()).map_err(anyhow::Error::new);
                }
            };

            let description = saga
                .describe(&record.id)
                .await
                .context("dns-zone created but failed to describe")?;
            print!("{}", output::render_description(&description));
        }

        Command::Delete { id } => {
            let outcome = saga.delete(&id).await.context("failed to delete dns-zone")?;
            info!(
                "dns-zone '{}' deleted (zone was {})",
                outcome.record.id,
                if outcome.zone_was_present {
                    "present"
                } else {
                    "already absent"
                }
            );
        }

        Command::Describe { id } => {
            let description = saga.describe(&id).await.context("failed to get dns-domain")?;
            print!("{}", output::render_description(&description));
        }

        Command::Get { id: Some(id), single } => {
            let record = saga.get(&id).await?;
            println!("{}", output::render_json(&record, single)?);
        }

        Command::Get { id: None, single } => {
            let records = saga.list().await.context("can't retrieve dns zones")?;
            let body = serde_json::json!({
                "kind": "DNSDomainList",
                "total": records.len(),
                "items": records,
            });
            println!("{}", output::render_json(&body, single)?);
        }

        Command::List {
            columns,
            no_headers,
        } => {
            let columns = output::parse_columns(&columns)?;
            let records = saga.list().await.context("can't retrieve dns zones")?;
            print!("{}", output::render_table(&records, &columns, !no_headers)?);
        }
    }

    Ok(())
}
