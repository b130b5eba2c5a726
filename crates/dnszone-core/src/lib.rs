// # dnszone-core
//
// Core library for provisioning DNS zones that span a cluster-management
// control plane and a cloud provider.
//
// ## Architecture Overview
//
// - **ControlPlane**: Trait for the registry that owns `DnsDomain` records
// - **CloudDns**: Trait for the cloud service that owns managed zones
// - **naming**: Pure functions deriving zone names from a record
// - **retry**: Deadline-bounded exponential backoff with jitter
// - **ProvisioningSaga**: Creates/deletes both halves as one unit, with
//   compensation when the second half fails
// - **BackendRegistry**: Plugin-based registry for backends
//
// ## Design Principles
//
// 1. **Record first**: The control-plane record is the source of truth; the
//    zone is derived from it and can always be re-addressed from it
// 2. **No stored names**: Zone names are recomputed, never persisted
// 3. **Nothing swallowed**: Rollback failures are reported with the error
//    that caused the rollback
// 4. **Idempotent teardown**: A missing zone on delete counts as deleted

pub mod config;
pub mod error;
pub mod memory;
pub mod naming;
pub mod registry;
pub mod retry;
pub mod saga;
pub mod traits;

// Re-export core types for convenience
pub use config::{CloudConfig, ControlPlaneConfig, CreateZoneRequest, DnsZoneConfig, SagaConfig};
pub use error::{CloudErrorKind, Error, Result};
pub use memory::{InMemoryCloudDns, InMemoryControlPlane};
pub use registry::BackendRegistry;
pub use retry::{Attempt, RetryPolicy, retry_with_backoff};
pub use saga::{CreateOutcome, DeleteOutcome, ProvisioningSaga, SagaEvent, ZoneDescription, ZoneStatus};
pub use traits::{CloudDns, ControlPlane, DnsDomain, DnsDomainSpec, ManagedZone, ZoneRequest};
