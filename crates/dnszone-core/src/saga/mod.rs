//! Provisioning saga
//!
//! The ProvisioningSaga creates and destroys a (DnsDomain, ManagedZone) pair
//! as one logical unit across two independent systems:
//! - The control plane holds the DnsDomain record (source of truth)
//! - The cloud provider holds the ManagedZone derived from it
//!
//! ## Architecture
//!
//! ```text
//!                    ┌───────────────────┐
//!                    │ ProvisioningSaga  │
//!                    └───────────────────┘
//!                              │
//!         ┌────────────────────┼────────────────────┐
//!         │                    │                    │
//!         ▼                    ▼                    ▼
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ ControlPlane │     │   CloudDns   │     │    Events    │
//! │ (records)    │     │ (zones,      │     │  (notify)    │
//! │              │     │  retried)    │     │              │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! ## Create
//!
//! ```text
//! Init ──► RecordCreated ──► Done
//!  │              │
//!  ▼              └──► RollingBack ──► Clean      (reports the cloud error)
//! Failed                    │
//!                           └────────► Orphaned   (reports both errors)
//! ```
//!
//! Rolling back deletes the zone before the record: a create attempt whose
//! response was lost may have left one behind.
//!
//! ## Delete
//!
//! 1. Resolve the record (missing → `Error::NotFound`)
//! 2. Delete the zone, addressed by names recomputed from the record; an
//!    absent zone counts as deleted
//! 3. Delete the record
//!
//! The zone always goes first: once the record is gone nothing can address
//! the zone any more.

use crate::config::{CreateZoneRequest, SagaConfig};
use crate::error::{CloudErrorKind, Error, Result};
use crate::retry::{Attempt, RetryPolicy, retry_with_backoff};
use crate::traits::{CloudDns, ControlPlane, DnsDomain, ManagedZone, ZoneRequest};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Description attached to every zone the saga creates
pub const ZONE_DESCRIPTION: &str = "Cloud DNS Zone created by OCM";

/// Page size used when listing control-plane records
pub const LIST_PAGE_SIZE: usize = 100;

/// Events emitted by the ProvisioningSaga
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaEvent {
    /// Control-plane record created
    RecordCreated { record_id: String },

    /// Managed zone created
    ZoneCreated {
        record_id: String,
        zone_name: String,
    },

    /// Zone creation failed; removing the zone (if any) and the record
    RollbackStarted { record_id: String, error: String },

    /// Record deleted after a failed zone creation
    RolledBack { record_id: String },

    /// Rollback could not finish; the record is left behind
    Orphaned { record_id: String, error: String },

    /// Managed zone deleted (or already absent)
    ZoneDeleted {
        record_id: String,
        zone_name: String,
        was_present: bool,
    },

    /// Control-plane record deleted
    RecordDeleted { record_id: String },
}

/// Non-terminal states of the create workflow
#[derive(Debug)]
pub enum CreateState {
    /// Nothing exists yet
    Init,
    /// The record exists; the zone does not yet
    RecordCreated(DnsDomain),
    /// Zone creation failed; any zone and then the record must be removed
    RollingBack { record: DnsDomain, cause: Error },
}

/// Terminal states of the create workflow
#[derive(Debug)]
pub enum CreateOutcome {
    /// Both halves exist
    Done { record: DnsDomain, zone: ManagedZone },
    /// The record could not be created; nothing to undo
    Failed(Error),
    /// Zone creation failed and the record was removed; nothing exists
    Clean { cause: Error },
    /// Zone creation failed and rollback did not finish; the record is left
    /// behind for manual cleanup (and still addresses the zone, if one exists)
    Orphaned {
        record: DnsDomain,
        cause: Error,
        compensation: Error,
    },
}

impl CreateOutcome {
    /// Collapse the outcome into the record or the error(s) to report
    pub fn into_result(self) -> Result<DnsDomain> {
        match self {
            CreateOutcome::Done { record, .. } => Ok(record),
            CreateOutcome::Failed(err) | CreateOutcome::Clean { cause: err } => Err(err),
            CreateOutcome::Orphaned {
                record,
                cause,
                compensation,
            } => Err(Error::compensation(record.id, cause, compensation)),
        }
    }
}

enum Transition {
    Next(CreateState),
    Finished(CreateOutcome),
}

/// Result of a successful delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// The record that was deleted
    pub record: DnsDomain,
    /// Whether the zone still existed when the delete reached it
    pub zone_was_present: bool,
}

/// Cloud-side state of a record's zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneStatus {
    /// The zone exists
    Present(ManagedZone),
    /// No zone with the record's DNS name exists
    Missing,
    /// The cloud provider could not be queried
    Unknown(String),
}

/// A record together with its derived names and zone status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDescription {
    /// The control-plane record
    pub record: DnsDomain,
    /// Derived zone name
    pub zone_name: String,
    /// Derived DNS name
    pub dns_name: String,
    /// Cloud-side status
    pub zone: ZoneStatus,
}

/// Cross-system provisioning saga
///
/// Every call runs its steps strictly in sequence; the saga holds no mutable
/// state between calls, so one instance can serve any number of records.
pub struct ProvisioningSaga {
    /// Control plane holding the records
    control_plane: Box<dyn ControlPlane>,

    /// Cloud provider holding the zones
    cloud: Box<dyn CloudDns>,

    /// Retry policy for transient cloud failures
    cloud_retry: RetryPolicy,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SagaEvent>,
}

impl ProvisioningSaga {
    /// Create a new saga
    ///
    /// # Returns
    ///
    /// A tuple of (saga, event_receiver) where event_receiver yields saga events
    pub fn new(
        control_plane: Box<dyn ControlPlane>,
        cloud: Box<dyn CloudDns>,
        config: &SagaConfig,
    ) -> Result<(Self, mpsc::Receiver<SagaEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let saga = Self {
            control_plane,
            cloud,
            cloud_retry: config.cloud_retry_policy(),
            event_tx: tx,
        };

        Ok((saga, rx))
    }

    /// Create a record and its zone, rolling the record back if the zone
    /// cannot be created
    ///
    /// # Returns
    ///
    /// - `Ok(DnsDomain)`: Both halves exist; the record carries its id
    /// - `Err(Error::Compensation)`: The record was orphaned; both errors and
    ///   the record id are included
    /// - `Err(_)`: Nothing exists; the error that stopped the saga
    pub async fn create(&self, request: &CreateZoneRequest) -> Result<DnsDomain> {
        self.create_outcome(request).await.into_result()
    }

    /// Run the create workflow to a terminal state
    pub async fn create_outcome(&self, request: &CreateZoneRequest) -> CreateOutcome {
        let mut state = CreateState::Init;
        loop {
            match self.advance(state, request).await {
                Transition::Next(next) => state = next,
                Transition::Finished(outcome) => return outcome,
            }
        }
    }

    async fn advance(&self, state: CreateState, request: &CreateZoneRequest) -> Transition {
        match state {
            CreateState::Init => {
                match self.control_plane.create_dns_domain(&request.to_spec()).await {
                    Ok(record) => {
                        info!("Created dns-domain '{}'", record.id);
                        self.emit_event(SagaEvent::RecordCreated {
                            record_id: record.id.clone(),
                        });
                        Transition::Next(CreateState::RecordCreated(record))
                    }
                    Err(e) => {
                        error!("Failed to create dns-domain: {}", e);
                        Transition::Finished(CreateOutcome::Failed(e))
                    }
                }
            }

            CreateState::RecordCreated(record) => {
                let zone_request = ZoneRequest {
                    project_id: record.gcp.project_id.clone(),
                    zone_name: record.zone_name(),
                    dns_name: record.dns_name(),
                    network_url: request.network_url(),
                    description: ZONE_DESCRIPTION.to_string(),
                };

                match self.create_zone_with_retry(&zone_request).await {
                    Ok(zone) => {
                        info!(
                            "Created {} zone '{}' for dns-domain '{}'",
                            self.cloud.provider_name(),
                            zone.name,
                            record.id
                        );
                        self.emit_event(SagaEvent::ZoneCreated {
                            record_id: record.id.clone(),
                            zone_name: zone.name.clone(),
                        });
                        Transition::Finished(CreateOutcome::Done { record, zone })
                    }
                    Err(cause) => {
                        warn!(
                            "Failed to create zone '{}', rolling back dns-domain '{}': {}",
                            zone_request.zone_name, record.id, cause
                        );
                        self.emit_event(SagaEvent::RollbackStarted {
                            record_id: record.id.clone(),
                            error: cause.to_string(),
                        });
                        Transition::Next(CreateState::RollingBack { record, cause })
                    }
                }
            }

            // An attempt whose response was lost may still have created the
            // zone. It goes first; the record is its only handle.
            CreateState::RollingBack { record, cause } => {
                let zone_name = record.zone_name();
                match self
                    .delete_zone_with_retry(&record.gcp.project_id, &zone_name)
                    .await
                {
                    Ok(true) => {
                        info!("Removed zone '{}' left by a failed create", zone_name);
                        self.emit_event(SagaEvent::ZoneDeleted {
                            record_id: record.id.clone(),
                            zone_name,
                            was_present: true,
                        });
                    }
                    Ok(false) => {}
                    Err(compensation) => {
                        error!(
                            "Failed to remove zone '{}', keeping dns-domain '{}': {}",
                            zone_name, record.id, compensation
                        );
                        self.emit_event(SagaEvent::Orphaned {
                            record_id: record.id.clone(),
                            error: compensation.to_string(),
                        });
                        return Transition::Finished(CreateOutcome::Orphaned {
                            record,
                            cause,
                            compensation,
                        });
                    }
                }

                // The record delete runs once; a failure here is surfaced, not retried
                match self.control_plane.delete_dns_domain(&record.id).await {
                    Ok(()) => {
                        info!("Rolled back dns-domain '{}'", record.id);
                        self.emit_event(SagaEvent::RolledBack {
                            record_id: record.id.clone(),
                        });
                        Transition::Finished(CreateOutcome::Clean { cause })
                    }
                    Err(compensation) => {
                        error!(
                            "Failed to roll back dns-domain '{}', manual cleanup required: {}",
                            record.id, compensation
                        );
                        self.emit_event(SagaEvent::Orphaned {
                            record_id: record.id.clone(),
                            error: compensation.to_string(),
                        });
                        Transition::Finished(CreateOutcome::Orphaned {
                            record,
                            cause,
                            compensation,
                        })
                    }
                }
            }
        }
    }

    /// Create a zone, retrying transient failures until the deadline
    ///
    /// A conflict on a retried attempt means an earlier attempt reached the
    /// provider before failing; the zone name embeds the record id, so the
    /// existing zone is ours and is adopted.
    async fn create_zone_with_retry(&self, request: &ZoneRequest) -> Result<ManagedZone> {
        let cloud = &*self.cloud;
        let mut attempt = 0u32;

        retry_with_backoff(&self.cloud_retry, || {
            attempt += 1;
            let attempt = attempt;
            async move {
                match cloud.create_zone(request).await {
                    Ok(zone) => Attempt::Done(Ok(zone)),
                    Err(e) if e.is_transient() => {
                        warn!("Zone create attempt {} failed: {}", attempt, e);
                        Attempt::Retry
                    }
                    Err(e) if attempt > 1 && e.cloud_kind() == Some(CloudErrorKind::Conflict) => {
                        debug!("Zone '{}' already exists after retry, adopting it", request.zone_name);
                        Attempt::Done(adopt_zone(cloud, request, e).await)
                    }
                    Err(e) => Attempt::Done(Err(e)),
                }
            }
        })
        .await
    }

    /// Delete a zone, treating "not found" as already deleted
    ///
    /// # Returns
    ///
    /// `true` if the zone existed
    async fn delete_zone_with_retry(&self, project_id: &str, zone_name: &str) -> Result<bool> {
        let cloud = &*self.cloud;

        retry_with_backoff(&self.cloud_retry, || async move {
            match cloud.delete_zone(project_id, zone_name).await {
                Ok(()) => Attempt::Done(Ok(true)),
                Err(e) if e.is_cloud_not_found() => Attempt::Done(Ok(false)),
                Err(e) if e.is_transient() => {
                    warn!("Zone delete attempt failed: {}", e);
                    Attempt::Retry
                }
                Err(e) => Attempt::Done(Err(e)),
            }
        })
        .await
    }

    /// Delete the zone and then the record
    ///
    /// Safe to repeat after a partial failure: a zone that is already gone is
    /// skipped and the record delete is attempted again.
    ///
    /// # Returns
    ///
    /// - `Err(Error::NotFound)`: No record matches `id_or_key`
    pub async fn delete(&self, id_or_key: &str) -> Result<DeleteOutcome> {
        let record = self.control_plane.get_dns_domain(id_or_key).await?;
        let zone_name = record.zone_name();

        let zone_was_present = self
            .delete_zone_with_retry(&record.gcp.project_id, &zone_name)
            .await?;
        if zone_was_present {
            info!("{} dns-zone '{}' deleted successfully.", self.cloud.provider_name(), zone_name);
        } else {
            info!("{} dns-zone '{}' already absent.", self.cloud.provider_name(), zone_name);
        }
        self.emit_event(SagaEvent::ZoneDeleted {
            record_id: record.id.clone(),
            zone_name,
            was_present: zone_was_present,
        });

        self.control_plane.delete_dns_domain(&record.id).await?;
        info!("dns-domain '{}' deleted successfully.", record.id);
        self.emit_event(SagaEvent::RecordDeleted {
            record_id: record.id.clone(),
        });

        Ok(DeleteOutcome {
            record,
            zone_was_present,
        })
    }

    /// Fetch a record by id or lookup key
    pub async fn get(&self, id_or_key: &str) -> Result<DnsDomain> {
        self.control_plane.get_dns_domain(id_or_key).await
    }

    /// Fetch a record and look up its zone
    ///
    /// A cloud lookup failure is reported as [`ZoneStatus::Unknown`] rather
    /// than failing the whole call.
    pub async fn describe(&self, id_or_key: &str) -> Result<ZoneDescription> {
        let record = self.control_plane.get_dns_domain(id_or_key).await?;
        let zone_name = record.zone_name();
        let dns_name = record.dns_name();

        let zone = match self.cloud.list_zones(&record.gcp.project_id, &dns_name).await {
            Ok(zones) => zones
                .into_iter()
                .find(|z| z.name == zone_name)
                .map_or(ZoneStatus::Missing, ZoneStatus::Present),
            Err(e) => {
                warn!("Failed to look up zone '{}': {}", zone_name, e);
                ZoneStatus::Unknown(e.to_string())
            }
        };

        Ok(ZoneDescription {
            record,
            zone_name,
            dns_name,
            zone,
        })
    }

    /// List every record, page by page
    pub async fn list(&self) -> Result<Vec<DnsDomain>> {
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .control_plane
                .list_dns_domains(page, LIST_PAGE_SIZE)
                .await?;
            let last = batch.len() < LIST_PAGE_SIZE;
            records.extend(batch);
            if last {
                break;
            }
            page += 1;
        }
        debug!("Listed {} dns-domain(s) in {} page(s)", records.len(), page);
        Ok(records)
    }

    /// Emit a saga event
    fn emit_event(&self, event: SagaEvent) {
        // Dropped when nobody drains the channel fast enough
        if self.event_tx.try_send(event).is_err() {
            warn!("Saga event channel full, dropping event");
        }
    }
}

async fn adopt_zone(cloud: &dyn CloudDns, request: &ZoneRequest, conflict: Error) -> Result<ManagedZone> {
    let zones = cloud.list_zones(&request.project_id, &request.dns_name).await?;
    zones
        .into_iter()
        .find(|z| z.name == request.zone_name)
        .ok_or(conflict)
}
