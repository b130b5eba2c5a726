//! Test doubles and common utilities for saga contract tests
//!
//! The doubles wrap the in-memory backends and inject faults on demand.
//! Every call is appended to a shared log so tests can check ordering
//! across both systems.

#![allow(dead_code)]

use dnszone_core::error::{CloudErrorKind, Error, Result};
use dnszone_core::traits::{
    CloudDns, ControlPlane, DnsDomain, DnsDomainSpec, ManagedZone, ZoneRequest,
};
use dnszone_core::{InMemoryCloudDns, InMemoryControlPlane, SagaConfig};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Ordered log of calls made against both systems
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }
}

/// A scripted fault for one cloud call
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Fail without touching state
    Reject(CloudErrorKind),
    /// Apply the change, then report a failure (lost response)
    ApplyThenFail(CloudErrorKind),
}

/// A cloud DNS double with scripted failures
#[derive(Clone)]
pub struct ScriptedCloud {
    pub inner: InMemoryCloudDns,
    log: CallLog,
    create_script: Arc<Mutex<VecDeque<Fault>>>,
    create_always: Arc<Mutex<Option<CloudErrorKind>>>,
    delete_script: Arc<Mutex<VecDeque<Fault>>>,
    create_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
}

impl ScriptedCloud {
    pub fn new(log: &CallLog) -> Self {
        Self {
            inner: InMemoryCloudDns::new(),
            log: log.clone(),
            create_script: Arc::default(),
            create_always: Arc::default(),
            delete_script: Arc::default(),
            create_calls: Arc::default(),
            delete_calls: Arc::default(),
        }
    }

    /// Queue faults for the next create calls
    pub fn fail_creates(self, faults: impl IntoIterator<Item = Fault>) -> Self {
        self.create_script.lock().unwrap().extend(faults);
        self
    }

    /// Fail every create call with `kind`
    pub fn always_fail_creates(self, kind: CloudErrorKind) -> Self {
        *self.create_always.lock().unwrap() = Some(kind);
        self
    }

    /// Queue faults for the next delete calls
    pub fn fail_deletes(self, faults: impl IntoIterator<Item = Fault>) -> Self {
        self.delete_script.lock().unwrap().extend(faults);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

fn injected(kind: CloudErrorKind) -> Error {
    Error::cloud("scripted", kind, "injected failure")
}

#[async_trait::async_trait]
impl CloudDns for ScriptedCloud {
    async fn create_zone(&self, request: &ZoneRequest) -> Result<ManagedZone> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("cloud.create_zone {}", request.zone_name));

        if let Some(kind) = *self.create_always.lock().unwrap() {
            return Err(injected(kind));
        }
        let fault = self.create_script.lock().unwrap().pop_front();
        match fault {
            Some(Fault::Reject(kind)) => Err(injected(kind)),
            Some(Fault::ApplyThenFail(kind)) => {
                self.inner.create_zone(request).await?;
                Err(injected(kind))
            }
            None => self.inner.create_zone(request).await,
        }
    }

    async fn delete_zone(&self, project_id: &str, zone_name: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("cloud.delete_zone {}", zone_name));

        let fault = self.delete_script.lock().unwrap().pop_front();
        match fault {
            Some(Fault::Reject(kind)) => Err(injected(kind)),
            Some(Fault::ApplyThenFail(kind)) => {
                self.inner.delete_zone(project_id, zone_name).await?;
                Err(injected(kind))
            }
            None => self.inner.delete_zone(project_id, zone_name).await,
        }
    }

    async fn list_zones(&self, project_id: &str, dns_name: &str) -> Result<Vec<ManagedZone>> {
        self.log.push(format!("cloud.list_zones {}", dns_name));
        self.inner.list_zones(project_id, dns_name).await
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A control-plane double with scripted failures
#[derive(Clone)]
pub struct ScriptedControlPlane {
    pub inner: InMemoryControlPlane,
    log: CallLog,
    fail_create: bool,
    delete_failures: Arc<AtomicUsize>,
}

impl ScriptedControlPlane {
    pub fn new(log: &CallLog, ids: &[&str]) -> Self {
        Self {
            inner: InMemoryControlPlane::with_ids(ids.iter().copied()),
            log: log.clone(),
            fail_create: false,
            delete_failures: Arc::default(),
        }
    }

    /// Reject every create call
    pub fn failing_creates(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Fail the next `n` delete calls
    pub fn fail_next_deletes(self, n: usize) -> Self {
        self.delete_failures.store(n, Ordering::SeqCst);
        self
    }
}

#[async_trait::async_trait]
impl ControlPlane for ScriptedControlPlane {
    async fn create_dns_domain(&self, spec: &DnsDomainSpec) -> Result<DnsDomain> {
        self.log.push("control_plane.create");
        if self.fail_create {
            return Err(Error::control_plane("injected create failure"));
        }
        self.inner.create_dns_domain(spec).await
    }

    async fn get_dns_domain(&self, id_or_key: &str) -> Result<DnsDomain> {
        self.log.push(format!("control_plane.get {}", id_or_key));
        self.inner.get_dns_domain(id_or_key).await
    }

    async fn delete_dns_domain(&self, id: &str) -> Result<()> {
        self.log.push(format!("control_plane.delete {}", id));
        let remaining = self.delete_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.delete_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::control_plane("injected delete failure"));
        }
        self.inner.delete_dns_domain(id).await
    }

    async fn list_dns_domains(&self, page: usize, size: usize) -> Result<Vec<DnsDomain>> {
        self.inner.list_dns_domains(page, size).await
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

/// Saga settings with fast, deterministic retries
pub fn fast_saga_config(retry_timeout_secs: u64) -> SagaConfig {
    SagaConfig {
        cloud_retry_timeout_secs: retry_timeout_secs,
        initial_backoff_secs: 1,
        max_jitter_millis: 0,
        log_retries: false,
        event_channel_capacity: 64,
    }
}
