//! Collaborator traits
//!
//! This module defines the interfaces to the two external systems a zone
//! spans.
//!
//! - [`ControlPlane`]: Owns `DnsDomain` records (source of truth)
//! - [`CloudDns`]: Owns the managed zones derived from those records

pub mod cloud_dns;
pub mod control_plane;

pub use cloud_dns::{CloudDns, CloudDnsFactory, ManagedZone, ZoneRequest, ZoneVisibility};
pub use control_plane::{
    ClusterArch, ControlPlane, ControlPlaneFactory, DnsDomain, DnsDomainSpec, GcpDnsDomain,
    PROVIDER_GCP,
};
