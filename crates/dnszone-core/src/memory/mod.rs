// # In-Memory Backends
//
// In-process implementations of both collaborator traits. Nothing persists
// across restarts.

pub mod cloud_dns;
pub mod control_plane;

pub use cloud_dns::{InMemoryCloudDns, InMemoryCloudDnsFactory};
pub use control_plane::{InMemoryControlPlane, InMemoryControlPlaneFactory};
