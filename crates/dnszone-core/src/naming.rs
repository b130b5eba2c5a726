//! Resource naming
//!
//! Pure functions that derive cloud-side names from control-plane data.
//! A later `delete` or `describe`, possibly in a different process, only has
//! the record in hand, so these must produce byte-identical output for
//! identical input forever. Changing any format here orphans existing zones.

/// Host of the compute API used in network locators
const COMPUTE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

/// Managed zone name for a record: `<prefix>.<id>` with every `.` replaced by `-`
///
/// Cloud DNS zone names may not contain dots.
///
/// ```
/// use dnszone_core::naming::zone_name;
///
/// assert_eq!(zone_name("my-domain", "abc123"), "my-domain-abc123");
/// ```
pub fn zone_name(domain_prefix: &str, record_id: &str) -> String {
    format!("{}.{}", domain_prefix, record_id).replace('.', "-")
}

/// Fully-qualified DNS name for a record: `<prefix>.<id>.`
///
/// ```
/// use dnszone_core::naming::dns_name;
///
/// assert_eq!(dns_name("my-domain", "abc123"), "my-domain.abc123.");
/// ```
pub fn dns_name(domain_prefix: &str, record_id: &str) -> String {
    format!("{}.{}.", domain_prefix, record_id)
}

/// Network locator expected by the private-visibility `networkUrl` field
pub fn network_resource_id(project_id: &str, network_id: &str) -> String {
    format!(
        "{}/projects/{}/global/networks/{}",
        COMPUTE_API_BASE, project_id, network_id
    )
}

/// Fully-qualified service account resource name
pub fn service_account_resource_id(account_id: &str, project_id: &str) -> String {
    format!(
        "projects/{}/serviceAccounts/{}@{}.iam.gserviceaccount.com",
        project_id, account_id, project_id
    )
}

/// Split a network locator produced by [`network_resource_id`] back into
/// `(project_id, network_id)`
///
/// Returns `None` for anything that is not exactly that shape.
pub fn parse_network_resource_id(locator: &str) -> Option<(&str, &str)> {
    let rest = locator.strip_prefix(COMPUTE_API_BASE)?.strip_prefix("/projects/")?;
    let (project_id, rest) = rest.split_once('/')?;
    let network_id = rest.strip_prefix("global/networks/")?;

    let valid = |s: &str| !s.is_empty() && !s.contains('/');
    if valid(project_id) && valid(network_id) {
        Some((project_id, network_id))
    } else {
        None
    }
}
