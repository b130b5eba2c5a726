//! Error types for DNS zone provisioning
//!
//! This module defines all error types used throughout the crate.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a cloud provider failure
///
/// `NotFound` is singled out because zone deletion treats it as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudErrorKind {
    /// The addressed zone does not exist
    NotFound,
    /// A zone with the same name already exists
    Conflict,
    /// The provider throttled the request
    RateLimited,
    /// The provider failed with a server-side error
    Unavailable,
    /// Credentials were rejected or lack permission
    Unauthorized,
    /// Anything else
    Other,
}

impl fmt::Display for CloudErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloudErrorKind::NotFound => "not found",
            CloudErrorKind::Conflict => "conflict",
            CloudErrorKind::RateLimited => "rate limited",
            CloudErrorKind::Unavailable => "unavailable",
            CloudErrorKind::Unauthorized => "unauthorized",
            CloudErrorKind::Other => "error",
        };
        f.write_str(name)
    }
}

/// Core error type for DNS zone provisioning
#[derive(Error, Debug)]
pub enum Error {
    /// Control-plane record create/read/delete/list failure
    #[error("Control plane error: {0}")]
    ControlPlane(String),

    /// The control plane holds no record for the given id or key
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Cloud provider failure
    #[error("Cloud provider error ({provider}, {kind}): {message}")]
    CloudProvider {
        /// Provider name
        provider: String,
        /// Failure classification
        kind: CloudErrorKind,
        /// Error message
        message: String,
    },

    /// Rolling back a half-created zone failed; the record is orphaned
    #[error(
        "failed to create dns-zone and failed to rollback dns-domain '{record_id}': {compensation}: {cause}"
    )]
    Compensation {
        /// Identifier of the record left behind in the control plane
        record_id: String,
        /// The cloud failure that triggered the rollback
        cause: Box<Error>,
        /// The failure raised while deleting the record
        compensation: Box<Error>,
    },

    /// Retry deadline exceeded
    #[error("Timeout occurred after {0:?}")]
    Timeout(Duration),

    /// Malformed caller input, rejected before any external call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

}

impl Error {
    /// Create a control-plane error
    pub fn control_plane(msg: impl Into<String>) -> Self {
        Self::ControlPlane(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a cloud provider error
    pub fn cloud(
        provider: impl Into<String>,
        kind: CloudErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::CloudProvider {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a compensation failure carrying both errors
    pub fn compensation(record_id: impl Into<String>, cause: Error, compensation: Error) -> Self {
        Self::Compensation {
            record_id: record_id.into(),
            cause: Box::new(cause),
            compensation: Box::new(compensation),
        }
    }

    /// The cloud failure classification, if this is a cloud provider error
    pub fn cloud_kind(&self) -> Option<CloudErrorKind> {
        match self {
            Self::CloudProvider { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether this is the cloud provider's "zone does not exist" condition
    pub fn is_cloud_not_found(&self) -> bool {
        self.cloud_kind() == Some(CloudErrorKind::NotFound)
    }

    /// Whether the control plane reported the record as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self.cloud_kind(),
            Some(CloudErrorKind::RateLimited | CloudErrorKind::Unavailable)
        ) || matches!(self, Self::Http(_))
    }

    /// Whether this is the retrier's deadline error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
