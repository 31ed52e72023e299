//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors cover building, checking and querying a topology.
/// These are independent of configuration and CLI concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid synthetic description {description:?}: {reason}")]
    InvalidSyntheticDescription { description: String, reason: String },

    #[error("invalid cpuset {text:?}: {reason}")]
    InvalidCpuSet { text: String, reason: String },

    #[error("index {index} out of range (max {max})")]
    IndexOutOfRange { index: usize, max: usize },

    #[error("index {index} exceeds mask capacity of {capacity} bits")]
    CapacityExceeded { index: usize, capacity: usize },

    #[error("topology inconsistency at {object}: {reason}")]
    TopologyInconsistency { object: String, reason: String },

    #[error("objects belong to different topologies")]
    CrossTopologyQuery,

    #[error("topology not loaded")]
    NotLoaded,
}

impl DomainError {
    pub(crate) fn synthetic(description: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSyntheticDescription {
            description: description.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn cpuset(text: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCpuSet {
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistency(object: impl ToString, reason: impl Into<String>) -> Self {
        Self::TopologyInconsistency {
            object: object.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
