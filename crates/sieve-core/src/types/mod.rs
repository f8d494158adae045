//! # Core Type Definitions
//!
//! Shared types for the sieve stage:
//! - Terminal responses returned to the pipeline executor (`Response`)
//! - Error types (`SieveError`)

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// RESPONSE
// =============================================================================

/// A terminal signal returned to the message source instead of output
/// batches.
///
/// - `Ack`: the message was handled and must not be re-delivered
/// - `Error`: the message could not be handled and may be retried
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum Response {
    /// Acknowledge the source message, no further action.
    Ack,
    /// Report a failure upstream.
    Error(String),
}

impl Response {
    /// Create an acknowledgment response.
    #[must_use]
    pub const fn ack() -> Self {
        Self::Ack
    }

    /// Create an error response from anything displayable.
    #[must_use]
    pub fn error(reason: impl std::fmt::Display) -> Self {
        Self::Error(reason.to_string())
    }

    /// Check whether this is an acknowledgment.
    #[must_use]
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    /// The error reason, if this is an error response.
    #[must_use]
    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Self::Ack => None,
            Self::Error(reason) => Some(reason),
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ack => write!(f, "ack"),
            Self::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building or driving a stage.
///
/// Filtering itself has no failure mode; every variant here comes from
/// construction, configuration or the I/O edges of the executor.
#[derive(Debug, Error)]
pub enum SieveError {
    /// No condition is registered under the configured type name.
    #[error("condition type '{0}' was not recognised")]
    UnknownConditionType(String),

    /// No processor is registered under the configured type name.
    #[error("processor type '{0}' was not recognised")]
    UnknownProcessorType(String),

    /// A processor could not build its condition.
    #[error("failed to construct condition '{kind}': {source}")]
    ConditionConstruction {
        /// The configured condition type.
        kind: String,
        /// The underlying cause.
        #[source]
        source: Box<SieveError>,
    },

    /// A configuration section is missing or has invalid values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A named resource was requested from the manager but does not exist.
    #[error("resource '{0}' was not found")]
    ResourceNotFound(String),

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An inbound batch could not be decoded.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
