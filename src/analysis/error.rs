//! Error types for assembly analysis.

use std::fmt;

use thiserror::Error;

use crate::onshape::OnshapeError;

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Which side of a two-instance operation an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceRole {
    /// The instance being moved.
    Source,
    /// The instance being aligned against.
    Target,
}

impl fmt::Display for InstanceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("Source"),
            Self::Target => f.write_str("Target"),
        }
    }
}

/// Errors that abort an analysis or positioning call.
///
/// Per-part bounding-box failures during a scan are not errors; they are
/// logged and the instance is skipped.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A collaborator call failed (assembly fetch, transform, or a
    /// bounding box that the operation cannot do without).
    #[error(transparent)]
    Source(#[from] OnshapeError),

    /// The assembly definition is missing data the operation requires.
    #[error("Malformed assembly data: {message}")]
    MalformedAssembly {
        /// Description of what's missing.
        message: String,
    },

    /// The face name is not one of the six supported faces.
    #[error("Invalid face '{face}'. Must be one of: {allowed}")]
    InvalidFace {
        /// The rejected input.
        face: String,
        /// Comma-separated list of accepted names.
        allowed: String,
    },

    /// An instance id is not present in the assembly.
    #[error("{role} instance '{id}' not found in assembly")]
    InstanceNotFound {
        /// Which side was missing.
        role: InstanceRole,
        /// The id that was looked up.
        id: String,
    },
}

impl AnalysisError {
    /// Creates a malformed-assembly error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedAssembly {
            message: message.into(),
        }
    }

    /// Creates an instance-not-found error.
    pub fn instance_not_found(role: InstanceRole, id: impl Into<String>) -> Self {
        Self::InstanceNotFound {
            role,
            id: id.into(),
        }
    }

    /// Returns `true` for input problems detected before any mutating call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidFace { .. } | Self::InstanceNotFound { .. }
        )
    }
}
