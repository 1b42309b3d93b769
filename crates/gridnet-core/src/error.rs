//! Unified error types for the gridnet crates
//!
//! Every hard failure (validation, decoding, migration, solver dispatch) is a
//! [`GridError`]. Each variant maps to a stable [`ErrorKind`] so callers can
//! branch on the kind without matching message text. Recoverable notices go
//! through [`crate::Diagnostics`] instead and never become errors.
//!
//! # Example
//!
//! ```
//! use gridnet_core::{ErrorKind, GridError, GridResult};
//!
//! fn lookup() -> GridResult<()> {
//!     Err(GridError::NoVoltageSource("the network does not contain any voltage source".into()))
//! }
//!
//! let err = lookup().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::NoVoltageSource);
//! ```

use serde::Serialize;
use thiserror::Error;

/// Which shared parameter table a duplicated id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterCategory {
    Line,
    Transformer,
}

impl std::fmt::Display for ParameterCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterCategory::Line => write!(f, "line"),
            ParameterCategory::Transformer => write!(f, "transformer"),
        }
    }
}

/// Stable, machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Io,
    BadDocument,
    BadPhase,
    BadSize,
    BadLength,
    BadElementId,
    DuplicateId,
    UnknownElement,
    ElementInUse,
    NoVoltageSource,
    NoPotentialReference,
    SeveralPotentialReferences,
    MultipleNetworks,
    BadBranchType,
    BadLoadType,
    InvalidPotentialRef,
    DuplicateParameterId,
    UnsupportedVersion,
    InvalidNetwork,
    NonConvergence,
    TransportOrRequestError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "io",
            ErrorKind::BadDocument => "bad_document",
            ErrorKind::BadPhase => "bad_phase",
            ErrorKind::BadSize => "bad_size",
            ErrorKind::BadLength => "bad_length",
            ErrorKind::BadElementId => "bad_element_id",
            ErrorKind::DuplicateId => "duplicate_id",
            ErrorKind::UnknownElement => "unknown_element",
            ErrorKind::ElementInUse => "element_in_use",
            ErrorKind::NoVoltageSource => "no_voltage_source",
            ErrorKind::NoPotentialReference => "no_potential_reference",
            ErrorKind::SeveralPotentialReferences => "several_potential_references",
            ErrorKind::MultipleNetworks => "multiple_networks",
            ErrorKind::BadBranchType => "bad_branch_type",
            ErrorKind::BadLoadType => "bad_load_type",
            ErrorKind::InvalidPotentialRef => "invalid_potential_ref",
            ErrorKind::DuplicateParameterId => "duplicate_parameter_id",
            ErrorKind::UnsupportedVersion => "unsupported_version",
            ErrorKind::InvalidNetwork => "invalid_network",
            ErrorKind::NonConvergence => "non_convergence",
            ErrorKind::TransportOrRequestError => "transport_or_request_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for all gridnet operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// File access errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON or a document missing required fields
    #[error("Bad document: {0}")]
    BadDocument(String),

    #[error("{0}")]
    BadPhase(String),

    /// Per-phase values whose count does not match the phases
    #[error("{0}")]
    BadSize(String),

    #[error("{0}")]
    BadLength(String),

    /// A mapping key differs from the id of the element stored under it
    #[error("{0}")]
    BadElementId(String),

    /// The same id is used twice within one element category
    #[error("{0}")]
    DuplicateId(String),

    /// Dangling adjacency, wrong category, or unresolved id lookup
    #[error("{0}")]
    UnknownElement(String),

    /// The element is still referenced by another element
    #[error("{0}")]
    ElementInUse(String),

    #[error("{0}")]
    NoVoltageSource(String),

    #[error("The connected component containing the element {element} does not have a potential reference.")]
    NoPotentialReference { element: String },

    #[error("The connected component containing the element {element} has {count} potential references, it should have only one.")]
    SeveralPotentialReferences { element: String, count: usize },

    #[error("{0}")]
    MultipleNetworks(String),

    #[error("{0}")]
    BadBranchType(String),

    #[error("{0}")]
    BadLoadType(String),

    #[error("{0}")]
    InvalidPotentialRef(String),

    #[error("The {category} parameters id {id} is used by several parameter objects with different values.")]
    DuplicateParameterId {
        id: String,
        category: ParameterCategory,
    },

    #[error("Unsupported document version {found}, the current version is {current}.")]
    UnsupportedVersion { found: String, current: u32 },

    /// Solve requested while the network has not passed validation
    #[error("{0}")]
    InvalidNetwork(String),

    #[error("The load flow did not converge after {iterations} iterations. The norm of the residuals is {residual:.5e}.")]
    NonConvergence { iterations: u32, residual: f64 },

    #[error("Solver request failed: {0}")]
    TransportOrRequestError(String),
}

impl GridError {
    /// The machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GridError::Io(_) => ErrorKind::Io,
            GridError::BadDocument(_) => ErrorKind::BadDocument,
            GridError::BadPhase(_) => ErrorKind::BadPhase,
            GridError::BadSize(_) => ErrorKind::BadSize,
            GridError::BadLength(_) => ErrorKind::BadLength,
            GridError::BadElementId(_) => ErrorKind::BadElementId,
            GridError::DuplicateId(_) => ErrorKind::DuplicateId,
            GridError::UnknownElement(_) => ErrorKind::UnknownElement,
            GridError::ElementInUse(_) => ErrorKind::ElementInUse,
            GridError::NoVoltageSource(_) => ErrorKind::NoVoltageSource,
            GridError::NoPotentialReference { .. } => ErrorKind::NoPotentialReference,
            GridError::SeveralPotentialReferences { .. } => ErrorKind::SeveralPotentialReferences,
            GridError::MultipleNetworks(_) => ErrorKind::MultipleNetworks,
            GridError::BadBranchType(_) => ErrorKind::BadBranchType,
            GridError::BadLoadType(_) => ErrorKind::BadLoadType,
            GridError::InvalidPotentialRef(_) => ErrorKind::InvalidPotentialRef,
            GridError::DuplicateParameterId { .. } => ErrorKind::DuplicateParameterId,
            GridError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            GridError::InvalidNetwork(_) => ErrorKind::InvalidNetwork,
            GridError::NonConvergence { .. } => ErrorKind::NonConvergence,
            GridError::TransportOrRequestError(_) => ErrorKind::TransportOrRequestError,
        }
    }
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

// JSON parsing errors surface as malformed documents
impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::BadDocument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridError::SeveralPotentialReferences {
            element: "'bus1'".into(),
            count: 2,
        };
        assert!(err.to_string().contains("'bus1'"));
        assert!(err.to_string().contains("2 potential references"));
        assert_eq!(err.kind(), ErrorKind::SeveralPotentialReferences);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let grid_err: GridError = io_err.into();
        assert!(matches!(grid_err, GridError::Io(_)));
        assert_eq!(grid_err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_json_error_is_bad_document() {
        let err: GridError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::BadDocument);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DuplicateParameterId).unwrap();
        assert_eq!(json, "\"duplicate_parameter_id\"");
        assert_eq!(ErrorKind::DuplicateParameterId.as_str(), "duplicate_parameter_id");
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> GridResult<()> {
            Err(GridError::NonConvergence {
                iterations: 20,
                residual: 1.5e-3,
            })
        }

        fn outer() -> GridResult<()> {
            inner()?;
            Ok(())
        }

        let err = outer().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonConvergence);
        assert!(err.to_string().contains("20 iterations"));
    }
}
