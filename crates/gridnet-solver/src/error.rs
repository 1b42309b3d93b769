//! Error types for solver backends.

use gridnet_core::GridError;
use thiserror::Error;

/// Errors a [`crate::LoadFlowBackend`] can report.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The backend could not be reached.
    #[error("Solver unreachable: {0}")]
    Transport(String),

    /// The backend answered but refused the request.
    #[error("Solver rejected the request ({code}): {message}")]
    Rejected { code: u16, message: String },

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request or response is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for backend calls.
pub type SolverResult<T> = Result<T, SolverError>;

// Every backend failure is a request error from the network's point of view
impl From<SolverError> for GridError {
    fn from(err: SolverError) -> Self {
        GridError::TransportOrRequestError(err.to_string())
    }
}
