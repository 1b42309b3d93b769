//! Load flow solver contract for gridnet networks.
//!
//! The numerical engine lives outside this workspace. This crate defines what
//! is exchanged with it and how answers land back on the network:
//!
//! ```text
//! Network ──to_dict──> SolveRequest {network, solver} ──> LoadFlowBackend
//!    ^                                                         │
//!    └──── set_results <── result blocks keyed by id <── response
//! ```
//!
//! # Response statuses
//!
//! | `info.status` | Outcome |
//! |---------------|---------|
//! | `success` | results applied, [`SolveInfo`] returned |
//! | `failure` | `GridError::NonConvergence` with iterations and residual |
//! | anything else | `GridError::TransportOrRequestError` |
//!
//! Transport failures reported by the backend as [`SolverError`] also become
//! `TransportOrRequestError`.

pub mod dispatch;
pub mod error;
pub mod request;
pub mod response;

pub use dispatch::{solve_load_flow, LoadFlowBackend, SolveInfo};
pub use error::{SolverError, SolverResult};
pub use request::{SolveRequest, SolverConfig};
pub use response::{ResponseInfo, ResponseResults, SolveStatus};
