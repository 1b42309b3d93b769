//! Solve dispatch: request out, results back onto the network.

use gridnet_core::{GridError, GridResult, Network};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::SolverResult;
use crate::request::{SolveRequest, SolverConfig};
use crate::response::{ResponseInfo, ResponseResults, SolveStatus};

/// A load flow engine reachable through some transport.
///
/// Implementations only move documents; interpreting the answer is done by
/// [`solve_load_flow`].
pub trait LoadFlowBackend {
    /// Name used in logs.
    fn name(&self) -> &str {
        "load flow backend"
    }

    /// Send one request and return the raw response document.
    fn solve(&self, request: &SolveRequest) -> SolverResult<Value>;
}

impl<F> LoadFlowBackend for F
where
    F: Fn(&SolveRequest) -> SolverResult<Value>,
{
    fn solve(&self, request: &SolveRequest) -> SolverResult<Value> {
        self(request)
    }
}

/// Convergence details of a successful solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveInfo {
    pub iterations: u32,
    pub final_error: f64,
}

fn malformed(err: serde_json::Error) -> GridError {
    GridError::TransportOrRequestError(format!("The solver response is malformed: {err}"))
}

/// Solve the load flow of `network` and attach the results to its elements.
///
/// Results are only written when every result block matches an element of
/// the network; otherwise the network keeps its previous results.
pub fn solve_load_flow<B: LoadFlowBackend + ?Sized>(
    network: &mut Network,
    backend: &B,
    config: SolverConfig,
) -> GridResult<SolveInfo> {
    if !network.is_valid() {
        return Err(GridError::InvalidNetwork(
            "The network has not passed validation, call `check` before solving.".to_string(),
        ));
    }
    let request = SolveRequest::new(network, config)?;
    info!(
        backend = backend.name(),
        precision = config.precision,
        max_iterations = config.max_iterations,
        "sending load flow request"
    );
    let mut response = backend.solve(&request)?;

    let info: ResponseInfo = match response.get_mut("info").map(Value::take) {
        Some(info) => serde_json::from_value(info).map_err(malformed)?,
        None => {
            return Err(GridError::TransportOrRequestError(
                "The solver response has no 'info' block.".to_string(),
            ))
        }
    };

    match info.status() {
        SolveStatus::Success => {}
        SolveStatus::Failure => {
            warn!(
                iterations = info.iterations,
                residual = info.final_error,
                "load flow did not converge"
            );
            return Err(GridError::NonConvergence {
                iterations: info.iterations,
                residual: info.final_error,
            });
        }
        SolveStatus::Other(status) => {
            return Err(GridError::TransportOrRequestError(format!(
                "The solver answered with the unknown status {status:?}."
            )))
        }
    }

    let results: ResponseResults = serde_json::from_value(response).map_err(malformed)?;
    let entries = results.into_entries();
    if let Some((category, id, _)) = entries
        .iter()
        .find(|(category, id, _)| network.find(*category, id).is_none())
    {
        return Err(GridError::UnknownElement(format!(
            "The solver returned results for the {category} {id} which is not in the network."
        )));
    }
    let count = entries.len();
    for (category, id, results) in entries {
        network.set_results(category, &id, results)?;
    }
    debug!(elements = count, "results dispatched");
    info!(
        iterations = info.iterations,
        final_error = info.final_error,
        "load flow converged"
    );
    Ok(SolveInfo {
        iterations: info.iterations,
        final_error: info.final_error,
    })
}
