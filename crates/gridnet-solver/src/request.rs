//! Outbound solve request.

use gridnet_core::{GridResult, Network};
use gridnet_io::to_dict;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Convergence settings sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Residual norm below which the solve is considered converged
    pub precision: f64,
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            precision: 1e-6,
            max_iterations: 20,
        }
    }
}

/// The current-version document of a network plus solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub network: Value,
    pub solver: SolverConfig,
}

impl SolveRequest {
    /// Build a request from a network, without any previous results.
    pub fn new(network: &Network, solver: SolverConfig) -> GridResult<Self> {
        Ok(Self {
            network: to_dict(network, false)?,
            solver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: SolverConfig = serde_json::from_str(r#"{"max_iterations": 50}"#).unwrap();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.precision, 1e-6);
    }

    #[test]
    fn request_serializes_both_blocks() {
        let request = SolveRequest {
            network: serde_json::json!({"version": 3}),
            solver: SolverConfig::default(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["network"]["version"], 3);
        assert_eq!(value["solver"]["max_iterations"], 20);
    }
}
