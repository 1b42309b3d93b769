//! `gridnet request`: the document a load flow backend would receive.

use std::path::Path;

use anyhow::{Context, Result};
use gridnet_io::{from_json, to_pretty_json};
use gridnet_solver::{SolveRequest, SolverConfig};

use super::util::{print_warnings, write_output};

pub fn handle(input: &Path, output: Option<&Path>, solver: SolverConfig) -> Result<()> {
    let result = from_json(input)?;
    print_warnings(&result.diagnostics);
    let request = SolveRequest::new(&result.network, solver)?;
    let value = serde_json::to_value(&request).context("serializing the request")?;
    write_output(output, &to_pretty_json(&value)?)
}
