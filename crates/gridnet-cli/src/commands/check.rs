//! `gridnet check`: load a document and run the validator.

use std::path::Path;

use anyhow::Result;
use gridnet_io::from_json;

use super::util::print_warnings;

pub fn handle(input: &Path) -> Result<()> {
    let result = from_json(input)?;
    print_warnings(&result.diagnostics);
    let stats = result.network.stats();
    println!(
        "{}: valid network with {} buses, {} branches, {} loads, {} sources ({} warnings)",
        input.display(),
        stats.buses,
        stats.branches,
        stats.loads,
        stats.sources,
        result.diagnostics.warning_count()
    );
    Ok(())
}
