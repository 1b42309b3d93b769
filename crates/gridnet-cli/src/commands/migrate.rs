//! `gridnet migrate`: rewrite a document at the current version.

use std::path::Path;

use anyhow::Result;
use gridnet_io::{migrate_json, to_pretty_json};
use tracing::info;

use super::util::{print_warnings, write_output};

pub fn handle(input: &Path, output: Option<&Path>) -> Result<()> {
    let (document, diagnostics) = migrate_json(input)?;
    print_warnings(&diagnostics);
    write_output(output, &to_pretty_json(&document)?)?;
    info!(
        input = %input.display(),
        warnings = diagnostics.warning_count(),
        "migration finished"
    );
    Ok(())
}
