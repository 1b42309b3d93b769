use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gridnet_core::Diagnostics;

/// Write `text` to `output`, or to stdout when no path is given.
pub fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{text}")?;
        }
    }
    Ok(())
}

/// Print the warnings of a load or migration on stderr.
pub fn print_warnings(diagnostics: &Diagnostics) {
    for issue in diagnostics.warnings() {
        eprintln!("{issue}");
    }
}
