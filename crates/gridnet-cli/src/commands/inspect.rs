//! Network inspection.
//!
//! Element counts per category and the galvanic components of the element
//! graph, or the whole graph in DOT format for Graphviz.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use gridnet_core::Network;
use gridnet_io::from_json;
use tabwriter::TabWriter;

pub fn handle(input: &Path, dot: bool) -> Result<()> {
    let result = from_json(input)?;
    if dot {
        println!("{}", result.network.to_dot());
        return Ok(());
    }
    print_summary(&result.network)
}

fn print_summary(network: &Network) -> Result<()> {
    let stats = network.stats();
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "CATEGORY\tCOUNT")?;
    writeln!(writer, "buses\t{}", stats.buses)?;
    writeln!(writer, "branches\t{}", stats.branches)?;
    writeln!(writer, "loads\t{}", stats.loads)?;
    writeln!(writer, "sources\t{}", stats.sources)?;
    writeln!(writer, "grounds\t{}", stats.grounds)?;
    writeln!(writer, "potential_refs\t{}", stats.potential_refs)?;
    writeln!(writer, "links\t{}", stats.links)?;
    writeln!(writer, "max degree\t{}", stats.max_degree)?;
    writer.flush()?;

    println!();
    println!("Galvanic components: {}", stats.galvanic_components);
    for component in network.components() {
        println!(
            "  #{} ({} elements, {} potential refs)",
            component.component_id,
            component.elements.len(),
            component.potential_refs
        );
        for element in &component.elements {
            println!("    {element}");
        }
    }
    Ok(())
}
