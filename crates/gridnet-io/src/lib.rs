//! # gridnet-io: Network Documents & Version Migration
//!
//! Reads and writes distribution networks as versioned JSON documents.
//!
//! ## Design Philosophy
//!
//! **One current shape**: only the current document version (3) is decoded
//! into elements. Older layouts are first rewritten by the migration chain,
//! one version at a time, so each converter only knows two adjacent shapes.
//!
//! **Hard errors vs. notices**: malformed documents fail immediately with a
//! [`gridnet_core::GridError`]. Lossy or heuristic rewrites during migration
//! (renamed parameters, inferred phases, dropped limits) are collected in
//! [`gridnet_core::Diagnostics`] and logged, and the conversion proceeds.
//!
//! ## Quick Start: Load Any Version
//!
//! ```rust,no_run
//! use gridnet_io::from_json;
//!
//! fn main() -> gridnet_core::GridResult<()> {
//!     let result = from_json("network.json")?;
//!     for issue in result.diagnostics.warnings() {
//!         eprintln!("{issue}");
//!     }
//!     println!("{} buses", result.network.stats().buses);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`schema`] - Serde shapes of the current document version
//! - [`dict`] - [`to_dict`] / [`from_dict`] between the element arena and documents
//! - [`migrations`] - The `v0 -> v1 -> v2 -> v3` converter chain
//! - [`json`] - File reading and writing, pretty output
//!
//! ## Document Conventions
//!
//! - Complex values are `[re, im]` pairs, complex matrices `[re_matrix, im_matrix]`
//! - Cross references between elements are bare ids
//! - Line parameter matrices always use the 4 slots `a, b, c, n`

pub mod dict;
pub mod json;
pub mod migrations;
pub mod schema;

pub use dict::{from_dict, from_document, network_from_dict, to_dict, to_document};
pub use json::{
    from_json, from_value, migrate_json, read_document, to_json, to_json_string, to_pretty_json,
    ImportResult,
};
pub use migrations::{document_version, migrate, MIGRATION_CATEGORY};
pub use schema::{NetworkDocument, CURRENT_VERSION};
