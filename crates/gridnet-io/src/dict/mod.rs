//! Dict codec for the current document version.
//!
//! [`to_dict`] and [`from_dict`] map between the element arena and the
//! `serde_json::Value` form of a version 3 document. Older documents go
//! through [`crate::migrate`] before decoding.

mod decode;
mod encode;

pub use decode::{from_dict, from_document, network_from_dict};
pub use encode::{to_dict, to_document};
