//! Pre-defined provider descriptors.

mod config;

pub use config::{by_name, github, google, microsoft, WELL_KNOWN};
