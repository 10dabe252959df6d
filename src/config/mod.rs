//! Configuration files supplying option values
//!
//! This module handles discovery and parsing of YAML files whose values are
//! captured with the `config` source, and validation of those files against
//! a command tree.

pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use types::*;
