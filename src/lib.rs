//! deferred-args - option and argument values that resolve later
//!
//! Declare a command tree, let clap match the command line, and have values
//! that are only available asynchronously (fetched, decrypted, read from
//! disk) awaited at the right points of subcommand dispatch. Every value
//! keeps the source it was captured from once it is resolved.

// Public modules
pub mod cli;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod parse_state;
pub mod parser;
pub mod provenance;
pub mod resolve;
pub mod value;

mod dispatch;

// Re-export commonly used types
pub use command::{Action, Command};
pub use descriptor::{Argument, CommandOption};
pub use error::{ConfigError, Error, ResolveError, Result};
pub use hooks::{ActionContext, LifecycleEvent, LifecycleHook};
pub use parse_state::{ParsePhase, ParseState};
pub use provenance::{Provenance, ProvenanceMap, ValueSource};
pub use value::{Deferred, ParsedValue, Value};

/// Current version of deferred-args
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
