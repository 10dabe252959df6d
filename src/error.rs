//! Error types for deferred-args

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for deferred-args operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type returned by the parse entry points
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed command line, `--help` or `--version`
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// A deferred value failed; carried through unchanged
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// An action handler or caller hook failed
    #[error(transparent)]
    Action(#[from] anyhow::Error),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Option '{option}' of command '{command}' is required but not provided")]
    MissingOption { command: String, option: String },

    /// Two options, arguments or subcommands of one command share a name
    #[error("Command '{command}' declares '{name}' more than once")]
    DuplicateName { command: String, name: String },

    /// A positional argument cannot be matched where it is declared
    #[error("Argument '{argument}' of command '{command}' {reason}")]
    ArgumentOrder {
        command: String,
        argument: String,
        reason: &'static str,
    },

    /// The matcher reported a subcommand that is not declared on the command
    #[error("Command '{command}' has no subcommand named '{name}'")]
    UnknownSubcommand { command: String, name: String },

    /// The synchronous entry point hit a suspension point
    #[error("Synchronous parse of '{0}' attempted to wait on a deferred value")]
    Suspended(String),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Command '{command}' has no option '{option}'")]
    UnknownOption { command: String, option: String },

    #[error("Command '{parent}' has no subcommand '{name}'")]
    UnknownCommand { parent: String, name: String },

    #[error("Failed to read config file '{path}': {error}")]
    Read { path: PathBuf, error: io::Error },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of a deferred value.
///
/// Cloneable so that one failure can be observed by every holder of the
/// same deferred value; clones share the underlying error.
#[derive(Clone)]
pub struct ResolveError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl ResolveError {
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ResolveError(Arc::new(error))
    }

    /// Build an error from a plain message
    pub fn msg(message: impl Into<String>) -> Self {
        ResolveError(Arc::new(Message(message.into())))
    }

    /// Whether two errors are the same failure (not merely equal messages)
    pub fn ptr_eq(&self, other: &ResolveError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The error produced by the deferred computation
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<io::Error> for ResolveError {
    fn from(error: io::Error) -> Self {
        ResolveError::new(error)
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl Error {
    /// The deferred-value failure behind this error, if that is what it is
    pub fn as_resolve(&self) -> Option<&ResolveError> {
        match self {
            Error::Resolve(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_keeps_message() {
        let err = ResolveError::msg("vault sealed");
        assert_eq!(err.to_string(), "vault sealed");

        let wrapped: Error = err.clone().into();
        assert_eq!(wrapped.to_string(), "vault sealed");
        assert!(wrapped.as_resolve().unwrap().ptr_eq(&err));
    }

    #[test]
    fn test_resolve_error_identity() {
        let a = ResolveError::msg("x");
        let b = ResolveError::msg("x");
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_resolve_error_from_io() {
        let err: ResolveError = io::Error::new(io::ErrorKind::NotFound, "no token file").into();
        assert_eq!(err.to_string(), "no token file");
        assert!(err.inner().downcast_ref::<io::Error>().is_some());
    }
}
