//! Core configuration types
//!
//! A config file mirrors the command tree: option values for a command sit
//! under `options`, and each subcommand gets its own nested section under
//! `commands`.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Option values for one command and its subcommands
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Option values keyed by attribute key
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, Value>,

    /// Sections for subcommands, keyed by subcommand name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub commands: HashMap<String, Config>,
}

impl Config {
    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.commands.is_empty()
    }
}
