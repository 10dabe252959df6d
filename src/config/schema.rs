//! Configuration validation
//!
//! Checks a config file against the command tree it is applied to.

use crate::command::Command;
use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::value::Value;

/// Validate a complete configuration against `command` and its subcommands
pub fn validate_config(config: &Config, command: &Command) -> ConfigResult<()> {
    for (key, value) in &config.options {
        let option = command
            .find_option(key)
            .ok_or_else(|| ConfigError::UnknownOption {
                command: command.name().to_string(),
                option: key.clone(),
            })?;

        if option.is_flag() && !matches!(value, Value::Bool(_)) {
            return Err(ConfigError::Invalid(format!(
                "Option '{}' of command '{}' is a flag and needs true or false",
                key,
                command.name()
            )));
        }
        if option.is_multiple() && !matches!(value, Value::Sequence(_)) {
            return Err(ConfigError::Invalid(format!(
                "Option '{}' of command '{}' takes a list of values",
                key,
                command.name()
            )));
        }
    }

    for (name, section) in &config.commands {
        let sub = command
            .find_subcommand(name)
            .ok_or_else(|| ConfigError::UnknownCommand {
                parent: command.name().to_string(),
                name: name.clone(),
            })?;
        validate_config(section, sub)?;
    }

    Ok(())
}
