//! Binding to clap, which does the actual token matching
//!
//! The declared tree is mirrored into a `clap::Command`. After matching,
//! clap's per-argument value sources become capture notifications, one for
//! each option given on the command line or read from its environment
//! variable.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::provenance::ValueSource;
use clap::parser::ValueSource as ClapSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches};
use std::collections::HashSet;

/// Positionals get their own id namespace so an argument may share its name
/// with an option key.
fn positional_id(name: &str) -> String {
    format!("arg:{}", name)
}

/// Raw values captured for one option, with where they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub key: String,
    /// One entry per occurrence, in command-line order
    pub raws: Vec<String>,
    pub source: ValueSource,
}

/// Reject declarations clap cannot represent, for `command` and every
/// subcommand below it.
pub fn check(command: &Command) -> Result<()> {
    let duplicate = |name: String| Error::DuplicateName {
        command: command.name().to_string(),
        name,
    };

    let mut keys = HashSet::new();
    let mut longs: HashSet<String> = HashSet::from(["help".to_string()]);
    let mut shorts: HashSet<char> = HashSet::from(['h']);
    if command.get_version().is_some() {
        longs.insert("version".to_string());
        shorts.insert('V');
    }
    for option in command.options() {
        if !keys.insert(option.key()) {
            return Err(duplicate(option.key().to_string()));
        }
        if !longs.insert(option.long_name().to_string()) {
            return Err(duplicate(format!("--{}", option.long_name())));
        }
        if let Some(short) = option.short_name() {
            if !shorts.insert(short) {
                return Err(duplicate(format!("-{}", short)));
            }
        }
    }

    let mut names = HashSet::new();
    let mut optional_seen = None;
    let count = command.arguments().len();
    for (index, argument) in command.arguments().iter().enumerate() {
        if !names.insert(argument.name()) {
            return Err(duplicate(argument.name().to_string()));
        }
        if argument.is_variadic() && index + 1 != count {
            return Err(Error::ArgumentOrder {
                command: command.name().to_string(),
                argument: argument.name().to_string(),
                reason: "is variadic but not the last argument",
            });
        }
        if argument.is_required() {
            if let Some(optional) = optional_seen {
                return Err(Error::ArgumentOrder {
                    command: command.name().to_string(),
                    argument: optional,
                    reason: "is optional but followed by a required argument",
                });
            }
        } else if optional_seen.is_none() {
            optional_seen = Some(argument.name().to_string());
        }
    }

    let mut sub_names = HashSet::new();
    if !command.subcommands().is_empty() {
        sub_names.insert("help");
    }
    for sub in command.subcommands() {
        for name in std::iter::once(sub.name()).chain(sub.get_aliases().iter().map(String::as_str)) {
            if !sub_names.insert(name) {
                return Err(duplicate(name.to_string()));
            }
        }
        check(sub)?;
    }

    Ok(())
}

/// Build the clap command mirroring `command` and its subcommands
pub fn build(command: &Command) -> clap::Command {
    let mut cmd = clap::Command::new(command.name().to_string());

    if let Some(about) = command.get_about() {
        cmd = cmd.about(about.to_string());
    }
    if let Some(version) = command.get_version() {
        cmd = cmd.version(version.to_string());
    }
    for alias in command.get_aliases() {
        cmd = cmd.alias(alias.clone());
    }
    if command.is_subcommand_required() {
        cmd = cmd.subcommand_required(true);
    }

    for option in command.options() {
        let mut arg = Arg::new(option.key().to_string()).long(option.long_name().to_string());

        if let Some(short) = option.short_name() {
            arg = arg.short(short);
        }
        if let Some(help) = option.help_text() {
            arg = arg.help(help.to_string());
        }
        if let Some(var) = option.env_var() {
            arg = arg.env(var.to_string());
        }
        if option.is_hidden() {
            arg = arg.hide(true);
        }

        arg = if option.is_flag() {
            arg.action(ArgAction::SetTrue)
        } else {
            let action = if option.is_multiple() {
                ArgAction::Append
            } else {
                ArgAction::Set
            };
            let mut arg = arg.action(action).value_parser(value_parser!(String));
            if let Some(name) = option.value_name_text() {
                arg = arg.value_name(name.to_string());
            }
            arg
        };

        cmd = cmd.arg(arg);
    }

    for (index, argument) in command.arguments().iter().enumerate() {
        let mut arg = Arg::new(positional_id(argument.name()))
            .value_name(argument.name().to_string())
            .index(index + 1)
            .value_parser(value_parser!(String))
            .required(argument.is_required());

        if let Some(help) = argument.help_text() {
            arg = arg.help(help.to_string());
        }
        arg = if argument.is_variadic() {
            arg.action(ArgAction::Append).num_args(1..)
        } else {
            arg.action(ArgAction::Set)
        };

        cmd = cmd.arg(arg);
    }

    for sub in command.subcommands() {
        cmd = cmd.subcommand(build(sub));
    }

    cmd
}

/// Capture notifications for the options of `command` that clap saw on the
/// command line or in the environment.
pub fn captures(command: &Command, matches: &ArgMatches) -> Vec<Capture> {
    let mut captured = Vec::new();

    for option in command.options() {
        let key = option.key();
        let source = match matches.value_source(key) {
            Some(ClapSource::CommandLine) => ValueSource::CommandLine,
            Some(ClapSource::EnvVariable) => ValueSource::Environment,
            _ => continue,
        };

        let raws = if option.is_flag() {
            vec![matches.get_flag(key).to_string()]
        } else {
            matches
                .get_many::<String>(key)
                .map(|values| values.cloned().collect())
                .unwrap_or_default()
        };

        captured.push(Capture {
            key: key.to_string(),
            raws,
            source,
        });
    }

    captured
}

/// Raw strings matched for each declared positional argument, in order
pub fn positionals(command: &Command, matches: &ArgMatches) -> Vec<Option<Vec<String>>> {
    command
        .arguments()
        .iter()
        .map(|argument| {
            matches
                .get_many::<String>(&positional_id(argument.name()))
                .map(|values| values.cloned().collect())
        })
        .collect()
}
