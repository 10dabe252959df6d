//! Option and positional argument descriptors
//!
//! Descriptors are declared up front and fixed once added to a command.
//! The owning command is bound when a parse pass reaches that command,
//! not at construction.

use crate::value::{Coerce, ParsedValue, Value};
use std::fmt;
use std::sync::Arc;

/// A named option (flag) accepted by a command
#[derive(Clone)]
pub struct CommandOption {
    key: String,
    long: String,
    short: Option<char>,
    help: Option<String>,
    value_name: Option<String>,
    env: Option<String>,
    default: Option<ParsedValue>,
    flag: bool,
    multiple: bool,
    required: bool,
    hidden: bool,
    implies: Vec<(String, Value)>,
    coerce: Option<Coerce>,
    owner: Option<String>,
}

impl CommandOption {
    /// Declare an option stored under `key`; the long flag defaults to `--key`
    /// with underscores turned into dashes.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        CommandOption {
            long: key.replace('_', "-"),
            key,
            short: None,
            help: None,
            value_name: None,
            env: None,
            default: None,
            flag: false,
            multiple: false,
            required: false,
            hidden: false,
            implies: Vec::new(),
            coerce: None,
            owner: None,
        }
    }

    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = long.into();
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn value_name(mut self, name: impl Into<String>) -> Self {
        self.value_name = Some(name.into());
        self
    }

    /// Read the value from this environment variable when absent on the command line
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    /// Value used when nothing else supplies one. Stored as given, never coerced.
    pub fn default_value(mut self, value: impl Into<ParsedValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Boolean switch taking no value
    pub fn flag(mut self) -> Self {
        self.flag = true;
        self
    }

    /// Accept the option more than once; the value becomes a sequence
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// When this option is given explicitly, also set `key` to `value`
    /// unless `key` already has a non-default value.
    pub fn implies(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.implies.push((key.into(), value.into()));
        self
    }

    /// Convert each raw string; the result may be a deferred value
    pub fn coerce<F>(mut self, coerce: F) -> Self
    where
        F: Fn(&str) -> ParsedValue + Send + Sync + 'static,
    {
        self.coerce = Some(Arc::new(coerce));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn long_name(&self) -> &str {
        &self.long
    }

    pub fn short_name(&self) -> Option<char> {
        self.short
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn value_name_text(&self) -> Option<&str> {
        self.value_name.as_deref()
    }

    pub fn env_var(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn get_default(&self) -> Option<&ParsedValue> {
        self.default.as_ref()
    }

    pub fn is_flag(&self) -> bool {
        self.flag
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn implied(&self) -> &[(String, Value)] {
        &self.implies
    }

    /// Name of the command this option was last bound to by a parse pass
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub(crate) fn bind_owner(&mut self, command: &str) {
        self.owner = Some(command.to_string());
    }

    /// Turn the raw strings captured for this option into its stored value
    pub(crate) fn parse_raw(&self, raws: &[String]) -> ParsedValue {
        if self.flag {
            let on = raws.last().map_or(true, |raw| raw != "false");
            return ParsedValue::Ready(Value::Bool(on));
        }
        let mut items: Vec<ParsedValue> =
            raws.iter().map(|raw| coerce_one(&self.coerce, raw)).collect();
        if self.multiple {
            ParsedValue::sequence(items)
        } else {
            items.pop().unwrap_or(ParsedValue::Ready(Value::Null))
        }
    }
}

impl fmt::Debug for CommandOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandOption")
            .field("key", &self.key)
            .field("long", &self.long)
            .field("short", &self.short)
            .field("env", &self.env)
            .field("flag", &self.flag)
            .field("multiple", &self.multiple)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// A positional argument accepted by a command
#[derive(Clone)]
pub struct Argument {
    name: String,
    help: Option<String>,
    required: bool,
    variadic: bool,
    default: Option<ParsedValue>,
    coerce: Option<Coerce>,
    owner: Option<String>,
}

impl Argument {
    pub fn new(name: impl Into<String>) -> Self {
        Argument {
            name: name.into(),
            help: None,
            required: false,
            variadic: false,
            default: None,
            coerce: None,
            owner: None,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Collect all remaining positional values; must be the last argument
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<ParsedValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn coerce<F>(mut self, coerce: F) -> Self
    where
        F: Fn(&str) -> ParsedValue + Send + Sync + 'static,
    {
        self.coerce = Some(Arc::new(coerce));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn get_default(&self) -> Option<&ParsedValue> {
        self.default.as_ref()
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub(crate) fn bind_owner(&mut self, command: &str) {
        self.owner = Some(command.to_string());
    }

    /// Stored value for this slot given the matched raw strings, if any
    pub(crate) fn parse_raw(&self, raws: Option<&[String]>) -> ParsedValue {
        match raws {
            Some(raws) if !raws.is_empty() => {
                let mut items: Vec<ParsedValue> =
                    raws.iter().map(|raw| coerce_one(&self.coerce, raw)).collect();
                if self.variadic {
                    ParsedValue::sequence(items)
                } else {
                    items.pop().unwrap_or(ParsedValue::Ready(Value::Null))
                }
            }
            _ => self
                .default
                .clone()
                .unwrap_or(ParsedValue::Ready(Value::Null)),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("variadic", &self.variadic)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

fn coerce_one(coerce: &Option<Coerce>, raw: &str) -> ParsedValue {
    match coerce {
        Some(coerce) => coerce(raw),
        None => ParsedValue::Ready(Value::from(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Deferred;

    #[test]
    fn test_long_defaults_to_key() {
        let option = CommandOption::new("api_token");
        assert_eq!(option.key(), "api_token");
        assert_eq!(option.long_name(), "api-token");
    }

    #[test]
    fn test_flag_parses_to_bool() {
        let option = CommandOption::new("verbose").flag();
        let on = option.parse_raw(&["true".to_string()]);
        assert_eq!(on.as_ready(), Some(&Value::Bool(true)));

        let off = option.parse_raw(&["false".to_string()]);
        assert_eq!(off.as_ready(), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_coerce_can_defer() {
        let option =
            CommandOption::new("token").coerce(|raw| Deferred::ready(raw.to_uppercase()).into());
        assert!(option.parse_raw(&["abc".to_string()]).is_pending());
    }

    #[test]
    fn test_single_option_keeps_last_raw() {
        let option = CommandOption::new("name");
        let value = option.parse_raw(&["a".to_string(), "b".to_string()]);
        assert_eq!(value.as_ready(), Some(&Value::from("b")));
    }

    #[test]
    fn test_multiple_option_collects() {
        let option = CommandOption::new("tag").multiple();
        let value = option.parse_raw(&["a".to_string(), "b".to_string()]);
        assert_eq!(
            value.as_ready(),
            Some(&Value::Sequence(vec![Value::from("a"), Value::from("b")]))
        );
    }

    #[test]
    fn test_argument_default_when_missing() {
        let arg = Argument::new("target").default_value("prod");
        assert_eq!(arg.parse_raw(None).as_ready(), Some(&Value::from("prod")));

        let bare = Argument::new("target");
        assert_eq!(bare.parse_raw(None).as_ready(), Some(&Value::Null));
    }

    #[test]
    fn test_owner_bound_later() {
        let mut arg = Argument::new("file");
        assert_eq!(arg.owner(), None);
        arg.bind_owner("upload");
        assert_eq!(arg.owner(), Some("upload"));
    }
}
