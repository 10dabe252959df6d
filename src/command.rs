//! Command tree with deferred-value aware parsing
//!
//! A [`Command`] declares options, positional arguments and subcommands,
//! holds the values captured for them during a parse pass, and exposes the
//! two parse entry points. Matching itself is delegated to clap.

use crate::config::{validate_config, Config};
use crate::descriptor::{Argument, CommandOption};
use crate::dispatch;
use crate::error::{ConfigResult, Error, Result};
use crate::hooks::{FnHook, LifecycleEvent, LifecycleHook, ResolveOnDispatch};
use crate::parse_state::{ParsePhase, ParseState};
use crate::parser::Capture;
use crate::provenance::{ProvenanceMap, ValueSource};
use crate::value::{ParsedValue, Value};
use futures::FutureExt;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Handler run when parsing ends on a command
pub type Action = Arc<dyn Fn(&Command) -> anyhow::Result<()> + Send + Sync>;

/// A node in the command tree
pub struct Command {
    name: String,
    about: Option<String>,
    version: Option<String>,
    aliases: Vec<String>,
    subcommand_required: bool,
    options: Vec<CommandOption>,
    arguments: Vec<Argument>,
    subcommands: Vec<Command>,
    hooks: Vec<Arc<dyn LifecycleHook>>,
    action: Option<Action>,
    /// Values supplied by a config file, captured with [`ValueSource::Config`]
    config: HashMap<String, Value>,

    pub(crate) values: HashMap<String, ParsedValue>,
    pub(crate) provenance: ProvenanceMap,
    pub(crate) processed_args: Vec<ParsedValue>,
    pub(crate) state: ParseState,
    /// Index of the subcommand dispatched into during the current pass
    dispatched: Option<usize>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            about: None,
            version: None,
            aliases: Vec::new(),
            subcommand_required: false,
            options: Vec::new(),
            arguments: Vec::new(),
            subcommands: Vec::new(),
            hooks: vec![Arc::new(ResolveOnDispatch)],
            action: None,
            config: HashMap::new(),
            values: HashMap::new(),
            provenance: ProvenanceMap::new(),
            processed_args: Vec::new(),
            state: ParseState::default(),
            dispatched: None,
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Fail with a usage error when no subcommand is given
    pub fn subcommand_required(mut self, required: bool) -> Self {
        self.subcommand_required = required;
        self
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(command);
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&Command) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Add a lifecycle hook; it runs after the hooks already present
    pub fn hook(mut self, hook: impl LifecycleHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Add a synchronous closure for one firing point.
    ///
    /// The closure gets this command and the name of the other command
    /// involved: the child for pre-subcommand, the acting command for
    /// pre-action.
    pub fn on<F>(self, event: LifecycleEvent, f: F) -> Self
    where
        F: Fn(&mut Command, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hook(FnHook::new(event, Arc::new(f)))
    }

    /// Distribute config-file values down the tree after validating them
    /// against the declared options and subcommands.
    pub fn apply_config(&mut self, config: &Config) -> ConfigResult<()> {
        validate_config(config, self)?;
        self.store_config(config);
        Ok(())
    }

    fn store_config(&mut self, config: &Config) {
        self.config = config.options.clone();
        for (name, sub_config) in &config.commands {
            if let Some(sub) = self.find_subcommand_mut(name) {
                sub.store_config(sub_config);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn get_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn get_aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_subcommand_required(&self) -> bool {
        self.subcommand_required
    }

    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn subcommands(&self) -> &[Command] {
        &self.subcommands
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn find_option(&self, key: &str) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.key() == key)
    }

    /// Look up a direct subcommand by name or alias
    pub fn find_subcommand(&self, name: &str) -> Option<&Command> {
        self.subcommand_index(name).map(|i| &self.subcommands[i])
    }

    pub fn find_subcommand_mut(&mut self, name: &str) -> Option<&mut Command> {
        self.subcommand_index(name)
            .map(move |i| &mut self.subcommands[i])
    }

    pub(crate) fn subcommand_index(&self, name: &str) -> Option<usize> {
        self.subcommands
            .iter()
            .position(|c| c.name == name || c.aliases.iter().any(|a| a == name))
    }

    /// Current option values keyed by attribute key
    pub fn opts(&self) -> &HashMap<String, ParsedValue> {
        &self.values
    }

    pub fn get_option_value(&self, key: &str) -> Option<&ParsedValue> {
        self.values.get(key)
    }

    pub fn get_option_value_source(&self, key: &str) -> Option<ValueSource> {
        self.provenance.source(key)
    }

    /// Settled value of an option; `None` when absent or still pending
    pub fn value_of(&self, key: &str) -> Option<&Value> {
        self.values.get(key).and_then(ParsedValue::as_ready)
    }

    /// Set a value without a source, dropping any recorded provenance
    pub fn set_option_value(&mut self, key: impl Into<String>, value: impl Into<ParsedValue>) {
        let key = key.into();
        self.provenance.remove(&key);
        self.values.insert(key, value.into());
    }

    /// Set a value together with its source. The captured raw text is kept
    /// when the source does not change.
    pub fn set_option_value_with_source(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParsedValue>,
        source: ValueSource,
    ) {
        let key = key.into();
        let raw = self
            .provenance
            .lookup(&key)
            .filter(|p| p.source == source)
            .and_then(|p| p.raw.clone());
        self.provenance.record(key.clone(), raw, source);
        self.values.insert(key, value.into());
    }

    pub fn provenance(&self) -> &ProvenanceMap {
        &self.provenance
    }

    /// Positional values in declaration order; absent optional arguments
    /// without a default are `Null`.
    pub fn processed_args(&self) -> &[ParsedValue] {
        &self.processed_args
    }

    pub fn argument_value(&self, name: &str) -> Option<&ParsedValue> {
        let index = self.arguments.iter().position(|a| a.name() == name)?;
        self.processed_args.get(index)
    }

    /// Keys of options and names of arguments still holding deferred values
    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .values
            .iter()
            .filter(|(_, v)| v.is_pending())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys.extend(
            self.arguments
                .iter()
                .zip(&self.processed_args)
                .filter(|(_, v)| v.is_pending())
                .map(|(a, _)| a.name().to_string()),
        );
        keys
    }

    pub fn parse_state(&self) -> &ParseState {
        &self.state
    }

    /// Subcommand this command dispatched into during the last parse
    pub fn dispatched_subcommand(&self) -> Option<&Command> {
        self.dispatched.and_then(|i| self.subcommands.get(i))
    }

    /// Commands from this one down to the deepest dispatched subcommand
    pub fn dispatch_chain(&self) -> Vec<&Command> {
        let mut chain = vec![self];
        let mut node = self;
        while let Some(next) = node.dispatched_subcommand() {
            chain.push(next);
            node = next;
        }
        chain
    }

    /// Deepest command reached by the last parse
    pub fn leaf(&self) -> &Command {
        let mut node = self;
        while let Some(next) = node.dispatched_subcommand() {
            node = next;
        }
        node
    }

    pub(crate) fn leaf_mut(&mut self) -> &mut Command {
        self.chain_node_mut(usize::MAX)
    }

    /// Command `depth` steps down the dispatch chain, or the end of the
    /// chain if it is shorter.
    pub(crate) fn chain_node_mut(&mut self, depth: usize) -> &mut Command {
        let mut node = self;
        for _ in 0..depth {
            match node.dispatched {
                Some(i) if i < node.subcommands.len() => node = &mut node.subcommands[i],
                _ => break,
            }
        }
        node
    }

    pub(crate) fn hooks(&self) -> Vec<Arc<dyn LifecycleHook>> {
        self.hooks.clone()
    }

    /// Start a parse pass on this command: fresh state, cleared values, and
    /// descriptors bound to this command.
    pub(crate) fn begin_parse(&mut self, async_mode: bool) {
        self.state = ParseState::begin(async_mode);
        self.dispatched = None;
        self.values.clear();
        self.provenance.clear();
        self.processed_args.clear();
        let name = self.name.clone();
        for option in &mut self.options {
            option.bind_owner(&name);
        }
        for argument in &mut self.arguments {
            argument.bind_owner(&name);
        }
    }

    /// Record `child` as the dispatched subcommand and start its parse pass
    /// in this command's mode.
    pub(crate) fn dispatch_into(&mut self, child: usize) {
        let async_mode = self.state.async_mode();
        if let Some(sub) = self.subcommands.get_mut(child) {
            sub.begin_parse(async_mode);
            self.dispatched = Some(child);
        }
    }

    pub(crate) fn mark_chain_complete(&mut self) {
        self.state.set_phase(ParsePhase::Complete);
        if let Some(i) = self.dispatched {
            if let Some(sub) = self.subcommands.get_mut(i) {
                sub.mark_chain_complete();
            }
        }
    }

    /// Store captured values. Precedence is command line, environment,
    /// config, then default; implied values fill in afterwards.
    pub(crate) fn apply_captures(
        &mut self,
        captures: Vec<Capture>,
        positionals: Vec<Option<Vec<String>>>,
    ) -> Result<()> {
        let mut captured: HashMap<String, Capture> =
            captures.into_iter().map(|c| (c.key.clone(), c)).collect();

        for option in &self.options {
            let key = option.key();
            if let Some(capture) = captured.remove(key) {
                trace!(
                    command = %self.name,
                    option = key,
                    source = %capture.source,
                    "captured option value"
                );
                self.provenance
                    .record(key, capture.raws.last().cloned(), capture.source);
                self.values.insert(key.to_string(), option.parse_raw(&capture.raws));
            } else if let Some(value) = self.config.get(key) {
                self.provenance.record(key, None, ValueSource::Config);
                self.values
                    .insert(key.to_string(), ParsedValue::Ready(value.clone()));
            } else if let Some(default) = option.get_default() {
                self.provenance.record(key, None, ValueSource::Default);
                self.values.insert(key.to_string(), default.clone());
            }
        }

        let implications: Vec<(String, Value)> = self
            .options
            .iter()
            .filter(|option| {
                self.provenance
                    .source(option.key())
                    .map_or(false, ValueSource::is_explicit)
            })
            .flat_map(|option| option.implied().iter().cloned())
            .collect();
        for (key, value) in implications {
            match self.provenance.source(&key) {
                None | Some(ValueSource::Default | ValueSource::Implied) => {
                    self.set_option_value_with_source(key, value, ValueSource::Implied);
                }
                Some(_) => {}
            }
        }

        if let Some(missing) = self
            .options
            .iter()
            .find(|o| o.is_required() && !self.values.contains_key(o.key()))
        {
            return Err(Error::MissingOption {
                command: self.name.clone(),
                option: missing.key().to_string(),
            });
        }

        let mut positionals = positionals.into_iter();
        self.processed_args = self
            .arguments
            .iter()
            .map(|arg| arg.parse_raw(positionals.next().flatten().as_deref()))
            .collect();

        Ok(())
    }

    pub(crate) fn run_action(&self) -> Result<()> {
        if let Some(action) = &self.action {
            action(self)?;
        }
        Ok(())
    }

    /// Parse `argv` synchronously. The first item is the program name.
    ///
    /// Deferred values are not awaited in this mode; they are left in place
    /// exactly as coerced.
    pub fn parse_from<I, T>(&mut self, argv: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let name = self.name.clone();
        dispatch::parse_pass(self, argv, false)
            .now_or_never()
            .unwrap_or(Err(Error::Suspended(name)))?;
        Ok(self)
    }

    /// Parse `argv`, awaiting every deferred value in the dispatch chain.
    /// The first item is the program name.
    pub async fn parse_from_async<I, T>(&mut self, argv: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        dispatch::parse_pass(self, argv, true).await?;
        Ok(self)
    }

    /// Parse the process arguments synchronously
    pub fn parse(&mut self) -> Result<&mut Self> {
        self.parse_from(std::env::args_os())
    }

    /// Parse the process arguments, awaiting deferred values
    pub async fn parse_async(&mut self) -> Result<&mut Self> {
        let argv: Vec<OsString> = std::env::args_os().collect();
        self.parse_from_async(argv).await
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("arguments", &self.arguments)
            .field("subcommands", &self.subcommands)
            .field("values", &self.values)
            .field("provenance", &self.provenance)
            .field("processed_args", &self.processed_args)
            .field("state", &self.state)
            .field("dispatched", &self.dispatched)
            .finish_non_exhaustive()
    }
}
