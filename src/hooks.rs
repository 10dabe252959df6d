//! Lifecycle hooks fired while dispatching through a command tree
//!
//! There are exactly two firing points: just before a command hands control
//! to a matched subcommand, and just before a command's action handler runs.
//! Every command gets [`ResolveOnDispatch`] at construction; callers may add
//! their own hooks after it.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::resolve::resolve;
use futures::future::{BoxFuture, FutureExt, TryFutureExt};
use std::sync::Arc;

/// Work a hook wants finished before dispatch continues
pub type HookFuture<'a> = BoxFuture<'a, Result<()>>;

/// Firing points for caller hooks registered with [`Command::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    PreSubcommand,
    PreAction,
}

/// Describes the command whose action is about to run.
///
/// Pre-action hooks fire on every command of the dispatch chain, root first,
/// so a hook can tell whether it is attached to the acting command itself.
#[derive(Debug, Clone)]
pub struct ActionContext {
    acting: String,
    is_acting: bool,
}

impl ActionContext {
    pub(crate) fn new(acting: impl Into<String>, is_acting: bool) -> Self {
        ActionContext {
            acting: acting.into(),
            is_acting,
        }
    }

    /// Name of the command whose action is about to run
    pub fn acting_command(&self) -> &str {
        &self.acting
    }

    /// Whether the hooked command is the acting command
    pub fn is_acting(&self) -> bool {
        self.is_acting
    }
}

/// Callbacks for the two lifecycle firing points.
///
/// Synchronous failures are returned as `Err`; asynchronous work is returned
/// as a future that the dispatcher awaits before continuing. Returning
/// `Ok(None)` means there is nothing to wait for.
pub trait LifecycleHook: Send + Sync {
    /// `parent` is about to hand control to `parent.subcommands()[child]`
    fn pre_subcommand<'a>(
        &self,
        _parent: &'a mut Command,
        _child: usize,
    ) -> Result<Option<HookFuture<'a>>> {
        Ok(None)
    }

    /// An action handler somewhere in `hooked`'s dispatch chain is about to run
    fn pre_action<'a>(
        &self,
        _hooked: &'a mut Command,
        _cx: &ActionContext,
    ) -> Result<Option<HookFuture<'a>>> {
        Ok(None)
    }
}

/// Resolves deferred values before a child starts matching and before an
/// action runs.
#[derive(Debug, Default)]
pub struct ResolveOnDispatch;

impl LifecycleHook for ResolveOnDispatch {
    fn pre_subcommand<'a>(
        &self,
        parent: &'a mut Command,
        child: usize,
    ) -> Result<Option<HookFuture<'a>>> {
        parent.dispatch_into(child);
        Ok(resolve(parent).map(|pending| pending.map_err(Error::from).boxed()))
    }

    fn pre_action<'a>(
        &self,
        hooked: &'a mut Command,
        cx: &ActionContext,
    ) -> Result<Option<HookFuture<'a>>> {
        if !cx.is_acting() {
            return Ok(None);
        }
        Ok(resolve(hooked).map(|pending| pending.map_err(Error::from).boxed()))
    }
}

type HookFn = Arc<dyn Fn(&mut Command, &str) -> anyhow::Result<()> + Send + Sync>;

/// Adapts a synchronous closure to one firing point.
///
/// The closure receives the hooked command and the name of the other command
/// involved: the child for pre-subcommand, the acting command for pre-action.
pub(crate) struct FnHook {
    event: LifecycleEvent,
    f: HookFn,
}

impl FnHook {
    pub(crate) fn new(event: LifecycleEvent, f: HookFn) -> Self {
        FnHook { event, f }
    }
}

impl LifecycleHook for FnHook {
    fn pre_subcommand<'a>(
        &self,
        parent: &'a mut Command,
        child: usize,
    ) -> Result<Option<HookFuture<'a>>> {
        if self.event != LifecycleEvent::PreSubcommand {
            return Ok(None);
        }
        let child_name = parent
            .subcommands()
            .get(child)
            .map(|sub| sub.name().to_string())
            .unwrap_or_default();
        (self.f)(parent, &child_name)?;
        Ok(None)
    }

    fn pre_action<'a>(
        &self,
        hooked: &'a mut Command,
        cx: &ActionContext,
    ) -> Result<Option<HookFuture<'a>>> {
        if self.event != LifecycleEvent::PreAction {
            return Ok(None);
        }
        (self.f)(hooked, cx.acting_command())?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CommandOption;
    use crate::provenance::ValueSource;
    use crate::value::Deferred;

    #[test]
    fn test_pre_action_ignores_other_acting_command() {
        let mut cmd = Command::new("root");
        cmd.begin_parse(true);
        cmd.set_option_value_with_source("x", Deferred::ready("v"), ValueSource::CommandLine);

        let cx = ActionContext::new("child", false);
        let outcome = ResolveOnDispatch.pre_action(&mut cmd, &cx).unwrap();
        assert!(outcome.is_none());
        drop(outcome);
        assert!(!cmd.parse_state().resolved());
    }

    #[tokio::test]
    async fn test_pre_action_resolves_acting_command() {
        let mut cmd = Command::new("root");
        cmd.begin_parse(true);
        cmd.set_option_value_with_source("x", Deferred::ready("v"), ValueSource::CommandLine);

        let cx = ActionContext::new("root", true);
        let pending = ResolveOnDispatch.pre_action(&mut cmd, &cx).unwrap();
        pending.expect("pending value scheduled").await.unwrap();
        assert_eq!(cmd.value_of("x").and_then(|v| v.as_str()), Some("v"));
    }

    #[test]
    fn test_pre_subcommand_records_child_and_mode() {
        let mut cmd = Command::new("root")
            .subcommand(Command::new("a"))
            .subcommand(Command::new("b").option(CommandOption::new("level")));
        cmd.begin_parse(true);

        let outcome = ResolveOnDispatch.pre_subcommand(&mut cmd, 1).unwrap();
        assert!(outcome.is_none());
        drop(outcome);
        assert!(cmd.parse_state().resolved());

        let child = cmd.dispatched_subcommand().unwrap();
        assert_eq!(child.name(), "b");
        assert!(child.parse_state().async_mode());
        assert_eq!(child.options()[0].owner(), Some("b"));
    }

    #[test]
    fn test_fn_hook_only_fires_for_its_event() {
        let hook = FnHook::new(
            LifecycleEvent::PreAction,
            Arc::new(|_cmd: &mut Command, _other: &str| -> anyhow::Result<()> {
                anyhow::bail!("refused")
            }),
        );
        let mut cmd = Command::new("root").subcommand(Command::new("child"));

        assert!(hook.pre_subcommand(&mut cmd, 0).unwrap().is_none());
        let err = hook
            .pre_action(&mut cmd, &ActionContext::new("root", true))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "refused");
    }
}
