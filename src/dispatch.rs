//! Walking the matched command chain
//!
//! One parse pass: match the tokens with clap, then walk from the root to
//! the deepest matched subcommand capturing values and firing hooks, run the
//! acting command's handler, and finally resolve the end of the chain, which
//! may have no handler and so never saw a pre-action hook.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::hooks::{ActionContext, HookFuture};
use crate::parser;
use crate::resolve::resolve;
use clap::ArgMatches;
use std::ffi::OsString;
use tracing::{debug, warn};

pub(crate) async fn parse_pass(
    root: &mut Command,
    argv: Vec<OsString>,
    async_mode: bool,
) -> Result<()> {
    root.begin_parse(async_mode);

    parser::check(root)?;
    let matches = parser::build(root).try_get_matches_from(argv)?;
    walk(root, &matches).await?;
    sweep_leaf(root).await?;

    if !async_mode {
        for node in root.dispatch_chain() {
            let pending = node.pending_keys();
            if !pending.is_empty() {
                warn!(
                    command = %node.name(),
                    pending = ?pending,
                    "synchronous parse left deferred values unresolved"
                );
            }
        }
    }

    root.mark_chain_complete();
    Ok(())
}

async fn walk(root: &mut Command, matches: &ArgMatches) -> Result<()> {
    let mut depth = 0;
    let mut matches = matches;

    loop {
        let node = root.chain_node_mut(depth);
        let captured = parser::captures(node, matches);
        let positionals = parser::positionals(node, matches);
        node.apply_captures(captured, positionals)?;

        let Some((name, sub_matches)) = matches.subcommand() else {
            break;
        };
        let child = node
            .subcommand_index(name)
            .ok_or_else(|| Error::UnknownSubcommand {
                command: node.name().to_string(),
                name: name.to_string(),
            })?;

        debug!(command = %node.name(), subcommand = name, "dispatching into subcommand");
        for hook in node.hooks() {
            settle(hook.pre_subcommand(node, child)?).await?;
        }

        depth += 1;
        matches = sub_matches;
    }

    let acting = root.chain_node_mut(depth);
    if !acting.has_action() {
        return Ok(());
    }
    let acting_name = acting.name().to_string();

    for level in 0..=depth {
        let hooked = root.chain_node_mut(level);
        let cx = ActionContext::new(acting_name.as_str(), level == depth);
        for hook in hooked.hooks() {
            settle(hook.pre_action(hooked, &cx)?).await?;
        }
    }

    root.chain_node_mut(depth).run_action()
}

async fn sweep_leaf(root: &mut Command) -> Result<()> {
    let leaf = root.leaf_mut();
    debug!(command = %leaf.name(), "resolving end of dispatch chain");
    if let Some(pending) = resolve(leaf) {
        pending.await?;
    }
    Ok(())
}

async fn settle(work: Option<HookFuture<'_>>) -> Result<()> {
    match work {
        Some(work) => work.await,
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CommandOption;
    use crate::hooks::{LifecycleEvent, LifecycleHook};
    use futures::future::{self, FutureExt};
    use crate::parse_state::ParsePhase;
    use std::sync::{Arc, Mutex};
    use crate::value::{Deferred, ParsedValue};

    fn deferring(key: &str) -> CommandOption {
        CommandOption::new(key).coerce(|raw| Deferred::ready(raw.to_string()).into())
    }

    #[tokio::test]
    async fn test_chain_marked_complete() {
        let mut root = Command::new("root")
            .subcommand(Command::new("mid").subcommand(Command::new("leaf")));

        parse_pass(&mut root, vec!["root".into(), "mid".into(), "leaf".into()], true)
            .await
            .unwrap();

        let chain: Vec<_> = root.dispatch_chain().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(chain, vec!["root", "mid", "leaf"]);
        for node in root.dispatch_chain() {
            assert_eq!(node.parse_state().phase(), ParsePhase::Complete);
        }
    }

    #[tokio::test]
    async fn test_parent_resolved_before_child_matches() {
        let seen = Arc::new(Mutex::new(None));
        let observer = seen.clone();
        let mut root = Command::new("root")
            .option(deferring("region"))
            .on(LifecycleEvent::PreSubcommand, move |cmd: &mut Command, child: &str| {
                let region = cmd.value_of("region").and_then(|v| v.as_str()).map(String::from);
                *observer.lock().unwrap() = Some((child.to_string(), region));
                Ok(())
            })
            .subcommand(Command::new("child"));

        parse_pass(
            &mut root,
            vec!["root".into(), "--region".into(), "eu".into(), "child".into()],
            true,
        )
        .await
        .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            Some(("child".to_string(), Some("eu".to_string())))
        );
        assert!(matches!(
            root.get_option_value("region"),
            Some(ParsedValue::Ready(v)) if v.as_str() == Some("eu")
        ));
        assert_eq!(root.leaf().name(), "child");
    }

    #[test]
    fn test_sync_pass_never_suspends() {
        let mut root = Command::new("root").option(deferring("token"));
        let outcome = FutureExt::now_or_never(parse_pass(
            &mut root,
            vec!["root".into(), "--token".into(), "t".into()],
            false,
        ));
        assert!(matches!(outcome, Some(Ok(()))));
        assert!(root.get_option_value("token").unwrap().is_pending());
    }

    struct Stall;

    impl LifecycleHook for Stall {
        fn pre_subcommand<'a>(
            &self,
            _parent: &'a mut Command,
            _child: usize,
        ) -> Result<Option<HookFuture<'a>>> {
            Ok(Some(future::pending::<Result<()>>().boxed()))
        }
    }

    #[test]
    fn test_sync_parse_reports_suspension() {
        let mut root = Command::new("app").hook(Stall).subcommand(Command::new("run"));

        let err = root.parse_from(["app", "run"]).unwrap_err();
        assert!(matches!(err, Error::Suspended(ref name) if name == "app"));
        assert_eq!(
            err.to_string(),
            "Synchronous parse of 'app' attempted to wait on a deferred value"
        );
    }
}
