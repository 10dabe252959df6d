//! Awaiting deferred option and argument values on one command
//!
//! Resolution runs at most once per command per parse pass and only for
//! passes started by the async entry point. Every pending value found is
//! started before any is awaited; the first failure ends the wait.

use crate::command::Command;
use crate::error::ResolveError;
use crate::parse_state::ParsePhase;
use crate::value::{Deferred, ParsedValue, Value};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

/// Storage slot a settled value is written back to
#[derive(Debug)]
enum Slot {
    Option(String),
    Argument(usize),
}

type Settling = BoxFuture<'static, (Slot, Result<Value, ResolveError>)>;

/// Await every pending value on `command` and write the results back.
///
/// Returns `None` when there is nothing to wait for: sync mode, already
/// resolved in this pass, or no pending values. The latch is closed before
/// returning, so a second call in the same pass is always a no-op.
///
/// Option values keep their recorded source. Values settled before a
/// failure stay written; values still in flight at that point keep running
/// on the tokio runtime but are not written back.
pub fn resolve(command: &mut Command) -> Option<BoxFuture<'_, Result<(), ResolveError>>> {
    if !command.state.try_claim_resolution() {
        return None;
    }

    let settling: FuturesUnordered<Settling> = FuturesUnordered::new();
    let mut scheduled = Vec::new();
    for (key, value) in &command.values {
        if let ParsedValue::Pending(deferred) = value {
            let slot = Slot::Option(key.clone());
            let deferred = deferred.clone();
            scheduled.push(deferred.clone());
            settling.push(async move { (slot, deferred.await) }.boxed());
        }
    }
    for (index, value) in command.processed_args.iter().enumerate() {
        if let ParsedValue::Pending(deferred) = value {
            let slot = Slot::Argument(index);
            let deferred = deferred.clone();
            scheduled.push(deferred.clone());
            settling.push(async move { (slot, deferred.await) }.boxed());
        }
    }

    if settling.is_empty() {
        return None;
    }

    debug!(
        command = %command.name(),
        pending = settling.len(),
        "awaiting deferred values"
    );
    command.state.set_phase(ParsePhase::Awaiting);

    Some(
        async move {
            let mut settling = settling;
            while let Some((slot, result)) = settling.next().await {
                match result {
                    Ok(value) => write_back(command, slot, value),
                    Err(error) => {
                        command.state.set_phase(ParsePhase::Parsing);
                        detach_unsettled(command.name(), scheduled);
                        return Err(error);
                    }
                }
            }
            command.state.set_phase(ParsePhase::Parsing);
            Ok(())
        }
        .boxed(),
    )
}

/// Keep driving values that were still in flight when a sibling failed.
///
/// Their results are not written back, but every other holder of the same
/// deferred value observes the settled result. Without a tokio runtime the
/// values are left to whoever awaits them next.
fn detach_unsettled(command: &str, scheduled: Vec<Deferred>) {
    let unsettled: Vec<Deferred> = scheduled
        .into_iter()
        .filter(|deferred| deferred.peek().is_none())
        .collect();
    if unsettled.is_empty() {
        return;
    }

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            debug!(
                command = %command,
                in_flight = unsettled.len(),
                "deferred value failed; letting siblings settle"
            );
            for deferred in unsettled {
                handle.spawn(async move {
                    let _ = deferred.await;
                });
            }
        }
        Err(_) => {
            warn!(
                command = %command,
                in_flight = unsettled.len(),
                "deferred value failed outside a tokio runtime; siblings stay unpolled"
            );
        }
    }
}

fn write_back(command: &mut Command, slot: Slot, value: Value) {
    match slot {
        Slot::Option(key) => match command.provenance.source(&key) {
            Some(source) => command.set_option_value_with_source(key, value, source),
            None => command.set_option_value(key, value),
        },
        Slot::Argument(index) => {
            if let Some(arg) = command.processed_args.get_mut(index) {
                *arg = ParsedValue::Ready(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::ValueSource;

    fn async_command() -> Command {
        let mut cmd = Command::new("deploy");
        cmd.begin_parse(true);
        cmd
    }

    #[test]
    fn test_sync_mode_is_noop() {
        let mut cmd = Command::new("deploy");
        cmd.begin_parse(false);
        cmd.set_option_value_with_source("token", Deferred::ready("t"), ValueSource::CommandLine);

        assert!(resolve(&mut cmd).is_none());
        assert!(cmd.get_option_value("token").unwrap().is_pending());
    }

    #[test]
    fn test_nothing_pending_closes_latch() {
        let mut cmd = async_command();
        cmd.set_option_value_with_source("name", "plain", ValueSource::CommandLine);

        assert!(resolve(&mut cmd).is_none());
        assert!(cmd.parse_state().resolved());
    }

    #[tokio::test]
    async fn test_second_call_is_noop() {
        let mut cmd = async_command();
        cmd.set_option_value_with_source("token", Deferred::ready("t"), ValueSource::Environment);

        let first = resolve(&mut cmd);
        assert!(first.is_some());
        first.unwrap().await.unwrap();

        cmd.set_option_value_with_source("token", Deferred::ready("u"), ValueSource::Environment);
        assert!(resolve(&mut cmd).is_none());
        assert!(cmd.get_option_value("token").unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_keeps_source_after_resolution() {
        let mut cmd = async_command();
        cmd.set_option_value_with_source("token", Deferred::ready("secret"), ValueSource::Environment);

        resolve(&mut cmd).unwrap().await.unwrap();

        assert_eq!(cmd.value_of("token"), Some(&Value::from("secret")));
        assert_eq!(cmd.get_option_value_source("token"), Some(ValueSource::Environment));
        assert_eq!(cmd.parse_state().phase(), ParsePhase::Parsing);
    }

    #[tokio::test]
    async fn test_resolves_arguments_in_place() {
        let mut cmd = async_command();
        cmd.processed_args = vec![
            ParsedValue::from("first"),
            Deferred::ready("second").into(),
            Deferred::ready("third").into(),
        ];

        resolve(&mut cmd).unwrap().await.unwrap();

        let values: Vec<_> = cmd
            .processed_args()
            .iter()
            .map(|v| v.as_ready().and_then(|v| v.as_str()))
            .collect();
        assert_eq!(values, vec![Some("first"), Some("second"), Some("third")]);
    }

    #[tokio::test]
    async fn test_failure_is_returned_unchanged() {
        let mut cmd = async_command();
        let err = ResolveError::msg("decrypt failed");
        cmd.set_option_value_with_source("a", Deferred::failed(err.clone()), ValueSource::CommandLine);

        let failure = resolve(&mut cmd).unwrap().await.unwrap_err();
        assert!(failure.ptr_eq(&err));
        assert_eq!(failure.to_string(), "decrypt failed");
    }

    #[tokio::test]
    async fn test_failure_leaves_parsing_phase() {
        let mut cmd = async_command();
        cmd.set_option_value_with_source(
            "a",
            Deferred::failed(ResolveError::msg("nope")),
            ValueSource::CommandLine,
        );

        assert!(resolve(&mut cmd).unwrap().await.is_err());
        assert_eq!(cmd.parse_state().phase(), ParsePhase::Parsing);
        assert!(cmd.parse_state().resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_siblings_keep_running_after_failure() {
        let mut cmd = async_command();
        let slow = Deferred::new(async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(Value::from("late"))
        });
        cmd.set_option_value_with_source("slow", slow.clone(), ValueSource::CommandLine);
        cmd.set_option_value_with_source(
            "bad",
            Deferred::failed(ResolveError::msg("nope")),
            ValueSource::CommandLine,
        );

        assert!(resolve(&mut cmd).unwrap().await.is_err());
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert!(matches!(slow.peek(), Some(Ok(v)) if v == &Value::from("late")));
        assert!(cmd.get_option_value("slow").unwrap().is_pending());
    }
}
