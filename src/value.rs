//! Parsed values and deferred placeholders
//!
//! Concrete values use the YAML value model so that config files and
//! command-line captures share one representation.

use crate::error::ResolveError;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pub use serde_yaml::Value;

/// A value that becomes available later.
///
/// Clones share one underlying computation, which runs at most once no
/// matter how many clones are awaited. Nothing runs until the value is
/// first polled.
#[derive(Clone)]
pub struct Deferred(Shared<BoxFuture<'static, Result<Value, ResolveError>>>);

impl Deferred {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Value, ResolveError>> + Send + 'static,
    {
        Deferred(fut.boxed().shared())
    }

    /// A deferred value that is already settled
    pub fn ready(value: impl Into<Value>) -> Self {
        Deferred::new(future::ready(Ok(value.into())))
    }

    /// A deferred value that fails with `error` when awaited
    pub fn failed(error: ResolveError) -> Self {
        Deferred::new(future::ready(Err(error)))
    }

    /// Whether both handles refer to the same computation
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        self.0.ptr_eq(&other.0)
    }

    /// The settled result, if some holder already drove it to completion
    pub fn peek(&self) -> Option<&Result<Value, ResolveError>> {
        self.0.peek()
    }
}

impl Future for Deferred {
    type Output = Result<Value, ResolveError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.poll_unpin(cx)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(Ok(value)) => f.debug_tuple("Deferred").field(value).finish(),
            Some(Err(err)) => f.debug_tuple("Deferred").field(err).finish(),
            None => f.write_str("Deferred(<pending>)"),
        }
    }
}

/// The stored value of an option or positional argument
#[derive(Debug, Clone)]
pub enum ParsedValue {
    Ready(Value),
    Pending(Deferred),
}

impl ParsedValue {
    pub fn is_pending(&self) -> bool {
        matches!(self, ParsedValue::Pending(_))
    }

    pub fn as_ready(&self) -> Option<&Value> {
        match self {
            ParsedValue::Ready(value) => Some(value),
            ParsedValue::Pending(_) => None,
        }
    }

    pub fn as_pending(&self) -> Option<&Deferred> {
        match self {
            ParsedValue::Pending(deferred) => Some(deferred),
            ParsedValue::Ready(_) => None,
        }
    }

    /// Settle this value, awaiting it when pending
    pub async fn settle(self) -> Result<Value, ResolveError> {
        match self {
            ParsedValue::Ready(value) => Ok(value),
            ParsedValue::Pending(deferred) => deferred.await,
        }
    }

    /// Combine per-item values of a repeated option or variadic argument.
    ///
    /// The result is pending if any item is, and then fails with the first
    /// item failure.
    pub fn sequence(items: Vec<ParsedValue>) -> ParsedValue {
        if !items.iter().any(ParsedValue::is_pending) {
            let values = items
                .into_iter()
                .filter_map(|item| match item {
                    ParsedValue::Ready(value) => Some(value),
                    ParsedValue::Pending(_) => None,
                })
                .collect();
            return ParsedValue::Ready(Value::Sequence(values));
        }

        ParsedValue::Pending(Deferred::new(async move {
            let values = future::try_join_all(items.into_iter().map(ParsedValue::settle)).await?;
            Ok(Value::Sequence(values))
        }))
    }
}

impl From<Value> for ParsedValue {
    fn from(value: Value) -> Self {
        ParsedValue::Ready(value)
    }
}

impl From<Deferred> for ParsedValue {
    fn from(deferred: Deferred) -> Self {
        ParsedValue::Pending(deferred)
    }
}

impl From<&str> for ParsedValue {
    fn from(value: &str) -> Self {
        ParsedValue::Ready(Value::from(value))
    }
}

impl From<String> for ParsedValue {
    fn from(value: String) -> Self {
        ParsedValue::Ready(Value::from(value))
    }
}

impl From<bool> for ParsedValue {
    fn from(value: bool) -> Self {
        ParsedValue::Ready(Value::Bool(value))
    }
}

/// Turns one raw command-line string into a stored value
pub type Coerce = Arc<dyn Fn(&str) -> ParsedValue + Send + Sync>;
