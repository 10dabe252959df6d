//! Common test utilities

#![allow(dead_code)]

use deferred_args::{Deferred, ResolveError, Value};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Deferred value that settles with `value` after `ms` milliseconds
pub fn settle_after(ms: u64, value: &str) -> Deferred {
    let value = value.to_string();
    Deferred::new(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(Value::from(value))
    })
}

/// Deferred value that fails with `error` after `ms` milliseconds
pub fn fail_after(ms: u64, error: ResolveError) -> Deferred {
    Deferred::new(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Err(error)
    })
}

/// Deferred value that bumps `runs` each time its computation starts
pub fn counting(runs: Arc<AtomicUsize>, value: &str) -> Deferred {
    let value = value.to_string();
    Deferred::new(async move {
        runs.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(Value::from(value))
    })
}

/// Create a temporary directory with a config file for `app`
pub fn create_test_config(app: &str, content: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(format!("{}.yml", app));
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config in a parent of a fresh subdirectory
pub fn create_test_config_in_subdir(
    app: &str,
    content: &str,
) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let (temp_dir, config_path) = create_test_config(app, content);
    let sub_dir = temp_dir.path().join("subdir");
    fs::create_dir(&sub_dir).unwrap();
    (temp_dir, config_path, sub_dir)
}

/// String view of a settled option value
pub fn text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}
