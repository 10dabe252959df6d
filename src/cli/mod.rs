//! Demo command-line application
//!
//! A small secrets tool whose access token may be given as `@FILE` and is
//! then read asynchronously while the command line is being dispatched.

pub mod app;

// Re-export main types
pub use app::*;
