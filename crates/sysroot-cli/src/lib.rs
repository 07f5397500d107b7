//! # sysroot CLI
//!
//! Shared argument definitions and handlers for the `sysroot-namespace` and
//! `sysroot-namespace-check` binaries.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod commands;
pub mod output;

/// Installs the stderr `tracing` subscriber, filtered by `RUST_LOG`.
///
/// Logs go to stderr so the sandboxed command owns stdout. The subscriber
/// spawns no threads, which `unshare(CLONE_NEWUSER)` requires.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
