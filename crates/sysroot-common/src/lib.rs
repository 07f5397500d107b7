//! # sysroot-common
//!
//! Shared error definitions, configuration model, constants, and workspace
//! discovery used across the sysroot workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives the core and the CLI build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod workspace;
