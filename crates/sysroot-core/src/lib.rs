//! # sysroot-core
//!
//! Namespace entry and mount orchestration for unprivileged rootfs sandboxes.
//!
//! This crate provides:
//! - **Syscall primitives**: an errno-checked [`sys::Syscalls`] layer and the
//!   `/proc/self` identity-map writer.
//! - **Restriction probing**: read-only diagnostics of the host before entry.
//! - **Namespace entry**: [`enter::enter_rootfs`], the ordered sequence from
//!   `unshare` to a process running inside the new root.
//!
//! All kernel calls go through [`sys::Syscalls`], so the ordering logic can
//! be exercised against a recording implementation without privileges.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod enter;
pub mod filesystem;
pub mod namespace;
pub mod probe;
pub mod procmap;
pub mod sys;

pub use enter::{DegradedModeNotice, EnterOutcome, EnterRequest, RootSwap, enter_rootfs};
pub use probe::{RestrictionFinding, collect_restrictions};
pub use sys::{LinuxSyscalls, Syscalls};
