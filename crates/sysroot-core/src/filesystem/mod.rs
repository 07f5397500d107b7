//! Filesystem setup inside the new mount namespace.
//!
//! Provides bind mounts into the new root and the root swap itself
//! (`pivot_root`, or `chroot` as the degraded alternative).

pub mod mount;
pub mod pivot_root;
