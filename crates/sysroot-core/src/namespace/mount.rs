//! Mount namespace propagation isolation.
//!
//! A fresh mount namespace inherits shared propagation from the host; every
//! mount is switched to private before anything is bind-mounted.

use std::path::Path;

use nix::mount::MsFlags;
use sysroot_common::error::Result;

use crate::sys::Syscalls;

/// Recursively remounts `/` as private in the current mount namespace.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
pub fn make_private<S: Syscalls>(sys: &S) -> Result<()> {
    sys.mount(
        None,
        Path::new("/"),
        None,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None,
    )?;
    tracing::debug!("mount propagation set to private");
    Ok(())
}
