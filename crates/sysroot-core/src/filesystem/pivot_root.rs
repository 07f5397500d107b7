//! Root filesystem switching via `pivot_root(2)`, with a `chroot(2)` fallback.
//!
//! `pivot_root` moves the old root under the new one, where it is detached
//! and removed, so nothing of the host tree stays reachable. `chroot` only
//! changes the process's view of `/`; the old root remains reachable through
//! the mount table.

use std::path::Path;

use nix::mount::{MntFlags, MsFlags};
use sysroot_common::error::Result;

use crate::sys::Syscalls;

/// Directory under the new root that receives the old root during a pivot.
pub const PUT_OLD: &str = ".sysroot-put-old";

/// Bind-mounts `new_root` onto itself so it is a mount point.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
pub fn self_bind<S: Syscalls>(sys: &S, new_root: &Path) -> Result<()> {
    sys.mount(
        Some(new_root),
        new_root,
        None,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None,
    )?;
    tracing::debug!(new_root = %new_root.display(), "new root self-bound");
    Ok(())
}

/// Pivots into `new_root` and discards the old root.
///
/// `new_root` must already be a mount point (see [`self_bind`]). On return
/// the cwd is `/` and `/.sysroot-put-old` is neither mounted nor present.
///
/// # Errors
///
/// Returns an error if any step fails; earlier steps are not undone.
pub fn pivot_into<S: Syscalls>(sys: &S, new_root: &Path) -> Result<()> {
    let put_old = new_root.join(PUT_OLD);
    sys.create_dir_all(&put_old)?;

    tracing::info!(new_root = %new_root.display(), "performing pivot_root");
    sys.pivot_root(new_root, &put_old)?;
    sys.chdir(Path::new("/"))?;

    let old_root = Path::new("/").join(PUT_OLD);
    sys.umount2(&old_root, MntFlags::MNT_DETACH)?;
    sys.remove_dir(&old_root)?;
    tracing::debug!("old root detached and removed");
    Ok(())
}

/// Changes the process root to `new_root` without detaching the old root.
///
/// # Errors
///
/// Returns an error if `chroot(2)` or `chdir(2)` fails.
pub fn chroot_into<S: Syscalls>(sys: &S, new_root: &Path) -> Result<()> {
    sys.chroot(new_root)?;
    sys.chdir(Path::new("/"))?;
    Ok(())
}
