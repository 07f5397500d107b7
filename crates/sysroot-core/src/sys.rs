//! Thin, errno-checked syscall layer.
//!
//! [`Syscalls`] is the only path through which the orchestrator touches
//! kernel namespace and mount state. [`LinuxSyscalls`] forwards each call to
//! `nix` and maps failures to [`SysrootError::Syscall`]; nothing here retries
//! or interprets a result.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::mount::{MntFlags, MsFlags};
use nix::sched::CloneFlags;
use nix::sys::statvfs::FsFlags;
use sysroot_common::error::{Result, SysrootError};

use crate::procmap;

/// Kernel primitives needed to enter a rootfs.
///
/// Implementations must not add behavior beyond issuing the call; ordering
/// is owned by [`crate::enter::enter_rootfs`].
pub trait Syscalls {
    /// `unshare(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the kernel rejects the call.
    fn unshare(&self, flags: CloneFlags) -> Result<()>;

    /// `mount(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the kernel rejects the call.
    fn mount(
        &self,
        source: Option<&Path>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> Result<()>;

    /// `umount2(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the kernel rejects the call.
    fn umount2(&self, target: &Path, flags: MntFlags) -> Result<()>;

    /// `pivot_root(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the kernel rejects the call.
    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> Result<()>;

    /// `chdir(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the kernel rejects the call.
    fn chdir(&self, path: &Path) -> Result<()>;

    /// `chroot(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the kernel rejects the call.
    fn chroot(&self, path: &Path) -> Result<()>;

    /// `sethostname(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the kernel rejects the call.
    fn sethostname(&self, name: &str) -> Result<()>;

    /// Mount flags reported by `statvfs(3)` for the mount holding `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the kernel rejects the call.
    fn statvfs(&self, path: &Path) -> Result<FsFlags>;

    /// Real uid of the calling process.
    fn getuid(&self) -> u32;

    /// Real gid of the calling process.
    fn getgid(&self) -> u32;

    /// Writes one of the calling process's identity-mapping control files.
    ///
    /// # Errors
    ///
    /// See [`procmap::write_proc_self_map`].
    fn write_proc_self_map(&self, entry: &str, payload: &str) -> Result<()>;

    /// `mkdir -p`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if a directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// `rmdir(2)`.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Syscall`] if the directory cannot be removed.
    fn remove_dir(&self, path: &Path) -> Result<()>;
}

/// Set by the first user-namespace `unshare` attempt, before the syscall is
/// issued. A failed attempt still consumes it: the process may be left
/// half-entered and must not try again.
static USER_NAMESPACE_ENTERED: AtomicBool = AtomicBool::new(false);

/// [`Syscalls`] backed by the running Linux kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxSyscalls;

impl LinuxSyscalls {
    /// Creates the kernel-backed syscall layer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn io_errno(operation: &'static str, err: &std::io::Error) -> SysrootError {
    SysrootError::syscall(operation, procmap::errno_of(err))
}

impl Syscalls for LinuxSyscalls {
    fn unshare(&self, flags: CloneFlags) -> Result<()> {
        let wants_user = flags.contains(CloneFlags::CLONE_NEWUSER);
        if wants_user && USER_NAMESPACE_ENTERED.swap(true, Ordering::SeqCst) {
            return Err(SysrootError::precondition(
                "a user namespace was already entered by this process",
            ));
        }
        nix::sched::unshare(flags).map_err(|e| SysrootError::syscall("unshare", e))
    }

    fn mount(
        &self,
        source: Option<&Path>,
        target: &Path,
        fstype: Option<&str>,
        flags: MsFlags,
        data: Option<&str>,
    ) -> Result<()> {
        nix::mount::mount(source, target, fstype, flags, data)
            .map_err(|e| SysrootError::syscall("mount", e))
    }

    fn umount2(&self, target: &Path, flags: MntFlags) -> Result<()> {
        nix::mount::umount2(target, flags).map_err(|e| SysrootError::syscall("umount2", e))
    }

    fn pivot_root(&self, new_root: &Path, put_old: &Path) -> Result<()> {
        nix::unistd::pivot_root(new_root, put_old)
            .map_err(|e| SysrootError::syscall("pivot_root", e))
    }

    fn chdir(&self, path: &Path) -> Result<()> {
        nix::unistd::chdir(path).map_err(|e| SysrootError::syscall("chdir", e))
    }

    fn chroot(&self, path: &Path) -> Result<()> {
        nix::unistd::chroot(path).map_err(|e| SysrootError::syscall("chroot", e))
    }

    fn sethostname(&self, name: &str) -> Result<()> {
        nix::unistd::sethostname(name).map_err(|e| SysrootError::syscall("sethostname", e))
    }

    fn statvfs(&self, path: &Path) -> Result<FsFlags> {
        nix::sys::statvfs::statvfs(path)
            .map(|stat| stat.flags())
            .map_err(|e| SysrootError::syscall("statvfs", e))
    }

    fn getuid(&self) -> u32 {
        nix::unistd::getuid().as_raw()
    }

    fn getgid(&self) -> u32 {
        nix::unistd::getgid().as_raw()
    }

    fn write_proc_self_map(&self, entry: &str, payload: &str) -> Result<()> {
        procmap::write_proc_self_map(entry, payload)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| io_errno("mkdir", &e))
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir(path).map_err(|e| io_errno("rmdir", &e))
    }
}
