//! Ordered namespace entry into an alternate rootfs.
//!
//! [`enter_rootfs`] drives the syscall layer through a fixed sequence:
//!
//! ```text
//! capture ids ─▶ unshare ─▶ setgroups/gid_map/uid_map ─▶ make / private
//!   ─▶ self-bind new root ─▶ extra binds ─▶ /proc /dev /sys binds
//!   ─▶ pivot_root (or chroot) ─▶ sethostname ─▶ cwd = / inside new root
//! ```
//!
//! The sequence is one-shot. A failing step returns its error immediately;
//! namespaces already entered and mounts already made stay in place, and the
//! caller is expected to terminate rather than continue.

use std::fmt;
use std::path::{Path, PathBuf};

use sysroot_common::error::{Result, SysrootError};

use crate::filesystem::mount::{MountBind, VirtualFs, bind_into_root};
use crate::filesystem::pivot_root::{chroot_into, pivot_into, self_bind};
use crate::namespace::NamespaceFlags;
use crate::namespace::mount::make_private;
use crate::namespace::user::{IdentityMaps, IdentityPolicy, write_identity_maps};
use crate::namespace::uts::set_hostname;
use crate::sys::Syscalls;

/// How the process root is swapped to the new rootfs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RootSwap {
    /// `pivot_root(2)` and detach the old root.
    #[default]
    PivotRoot,
    /// `chroot(2)`; the old root stays reachable.
    Chroot,
}

/// Emitted when the root swap used `chroot` instead of `pivot_root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedModeNotice {
    new_root: PathBuf,
}

impl fmt::Display for DegradedModeNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entered {} with chroot instead of pivot_root; the old root is still reachable",
            self.new_root.display()
        )
    }
}

/// Parameters for one [`enter_rootfs`] call.
#[derive(Debug, Clone)]
pub struct EnterRequest {
    /// Directory that becomes `/`.
    pub rootfs: PathBuf,
    /// Namespaces to unshare.
    pub namespaces: NamespaceFlags,
    /// Host directories to bind into the new root, in order.
    pub binds: Vec<MountBind>,
    /// Host virtual filesystems to bind after `binds`.
    pub virtual_fs: Vec<VirtualFs>,
    /// Root swap mode.
    pub root_swap: RootSwap,
    /// Identity mapping policy.
    pub identity: IdentityPolicy,
    /// Hostname for the new UTS namespace.
    pub hostname: Option<String>,
}

impl EnterRequest {
    /// Request with the default namespace set, no binds, `pivot_root`, and
    /// root identity.
    #[must_use]
    pub fn new(rootfs: impl Into<PathBuf>) -> Self {
        Self {
            rootfs: rootfs.into(),
            namespaces: NamespaceFlags::default(),
            binds: Vec::new(),
            virtual_fs: Vec::new(),
            root_swap: RootSwap::default(),
            identity: IdentityPolicy::default(),
            hostname: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.rootfs.is_dir() {
            return Err(SysrootError::precondition(format!(
                "rootfs {} is not a directory",
                self.rootfs.display()
            )));
        }
        let virtual_binds = self.virtual_fs.iter().map(|vfs| vfs.as_bind());
        for bind in self.binds.iter().cloned().chain(virtual_binds) {
            let _ = bind.confined_target(&self.rootfs)?;
        }
        if self.hostname.as_deref().is_some_and(str::is_empty) {
            return Err(SysrootError::precondition("hostname must not be empty"));
        }
        Ok(())
    }
}

/// Terminal state of a successful [`enter_rootfs`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterOutcome {
    /// Root swap that was performed.
    pub root_swap: RootSwap,
    /// Present when the weaker `chroot` swap was used.
    pub degraded: Option<DegradedModeNotice>,
}

/// Enters `request.rootfs` inside fresh user, mount, and UTS namespaces.
///
/// Must be called once per process, from its only thread, before any
/// other thread is spawned. On success the cwd is `/` inside the new root.
///
/// # Errors
///
/// - [`SysrootError::Precondition`] for an invalid request, before any
///   syscall is made.
/// - [`SysrootError::Syscall`] from the first failing step, wrapped in
///   [`SysrootError::Bind`] when that step belongs to a bind. Earlier steps
///   are not rolled back.
pub fn enter_rootfs<S: Syscalls>(sys: &S, request: &EnterRequest) -> Result<EnterOutcome> {
    request.validate()?;
    let rootfs = request.rootfs.as_path();
    tracing::info!(
        rootfs = %rootfs.display(),
        cgroup = request.namespaces.cgroup(),
        binds = request.binds.len(),
        root_swap = ?request.root_swap,
        identity = %request.identity,
        "entering rootfs"
    );

    let maps = IdentityMaps::capture(sys, request.identity);

    sys.unshare(request.namespaces.clone_flags())?;
    tracing::debug!("namespaces unshared");

    write_identity_maps(sys, &maps)?;
    make_private(sys)?;
    self_bind(sys, rootfs)?;

    for bind in &request.binds {
        bind_into_root(sys, rootfs, bind)?;
    }
    for vfs in &request.virtual_fs {
        bind_into_root(sys, rootfs, &vfs.as_bind())?;
    }

    let degraded = swap_root(sys, rootfs, request.root_swap)?;

    if let Some(hostname) = &request.hostname {
        set_hostname(sys, hostname)?;
    }

    tracing::info!(rootfs = %rootfs.display(), "inside new root");
    Ok(EnterOutcome {
        root_swap: request.root_swap,
        degraded,
    })
}

fn swap_root<S: Syscalls>(
    sys: &S,
    rootfs: &Path,
    mode: RootSwap,
) -> Result<Option<DegradedModeNotice>> {
    match mode {
        RootSwap::PivotRoot => {
            pivot_into(sys, rootfs)?;
            Ok(None)
        }
        RootSwap::Chroot => {
            chroot_into(sys, rootfs)?;
            let notice = DegradedModeNotice {
                new_root: rootfs.to_path_buf(),
            };
            tracing::warn!(%notice, "degraded isolation");
            Ok(Some(notice))
        }
    }
}
