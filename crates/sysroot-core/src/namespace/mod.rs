//! Namespace selection and the per-namespace setup steps.
//!
//! Only the user, mount, and UTS namespaces are always created; a cgroup
//! namespace is opt-in. Network, PID, and IPC isolation are not offered.

pub mod mount;
pub mod user;
pub mod uts;

use nix::sched::CloneFlags;

/// Namespace set requested from a single `unshare(2)` call.
///
/// User, mount, and UTS are always present; only the cgroup namespace is
/// selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceFlags {
    cgroup: bool,
}

impl NamespaceFlags {
    /// User + mount + UTS.
    #[must_use]
    pub const fn new() -> Self {
        Self { cgroup: false }
    }

    /// Returns a copy that also requests a cgroup namespace.
    #[must_use]
    pub const fn with_cgroup(self, cgroup: bool) -> Self {
        Self { cgroup }
    }

    /// Whether a cgroup namespace is requested.
    #[must_use]
    pub const fn cgroup(self) -> bool {
        self.cgroup
    }

    /// Kernel flag set passed to `unshare(2)`.
    #[must_use]
    pub fn clone_flags(self) -> CloneFlags {
        let mut flags =
            CloneFlags::CLONE_NEWUSER | CloneFlags::CLONE_NEWNS | CloneFlags::CLONE_NEWUTS;
        if self.cgroup {
            flags |= CloneFlags::CLONE_NEWCGROUP;
        }
        flags
    }
}

impl Default for NamespaceFlags {
    fn default() -> Self {
        Self::new()
    }
}
