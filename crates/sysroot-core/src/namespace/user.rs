//! User namespace identity mapping.
//!
//! Maps the caller's uid/gid to an id inside the new user namespace, which
//! grants the namespace-local capabilities needed for the mount steps.

use std::fmt;

use sysroot_common::error::Result;

pub use sysroot_common::config::IdentityPolicy;

use crate::sys::Syscalls;

/// One line of a `uid_map`/`gid_map` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMapping {
    /// First id inside the namespace.
    pub inside: u32,
    /// First id outside the namespace.
    pub outside: u32,
    /// Number of consecutive ids mapped.
    pub length: u32,
}

impl IdentityMapping {
    /// Single-id mapping of `outside` under `policy`.
    #[must_use]
    pub const fn single(policy: IdentityPolicy, outside: u32) -> Self {
        Self {
            inside: policy.inside_id(outside),
            outside,
            length: 1,
        }
    }
}

impl fmt::Display for IdentityMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.inside, self.outside, self.length)
    }
}

/// Uid and gid mappings for one namespace transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMaps {
    /// Written to `uid_map`.
    pub uid: IdentityMapping,
    /// Written to `gid_map`.
    pub gid: IdentityMapping,
}

impl IdentityMaps {
    /// Captures the caller's real ids and maps them under `policy`.
    ///
    /// Must run before `unshare(CLONE_NEWUSER)`: until the map is written the
    /// kernel reports the overflow id to a process inside the new namespace.
    pub fn capture<S: Syscalls>(sys: &S, policy: IdentityPolicy) -> Self {
        Self {
            uid: IdentityMapping::single(policy, sys.getuid()),
            gid: IdentityMapping::single(policy, sys.getgid()),
        }
    }
}

/// Writes `setgroups`, `gid_map`, and `uid_map` for the calling process.
///
/// `setgroups` is set to `deny` first: an unprivileged process may not write
/// `gid_map` otherwise.
///
/// # Errors
///
/// Returns an error if any of the three writes fails.
pub fn write_identity_maps<S: Syscalls>(sys: &S, maps: &IdentityMaps) -> Result<()> {
    sys.write_proc_self_map("setgroups", "deny")?;
    sys.write_proc_self_map("gid_map", &maps.gid.to_string())?;
    sys.write_proc_self_map("uid_map", &maps.uid.to_string())?;
    tracing::debug!(uid_map = %maps.uid, gid_map = %maps.gid, "identity mapping written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_renders_kernel_line() {
        let mapping = IdentityMapping::single(IdentityPolicy::Root, 1000);
        assert_eq!(mapping.to_string(), "0 1000 1");
        let mapping = IdentityMapping::single(IdentityPolicy::Preserve, 1000);
        assert_eq!(mapping.to_string(), "1000 1000 1");
    }
}
