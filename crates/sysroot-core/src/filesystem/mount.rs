//! Bind mounts into the new root.
//!
//! Caller-supplied binds and the optional host `/proc`, `/dev`, `/sys`
//! binds are all recursive bind mounts; a read-only bind is remounted
//! read-only in a second call because `MS_RDONLY` is ignored on the initial
//! bind. Inside a user namespace the remount must repeat the flags the
//! kernel locked on the source mount (`nosuid`, `nodev`, `noexec`, atime
//! mode) or it is refused with `EPERM`.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use nix::mount::MsFlags;
use nix::sys::statvfs::FsFlags;
use sysroot_common::error::{Result, SysrootError};

use crate::sys::Syscalls;

/// A host directory exposed inside the new root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountBind {
    /// Host path.
    pub source: PathBuf,
    /// Path inside the new root. A leading `/` is ignored.
    pub target: PathBuf,
    /// Remount read-only after binding.
    pub read_only: bool,
}

impl MountBind {
    /// Read-write bind of `source` onto `target`.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Returns a copy with the read-only flag set.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Absolute mount point of this bind under `new_root`, by path alone.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Precondition`] if the target contains a `..`
    /// component or names the new root itself.
    pub fn resolve_target(&self, new_root: &Path) -> Result<PathBuf> {
        let mut resolved = new_root.to_path_buf();
        let mut depth = 0_usize;
        for component in self.target.components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::ParentDir | Component::Prefix(_) => return Err(self.escapes()),
            }
        }
        if depth == 0 {
            return Err(SysrootError::precondition(format!(
                "bind target {} is the new root itself",
                self.target.display()
            )));
        }
        Ok(resolved)
    }

    /// Like [`MountBind::resolve_target`], and also follows the symlinks
    /// already present under `new_root`.
    ///
    /// The deepest existing ancestor of the mount point is canonicalized and
    /// must stay under the canonical `new_root`; the missing components below
    /// it are later created as plain directories.
    ///
    /// # Errors
    ///
    /// Returns [`SysrootError::Precondition`] if the target escapes the new
    /// root lexically or through a symlink (dangling ones included), and
    /// [`SysrootError::Io`] if `new_root` itself cannot be resolved.
    pub fn confined_target(&self, new_root: &Path) -> Result<PathBuf> {
        let target = self.resolve_target(new_root)?;
        let root = std::fs::canonicalize(new_root).map_err(|source| SysrootError::Io {
            path: new_root.to_path_buf(),
            source,
        })?;
        let existing = target
            .ancestors()
            .find(|path| path.symlink_metadata().is_ok())
            .ok_or_else(|| self.escapes())?;
        let resolved = std::fs::canonicalize(existing).map_err(|_| self.escapes())?;
        if !resolved.starts_with(&root) {
            tracing::debug!(
                target = %target.display(),
                resolved = %resolved.display(),
                "bind target leaves the new root"
            );
            return Err(self.escapes());
        }
        Ok(target)
    }

    fn escapes(&self) -> SysrootError {
        SysrootError::precondition(format!(
            "bind target {} escapes the new root",
            self.target.display()
        ))
    }
}

impl fmt::Display for MountBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source.display(), self.target.display())?;
        if self.read_only {
            write!(f, ":ro")?;
        }
        Ok(())
    }
}

impl FromStr for MountBind {
    type Err = SysrootError;

    /// Parses `SRC:DST`, `SRC:DST:ro`, or `SRC:DST:rw`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid =
            || SysrootError::precondition(format!("invalid bind '{s}' (expected SRC:DST[:ro])"));
        let mut parts = s.split(':');
        let source = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let target = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let read_only = match parts.next() {
            None | Some("rw") => false,
            Some("ro") => true,
            Some(_) => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(source, target).read_only(read_only))
    }
}

/// Host virtual filesystems that can be bound into the new root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualFs {
    /// Host `/proc`.
    Proc,
    /// Host `/dev`.
    Dev,
    /// Host `/sys`.
    Sys,
}

impl VirtualFs {
    /// Host path, which is also the path under the new root.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Proc => "/proc",
            Self::Dev => "/dev",
            Self::Sys => "/sys",
        }
    }

    /// The same host path as a bind request.
    #[must_use]
    pub fn as_bind(self) -> MountBind {
        MountBind::new(self.path(), self.path())
    }
}

/// Remount flags that preserve what the kernel locked on a mount with the
/// given `statvfs` flags.
///
/// With neither `noatime` nor `relatime` reported the mount is
/// `strictatime`, which must be asked for explicitly since a remount
/// otherwise defaults to `relatime`.
#[must_use]
pub fn locked_flags(fs: FsFlags) -> MsFlags {
    const CARRIED: [(FsFlags, MsFlags); 6] = [
        (FsFlags::ST_NOSUID, MsFlags::MS_NOSUID),
        (FsFlags::ST_NODEV, MsFlags::MS_NODEV),
        (FsFlags::ST_NOEXEC, MsFlags::MS_NOEXEC),
        (FsFlags::ST_NOATIME, MsFlags::MS_NOATIME),
        (FsFlags::ST_NODIRATIME, MsFlags::MS_NODIRATIME),
        (FsFlags::ST_RELATIME, MsFlags::MS_RELATIME),
    ];
    let mut flags = CARRIED
        .iter()
        .filter(|(st, _)| fs.contains(*st))
        .fold(MsFlags::empty(), |acc, (_, ms)| acc | *ms);
    if !fs.intersects(FsFlags::ST_NOATIME | FsFlags::ST_RELATIME) {
        flags |= MsFlags::MS_STRICTATIME;
    }
    flags
}

/// Recursively bind-mounts `source` onto `target`, optionally read-only.
///
/// # Errors
///
/// Returns an error if either `mount(2)` call fails, or if the flags of the
/// new mount cannot be read for the read-only remount.
pub fn bind_mount<S: Syscalls>(
    sys: &S,
    source: &Path,
    target: &Path,
    read_only: bool,
) -> Result<()> {
    sys.mount(
        Some(source),
        target,
        None,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None,
    )?;
    if read_only {
        let locked = locked_flags(sys.statvfs(target)?);
        sys.mount(
            None,
            target,
            None,
            MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY | locked,
            None,
        )?;
    }
    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        read_only,
        "bind mount created"
    );
    Ok(())
}

/// Creates the mount point under `new_root` and binds `bind.source` onto it.
///
/// # Errors
///
/// Returns [`SysrootError::Precondition`] if the target escapes the root,
/// and [`SysrootError::Bind`] naming `bind` if the directory cannot be
/// created or the mount fails.
pub fn bind_into_root<S: Syscalls>(sys: &S, new_root: &Path, bind: &MountBind) -> Result<()> {
    let target = bind.confined_target(new_root)?;
    sys.create_dir_all(&target)
        .and_then(|()| bind_mount(sys, &bind.source, &target, bind.read_only))
        .map_err(|err| {
            tracing::warn!(%bind, target = %target.display(), error = %err, "bind failed");
            SysrootError::bind(bind.to_string(), err)
        })
}
