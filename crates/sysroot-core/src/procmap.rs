//! Writer for the per-process identity-mapping control files.
//!
//! The kernel only accepts a complete mapping in a single `write(2)` to
//! `/proc/self/{uid_map,gid_map,setgroups}`, so the payload is sent through
//! an unbuffered file handle in one call and a short write is an error.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use nix::errno::Errno;
use sysroot_common::error::{Result, SysrootError};

/// Directory holding the calling process's control files.
pub const PROC_SELF: &str = "/proc/self";

/// Control files the writer is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcMapEntry {
    /// `uid_map`.
    UidMap,
    /// `gid_map`.
    GidMap,
    /// `setgroups`.
    Setgroups,
}

impl ProcMapEntry {
    /// File name under `/proc/<pid>/`.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::UidMap => "uid_map",
            Self::GidMap => "gid_map",
            Self::Setgroups => "setgroups",
        }
    }

    const fn open_op(self) -> &'static str {
        match self {
            Self::UidMap => "open uid_map",
            Self::GidMap => "open gid_map",
            Self::Setgroups => "open setgroups",
        }
    }

    const fn write_op(self) -> &'static str {
        match self {
            Self::UidMap => "write uid_map",
            Self::GidMap => "write gid_map",
            Self::Setgroups => "write setgroups",
        }
    }
}

impl fmt::Display for ProcMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl FromStr for ProcMapEntry {
    type Err = SysrootError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uid_map" => Ok(Self::UidMap),
            "gid_map" => Ok(Self::GidMap),
            "setgroups" => Ok(Self::Setgroups),
            other => Err(SysrootError::precondition(format!(
                "refusing to write /proc entry '{other}' (allowed: uid_map, gid_map, setgroups)"
            ))),
        }
    }
}

pub(crate) fn errno_of(err: &std::io::Error) -> Errno {
    Errno::from_raw(err.raw_os_error().unwrap_or(Errno::EIO as i32))
}

/// Writes `payload` to `/proc/self/<entry>`.
///
/// # Errors
///
/// See [`write_map_file`].
pub fn write_proc_self_map(entry: &str, payload: &str) -> Result<()> {
    write_map_file(Path::new(PROC_SELF), entry, payload)
}

/// Writes `payload` to `<dir>/<entry>` in a single unbuffered write.
///
/// A trailing newline is appended when missing. The file must already
/// exist; it is neither created nor truncated.
///
/// # Errors
///
/// - [`SysrootError::Precondition`] if `entry` is not one of `uid_map`,
///   `gid_map`, `setgroups`, or if `payload` contains a NUL byte. Nothing is
///   opened in either case.
/// - [`SysrootError::Syscall`] if opening or writing fails, or if the kernel
///   accepts fewer bytes than the full payload (`EIO`).
pub fn write_map_file(dir: &Path, entry: &str, payload: &str) -> Result<()> {
    let entry: ProcMapEntry = entry.parse()?;
    if payload.contains('\0') {
        return Err(SysrootError::precondition(format!(
            "{entry} payload contains a NUL byte"
        )));
    }

    let mut line = String::with_capacity(payload.len() + 1);
    line.push_str(payload);
    if !line.ends_with('\n') {
        line.push('\n');
    }

    let path = dir.join(entry.file_name());
    let mut file = OpenOptions::new()
        .write(true)
        .open(&path)
        .map_err(|e| SysrootError::syscall(entry.open_op(), errno_of(&e)))?;
    let written = file
        .write(line.as_bytes())
        .map_err(|e| SysrootError::syscall(entry.write_op(), errno_of(&e)))?;
    if written != line.len() {
        return Err(SysrootError::syscall(entry.write_op(), Errno::EIO));
    }

    tracing::debug!(path = %path.display(), payload = %line.trim_end(), "wrote proc map");
    Ok(())
}
