//! Unified error types for the sysroot workspace.
//!
//! Failures fall into two fatal classes: a syscall that returned an error, and
//! a precondition rejected before any syscall was issued. Degraded-mode notices
//! and restriction findings are data, not errors, and live in `sysroot-core`.

use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum SysrootError {
    /// A kernel primitive returned an error.
    #[error("{operation} failed: {errno}")]
    Syscall {
        /// Name of the failed operation (e.g. `unshare`, `pivot_root`).
        operation: &'static str,
        /// Captured errno.
        errno: Errno,
    },

    /// A bind into the new root failed; wraps the failing step.
    #[error("cannot bind {bind}")]
    Bind {
        /// The bind request, as `SRC:DST[:ro]`.
        bind: String,
        /// The step that failed.
        source: Box<SysrootError>,
    },

    /// Input was rejected before any syscall was attempted.
    #[error("precondition violated: {message}")]
    Precondition {
        /// Description of the violated precondition.
        message: String,
    },

    /// An I/O operation outside the syscall layer failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl SysrootError {
    /// Builds a [`SysrootError::Syscall`] from an operation name and errno.
    #[must_use]
    pub const fn syscall(operation: &'static str, errno: Errno) -> Self {
        Self::Syscall { operation, errno }
    }

    /// Builds a [`SysrootError::Precondition`] from a message.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Attaches the bind request `bind` to the error of one of its steps.
    #[must_use]
    pub fn bind(bind: impl Into<String>, source: Self) -> Self {
        Self::Bind {
            bind: bind.into(),
            source: Box::new(source),
        }
    }

    /// Returns the captured errno when this is, or wraps, a syscall failure.
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Syscall { errno, .. } => Some(*errno),
            Self::Bind { source, .. } => source.errno(),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SysrootError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syscall_failure_names_operation_and_errno() {
        let err = SysrootError::syscall("pivot_root", Errno::EPERM);
        let msg = err.to_string();
        assert!(msg.starts_with("pivot_root failed"));
        assert!(msg.contains("EPERM"));
        assert_eq!(err.errno(), Some(Errno::EPERM));
    }

    #[test]
    fn precondition_has_no_errno() {
        let err = SysrootError::precondition("empty command");
        assert_eq!(err.to_string(), "precondition violated: empty command");
        assert!(err.errno().is_none());
    }

    #[test]
    fn bind_failure_names_the_bind_and_keeps_errno() {
        let err = SysrootError::bind(
            "/dev/shm:/shm:ro",
            SysrootError::syscall("mount", Errno::EPERM),
        );
        assert_eq!(err.to_string(), "cannot bind /dev/shm:/shm:ro");
        assert_eq!(err.errno(), Some(Errno::EPERM));
        let cause = std::error::Error::source(&err).unwrap();
        assert_eq!(cause.to_string(), "mount failed: EPERM");
    }
}
