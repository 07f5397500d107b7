//! Marker-based workspace discovery.
//!
//! A workspace is the nearest ancestor directory holding
//! [`WORKSPACE_MARKER`]. It supplies the default rootfs location and the
//! configured coordinator command to the CLI.

use std::path::{Path, PathBuf};

use crate::config::SysrootConfig;
use crate::constants::{DEFAULT_ROOTFS_DIR, WORKSPACE_MARKER};
use crate::error::Result;

/// A discovered workspace and its configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: SysrootConfig,
}

/// Returns the nearest directory at or above `start` containing the marker.
#[must_use]
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(WORKSPACE_MARKER).is_file())
        .map(Path::to_path_buf)
}

impl Workspace {
    /// Discovers the workspace enclosing `start`.
    ///
    /// Returns `Ok(None)` when no ancestor carries the marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker exists but cannot be read or parsed.
    pub fn discover(start: &Path) -> Result<Option<Self>> {
        find_root(start).map(|root| Self::open(&root)).transpose()
    }

    /// Opens the workspace rooted at `root`.
    ///
    /// A missing marker is treated as an empty configuration, so a pinned
    /// workspace directory does not need one.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker exists but cannot be read or parsed.
    pub fn open(root: &Path) -> Result<Self> {
        let marker = root.join(WORKSPACE_MARKER);
        let config = if marker.is_file() {
            SysrootConfig::load(&marker)?
        } else {
            SysrootConfig::default()
        };
        tracing::debug!(root = %root.display(), "opened workspace");
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    /// Workspace root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed workspace configuration.
    #[must_use]
    pub const fn config(&self) -> &SysrootConfig {
        &self.config
    }

    /// Rootfs path: the configured one resolved against the root, or
    /// `<root>/rootfs`.
    #[must_use]
    pub fn rootfs(&self) -> PathBuf {
        self.config.rootfs.as_ref().map_or_else(
            || self.root.join(DEFAULT_ROOTFS_DIR),
            |path| self.root.join(path),
        )
    }

    /// Configured coordinator command, if any.
    #[must_use]
    pub fn coordinator(&self) -> Option<&[String]> {
        self.config.coordinator.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_marker_in_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WORKSPACE_MARKER), "").unwrap();
        let nested = dir.path().join("codex/work/deep");
        std::fs::create_dir_all(&nested).unwrap();

        let ws = Workspace::discover(&nested).unwrap().expect("workspace found");
        assert_eq!(ws.root(), dir.path());
        assert_eq!(ws.rootfs(), dir.path().join("rootfs"));
        assert!(ws.coordinator().is_none());
    }

    #[test]
    fn configured_rootfs_resolves_against_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(WORKSPACE_MARKER),
            r#"{"rootfs": "images/alpine", "coordinator": ["/usr/bin/coord"]}"#,
        )
        .unwrap();

        let ws = Workspace::open(dir.path()).unwrap();
        assert_eq!(ws.rootfs(), dir.path().join("images/alpine"));
        assert_eq!(ws.coordinator(), Some(&["/usr/bin/coord".to_string()][..]));
    }

    #[test]
    fn absolute_rootfs_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WORKSPACE_MARKER), r#"{"rootfs": "/srv/rootfs"}"#)
            .unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        assert_eq!(ws.rootfs(), PathBuf::from("/srv/rootfs"));
    }

    #[test]
    fn open_without_marker_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        assert_eq!(ws.config(), &SysrootConfig::default());
    }

    #[test]
    fn malformed_marker_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WORKSPACE_MARKER), "{not json").unwrap();
        assert!(Workspace::discover(dir.path()).is_err());
    }
}
