//! Workspace configuration model.
//!
//! The configuration lives in the workspace marker file
//! ([`crate::constants::WORKSPACE_MARKER`]). An empty marker is valid and
//! yields the defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SysrootError};

/// How ids inside the new user namespace relate to the caller's ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityPolicy {
    /// Map the caller to id 0 inside the namespace.
    #[default]
    Root,
    /// Map the caller to its own id inside the namespace.
    Preserve,
}

impl IdentityPolicy {
    /// Returns the inside id for a given outside id under this policy.
    #[must_use]
    pub const fn inside_id(self, outside: u32) -> u32 {
        match self {
            Self::Root => 0,
            Self::Preserve => outside,
        }
    }
}

impl fmt::Display for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Preserve => write!(f, "preserve"),
        }
    }
}

impl FromStr for IdentityPolicy {
    type Err = SysrootError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "root" => Ok(Self::Root),
            "preserve" => Ok(Self::Preserve),
            other => Err(SysrootError::Config {
                message: format!("unknown identity policy '{other}' (expected root or preserve)"),
            }),
        }
    }
}

/// Root configuration for a sysroot workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SysrootConfig {
    /// Rootfs directory; relative paths resolve against the workspace.
    pub rootfs: Option<PathBuf>,
    /// Command run inside the sandbox when the caller gives none.
    pub coordinator: Option<Vec<String>>,
    /// Hostname set in the new UTS namespace.
    pub hostname: Option<String>,
    /// Identity mapping policy.
    pub identity: IdentityPolicy,
}

impl SysrootConfig {
    /// Parses a configuration document. Blank input yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for this model.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| SysrootError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&raw)
    }

    fn validate(&self) -> Result<()> {
        let bad_coordinator = self
            .coordinator
            .as_ref()
            .is_some_and(|argv| argv.first().is_none_or(String::is_empty));
        if bad_coordinator {
            return Err(SysrootError::Config {
                message: "coordinator must name a program".into(),
            });
        }
        if self.hostname.as_deref().is_some_and(str::is_empty) {
            return Err(SysrootError::Config {
                message: "hostname must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_document_yields_defaults() {
        let config = SysrootConfig::parse("  \n").expect("blank parses");
        assert_eq!(config, SysrootConfig::default());
        assert_eq!(config.identity, IdentityPolicy::Root);
    }

    #[test]
    fn parses_full_document() {
        let config = SysrootConfig::parse(
            r#"{
                "rootfs": "alpine",
                "coordinator": ["/usr/bin/coordinator", "--serve"],
                "hostname": "sandbox",
                "identity": "preserve"
            }"#,
        )
        .expect("document parses");
        assert_eq!(config.rootfs, Some(PathBuf::from("alpine")));
        assert_eq!(
            config.coordinator.as_deref(),
            Some(&["/usr/bin/coordinator".to_string(), "--serve".to_string()][..])
        );
        assert_eq!(config.hostname.as_deref(), Some("sandbox"));
        assert_eq!(config.identity, IdentityPolicy::Preserve);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(SysrootConfig::parse(r#"{"network": true}"#).is_err());
    }

    #[test]
    fn rejects_empty_coordinator() {
        let err = SysrootConfig::parse(r#"{"coordinator": []}"#).unwrap_err();
        assert!(matches!(err, SysrootError::Config { .. }));
    }

    #[test]
    fn identity_policy_inside_ids() {
        assert_eq!(IdentityPolicy::Root.inside_id(1000), 0);
        assert_eq!(IdentityPolicy::Preserve.inside_id(1000), 1000);
        assert_eq!("preserve".parse::<IdentityPolicy>().ok(), Some(IdentityPolicy::Preserve));
        assert!("nobody".parse::<IdentityPolicy>().is_err());
    }
}
