//! Read-only restriction prober.
//!
//! Inspects the environment for conditions that would make
//! [`crate::enter::enter_rootfs`] fail, before anything is attempted. Every
//! check runs regardless of earlier outcomes, and an unreadable input is
//! reported as a finding rather than an error. Nothing here writes.

use std::fmt;
use std::path::Path;

use nix::unistd::{AccessFlags, access};

/// Filesystem types that must appear in the filesystems listing.
pub const REQUIRED_FILESYSTEMS: &[&str] = &["proc"];

/// Kernel knobs under `<proc_root>/sys` that disable unprivileged user
/// namespaces when set to the paired value.
const USERNS_KNOBS: &[(&str, &str, &str)] = &[
    (
        "user/max_user_namespaces",
        "0",
        "user namespaces are disabled (user.max_user_namespaces = 0)",
    ),
    (
        "kernel/unprivileged_userns_clone",
        "0",
        "unprivileged user namespaces are disabled (kernel.unprivileged_userns_clone = 0)",
    ),
    (
        "kernel/apparmor_restrict_unprivileged_userns",
        "1",
        "AppArmor restricts unprivileged user namespaces \
         (kernel.apparmor_restrict_unprivileged_userns = 1)",
    ),
];

/// A human-readable description of one detected restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionFinding(String);

impl RestrictionFinding {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The diagnostic text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RestrictionFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collects every detected restriction, in check order.
///
/// An empty result means nothing was detected; it does not guarantee that
/// entry will succeed.
#[must_use]
pub fn collect_restrictions(
    proc_root: &Path,
    filesystems_path: &Path,
    setgroups_path: &Path,
) -> Vec<RestrictionFinding> {
    let mut findings = Vec::new();
    check_proc_root(proc_root, &mut findings);
    check_filesystems(filesystems_path, &mut findings);
    check_setgroups(setgroups_path, &mut findings);
    check_userns_knobs(proc_root, &mut findings);
    tracing::debug!(count = findings.len(), "restriction probe finished");
    findings
}

fn check_proc_root(proc_root: &Path, findings: &mut Vec<RestrictionFinding>) {
    if !proc_root.is_dir() {
        findings.push(RestrictionFinding::new(format!(
            "proc root {} is not accessible",
            proc_root.display()
        )));
    }
}

/// Names listed in a `/proc/filesystems` style document: one type per line,
/// optionally preceded by a `nodev` column.
fn filesystem_types(listing: &str) -> impl Iterator<Item = &str> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().last())
}

fn check_filesystems(path: &Path, findings: &mut Vec<RestrictionFinding>) {
    let listing = match std::fs::read_to_string(path) {
        Ok(listing) => listing,
        Err(e) => {
            findings.push(RestrictionFinding::new(format!(
                "cannot read filesystem list {}: {e}",
                path.display()
            )));
            return;
        }
    };
    for required in REQUIRED_FILESYSTEMS {
        if !filesystem_types(&listing).any(|fs| fs == *required) {
            findings.push(RestrictionFinding::new(format!(
                "kernel does not list '{required}' filesystem support in {}",
                path.display()
            )));
        }
    }
}

fn check_setgroups(path: &Path, findings: &mut Vec<RestrictionFinding>) {
    if !path.exists() {
        findings.push(RestrictionFinding::new(format!(
            "setgroups control file {} is missing; the kernel may lack user namespace support",
            path.display()
        )));
        return;
    }
    if access(path, AccessFlags::W_OK).is_err() {
        findings.push(RestrictionFinding::new(format!(
            "setgroups control file {} is not writable",
            path.display()
        )));
    }
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let value = content.trim();
            if value != "allow" && value != "deny" {
                findings.push(RestrictionFinding::new(format!(
                    "setgroups control file {} has unexpected content '{value}'",
                    path.display()
                )));
            }
        }
        Err(e) => findings.push(RestrictionFinding::new(format!(
            "cannot read setgroups control file {}: {e}",
            path.display()
        ))),
    }
}

fn check_userns_knobs(proc_root: &Path, findings: &mut Vec<RestrictionFinding>) {
    let sys = proc_root.join("sys");
    for (knob, blocking, message) in USERNS_KNOBS {
        let Ok(value) = std::fs::read_to_string(sys.join(knob)) else {
            continue;
        };
        if value.trim() == *blocking {
            findings.push(RestrictionFinding::new(*message));
        }
    }
}
