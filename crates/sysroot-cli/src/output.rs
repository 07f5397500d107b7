//! Formatted output helpers for CLI commands.

use std::fmt::Write;

use sysroot_core::probe::RestrictionFinding;

/// Line printed when the prober found nothing.
pub const NO_RESTRICTIONS: &str = "OK: no namespace restrictions detected";

/// Renders prober findings as the check command prints them.
///
/// No findings yields [`NO_RESTRICTIONS`]; otherwise a header followed by one
/// `- ` bullet per finding.
#[must_use]
pub fn render_findings(findings: &[RestrictionFinding]) -> String {
    if findings.is_empty() {
        return format!("{NO_RESTRICTIONS}\n");
    }
    let mut out = String::from("namespace restrictions detected:\n");
    for finding in findings {
        let _ = writeln!(out, "- {finding}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_findings_render_ok() {
        assert_eq!(render_findings(&[]), "OK: no namespace restrictions detected\n");
    }

    #[test]
    fn findings_render_as_bullets() {
        let dir = tempfile::tempdir().unwrap();
        let findings = sysroot_core::probe::collect_restrictions(
            &dir.path().join("proc"),
            &dir.path().join("filesystems"),
            &dir.path().join("setgroups"),
        );
        let rendered = render_findings(&findings);
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("namespace restrictions detected:"));
        let bullets: Vec<_> = lines.collect();
        assert_eq!(bullets.len(), findings.len());
        assert!(bullets.iter().all(|line| line.starts_with("- ")));
    }
}
