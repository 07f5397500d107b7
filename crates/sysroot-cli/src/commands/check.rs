//! `sysroot-namespace-check` — report environment restrictions before entry.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sysroot_common::constants::{
    DEFAULT_FILESYSTEMS_PATH, DEFAULT_PROC_ROOT, DEFAULT_SETGROUPS_PATH,
};
use sysroot_core::probe::collect_restrictions;

use crate::output;

/// Diagnose restrictions that would prevent entering a namespace sandbox.
#[derive(Parser, Debug)]
#[command(name = "sysroot-namespace-check", version, about, long_about = None)]
pub struct CheckArgs {
    /// Proc filesystem root.
    #[arg(long, default_value = DEFAULT_PROC_ROOT)]
    pub proc_root: PathBuf,

    /// Filesystem-type listing.
    #[arg(long, default_value = DEFAULT_FILESYSTEMS_PATH)]
    pub filesystems: PathBuf,

    /// setgroups control file.
    #[arg(long, default_value = DEFAULT_SETGROUPS_PATH)]
    pub setgroups: PathBuf,
}

/// Executes `sysroot-namespace-check` and returns the process exit code.
#[must_use]
pub fn execute(args: &CheckArgs) -> ExitCode {
    let findings = collect_restrictions(&args.proc_root, &args.filesystems, &args.setgroups);
    #[allow(clippy::print_stdout)]
    {
        print!("{}", output::render_findings(&findings));
    }
    if findings.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
