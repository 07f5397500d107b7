//! # sysroot-namespace-check
//!
//! Reports host restrictions that would prevent namespace entry.

use std::process::ExitCode;

use clap::Parser;
use sysroot_cli::commands::check::{self, CheckArgs};

fn main() -> ExitCode {
    sysroot_cli::init_tracing();

    let args = CheckArgs::parse();
    check::execute(&args)
}
