//! # sysroot-namespace
//!
//! Enters an unprivileged namespace sandbox rooted at a rootfs and replaces
//! itself with the requested command.

use clap::Parser;
use sysroot_cli::commands::namespace::{self, NamespaceArgs};

fn main() -> anyhow::Result<()> {
    sysroot_cli::init_tracing();

    let args = NamespaceArgs::parse();
    match namespace::execute(&args)? {}
}
