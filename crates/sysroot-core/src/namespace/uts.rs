//! UTS namespace hostname.

use sysroot_common::error::Result;

use crate::sys::Syscalls;

/// Sets the hostname inside the UTS namespace.
///
/// # Errors
///
/// Returns an error if `sethostname(2)` fails.
pub fn set_hostname<S: Syscalls>(sys: &S, hostname: &str) -> Result<()> {
    sys.sethostname(hostname)?;
    tracing::debug!(hostname, "hostname set");
    Ok(())
}
