//! System-wide constants and default paths.

/// Marker file that identifies a sysroot workspace; it doubles as the
/// workspace configuration file.
pub const WORKSPACE_MARKER: &str = "sysroot.json";

/// Environment variable that pins the workspace directory.
pub const WORKSPACE_ENV: &str = "SYSROOT_WORKSPACE";

/// Rootfs directory name, relative to the workspace, used when none is configured.
pub const DEFAULT_ROOTFS_DIR: &str = "rootfs";

/// Command executed inside the sandbox when neither the caller nor the
/// configuration names one.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Default proc mount inspected by the restriction prober.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Default filesystem-type listing inspected by the restriction prober.
pub const DEFAULT_FILESYSTEMS_PATH: &str = "/proc/filesystems";

/// Default setgroups control file inspected by the restriction prober.
pub const DEFAULT_SETGROUPS_PATH: &str = "/proc/self/setgroups";
