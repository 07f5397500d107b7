//! `sysroot-namespace` — enter a rootfs sandbox and exec a command in it.

use std::convert::Infallible;
use std::ffi::CString;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sysroot_common::constants::{DEFAULT_SHELL, WORKSPACE_ENV};
use sysroot_common::error::SysrootError;
use sysroot_common::workspace::Workspace;
use sysroot_core::enter::{EnterRequest, RootSwap, enter_rootfs};
use sysroot_core::filesystem::mount::{MountBind, VirtualFs};
use sysroot_core::namespace::NamespaceFlags;
use sysroot_core::namespace::user::IdentityPolicy;
use sysroot_core::sys::LinuxSyscalls;

/// Run a command inside private user, mount, and UTS namespaces rooted at a rootfs.
#[derive(Parser, Debug)]
#[command(name = "sysroot-namespace", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct NamespaceArgs {
    /// Directory that becomes `/`. Defaults to the workspace rootfs.
    #[arg(long)]
    pub rootfs: Option<PathBuf>,

    /// Bind a host directory into the rootfs. Repeatable.
    #[arg(long = "bind", value_name = "SRC:DST[:ro]")]
    pub binds: Vec<MountBind>,

    /// Bind the host /proc into the rootfs.
    #[arg(long)]
    pub bind_proc: bool,

    /// Bind the host /dev into the rootfs.
    #[arg(long)]
    pub bind_dev: bool,

    /// Bind the host /sys into the rootfs.
    #[arg(long)]
    pub bind_sys: bool,

    /// Also create a cgroup namespace.
    #[arg(long)]
    pub cgroup: bool,

    /// Use chroot instead of pivot_root (the old root stays reachable).
    #[arg(long)]
    pub no_pivot_root: bool,

    /// Identity mapping policy: `root` or `preserve`.
    #[arg(long, value_name = "POLICY")]
    pub identity: Option<IdentityPolicy>,

    /// Hostname inside the new UTS namespace.
    #[arg(long)]
    pub hostname: Option<String>,

    /// Directory to change into inside the sandbox before exec.
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Workspace directory. Discovered from the current directory if unset.
    #[arg(long, env = WORKSPACE_ENV)]
    pub workspace: Option<PathBuf>,

    /// Command to run. Defaults to the configured coordinator, then /bin/sh.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Finds the workspace pinned by `--workspace` or enclosing the cwd.
///
/// # Errors
///
/// Returns an error if the workspace configuration cannot be loaded.
pub fn resolve_workspace(args: &NamespaceArgs) -> anyhow::Result<Option<Workspace>> {
    if let Some(root) = &args.workspace {
        return Ok(Some(Workspace::open(root)?));
    }
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    Ok(Workspace::discover(&cwd)?)
}

/// Builds the entry request from flags, falling back to the workspace.
///
/// # Errors
///
/// Returns an error if no rootfs is given or configured, or if it cannot be
/// resolved to an absolute path.
pub fn build_request(
    args: &NamespaceArgs,
    workspace: Option<&Workspace>,
) -> anyhow::Result<EnterRequest> {
    let rootfs = args
        .rootfs
        .clone()
        .or_else(|| workspace.map(Workspace::rootfs))
        .context("no rootfs given: pass --rootfs or run inside a sysroot workspace")?;
    let rootfs = std::fs::canonicalize(&rootfs)
        .with_context(|| format!("cannot resolve rootfs {}", rootfs.display()))?;

    let config = workspace.map(Workspace::config);
    let mut request = EnterRequest::new(rootfs);
    request.namespaces = NamespaceFlags::new().with_cgroup(args.cgroup);
    request.binds.clone_from(&args.binds);
    request.virtual_fs = [
        (args.bind_proc, VirtualFs::Proc),
        (args.bind_dev, VirtualFs::Dev),
        (args.bind_sys, VirtualFs::Sys),
    ]
    .into_iter()
    .filter_map(|(wanted, vfs)| wanted.then_some(vfs))
    .collect();
    request.root_swap = if args.no_pivot_root {
        RootSwap::Chroot
    } else {
        RootSwap::PivotRoot
    };
    request.identity = args
        .identity
        .or_else(|| config.map(|c| c.identity))
        .unwrap_or_default();
    request.hostname = args
        .hostname
        .clone()
        .or_else(|| config.and_then(|c| c.hostname.clone()));
    Ok(request)
}

/// Resolves the command vector: explicit, configured coordinator, or the shell.
#[must_use]
pub fn resolve_command(args: &NamespaceArgs, workspace: Option<&Workspace>) -> Vec<String> {
    if !args.command.is_empty() {
        return args.command.clone();
    }
    workspace
        .and_then(Workspace::coordinator)
        .map_or_else(|| vec![DEFAULT_SHELL.to_string()], <[String]>::to_vec)
}

/// Converts a command vector to exec arguments.
///
/// # Errors
///
/// Returns [`SysrootError::Precondition`] for an empty vector, an empty
/// program name, or an argument containing a NUL byte.
pub fn command_argv(command: &[String]) -> Result<Vec<CString>, SysrootError> {
    match command.first() {
        None => return Err(SysrootError::precondition("command vector is empty")),
        Some(program) if program.is_empty() => {
            return Err(SysrootError::precondition("command program name is empty"));
        }
        Some(_) => {}
    }
    command
        .iter()
        .map(|arg| {
            CString::new(arg.as_str()).map_err(|_| {
                SysrootError::precondition(format!("command argument {arg:?} contains a NUL byte"))
            })
        })
        .collect()
}

/// Executes `sysroot-namespace`.
///
/// Only returns on failure: on success the process image is replaced by
/// the requested command.
///
/// # Errors
///
/// Returns an error if the request is invalid, any entry step fails, or the
/// command cannot be executed.
pub fn execute(args: &NamespaceArgs) -> anyhow::Result<Infallible> {
    let workspace = resolve_workspace(args)?;
    let request = build_request(args, workspace.as_ref())?;
    let argv = command_argv(&resolve_command(args, workspace.as_ref()))?;

    let outcome = enter_rootfs(&LinuxSyscalls::new(), &request)
        .with_context(|| format!("failed to enter rootfs {}", request.rootfs.display()))?;
    if let Some(notice) = &outcome.degraded {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("warning: {notice}");
        }
    }

    if let Some(workdir) = &args.workdir {
        nix::unistd::chdir(workdir)
            .with_context(|| format!("cannot change into {} inside the sandbox", workdir.display()))?;
    }

    tracing::debug!(command = ?argv, "exec");
    let program = argv[0].as_c_str();
    nix::unistd::execvp(program, argv.as_slice())
        .with_context(|| format!("failed to exec {}", program.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> NamespaceArgs {
        let full = std::iter::once("sysroot-namespace").chain(argv.iter().copied());
        NamespaceArgs::try_parse_from(full).unwrap()
    }

    #[test]
    fn trailing_command_keeps_its_flags() {
        let args = parse(&["--rootfs", "/srv/root", "/bin/sh", "-c", "pwd"]);
        assert_eq!(args.command, ["/bin/sh", "-c", "pwd"]);
        assert!(!args.no_pivot_root);
    }

    #[test]
    fn full_flag_variant_builds_request() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let args = parse(&[
            "--rootfs",
            root,
            "--bind",
            "codex/work:/work",
            "--bind",
            "/usr:/usr:ro",
            "--bind-proc",
            "--bind-sys",
            "--cgroup",
            "--no-pivot-root",
            "--identity",
            "preserve",
            "--hostname",
            "builder",
        ]);
        let request = build_request(&args, None).unwrap();

        assert_eq!(request.rootfs, std::fs::canonicalize(dir.path()).unwrap());
        assert_eq!(request.binds.len(), 2);
        assert!(request.binds[1].read_only);
        assert_eq!(request.virtual_fs, [VirtualFs::Proc, VirtualFs::Sys]);
        assert!(request.namespaces.cgroup());
        assert_eq!(request.root_swap, RootSwap::Chroot);
        assert_eq!(request.identity, IdentityPolicy::Preserve);
        assert_eq!(request.hostname.as_deref(), Some("builder"));
    }

    #[test]
    fn rootfs_and_coordinator_come_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("rootfs")).unwrap();
        std::fs::write(
            dir.path().join("sysroot.json"),
            r#"{"coordinator": ["/opt/coordinator", "--serve"], "hostname": "ws"}"#,
        )
        .unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        let args = parse(&[]);

        let request = build_request(&args, Some(&workspace)).unwrap();
        assert_eq!(
            request.rootfs,
            std::fs::canonicalize(dir.path().join("rootfs")).unwrap()
        );
        assert_eq!(request.hostname.as_deref(), Some("ws"));
        assert_eq!(request.root_swap, RootSwap::PivotRoot);
        assert_eq!(
            resolve_command(&args, Some(&workspace)),
            ["/opt/coordinator", "--serve"]
        );
    }

    #[test]
    fn missing_rootfs_is_reported() {
        let err = build_request(&parse(&[]), None).unwrap_err();
        assert!(err.to_string().contains("no rootfs given"));
    }

    #[test]
    fn default_command_is_shell() {
        assert_eq!(resolve_command(&parse(&[]), None), [DEFAULT_SHELL]);
    }

    #[test]
    fn command_argv_rejects_bad_vectors() {
        assert!(matches!(command_argv(&[]), Err(SysrootError::Precondition { .. })));
        assert!(command_argv(&[String::new()]).is_err());
        assert!(command_argv(&["/bin/sh".into(), "a\0b".into()]).is_err());

        let argv = command_argv(&["/bin/sh".into(), "-c".into(), "pwd".into()]).unwrap();
        assert_eq!(argv.len(), 3);
        assert_eq!(argv[0].to_str().unwrap(), "/bin/sh");
    }

    #[test]
    fn malformed_bind_is_a_parse_error() {
        let result = NamespaceArgs::try_parse_from(["sysroot-namespace", "--bind", "nocolon"]);
        assert!(result.is_err());
    }
}
