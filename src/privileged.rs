// Operations that need an elevated token: file ownership, ACL grants and
// offline hive mounting. The system implementation shells out to the stock
// Windows tools so the behaviour matches what an administrator would type.

use std::{ffi::OsStr, path::Path};

use crate::error::PrivilegedError;

pub trait PrivilegedOps: Send + Sync {
    fn is_elevated(&self) -> bool;

    /// Makes the Administrators group the owner of `path`.
    fn take_ownership(&self, path: &Path) -> Result<(), PrivilegedError>;

    /// Grants Administrators full control over `path`.
    fn grant_full_control(&self, path: &Path) -> Result<(), PrivilegedError>;

    /// Mounts `file` as `HKLM\<name>`.
    fn load_hive(&self, file: &Path, name: &str) -> Result<(), PrivilegedError>;

    fn unload_hive(&self, name: &str) -> Result<(), PrivilegedError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOps;

impl PrivilegedOps for SystemOps {
    fn is_elevated(&self) -> bool {
        is_user_an_admin()
    }

    fn take_ownership(&self, path: &Path) -> Result<(), PrivilegedError> {
        run_tool(
            "takeown",
            &[OsStr::new("/F"), path.as_os_str(), OsStr::new("/A")],
            true,
        )
    }

    fn grant_full_control(&self, path: &Path) -> Result<(), PrivilegedError> {
        run_tool(
            "icacls",
            &[
                path.as_os_str(),
                OsStr::new("/grant"),
                OsStr::new("Administrators:F"),
            ],
            true,
        )
    }

    fn load_hive(&self, file: &Path, name: &str) -> Result<(), PrivilegedError> {
        let mount = format!("HKLM\\{name}");
        run_tool(
            "reg.exe",
            &[OsStr::new("load"), OsStr::new(&mount), file.as_os_str()],
            false,
        )
    }

    fn unload_hive(&self, name: &str) -> Result<(), PrivilegedError> {
        let mount = format!("HKLM\\{name}");
        run_tool("reg.exe", &[OsStr::new("unload"), OsStr::new(&mount)], false)
    }
}

fn describe(program: &str, args: &[&OsStr]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

#[cfg(windows)]
fn run_tool(program: &str, args: &[&OsStr], quiet: bool) -> Result<(), PrivilegedError> {
    use std::process::{Command, Stdio};

    let mut command = Command::new(program);
    command.args(args);
    if quiet {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let status = command.status().map_err(|source| PrivilegedError::Launch {
        command: describe(program, args),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(PrivilegedError::Failed {
            command: describe(program, args),
            status: status.to_string(),
        })
    }
}

#[cfg(not(windows))]
fn run_tool(program: &str, args: &[&OsStr], _quiet: bool) -> Result<(), PrivilegedError> {
    Err(PrivilegedError::Unsupported {
        command: describe(program, args),
    })
}

#[cfg(windows)]
fn is_user_an_admin() -> bool {
    use windows::Win32::UI::Shell::IsUserAnAdmin;

    unsafe { IsUserAnAdmin().as_bool() }
}

#[cfg(not(windows))]
fn is_user_an_admin() -> bool {
    false
}
