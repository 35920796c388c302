use std::{io, path::Path};

use crate::{
    error::{PrivilegedError, RunError},
    info,
    logging::Logger,
    privileged::PrivilegedOps,
    warn,
};

/// Mount point for the offline SOFTWARE hive.
pub const OFFLINE_HIVE_NAME: &str = "TempHive";

const EXPLORER_POLICIES: &str = r"Microsoft\Windows\CurrentVersion\Policies\Explorer";
const LOGON_BACKGROUND: &str = r"Microsoft\Windows\CurrentVersion\Authentication\LogonUI\Background";

/// DWORD writes below HKEY_LOCAL_MACHINE. Missing keys are created.
pub trait RegistryWriter: Send + Sync {
    fn set_dword(&self, key: &str, name: &str, value: u32) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryScope {
    /// HKLM\SOFTWARE of the running system.
    Live,
    /// The target's SOFTWARE hive loaded under HKLM\TempHive.
    Offline,
}

impl RegistryScope {
    pub fn from_offline_flag(offline: bool) -> Self {
        if offline {
            Self::Offline
        } else {
            Self::Live
        }
    }

    pub fn root(self) -> &'static str {
        match self {
            Self::Live => "SOFTWARE",
            Self::Offline => OFFLINE_HIVE_NAME,
        }
    }
}

pub fn set_use_default_tile(registry: &dyn RegistryWriter, scope: RegistryScope) -> Result<(), RunError> {
    set_flag(registry, scope, EXPLORER_POLICIES, "UseDefaultTile")
}

pub fn set_oem_background(registry: &dyn RegistryWriter, scope: RegistryScope) -> Result<(), RunError> {
    set_flag(registry, scope, LOGON_BACKGROUND, "OEMBackground")
}

fn set_flag(
    registry: &dyn RegistryWriter,
    scope: RegistryScope,
    subkey: &str,
    name: &str,
) -> Result<(), RunError> {
    let key = format!(r"{}\{}", scope.root(), subkey);
    registry
        .set_dword(&key, name, 1)
        .map_err(|source| RunError::Registry {
            key,
            name: name.to_string(),
            source,
        })
}

/// Offline hive mounted for the lifetime of the guard.
///
/// [`MountedHive::unload`] detaches it and reports failure. If the guard is
/// dropped without that call, the hive is still unloaded and any error is
/// only logged.
pub struct MountedHive<'a> {
    ops: &'a dyn PrivilegedOps,
    log: &'a Logger,
    name: &'static str,
    mounted: bool,
}

impl<'a> MountedHive<'a> {
    pub fn load(
        ops: &'a dyn PrivilegedOps,
        file: &Path,
        name: &'static str,
        log: &'a Logger,
    ) -> Result<Self, PrivilegedError> {
        ops.load_hive(file, name)?;
        info!(log, "loaded {} as HKLM\\{}", file.display(), name);
        Ok(Self {
            ops,
            log,
            name,
            mounted: true,
        })
    }

    pub fn unload(mut self) -> Result<(), PrivilegedError> {
        self.mounted = false;
        self.ops.unload_hive(self.name)?;
        info!(self.log, "unloaded HKLM\\{}", self.name);
        Ok(())
    }
}

impl Drop for MountedHive<'_> {
    fn drop(&mut self) {
        if !self.mounted {
            return;
        }

        match self.ops.unload_hive(self.name) {
            Ok(()) => warn!(self.log, "unloaded HKLM\\{} after an interrupted patch", self.name),
            Err(e) => warn!(self.log, "failed to unload HKLM\\{}: {e}", self.name),
        }
    }
}

/// Writes `UseDefaultTile` and, for Windows 7 support, `OEMBackground`.
///
/// In offline mode the target's SOFTWARE hive is loaded first and unloaded
/// afterwards on every path.
pub fn patch(
    registry: &dyn RegistryWriter,
    ops: &dyn PrivilegedOps,
    scope: RegistryScope,
    software_hive: &Path,
    win7: bool,
    log: &Logger,
) -> Result<(), RunError> {
    match scope {
        RegistryScope::Live => write_flags(registry, scope, win7),
        RegistryScope::Offline => {
            let hive = MountedHive::load(ops, software_hive, OFFLINE_HIVE_NAME, log)?;
            write_flags(registry, scope, win7)?;
            hive.unload()?;
            Ok(())
        }
    }
}

fn write_flags(registry: &dyn RegistryWriter, scope: RegistryScope, win7: bool) -> Result<(), RunError> {
    set_use_default_tile(registry, scope)?;
    if win7 {
        set_oem_background(registry, scope)?;
    }
    Ok(())
}

/// HKEY_LOCAL_MACHINE of this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalMachine;

#[cfg(windows)]
impl RegistryWriter for LocalMachine {
    fn set_dword(&self, key: &str, name: &str, value: u32) -> io::Result<()> {
        use winreg::{enums::HKEY_LOCAL_MACHINE, RegKey};

        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let (subkey, _) = hklm.create_subkey(key)?;
        subkey.set_value(name, &value)
    }
}

#[cfg(not(windows))]
impl RegistryWriter for LocalMachine {
    fn set_dword(&self, key: &str, name: &str, _value: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot write HKLM\\{key}!{name} on this platform"),
        ))
    }
}
