use std::{
    env,
    path::{Path, PathBuf},
};

pub const CONFIG_FILE_NAME: &str = "win-wallpaper.yaml";

const IMAGE_DIR_SUFFIXES: [&[&str]; 3] = [
    &["ProgramData", "Microsoft", "User Account Pictures"],
    &["Windows", "Web"],
    &["ProgramData", "Microsoft", "Windows", "SystemData"],
];

const LEGACY_BACKGROUND_DIR: &[&str] = &["Windows", "System32", "oobe", "info", "backgrounds"];
const LEGACY_BACKGROUND_FILE: &str = "backgroundDefault.jpg";
const SOFTWARE_HIVE: &[&str] = &["Windows", "System32", "config", "SOFTWARE"];

/// Well-known locations inside a Windows installation tree, online or offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLayout {
    root: PathBuf,
}

impl TargetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Account pictures, web wallpapers and the system wallpaper cache.
    pub fn image_dirs(&self) -> Vec<PathBuf> {
        IMAGE_DIR_SUFFIXES
            .iter()
            .map(|segments| join_all(&self.root, segments))
            .collect()
    }

    /// A target is usable when at least one image directory exists.
    pub fn is_valid(&self) -> bool {
        self.image_dirs().iter().any(|dir| dir.exists())
    }

    pub fn legacy_background_dir(&self) -> PathBuf {
        join_all(&self.root, LEGACY_BACKGROUND_DIR)
    }

    pub fn legacy_background_file(&self) -> PathBuf {
        self.legacy_background_dir().join(LEGACY_BACKGROUND_FILE)
    }

    /// Offline SOFTWARE hive of the target installation.
    pub fn software_hive(&self) -> PathBuf {
        join_all(&self.root, SOFTWARE_HIVE)
    }
}

fn join_all(root: &Path, segments: &[&str]) -> PathBuf {
    segments.iter().fold(root.to_path_buf(), |path, seg| path.join(seg))
}

pub fn exe_dir() -> Option<PathBuf> {
    let exe_path = env::current_exe().ok()?;
    exe_path.parent().map(Path::to_path_buf)
}

/// Config next to the executable, falling back to the working directory.
pub fn config_path() -> PathBuf {
    if let Some(dir) = exe_dir() {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return candidate;
        }
    }

    PathBuf::from(CONFIG_FILE_NAME)
}

/// Relative paths resolve against the executable directory.
pub fn resolve_from_exe_dir(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    match exe_dir() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}
