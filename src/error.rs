use std::{io, path::PathBuf};

use image::ImageError;
use thiserror::Error;

/// Exit code for faults the run does not recover from.
pub const FATAL_EXIT_CODE: u8 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color `{0}`")]
pub struct InvalidColorError(pub String);

#[derive(Debug, Error)]
pub enum PrivilegedError {
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: String },
    #[error("`{command}` is not supported on this platform")]
    Unsupported { command: String },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("administrator privileges required")]
    NotElevated,
    #[error("no folders found, invalid directory: {}", .0.display())]
    InvalidTarget(PathBuf),
    #[error("invalid hex code for --rgb argument: {0}")]
    InvalidColor(#[from] InvalidColorError),
    #[error("permission error accessing {}", path.display())]
    LegacyBackground {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error(transparent)]
    Privileged(#[from] PrivilegedError),
    #[error("failed to rewrite {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to set {name} under HKLM\\{key}: {source}")]
    Registry {
        key: String,
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl RunError {
    /// User-facing failures exit with 1, everything else is fatal.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotElevated
            | Self::InvalidTarget(_)
            | Self::InvalidColor(_)
            | Self::LegacyBackground { .. } => 1,
            _ => FATAL_EXIT_CODE,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.exit_code() == FATAL_EXIT_CODE
    }
}

/// True when an image read or write failed because access was denied.
pub fn is_permission_denied(err: &ImageError) -> bool {
    matches!(err, ImageError::IoError(e) if e.kind() == io::ErrorKind::PermissionDenied)
}
