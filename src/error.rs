//! Error types for the platform seam, the control tree, configuration and
//! input scripts

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ui::ControlId;

/// Failures reported by a platform window or its drawing surface
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform surface is unavailable")]
    SurfaceUnavailable,
    #[error("framebuffer is already locked")]
    SurfaceBusy,
    #[error("window has been disposed")]
    Disposed,
    #[error("unsupported by this platform: {0}")]
    Unsupported(String),
    #[error("platform I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Failures of control tree mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("control {0:?} is no longer part of the tree")]
    StaleControl(ControlId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures while loading a raw-input replay script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("failed to read script: {0}")]
    Read(#[from] io::Error),
}
