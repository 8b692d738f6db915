// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Harness-configuration errors. These are fatal for a run: anything the
/// transpiler or the downstream tools do wrong is an `Outcome`, not a
/// `TvError`.
#[derive(Debug)]
pub enum TvError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A test file whose base name does not start with an integer ordinal.
    BadTestFileName { path: PathBuf },
    SuiteRootMissing { path: PathBuf },
    /// An external tool could not be started at all (e.g. not installed).
    ToolSpawn {
        description: String,
        message: String,
    },
    Config(String),
}

impl TvError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TvError::Io {
            path: path.into(),
            source,
        }
    }
}

impl std::fmt::Display for TvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TvError::Io { path, source } => {
                write!(f, "bimple-tv error: I/O on {}: {}", path.display(), source)
            }
            TvError::BadTestFileName { path } => write!(
                f,
                "bimple-tv error: test file name has no leading integer ordinal: {}",
                path.display()
            ),
            TvError::SuiteRootMissing { path } => write!(
                f,
                "bimple-tv error: suite root is not a directory: {}",
                path.display()
            ),
            TvError::ToolSpawn {
                description,
                message,
            } => write!(
                f,
                "bimple-tv error: failed to spawn {}: {}",
                description, message
            ),
            TvError::Config(message) => write!(f, "bimple-tv error: config: {}", message),
        }
    }
}

impl std::error::Error for TvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TvError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
