// SPDX-License-Identifier: Apache-2.0

//! Harness-level settings and the TOML file format that carries them
//! alongside the toolchain description.
//!
//! ```toml
//! [toolchain]
//! plugin_path = "build/libplugin.so"
//! prover = "/opt/alive2/build/alive-tv"
//!
//! [harness]
//! test_root = "."
//! on_failure = "continue"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::outcome::Suite;
use crate::toolchain::ToolchainConfig;
use crate::tv_error::TvError;

/// What to do after a test case is classified `Fail`. Applies to both
/// suites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failure. Any semantic divergence is
    /// treated as release-blocking.
    #[default]
    Abort,
    /// Record the failure and keep going.
    Continue,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            _ => Err(format!("invalid failure policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory holding the suite directories.
    pub test_root: PathBuf,
    pub equivalence_dir: String,
    pub behavioral_dir: String,
    pub on_failure: FailurePolicy,
    /// Keep each test case's scratch directory instead of deleting it.
    pub keep_temps: bool,
    /// Per-tool-invocation wall clock limit; unset means wait forever.
    pub tool_timeout_secs: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_root: PathBuf::from("."),
            equivalence_dir: "alive-tests".to_string(),
            behavioral_dir: "output-tests".to_string(),
            on_failure: FailurePolicy::default(),
            keep_temps: false,
            tool_timeout_secs: None,
        }
    }
}

impl HarnessConfig {
    pub fn suite_root(&self, suite: Suite) -> PathBuf {
        match suite {
            Suite::Equivalence => self.test_root.join(&self.equivalence_dir),
            Suite::Behavioral => self.test_root.join(&self.behavioral_dir),
        }
    }

    pub fn tool_timeout(&self) -> Option<std::time::Duration> {
        self.tool_timeout_secs.map(std::time::Duration::from_secs)
    }
}

/// Contents of a `bimple-tv-toolchain.toml` file. Both tables are optional
/// and every field falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub toolchain: ToolchainConfig,
    pub harness: HarnessConfig,
}

impl ConfigFile {
    pub fn from_toml_str(text: &str) -> Result<Self, TvError> {
        toml::from_str(text).map_err(|e| TvError::Config(e.to_string()))
    }

    /// Reads the file and resolves its relative paths against the absolute
    /// directory containing it.
    pub fn from_path(path: &Path) -> Result<Self, TvError> {
        let text = std::fs::read_to_string(path).map_err(|e| TvError::io(path, e))?;
        let mut config = Self::from_toml_str(&text)?;
        let path = std::path::absolute(path).map_err(|e| TvError::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("/"));
        config.toolchain = config.toolchain.resolved_against(base);
        if config.harness.test_root.is_relative() {
            config.harness.test_root = base.join(&config.harness.test_root);
        }
        Ok(config)
    }
}
