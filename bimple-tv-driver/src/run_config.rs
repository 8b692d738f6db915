// SPDX-License-Identifier: Apache-2.0

//! Resolves the effective configuration from the toolchain TOML file and
//! command line flags, and checks the host has the tools it names.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bimple_tv::{ConfigFile, FailurePolicy, HarnessConfig, HarnessRun, ToolchainConfig, TvError};
use clap::ArgMatches;

pub const TOOLCHAIN_FILE_NAME: &str = "bimple-tv-toolchain.toml";

/// The `--toolchain` flag if given; otherwise a `bimple-tv-toolchain.toml`
/// in `cwd` when one exists.
pub fn find_toolchain_toml(flag: Option<&String>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(cwd.join(path));
    }
    let cwd_toml_path = cwd.join(TOOLCHAIN_FILE_NAME);
    if cwd_toml_path.exists() {
        log::info!(
            "Using {} in current directory: {}",
            TOOLCHAIN_FILE_NAME,
            cwd_toml_path.display()
        );
        Some(cwd_toml_path)
    } else {
        None
    }
}

/// Relative paths in a file resolve against the file's directory; without a
/// file the defaults resolve against `cwd`.
pub fn load_config(toml_path: Option<&Path>, cwd: &Path) -> Result<ConfigFile, TvError> {
    match toml_path {
        Some(path) => ConfigFile::from_path(path),
        None => {
            let defaults = ConfigFile::default();
            Ok(ConfigFile {
                toolchain: defaults.toolchain.resolved_against(cwd),
                harness: HarnessConfig {
                    test_root: cwd.join(&defaults.harness.test_root),
                    ..defaults.harness
                },
            })
        }
    }
}

/// Command line flags win over the `[harness]` table.
pub fn apply_overrides(
    harness: &mut HarnessConfig,
    matches: &ArgMatches,
    cwd: &Path,
) -> Result<(), String> {
    if let Some(test_root) = matches.get_one::<String>("test_root") {
        harness.test_root = cwd.join(test_root);
    }
    if let Some(policy) = matches.get_one::<String>("on_failure") {
        harness.on_failure = policy.parse::<FailurePolicy>()?;
    }
    if let Some(keep_temps) = matches.get_one::<String>("keep_temps") {
        harness.keep_temps = keep_temps == "true";
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout_secs") {
        harness.tool_timeout_secs = if *timeout == 0 { None } else { Some(*timeout) };
    }
    Ok(())
}

/// Returns one `(what, problem)` entry per tool or artifact that is not
/// available on this host.
pub fn preflight(toolchain: &ToolchainConfig) -> Vec<(String, String)> {
    let mut problems = Vec::new();
    for (what, program) in toolchain.required_programs() {
        match which::which(program) {
            Ok(found) => log::debug!("{} {} found at {}", what, program, found.display()),
            Err(e) => problems.push((what.to_string(), format!("{}: {}", program, e))),
        }
    }
    if !toolchain.plugin_path.is_file() {
        problems.push((
            "transpiler plugin".to_string(),
            format!("{}: not found", toolchain.plugin_path.display()),
        ));
    }
    problems
}

pub fn write_json_summary(path: &Path, run: &HarnessRun) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(run).context("serialize run summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("write json summary to {}", path.display()))?;
    Ok(())
}
