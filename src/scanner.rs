// SPDX-License-Identifier: Apache-2.0

//! Discovery and ordering of test files under a suite root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::outcome::Suite;
use crate::tv_error::TvError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub path: PathBuf,
    /// Integer prefix of the base name, before the first `_`.
    pub ordinal: i64,
    pub suite: Suite,
}

impl TestCase {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Returns the ordinal for a test file base name, e.g. `12` for
/// `12_loops.cpp`. A name without any `_` is parsed whole. Signed prefixes
/// (`-1_x.cpp`, `+2_y.cpp`) are accepted; a prefix outside the `i64` range is
/// not an ordinal.
pub fn parse_ordinal(file_name: &str) -> Option<i64> {
    let prefix = file_name.split('_').next()?;
    prefix.trim().parse::<i64>().ok()
}

/// Recursively collects every regular file below `root` and orders the
/// result by ordinal, then by path.
///
/// Any file whose name lacks an ordinal is an error. Returned paths are
/// absolute, since tools run from per-case scratch directories.
pub fn discover_suite(root: &Path, suite: Suite) -> Result<Vec<TestCase>, TvError> {
    if !root.is_dir() {
        return Err(TvError::SuiteRootMissing {
            path: root.to_path_buf(),
        });
    }
    let root = std::path::absolute(root).map_err(|e| TvError::io(root, e))?;
    let mut cases = Vec::new();
    let mut dir_worklist: Vec<PathBuf> = vec![root.clone()];
    while let Some(dir) = dir_worklist.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| TvError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| TvError::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| TvError::io(&path, e))?;
            if file_type.is_dir() {
                dir_worklist.push(path);
                continue;
            }
            // Symlinked directories are not descended into; symlinked files
            // are tests like any other.
            let is_file = if file_type.is_symlink() {
                fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false)
            } else {
                file_type.is_file()
            };
            if !is_file {
                continue;
            }
            let name = entry.file_name();
            let ordinal = parse_ordinal(&name.to_string_lossy())
                .ok_or_else(|| TvError::BadTestFileName { path: path.clone() })?;
            cases.push(TestCase {
                path,
                ordinal,
                suite,
            });
        }
    }
    cases.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.path.cmp(&b.path)));
    log::info!(
        "discover_suite; suite: {} root: {} cases: {}",
        suite,
        root.display(),
        cases.len()
    );
    Ok(cases)
}
