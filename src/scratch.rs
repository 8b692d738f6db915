// SPDX-License-Identifier: Apache-2.0

//! Per-test-case scratch directories.
//!
//! Every test case gets its own directory for intermediate artifacts (the two
//! IR files, the host program and the linked binary), so artifact names never
//! collide between test cases.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::scanner::TestCase;
use crate::tv_error::TvError;

pub struct CaseWorkspace {
    dir: TempDir,
    keep: bool,
}

impl CaseWorkspace {
    pub fn create(case: &TestCase, keep: bool) -> Result<Self, TvError> {
        Self::create_in(&std::env::temp_dir(), case, keep)
    }

    pub fn create_in(parent: &Path, case: &TestCase, keep: bool) -> Result<Self, TvError> {
        let prefix = format!("bimple-tv-{}-{}-", case.suite, case.ordinal);
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(parent)
            .map_err(|e| TvError::io(parent, e))?;
        log::debug!(
            "created workspace {} for {}",
            dir.path().display(),
            case.path.display()
        );
        Ok(Self { dir, keep })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn artifact(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Deletes the directory, or persists it when keeping temps and returns
    /// where it lives.
    pub fn finish(self) -> Option<PathBuf> {
        if self.keep {
            Some(self.dir.keep())
        } else {
            None
        }
    }
}
