// SPDX-License-Identifier: Apache-2.0

//! Removes build-environment specific lines (the target triple) from textual
//! LLVM IR before it is handed to the equivalence prover.

use std::path::Path;

use crate::tv_error::TvError;

/// Returns `text` without the lines that start with `marker`, along with the
/// number of lines removed. All other lines are kept byte-for-byte, including
/// their terminators. An empty marker removes nothing.
pub fn strip_marker_lines(text: &str, marker: &str) -> (String, usize) {
    if marker.is_empty() {
        return (text.to_string(), 0);
    }
    let mut kept = String::with_capacity(text.len());
    let mut removed = 0;
    for line in text.split_inclusive('\n') {
        if line.starts_with(marker) {
            removed += 1;
        } else {
            kept.push_str(line);
        }
    }
    (kept, removed)
}

/// Rewrites the IR file at `path` in place with marker lines removed and
/// returns how many were dropped. The file is left untouched when there is
/// nothing to remove.
pub fn normalize_ir_file(path: &Path, marker: &str) -> Result<usize, TvError> {
    let text = std::fs::read_to_string(path).map_err(|e| TvError::io(path, e))?;
    let (normalized, removed) = strip_marker_lines(&text, marker);
    if removed > 0 {
        std::fs::write(path, normalized).map_err(|e| TvError::io(path, e))?;
    }
    log::debug!(
        "normalize_ir_file; path: {} removed: {}",
        path.display(),
        removed
    );
    Ok(removed)
}
