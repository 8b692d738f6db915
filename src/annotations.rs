// SPDX-License-Identifier: Apache-2.0

//! Extraction of `DECL:` / `TEST:` annotation lines from behavioral test
//! sources.

use std::path::Path;

use serde::Deserialize;

use crate::tv_error::TvError;

/// Line prefixes that mark annotation lines. A source line is an annotation
/// only when it begins with the marker exactly (no leading whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationMarkers {
    pub declaration: String,
    pub assertion: String,
}

impl Default for AnnotationMarkers {
    fn default() -> Self {
        Self {
            declaration: "// DECL: ".to_string(),
            assertion: "// TEST: ".to_string(),
        }
    }
}

/// Annotation text in file order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Annotations {
    /// Declarations the host program needs before `main`.
    pub declarations: Vec<String>,
    /// Statements placed in the body of `main`.
    pub assertions: Vec<String>,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.assertions.is_empty()
    }
}

pub fn extract_annotations(source: &str, markers: &AnnotationMarkers) -> Annotations {
    let mut annotations = Annotations::default();
    for line in source.lines() {
        if let Some(rest) = line.strip_prefix(markers.declaration.as_str()) {
            annotations.declarations.push(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(markers.assertion.as_str()) {
            annotations.assertions.push(rest.trim().to_string());
        }
    }
    annotations
}

pub fn read_annotations(path: &Path, markers: &AnnotationMarkers) -> Result<Annotations, TvError> {
    let source = std::fs::read_to_string(path).map_err(|e| TvError::io(path, e))?;
    Ok(extract_annotations(&source, markers))
}
