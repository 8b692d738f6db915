// SPDX-License-Identifier: Apache-2.0

//! Synthesis of the small C++ program that exercises transpiled code through
//! the extracted assertions.

use serde::Deserialize;

use crate::annotations::Annotations;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostProgramLayout {
    /// First line of the program, normally the assertion library include.
    pub header: String,
    pub entry_open: String,
    pub entry_close: String,
    /// Prefix applied to every assertion line inside the entry point.
    pub indent: String,
}

impl Default for HostProgramLayout {
    fn default() -> Self {
        Self {
            header: "#include <assert.hpp>".to_string(),
            entry_open: "int main() {".to_string(),
            entry_close: "}".to_string(),
            indent: "    ".to_string(),
        }
    }
}

pub fn synthesize_host_program(annotations: &Annotations, layout: &HostProgramLayout) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(
        annotations.declarations.len() + annotations.assertions.len() + 4,
    );
    lines.push(layout.header.clone());
    lines.extend(annotations.declarations.iter().cloned());
    lines.push(layout.entry_open.clone());
    lines.extend(
        annotations
            .assertions
            .iter()
            .map(|line| format!("{}{}", layout.indent, line)),
    );
    lines.push(layout.entry_close.clone());
    lines.push(String::new());
    lines.join("\n")
}
