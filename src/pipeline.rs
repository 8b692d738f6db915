// SPDX-License-Identifier: Apache-2.0

//! Types shared by the equivalence and behavioral pipelines, plus the
//! transpile step they both start with.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::outcome::{Outcome, Suite};
use crate::scanner::TestCase;
use crate::scratch::CaseWorkspace;
use crate::toolchain::ToolchainConfig;
use crate::tools::{ToolOutput, ToolRunner};
use crate::tv_error::TvError;

/// Last state-machine stage a test case reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transpile,
    ReferenceCompile,
    Prove,
    Link,
    Execute,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Transpile => "transpile",
            Stage::ReferenceCompile => "reference compile",
            Stage::Prove => "prove",
            Stage::Link => "link",
            Stage::Execute => "execute",
        };
        write!(f, "{}", s)
    }
}

/// A labelled block of captured text to show a human when a case does not
/// pass, e.g. tool output or an IR artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub label: String,
    pub text: String,
}

impl Diagnostic {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    pub(crate) fn tool_output(label: &str, output: &ToolOutput) -> Self {
        Self::new(
            format!("{} ({})", label, output.status_description()),
            output.combined(),
        )
    }

    /// Contents of an artifact file, or a note saying why it is unavailable.
    pub(crate) fn artifact(label: &str, path: &Path) -> Self {
        let text = std::fs::read_to_string(path)
            .unwrap_or_else(|e| format!("<could not read {}: {}>", path.display(), e));
        Self::new(label, text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    pub path: PathBuf,
    pub ordinal: i64,
    pub suite: Suite,
    pub outcome: Outcome,
    pub stage: Stage,
    /// One-line reason for the outcome.
    pub detail: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the scratch directory was kept for inspection.
    pub workspace: Option<PathBuf>,
}

impl CaseReport {
    pub fn new(case: &TestCase, outcome: Outcome, stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            path: case.path.clone(),
            ordinal: case.ordinal,
            suite: case.suite,
            outcome,
            stage,
            detail: detail.into(),
            diagnostics: Vec::new(),
            workspace: None,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Runs one suite's test cases.
pub trait Pipeline {
    fn suite(&self) -> Suite;

    fn run_case(&self, case: &TestCase, workspace: &CaseWorkspace)
        -> Result<CaseReport, TvError>;
}

pub(crate) enum Transpiled {
    /// The plugin printed its success marker within the deadline; the IR
    /// artifact lives at `ir`.
    Ir { ir: PathBuf, output: ToolOutput },
    /// The plugin declined or failed; no later stage may run.
    Unsupported(CaseReport),
}

/// Compiles `case` with the plugin loaded, inside the case's workspace.
pub(crate) fn transpile(
    case: &TestCase,
    toolchain: &ToolchainConfig,
    runner: &dyn ToolRunner,
    workspace: &CaseWorkspace,
) -> Result<Transpiled, TvError> {
    let invocation = toolchain.transpile_invocation(&case.path, workspace.path());
    let output = runner.run(&invocation)?;
    if output.timed_out || !output.stdout.contains(toolchain.success_marker.as_str()) {
        let detail = if output.timed_out {
            "transpiler timed out".to_string()
        } else {
            "transpiler did not report success".to_string()
        };
        log::info!("{}: {}", case.path.display(), detail);
        let report = CaseReport::new(case, Outcome::Unsupported, Stage::Transpile, detail)
            .with_diagnostic(Diagnostic::tool_output("transpiler output", &output));
        return Ok(Transpiled::Unsupported(report));
    }
    Ok(Transpiled::Ir {
        ir: workspace.artifact(&toolchain.transpiled_ir_name),
        output,
    })
}
