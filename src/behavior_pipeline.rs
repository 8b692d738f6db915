// SPDX-License-Identifier: Apache-2.0

//! Behavioral suite: the transpiler's IR is linked into a host program built
//! from the test's `DECL:`/`TEST:` annotations, and the program must exit 0.
//!
//! ```text
//! test.cpp --g++ -fplugin--> x.ll ----\
//!                            main.cpp --+--clang--> a.out --run--> exit status
//! ```

use crate::annotations::read_annotations;
use crate::host_program::synthesize_host_program;
use crate::outcome::{Outcome, Suite};
use crate::pipeline::{transpile, CaseReport, Diagnostic, Pipeline, Stage, Transpiled};
use crate::scanner::TestCase;
use crate::scratch::CaseWorkspace;
use crate::toolchain::ToolchainConfig;
use crate::tools::ToolRunner;
use crate::tv_error::TvError;

pub struct BehavioralPipeline<'a> {
    toolchain: &'a ToolchainConfig,
    runner: &'a dyn ToolRunner,
}

impl<'a> BehavioralPipeline<'a> {
    pub fn new(toolchain: &'a ToolchainConfig, runner: &'a dyn ToolRunner) -> Self {
        Self { toolchain, runner }
    }
}

impl Pipeline for BehavioralPipeline<'_> {
    fn suite(&self) -> Suite {
        Suite::Behavioral
    }

    fn run_case(
        &self,
        case: &TestCase,
        workspace: &CaseWorkspace,
    ) -> Result<CaseReport, TvError> {
        let toolchain = self.toolchain;
        let transpiled = transpile(case, toolchain, self.runner, workspace)?;
        let annotations = read_annotations(&case.path, &toolchain.annotations)?;
        let transpiled_ir = match transpiled {
            Transpiled::Ir { ir, .. } => ir,
            Transpiled::Unsupported(report) => return Ok(report),
        };
        log::debug!(
            "{}: {} declarations, {} assertions",
            case.path.display(),
            annotations.declarations.len(),
            annotations.assertions.len()
        );

        let host_source = synthesize_host_program(&annotations, &toolchain.host_program);
        let host_path = workspace.artifact(&toolchain.host_program_name);
        std::fs::write(&host_path, &host_source).map_err(|e| TvError::io(&host_path, e))?;

        // A link failure can be a transpiler bug or a badly written
        // annotation; both are reported as Fail.
        let binary = workspace.artifact(&toolchain.binary_name);
        let link = self.runner.run(&toolchain.link_invocation(
            &host_path,
            &transpiled_ir,
            &binary,
            workspace.path(),
        ))?;
        if !link.success() {
            return Ok(CaseReport::new(
                case,
                Outcome::Fail,
                Stage::Link,
                format!("host program failed to build ({})", link.status_description()),
            )
            .with_diagnostic(Diagnostic::tool_output("link output", &link))
            .with_diagnostic(Diagnostic::new("Host program", host_source)));
        }

        let execute = self
            .runner
            .run(&toolchain.execute_invocation(&binary, workspace.path()))?;
        if execute.success() {
            return Ok(CaseReport::new(
                case,
                Outcome::Pass,
                Stage::Execute,
                "assertions held",
            ));
        }
        Ok(CaseReport::new(
            case,
            Outcome::Fail,
            Stage::Execute,
            format!("test program failed ({})", execute.status_description()),
        )
        .with_diagnostic(Diagnostic::tool_output("test program output", &execute)))
    }
}
