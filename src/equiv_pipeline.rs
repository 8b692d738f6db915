// SPDX-License-Identifier: Apache-2.0

//! Equivalence suite: the transpiler's IR must be provably equivalent, in both
//! directions, to the IR the reference compiler produces for the same source.
//!
//! ```text
//! test.cpp --g++ -fplugin--> x.ll --\
//!                                    +--> prover --bidirectional x.ll y.ll
//! test.cpp --clang -Og-----> y.ll --/
//! ```

use crate::ir_normalizer::normalize_ir_file;
use crate::outcome::{Outcome, Suite};
use crate::pipeline::{transpile, CaseReport, Diagnostic, Pipeline, Stage, Transpiled};
use crate::scanner::TestCase;
use crate::scratch::CaseWorkspace;
use crate::toolchain::ToolchainConfig;
use crate::tools::ToolRunner;
use crate::tv_error::TvError;
use crate::verdict::VerdictParser;

pub struct EquivalencePipeline<'a> {
    toolchain: &'a ToolchainConfig,
    runner: &'a dyn ToolRunner,
    parser: &'a dyn VerdictParser,
}

impl<'a> EquivalencePipeline<'a> {
    pub fn new(
        toolchain: &'a ToolchainConfig,
        runner: &'a dyn ToolRunner,
        parser: &'a dyn VerdictParser,
    ) -> Self {
        Self {
            toolchain,
            runner,
            parser,
        }
    }
}

impl Pipeline for EquivalencePipeline<'_> {
    fn suite(&self) -> Suite {
        Suite::Equivalence
    }

    fn run_case(
        &self,
        case: &TestCase,
        workspace: &CaseWorkspace,
    ) -> Result<CaseReport, TvError> {
        let toolchain = self.toolchain;
        let (transpiled_ir, transpile_output) =
            match transpile(case, toolchain, self.runner, workspace)? {
                Transpiled::Ir { ir, output } => (ir, output),
                Transpiled::Unsupported(report) => return Ok(report),
            };
        if !transpiled_ir.exists() {
            return Ok(CaseReport::new(
                case,
                Outcome::Fail,
                Stage::Transpile,
                format!(
                    "transpiler reported success but wrote no {}",
                    toolchain.transpiled_ir_name
                ),
            )
            .with_diagnostic(Diagnostic::tool_output(
                "transpiler output",
                &transpile_output,
            )));
        }
        if toolchain.normalize_transpiler_ir {
            normalize_ir_file(&transpiled_ir, &toolchain.target_triple_marker)?;
        }

        let reference_ir = workspace.artifact(&toolchain.reference_ir_name);
        let reference = self.runner.run(&toolchain.reference_compile_invocation(
            &case.path,
            &reference_ir,
            workspace.path(),
        ))?;
        if !reference.success() {
            log::warn!(
                "{}: reference compiler failed ({}); no verdict",
                case.path.display(),
                reference.status_description()
            );
            return Ok(CaseReport::new(
                case,
                Outcome::Inconclusive,
                Stage::ReferenceCompile,
                "reference compiler failed",
            )
            .with_diagnostic(Diagnostic::tool_output(
                "reference compiler output",
                &reference,
            )));
        }
        normalize_ir_file(&reference_ir, &toolchain.target_triple_marker)?;

        let prove = self.runner.run(&toolchain.prove_invocation(
            &transpiled_ir,
            &reference_ir,
            workspace.path(),
        ))?;
        let prover_output = prove.combined();
        let verdict = self.parser.parse(&prover_output);
        log::info!("{}: prover verdict: {}", case.path.display(), verdict);

        if verdict.is_pass() && !prove.timed_out {
            return Ok(CaseReport::new(case, Outcome::Pass, Stage::Prove, verdict.to_string()));
        }
        let detail = if prove.timed_out {
            "prover timed out".to_string()
        } else {
            verdict.to_string()
        };
        Ok(CaseReport::new(case, Outcome::Fail, Stage::Prove, detail)
            .with_diagnostic(Diagnostic::tool_output("prover output", &prove))
            .with_diagnostic(Diagnostic::artifact("Transpiled code", &transpiled_ir))
            .with_diagnostic(Diagnostic::artifact("Reference code", &reference_ir)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::tools::ToolOutput;
    use crate::verdict::PhraseVerdictParser;

    const X_LL: &str = "define i32 @_Z3addii(i32 %0, i32 %1) {\n  %3 = add nsw i32 %1, %0\n  ret i32 %3\n}\n";
    const Y_LL: &str = "target datalayout = \"e-m:e\"\ntarget triple = \"x86_64-pc-linux-gnu\"\n\ndefine i32 @_Z3addii(i32 %0, i32 %1) {\n  %3 = add nsw i32 %0, %1\n  ret i32 %3\n}\n";
    const ALIVE_OK: &str = "Transformation seems to be correct!\n\nSummary:\n  1 correct transformations\n";
    const ALIVE_BAD: &str = "Transformation doesn't verify!\nERROR: Value mismatch\n";

    struct Fixture {
        _dir: tempfile::TempDir,
        case: TestCase,
        workspace: CaseWorkspace,
        toolchain: ToolchainConfig,
        parser: PhraseVerdictParser,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let case = write_case(
            dir.path(),
            "1_add.cpp",
            "int add(int a, int b) { return a + b; }\n",
            Suite::Equivalence,
        );
        let workspace = CaseWorkspace::create_in(dir.path(), &case, false).unwrap();
        Fixture {
            _dir: dir,
            case,
            workspace,
            toolchain: ToolchainConfig::default(),
            parser: PhraseVerdictParser::default(),
        }
    }

    fn run(f: &Fixture, runner: &FakeToolRunner) -> CaseReport {
        EquivalencePipeline::new(&f.toolchain, runner, &f.parser)
            .run_case(&f.case, &f.workspace)
            .unwrap()
    }

    #[test]
    fn test_pass_runs_all_three_tools_in_order() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on("transpile", transpile_ok(X_LL))
            .on("reference compile", write_output_arg(Y_LL, exit_with(0, "", "")))
            .on("prove", |_| exit_with(0, ALIVE_OK, ""));
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Pass, "{:?}", report);
        assert_eq!(report.stage, Stage::Prove);
        let order: Vec<String> = runner
            .invocations()
            .into_iter()
            .map(|i| i.description)
            .collect();
        assert_eq!(order, vec!["transpile", "reference compile", "prove"]);
    }

    #[test]
    fn test_reference_ir_is_normalized_before_proving() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on("transpile", transpile_ok(X_LL))
            .on("reference compile", write_output_arg(Y_LL, exit_with(0, "", "")))
            .on("prove", |invocation| {
                let args = invocation.args_lossy();
                assert_eq!(args[0], "--bidirectional");
                assert!(args[1].ends_with("x.ll"), "transpiler IR goes first");
                let y = std::fs::read_to_string(&args[2]).unwrap();
                assert!(!y.contains("target triple"), "{}", y);
                assert!(y.contains("target datalayout"));
                exit_with(0, ALIVE_OK, "")
            });
        assert_eq!(run(&f, &runner).outcome, Outcome::Pass);
        assert_eq!(runner.calls("prove"), 1);
    }

    #[test]
    fn test_transpiler_ir_is_left_alone_by_default() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on(
                "transpile",
                transpile_ok("target triple = \"x86_64\"\ndefine void @f() {\n  ret void\n}\n"),
            )
            .on("reference compile", write_output_arg(Y_LL, exit_with(0, "", "")))
            .on("prove", |invocation| {
                let x = std::fs::read_to_string(&invocation.args_lossy()[1]).unwrap();
                assert!(x.starts_with("target triple"));
                exit_with(0, ALIVE_OK, "")
            });
        assert_eq!(run(&f, &runner).outcome, Outcome::Pass);
    }

    #[test]
    fn test_transpiler_ir_normalized_when_configured() {
        let mut f = fixture();
        f.toolchain.normalize_transpiler_ir = true;
        let runner = FakeToolRunner::new()
            .on(
                "transpile",
                transpile_ok("target triple = \"x86_64\"\ndefine void @f() {\n  ret void\n}\n"),
            )
            .on("reference compile", write_output_arg(Y_LL, exit_with(0, "", "")))
            .on("prove", |invocation| {
                let x = std::fs::read_to_string(&invocation.args_lossy()[1]).unwrap();
                assert!(!x.contains("target triple"));
                exit_with(0, ALIVE_OK, "")
            });
        assert_eq!(run(&f, &runner).outcome, Outcome::Pass);
    }

    #[test]
    fn test_unsupported_never_reaches_reference_compiler_or_prover() {
        let f = fixture();
        let runner = FakeToolRunner::new().on("transpile", transpile_declined());
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Unsupported);
        assert_eq!(report.stage, Stage::Transpile);
        assert_eq!(runner.calls("transpile"), 1);
        assert_eq!(runner.calls("reference compile"), 0);
        assert_eq!(runner.calls("prove"), 0);
        assert_eq!(runner.total_calls(), 1);
    }

    #[test]
    fn test_transpiler_timeout_is_unsupported() {
        let f = fixture();
        let runner = FakeToolRunner::new().on("transpile", |_| timed_out());
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Unsupported);
        assert_eq!(report.detail, "transpiler timed out");
    }

    #[test]
    fn test_marker_only_on_stderr_is_unsupported() {
        let f = fixture();
        let runner = FakeToolRunner::new().on("transpile", |_| {
            exit_with(0, "", "TRANSPILED SUCCESSFULLY\n")
        });
        assert_eq!(run(&f, &runner).outcome, Outcome::Unsupported);
    }

    #[test]
    fn test_reference_failure_is_inconclusive_and_skips_prover() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on("transpile", transpile_ok(X_LL))
            .on("reference compile", |_| {
                exit_with(1, "", "error: unknown type name '__float128'\n")
            });
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Inconclusive);
        assert_eq!(report.stage, Stage::ReferenceCompile);
        assert_eq!(runner.calls("prove"), 0);
        assert!(report.diagnostics[0].text.contains("__float128"));
    }

    #[test]
    fn test_mismatch_fails_with_both_ir_files_attached() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on("transpile", transpile_ok(X_LL))
            .on("reference compile", write_output_arg(Y_LL, exit_with(0, "", "")))
            .on("prove", |_| exit_with(1, ALIVE_BAD, ""));
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Fail);
        assert_eq!(report.detail, "transformation does not verify");
        let labels: Vec<&str> = report.diagnostics.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["prover output (exit code 1)", "Transpiled code", "Reference code"]
        );
        assert_eq!(report.diagnostics[1].text, X_LL);
        assert!(!report.diagnostics[2].text.contains("target triple"));
    }

    #[test]
    fn test_negative_phrase_overrides_positive() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on("transpile", transpile_ok(X_LL))
            .on("reference compile", write_output_arg(Y_LL, exit_with(0, "", "")))
            .on("prove", |_| {
                exit_with(
                    0,
                    "Transformation seems to be correct!\n",
                    "ERROR: Couldn't prove the correctness of the transformation\n",
                )
            });
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Fail);
        assert_eq!(report.detail, "correctness could not be proven");
    }

    /// Sanity fixture: identical IR on both sides passes whatever else the
    /// prover prints.
    #[test]
    fn test_identical_ir_passes() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on("transpile", transpile_ok(X_LL))
            .on("reference compile", write_output_arg(X_LL, exit_with(0, "", "")))
            .on("prove", |invocation| {
                let args = invocation.args_lossy();
                let x = std::fs::read_to_string(&args[1]).unwrap();
                let y = std::fs::read_to_string(&args[2]).unwrap();
                if x == y {
                    exit_with(0, "----\nTransformation seems to be correct!\n", "")
                } else {
                    exit_with(1, "Transformation doesn't verify!\n", "")
                }
            });
        assert_eq!(run(&f, &runner).outcome, Outcome::Pass);
    }

    #[test]
    fn test_prover_timeout_fails() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on("transpile", transpile_ok(X_LL))
            .on("reference compile", write_output_arg(Y_LL, exit_with(0, "", "")))
            .on("prove", |_| timed_out());
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Fail);
        assert_eq!(report.detail, "prover timed out");
    }

    #[test]
    fn test_success_marker_without_ir_file_fails() {
        let f = fixture();
        let runner = FakeToolRunner::new().on("transpile", |_| {
            exit_with(1, "TRANSPILED SUCCESSFULLY\n", "")
        });
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Fail);
        assert_eq!(report.stage, Stage::Transpile);
        assert_eq!(runner.calls("reference compile"), 0);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].label.starts_with("transpiler output"));
        assert!(report.diagnostics[0].text.contains("TRANSPILED SUCCESSFULLY"));
    }

    #[test]
    fn test_marker_printed_before_timeout_is_unsupported() {
        let f = fixture();
        let runner = FakeToolRunner::new().on("transpile", |invocation| {
            let dir = invocation.current_dir.clone().unwrap();
            std::fs::write(dir.join("x.ll"), X_LL).unwrap();
            ToolOutput {
                stdout: "TRANSPILED SUCCESSFULLY\n".to_string(),
                ..timed_out()
            }
        });
        let report = run(&f, &runner);
        assert_eq!(report.outcome, Outcome::Unsupported);
        assert_eq!(report.stage, Stage::Transpile);
        assert_eq!(report.detail, "transpiler timed out");
        assert_eq!(runner.calls("reference compile"), 0);
    }

    #[test]
    fn test_missing_prover_is_fatal() {
        let f = fixture();
        let runner = FakeToolRunner::new()
            .on("transpile", transpile_ok(X_LL))
            .on("reference compile", write_output_arg(Y_LL, exit_with(0, "", "")));
        let err = EquivalencePipeline::new(&f.toolchain, &runner, &f.parser)
            .run_case(&f.case, &f.workspace)
            .unwrap_err();
        assert!(matches!(err, TvError::ToolSpawn { .. }));
    }
}
