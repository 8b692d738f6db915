// SPDX-License-Identifier: Apache-2.0

//! Translation-validation harness for the bimple GIMPLE-to-LLVM-IR
//! transpiler plugin.
//!
//! Two suites are run over a directory of C++ test files:
//!
//! * the equivalence suite proves the transpiled IR refines the reference
//!   compiler's IR using an external bidirectional refinement checker;
//! * the behavioral suite links the transpiled IR against a host program
//!   synthesized from `// DECL:` and `// TEST:` annotations and runs it.

pub mod annotations;
pub mod behavior_pipeline;
pub mod config;
pub mod equiv_pipeline;
pub mod harness;
pub mod host_program;
pub mod ir_normalizer;
pub mod outcome;
pub mod pipeline;
pub mod run_summary;
pub mod scanner;
pub mod scratch;
pub mod toolchain;
pub mod tools;
pub mod tv_error;
pub mod verdict;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{ConfigFile, FailurePolicy, HarnessConfig};
pub use harness::{Harness, HarnessRun, NullReporter, Reporter, SuiteSelection};
pub use outcome::{Outcome, Suite};
pub use pipeline::{CaseReport, Diagnostic, Stage};
pub use run_summary::RunSummary;
pub use scanner::TestCase;
pub use toolchain::ToolchainConfig;
pub use tools::{SystemToolRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use tv_error::TvError;
pub use verdict::{PhraseVerdictParser, ProverVerdict, VerdictParser, VerdictPhrases};
