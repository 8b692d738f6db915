// SPDX-License-Identifier: Apache-2.0

//! Top-level orchestration: discover both suites, run every case through its
//! suite's pipeline one at a time, and aggregate the outcomes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::behavior_pipeline::BehavioralPipeline;
use crate::config::{FailurePolicy, HarnessConfig};
use crate::equiv_pipeline::EquivalencePipeline;
use crate::outcome::Suite;
use crate::pipeline::{CaseReport, Pipeline};
use crate::run_summary::RunSummary;
use crate::scanner::{discover_suite, TestCase};
use crate::scratch::CaseWorkspace;
use crate::toolchain::ToolchainConfig;
use crate::tools::ToolRunner;
use crate::tv_error::TvError;
use crate::verdict::VerdictParser;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuiteSelection {
    #[default]
    All,
    Only(Suite),
}

impl SuiteSelection {
    pub fn includes(&self, suite: Suite) -> bool {
        match self {
            SuiteSelection::All => true,
            SuiteSelection::Only(only) => *only == suite,
        }
    }
}

impl std::str::FromStr for SuiteSelection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "equivalence" => Ok(Self::Only(Suite::Equivalence)),
            "behavioral" => Ok(Self::Only(Suite::Behavioral)),
            _ => Err(format!("invalid suite selection: {}", s)),
        }
    }
}

/// Observer for run progress. All methods default to doing nothing.
pub trait Reporter {
    fn suite_started(&mut self, _suite: Suite, _case_count: usize) {}
    fn case_started(&mut self, _case: &TestCase) {}
    fn case_finished(&mut self, _report: &CaseReport) {}
}

pub struct NullReporter;

impl Reporter for NullReporter {}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HarnessRun {
    pub summary: RunSummary,
    pub suites: BTreeMap<Suite, RunSummary>,
    pub cases: Vec<CaseReport>,
    /// The failing test that stopped the run under `FailurePolicy::Abort`.
    pub aborted_on: Option<PathBuf>,
}

impl HarnessRun {
    pub fn aborted(&self) -> bool {
        self.aborted_on.is_some()
    }

    fn record(&mut self, report: CaseReport) {
        self.summary.record(report.outcome);
        self.suites
            .entry(report.suite)
            .or_default()
            .record(report.outcome);
        self.cases.push(report);
    }
}

pub struct Harness<'a> {
    toolchain: &'a ToolchainConfig,
    settings: &'a HarnessConfig,
    runner: &'a dyn ToolRunner,
    parser: &'a dyn VerdictParser,
    scratch_parent: PathBuf,
}

impl<'a> Harness<'a> {
    pub fn new(
        toolchain: &'a ToolchainConfig,
        settings: &'a HarnessConfig,
        runner: &'a dyn ToolRunner,
        parser: &'a dyn VerdictParser,
    ) -> Self {
        Self {
            toolchain,
            settings,
            runner,
            parser,
            scratch_parent: std::env::temp_dir(),
        }
    }

    /// Where per-case scratch directories are created; the system temp dir
    /// by default.
    pub fn with_scratch_parent(mut self, dir: &Path) -> Self {
        self.scratch_parent = dir.to_path_buf();
        self
    }

    /// Discovers every selected suite, in run order. Done in full before any
    /// test runs so a misnamed file fails the run at startup.
    pub fn discover(
        &self,
        selection: SuiteSelection,
    ) -> Result<Vec<(Suite, Vec<TestCase>)>, TvError> {
        let mut suites = Vec::new();
        for suite in Suite::ALL {
            if selection.includes(suite) {
                let cases = discover_suite(&self.settings.suite_root(suite), suite)?;
                suites.push((suite, cases));
            }
        }
        Ok(suites)
    }

    fn pipeline(&self, suite: Suite) -> Box<dyn Pipeline + '_> {
        match suite {
            Suite::Equivalence => Box::new(EquivalencePipeline::new(
                self.toolchain,
                self.runner,
                self.parser,
            )),
            Suite::Behavioral => Box::new(BehavioralPipeline::new(self.toolchain, self.runner)),
        }
    }

    /// Runs the selected suites sequentially: every tool invocation of a case
    /// completes before the next case starts, and the equivalence suite
    /// completes before the behavioral suite starts.
    pub fn run(
        &self,
        selection: SuiteSelection,
        reporter: &mut dyn Reporter,
    ) -> Result<HarnessRun, TvError> {
        let suites = self.discover(selection)?;
        let mut run = HarnessRun::default();
        for (suite, cases) in suites {
            log::info!("running {} suite; {} cases", suite, cases.len());
            reporter.suite_started(suite, cases.len());
            run.suites.entry(suite).or_default();
            let pipeline = self.pipeline(suite);
            debug_assert_eq!(pipeline.suite(), suite);
            for case in &cases {
                reporter.case_started(case);
                let workspace =
                    CaseWorkspace::create_in(&self.scratch_parent, case, self.settings.keep_temps)?;
                let result = pipeline.run_case(case, &workspace);
                let kept = workspace.finish();
                let mut report = result?;
                report.workspace = kept;
                log::info!(
                    "{}: {} at {} ({})",
                    case.path.display(),
                    report.outcome,
                    report.stage,
                    report.detail
                );
                reporter.case_finished(&report);
                let stop = report.outcome.is_failure()
                    && self.settings.on_failure == FailurePolicy::Abort;
                let path = report.path.clone();
                run.record(report);
                if stop {
                    log::warn!("aborting run after failure in {}", path.display());
                    run.aborted_on = Some(path);
                    return Ok(run);
                }
            }
        }
        Ok(run)
    }
}
