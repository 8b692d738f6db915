// SPDX-License-Identifier: Apache-2.0

//! Per-test progress lines on stdout: the test's file name when it starts,
//! then `<name> - <outcome>`. Failures are preceded by their captured
//! diagnostics.

use std::io::Write;

use bimple_tv::{CaseReport, Outcome, Reporter, Suite, TestCase};
use colored::Colorize;

pub struct ConsoleReporter<W: Write> {
    out: W,
    /// Also dump diagnostics for unsupported and inconclusive cases.
    verbose: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    fn dump_diagnostics(&mut self, report: &CaseReport) -> std::io::Result<()> {
        for diagnostic in &report.diagnostics {
            writeln!(self.out, "{}:", diagnostic.label.bold())?;
            write!(self.out, "{}", diagnostic.text)?;
            if !diagnostic.text.is_empty() && !diagnostic.text.ends_with('\n') {
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    fn finish_line(&mut self, report: &CaseReport) -> std::io::Result<()> {
        let name = report.file_name();
        match report.outcome {
            Outcome::Pass => writeln!(self.out, "{} - {}", name, "Pass".green()),
            Outcome::Fail => {
                self.dump_diagnostics(report)?;
                writeln!(
                    self.out,
                    "{} - {} ({}: {})",
                    name,
                    "Fail".red().bold(),
                    report.stage,
                    report.detail
                )
            }
            Outcome::Unsupported => {
                if self.verbose {
                    self.dump_diagnostics(report)?;
                }
                writeln!(self.out, "{} - {}", name, "Unsupported".yellow())
            }
            Outcome::Inconclusive => {
                if self.verbose {
                    self.dump_diagnostics(report)?;
                }
                writeln!(
                    self.out,
                    "{} - {} ({})",
                    name,
                    "Inconclusive".yellow(),
                    report.detail
                )
            }
        }?;
        if let Some(workspace) = &report.workspace {
            writeln!(self.out, "  artifacts kept in {}", workspace.display())?;
        }
        Ok(())
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn suite_started(&mut self, suite: Suite, case_count: usize) {
        log::info!("{} suite: {} test files", suite, case_count);
    }

    fn case_started(&mut self, case: &TestCase) {
        if let Err(e) = writeln!(self.out, "{}", case.file_name()) {
            log::warn!("could not write progress line: {}", e);
        }
    }

    fn case_finished(&mut self, report: &CaseReport) {
        if let Err(e) = self.finish_line(report).and_then(|_| self.out.flush()) {
            log::warn!("could not write progress line: {}", e);
        }
    }
}
