// SPDX-License-Identifier: Apache-2.0

//! Aggregation of per-test outcomes into run-level counts.

use serde::Serialize;

use crate::outcome::Outcome;

/// Counts of outcomes for one harness run. This is a plain value threaded
/// through the run; there is no process-wide counter state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub passed: u64,
    pub failed: u64,
    pub unsupported: u64,
    pub inconclusive: u64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Pass => self.passed += 1,
            Outcome::Fail => self.failed += 1,
            Outcome::Unsupported => self.unsupported += 1,
            Outcome::Inconclusive => self.inconclusive += 1,
        }
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Pass => self.passed,
            Outcome::Fail => self.failed,
            Outcome::Unsupported => self.unsupported,
            Outcome::Inconclusive => self.inconclusive,
        }
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.unsupported += other.unsupported;
        self.inconclusive += other.inconclusive;
    }

    pub fn total(&self) -> u64 {
        self.passed + self.failed + self.unsupported + self.inconclusive
    }
}

impl Extend<Outcome> for RunSummary {
    fn extend<I: IntoIterator<Item = Outcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.record(outcome);
        }
    }
}

impl FromIterator<Outcome> for RunSummary {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut summary = RunSummary::new();
        summary.extend(iter);
        summary
    }
}

/// Renders the `Passed:` / `Failed:` / `Unsupported:` lines. The
/// `Inconclusive:` line only appears when something was inconclusive.
impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Passed: {}", self.passed)?;
        writeln!(f, "Failed: {}", self.failed)?;
        write!(f, "Unsupported: {}", self.unsupported)?;
        if self.inconclusive > 0 {
            write!(f, "\nInconclusive: {}", self.inconclusive)?;
        }
        Ok(())
    }
}
