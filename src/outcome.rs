// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

/// Classification of a single test case by a single pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
    /// The transpiler did not report success for the input. This is a
    /// property of the input, not a verification failure.
    Unsupported,
    /// The harness could not reach a verdict, e.g. the reference compiler
    /// rejected the source.
    Inconclusive,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Fail)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Pass => "Pass",
            Outcome::Fail => "Fail",
            Outcome::Unsupported => "Unsupported",
            Outcome::Inconclusive => "Inconclusive",
        };
        write!(f, "{}", s)
    }
}

/// The two independent groups of test cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    /// Checked by comparing transpiler IR against reference-compiler IR with
    /// the equivalence prover.
    Equivalence,
    /// Checked by linking the transpiler IR into a synthesized assertion
    /// program and running it.
    Behavioral,
}

impl Suite {
    /// Suites in run order.
    pub const ALL: [Suite; 2] = [Suite::Equivalence, Suite::Behavioral];

    pub fn name(&self) -> &'static str {
        match self {
            Suite::Equivalence => "equivalence",
            Suite::Behavioral => "behavioral",
        }
    }
}

impl std::fmt::Display for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
