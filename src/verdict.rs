// SPDX-License-Identifier: Apache-2.0

//! Interpretation of the equivalence prover's free-text output.
//!
//! The prover reports its result as prose, so the parser is a trait with the
//! literal phrases held in configuration: a change in the prover's wording is
//! a config change, and the classification can be tested against captured
//! output without running the prover.

use serde::Deserialize;

/// What the prover said about a transpiler/reference IR pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProverVerdict {
    Correct,
    /// A counterexample was found.
    DoesNotVerify,
    /// The prover gave up (e.g. timeout or unsupported feature).
    Unprovable,
    /// The prover could not read one of the IR files.
    TranslationFailed,
    /// None of the known phrases appeared.
    NoVerdict,
}

impl ProverVerdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, ProverVerdict::Correct)
    }
}

impl std::fmt::Display for ProverVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProverVerdict::Correct => "transformation is correct",
            ProverVerdict::DoesNotVerify => "transformation does not verify",
            ProverVerdict::Unprovable => "correctness could not be proven",
            ProverVerdict::TranslationFailed => "prover could not translate the IR",
            ProverVerdict::NoVerdict => "prover output contained no verdict",
        };
        write!(f, "{}", s)
    }
}

pub trait VerdictParser {
    fn parse(&self, prover_output: &str) -> ProverVerdict;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerdictPhrases {
    pub correct: String,
    pub does_not_verify: String,
    pub unprovable: String,
    pub translation_failed: String,
}

impl Default for VerdictPhrases {
    fn default() -> Self {
        Self {
            correct: "Transformation seems to be correct!".to_string(),
            does_not_verify: "Transformation doesn't verify!".to_string(),
            unprovable: "ERROR: Couldn't prove the correctness of the transformation".to_string(),
            translation_failed: "ERROR: Could not translate".to_string(),
        }
    }
}

/// Substring-matching parser. Negative phrases are checked before the
/// positive one, so any negative phrase wins even when the positive phrase is
/// also present (bidirectional runs print one result per direction).
#[derive(Debug, Clone, Default)]
pub struct PhraseVerdictParser {
    phrases: VerdictPhrases,
}

impl PhraseVerdictParser {
    pub fn new(phrases: VerdictPhrases) -> Self {
        Self { phrases }
    }

    pub fn phrases(&self) -> &VerdictPhrases {
        &self.phrases
    }
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    !phrase.is_empty() && haystack.contains(phrase)
}

impl VerdictParser for PhraseVerdictParser {
    fn parse(&self, prover_output: &str) -> ProverVerdict {
        let p = &self.phrases;
        if contains_phrase(prover_output, &p.does_not_verify) {
            ProverVerdict::DoesNotVerify
        } else if contains_phrase(prover_output, &p.unprovable) {
            ProverVerdict::Unprovable
        } else if contains_phrase(prover_output, &p.translation_failed) {
            ProverVerdict::TranslationFailed
        } else if contains_phrase(prover_output, &p.correct) {
            ProverVerdict::Correct
        } else {
            ProverVerdict::NoVerdict
        }
    }
}
