//! Validation and branch policy.
//!
//! Every submission passes through [`evaluate`] before it reaches the
//! cursor. Malformed scans are input errors and never touch workflow state.
//! A well-formed answer becomes a [`Verdict`], driven by the step's
//! [`BlockingPolicy`] rather than by per-step conditionals.

use crate::catalog::{BlockingPolicy, StepDefinition};
use crate::error::{QcError, Result};
use crate::session::AnswerValue;

/// Technician's answer to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// "Yes", optionally carrying scanned codes.
    Accepted { codes: Vec<String> },
    /// "No".
    Rejected,
}

impl Answer {
    /// A plain "yes" without codes.
    pub fn yes() -> Self {
        Answer::Accepted { codes: Vec::new() }
    }

    /// A "yes" carrying scanned codes.
    pub fn with_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Answer::Accepted {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// A "no".
    pub fn no() -> Self {
        Answer::Rejected
    }
}

/// Outcome of evaluating a well-formed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Record the answer and advance.
    Accept { codes: Vec<String> },
    /// Stay on the step and show guidance.
    Reject,
    /// Branch step: record the sub-answer and open category submission.
    BranchAnswer(AnswerValue),
}

/// Evaluates `answer` against `step`.
///
/// Codes are trimmed. Scan steps need exactly the configured number of
/// non-empty codes; codes sent to other steps are dropped.
///
/// # Errors
///
/// Returns `QcError::EmptyScanCode` for a blank code and
/// `QcError::MissingScanCodes` when the code count is wrong.
pub fn evaluate(step: &StepDefinition, answer: &Answer) -> Result<Verdict> {
    let step_number = step.number.get();

    let codes = match answer {
        Answer::Rejected => {
            return Ok(match step.policy {
                BlockingPolicy::AlwaysBlockOnNo => Verdict::Reject,
                BlockingPolicy::BranchOnAnswer => Verdict::BranchAnswer(AnswerValue::No),
            });
        }
        Answer::Accepted { codes } => codes,
    };

    let codes = if step.requires_scan() {
        let trimmed: Vec<String> = codes.iter().map(|c| c.trim().to_string()).collect();
        if trimmed.iter().any(String::is_empty) {
            return Err(QcError::EmptyScanCode(step_number));
        }
        if trimmed.len() != step.scan_count() {
            return Err(QcError::MissingScanCodes {
                step: step_number,
                expected: step.scan_count(),
                got: trimmed.len(),
            });
        }
        trimmed
    } else {
        Vec::new()
    };

    Ok(match step.policy {
        BlockingPolicy::AlwaysBlockOnNo => Verdict::Accept { codes },
        BlockingPolicy::BranchOnAnswer => Verdict::BranchAnswer(AnswerValue::Yes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, STEP_COUNT};

    #[test]
    fn test_should_reject_no_on_every_non_branch_step() {
        for number in (1..=STEP_COUNT).filter(|n| *n != 14) {
            let step = catalog::step_at(number).unwrap();
            assert_eq!(evaluate(step, &Answer::no()).unwrap(), Verdict::Reject);
        }
    }

    #[test]
    fn test_branch_step_accepts_both_answers() {
        let step = catalog::step_at(14).unwrap();
        assert_eq!(
            evaluate(step, &Answer::yes()).unwrap(),
            Verdict::BranchAnswer(AnswerValue::Yes)
        );
        assert_eq!(
            evaluate(step, &Answer::no()).unwrap(),
            Verdict::BranchAnswer(AnswerValue::No)
        );
    }

    #[test]
    fn test_scan_step_requires_exact_code_count() {
        let step = catalog::step_at(9).unwrap();

        let result = evaluate(step, &Answer::with_codes(["BAT1"]));
        assert!(matches!(
            result,
            Err(QcError::MissingScanCodes {
                step: 9,
                expected: 2,
                got: 1
            })
        ));

        let result = evaluate(step, &Answer::yes());
        assert!(matches!(result, Err(QcError::MissingScanCodes { got: 0, .. })));

        let result = evaluate(step, &Answer::with_codes(["BAT1", "BAT2", "BAT3"]));
        assert!(matches!(result, Err(QcError::MissingScanCodes { got: 3, .. })));
    }

    #[test]
    fn test_blank_code_is_rejected() {
        let step = catalog::step_at(17).unwrap();
        let result = evaluate(step, &Answer::with_codes(["BAT1", "   "]));
        assert!(matches!(result, Err(QcError::EmptyScanCode(17))));
    }

    #[test]
    fn test_codes_are_trimmed() {
        let step = catalog::step_at(2).unwrap();
        assert_eq!(
            evaluate(step, &Answer::with_codes([" BOX123 "])).unwrap(),
            Verdict::Accept {
                codes: vec!["BOX123".to_string()]
            }
        );
    }

    #[test]
    fn test_codes_dropped_on_non_scan_step() {
        let step = catalog::step_at(3).unwrap();
        assert_eq!(
            evaluate(step, &Answer::with_codes(["stray"])).unwrap(),
            Verdict::Accept { codes: Vec::new() }
        );
    }
}
