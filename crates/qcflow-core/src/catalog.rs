//! The fixed catalog of inspection steps.
//!
//! Twenty-one steps drive one box from arrival at the categorization
//! station to the outbound staging area. The catalog is immutable: each
//! step's phase, scan requirement, operator requirement, and blocking policy
//! is defined here once and looked up by number.

use crate::checkpoint::CheckpointKind;
use crate::error::{QcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of steps in the catalog.
pub const STEP_COUNT: u8 = 21;

/// A step number in `1..=21`.
///
/// Ordering follows the numeric value, which is also the order in which
/// steps are completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StepNumber(u8);

impl StepNumber {
    /// First step of every unit.
    pub const FIRST: StepNumber = StepNumber(1);

    /// The branch step that opens the category sub-workflow.
    pub const BRANCH: StepNumber = StepNumber(14);

    /// Terminal step; completing it completes the cycle.
    pub const LAST: StepNumber = StepNumber(STEP_COUNT);

    /// Creates a step number, rejecting values outside the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::StepNotFound`] for `0` or anything above 21.
    pub fn new(number: u8) -> Result<Self> {
        if (1..=STEP_COUNT).contains(&number) {
            Ok(Self(number))
        } else {
            Err(QcError::StepNotFound(number))
        }
    }

    /// Returns the raw step number.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position in the catalog.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Step number for a zero-based catalog index.
    pub fn from_index(index: usize) -> Result<Self> {
        let number = u8::try_from(index + 1).map_err(|_| QcError::StepNotFound(u8::MAX))?;
        Self::new(number)
    }

    /// The following step, or `None` after the last one.
    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }
}

impl TryFrom<u8> for StepNumber {
    type Error = QcError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<StepNumber> for u8 {
    fn from(step: StepNumber) -> Self {
        step.0
    }
}

impl fmt::Display for StepNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inspection phase.
///
/// Steps 1-14 classify the incoming batteries; steps 15-21 repack them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Unboxing, inspection and classification (steps 1-14).
    Categorization,

    /// Repacking by category (steps 15-21).
    Repack,
}

impl Phase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Categorization => "categorization",
            Phase::Repack => "repack",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "categorization" => Ok(Phase::Categorization),
            "repack" => Ok(Phase::Repack),
            _ => Err(format!("invalid phase: {}", s)),
        }
    }
}

/// How a step treats a negative answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingPolicy {
    /// "No" blocks the step and shows guidance until answered "yes".
    AlwaysBlockOnNo,

    /// Both answers are accepted as a sub-answer; the step then opens the
    /// category sub-workflow.
    BranchOnAnswer,
}

/// Scan requirement attached to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequirement {
    /// Exact number of non-empty codes an accepted answer must carry.
    pub codes: usize,

    /// Checkpoint kind recorded for each scanned code.
    pub checkpoint: CheckpointKind,
}

/// Immutable definition of one inspection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    /// Step number (1..=21).
    pub number: StepNumber,

    /// Phase the step belongs to.
    pub phase: Phase,

    /// Question shown to the technician.
    pub prompt: &'static str,

    /// Scan requirement, if the step is a scan step.
    pub scan: Option<ScanRequirement>,

    /// Whether the physical action needs a second operator.
    pub requires_multiple_operators: bool,

    /// Negative-answer handling.
    pub policy: BlockingPolicy,
}

impl StepDefinition {
    /// Whether an accepted answer must carry scanned codes.
    pub fn requires_scan(&self) -> bool {
        self.scan.is_some()
    }

    /// Number of codes an accepted answer must carry (0 for non-scan steps).
    pub fn scan_count(&self) -> usize {
        self.scan.map_or(0, |scan| scan.codes)
    }

    /// Whether this is the branch step.
    pub fn is_branch_step(&self) -> bool {
        self.policy == BlockingPolicy::BranchOnAnswer
    }

    /// Whether this is the terminal step.
    pub fn is_last(&self) -> bool {
        self.number == StepNumber::LAST
    }
}

const fn step(number: u8, phase: Phase, prompt: &'static str) -> StepDefinition {
    StepDefinition {
        number: StepNumber(number),
        phase,
        prompt,
        scan: None,
        requires_multiple_operators: false,
        policy: BlockingPolicy::AlwaysBlockOnNo,
    }
}

const fn scan_step(
    number: u8,
    phase: Phase,
    prompt: &'static str,
    codes: usize,
    checkpoint: CheckpointKind,
) -> StepDefinition {
    StepDefinition {
        scan: Some(ScanRequirement { codes, checkpoint }),
        ..step(number, phase, prompt)
    }
}

const fn two_person_step(number: u8, phase: Phase, prompt: &'static str) -> StepDefinition {
    StepDefinition {
        requires_multiple_operators: true,
        ..step(number, phase, prompt)
    }
}

const fn branch_step(number: u8, phase: Phase, prompt: &'static str) -> StepDefinition {
    StepDefinition {
        policy: BlockingPolicy::BranchOnAnswer,
        ..step(number, phase, prompt)
    }
}

use CheckpointKind::{BatteryLayer1, BatteryRepack, BoxCategoryB, BoxInitial};
use Phase::{Categorization, Repack};

static STEPS: [StepDefinition; STEP_COUNT as usize] = [
    step(1, Categorization, "Box received at the categorization station?"),
    scan_step(2, Categorization, "Scan the box label", 1, BoxInitial),
    step(3, Categorization, "Box opened and packing material removed?"),
    two_person_step(4, Categorization, "Top cover lifted clear with a second operator?"),
    step(5, Categorization, "Top layer inspected (no swelling, leaks or case damage)?"),
    step(6, Categorization, "Terminal caps present on all visible batteries?"),
    step(7, Categorization, "Insulating sheet between layers intact?"),
    step(8, Categorization, "Protective equipment worn (gloves, safety glasses)?"),
    scan_step(9, Categorization, "Scan both batteries of the first layer", 2, BatteryLayer1),
    step(10, Categorization, "Batteries moved to the test bench?"),
    two_person_step(11, Categorization, "Layer transferred with a second operator?"),
    step(12, Categorization, "Voltage measured on both batteries?"),
    step(13, Categorization, "Labels legible on both batteries?"),
    branch_step(14, Categorization, "Were both batteries free of defects? Classify each battery."),
    scan_step(15, Repack, "Scan the repack box label", 1, BoxCategoryB),
    step(16, Repack, "Repack box lined with fresh insulation?"),
    scan_step(17, Repack, "Scan both batteries as they go into the repack box", 2, BatteryRepack),
    step(18, Repack, "Terminal caps refitted on both batteries?"),
    two_person_step(19, Repack, "Repack box closed and taped with a second operator?"),
    step(20, Repack, "Category label applied to the repack box?"),
    step(21, Repack, "Repack box moved to the outbound staging area?"),
];

/// Returns every step in order.
pub fn steps() -> &'static [StepDefinition] {
    &STEPS
}

/// Looks up a step by number.
///
/// # Errors
///
/// Returns [`QcError::StepNotFound`] if `number` is outside `1..=21`.
pub fn step_at(number: u8) -> Result<&'static StepDefinition> {
    let number = StepNumber::new(number)?;
    Ok(definition(number))
}

/// Looks up a step by an already validated number.
pub fn definition(number: StepNumber) -> &'static StepDefinition {
    &STEPS[number.index()]
}
