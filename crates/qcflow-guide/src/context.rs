//! Context passed to guidance templates.

use serde::Serialize;

/// Data a guidance template can reference.
///
/// The engine fills this from the step catalog whenever a step is blocked,
/// so templates can mention the step number, its phase, and what the
/// technician was asked.
///
/// # Examples
///
/// ```
/// use qcflow_guide::GuidanceContext;
///
/// let context = GuidanceContext::new(7, "categorization")
///     .with_prompt("Insulating sheet between layers intact?")
///     .with_multiple_operators(false);
/// assert_eq!(context.step, 7);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct GuidanceContext {
    /// Step number (1-based) that was blocked.
    pub step: u8,

    /// Phase name of the step (`categorization` or `repack`).
    pub phase: String,

    /// Question shown to the technician for this step.
    pub prompt: String,

    /// Whether the step needs a second operator.
    pub requires_multiple_operators: bool,
}

impl GuidanceContext {
    /// Creates a context for a step in the given phase.
    #[must_use]
    pub fn new(step: u8, phase: impl Into<String>) -> Self {
        Self {
            step,
            phase: phase.into(),
            ..Default::default()
        }
    }

    /// Sets the question text.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Sets the multiple-operators flag.
    #[must_use]
    pub fn with_multiple_operators(mut self, required: bool) -> Self {
        self.requires_multiple_operators = required;
        self
    }
}
