//! Guidance engine trait definition.

use crate::context::GuidanceContext;
use crate::error::Result;
use serde::Serialize;

/// Trait for rendering guidance text shown when a step is blocked.
///
/// # Examples
///
/// ```
/// use qcflow_guide::{GuidanceContext, GuidanceEngine, GuidanceManager};
///
/// let manager = GuidanceManager::builtin();
/// let context = GuidanceContext::new(3, "categorization");
/// let message = manager.blocked_message(&context).unwrap();
/// assert!(!message.is_empty());
/// ```
pub trait GuidanceEngine {
    /// Renders a named template (without the `.j2` extension).
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not exist or fails to render.
    fn render<T: Serialize>(&self, template: &str, ctx: &T) -> Result<String>;

    /// Renders the guidance for a blocked step.
    ///
    /// Looks up `step_<N>` first and falls back to the generic `blocked`
    /// template when no step-specific one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if neither template can be rendered.
    fn blocked_message(&self, ctx: &GuidanceContext) -> Result<String>;

    /// Lists the template names available to this engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the override directory cannot be read.
    fn list_templates(&self) -> Result<Vec<String>>;
}
