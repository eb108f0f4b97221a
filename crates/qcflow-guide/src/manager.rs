//! Guidance manager implementation using minijinja.

use crate::{
    builtin,
    context::GuidanceContext,
    engine::GuidanceEngine,
    error::{GuidanceError, Result},
};
use minijinja::ErrorKind;
use serde::Serialize;
use std::path::PathBuf;

/// Generic template used when no step-specific template exists.
const FALLBACK_TEMPLATE: &str = "blocked";

/// Manager for loading and rendering guidance templates.
///
/// Templates resolve from the override directory first (when one is
/// configured) and then from the built-in set, so a station only needs to
/// ship the files it wants to change. Includes resolve the same way.
///
/// # Examples
///
/// ```no_run
/// use qcflow_guide::{GuidanceContext, GuidanceEngine, GuidanceManager};
/// use std::path::PathBuf;
///
/// let manager = GuidanceManager::new(Some(PathBuf::from("./station-templates")))?;
/// let message = manager.blocked_message(&GuidanceContext::new(5, "categorization"))?;
/// # Ok::<(), qcflow_guide::GuidanceError>(())
/// ```
#[derive(Debug)]
pub struct GuidanceManager {
    /// Optional directory whose `.j2` files take precedence over built-ins.
    pub override_dir: Option<PathBuf>,
    /// Minijinja environment for template rendering.
    env: minijinja::Environment<'static>,
}

impl GuidanceManager {
    /// Creates a manager, optionally layering an override directory on top
    /// of the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`GuidanceError::TemplateDirectoryNotFound`] if an override
    /// directory is given but does not exist or is not a directory.
    pub fn new(override_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &override_dir {
            if !dir.is_dir() {
                return Err(GuidanceError::TemplateDirectoryNotFound(dir.clone()));
            }
        }

        let mut env = minijinja::Environment::new();
        let loader_dir = override_dir.clone();
        env.set_loader(move |name| {
            if let Some(dir) = &loader_dir {
                let path = dir.join(name);
                if path.is_file() {
                    return std::fs::read_to_string(&path).map(Some).map_err(|e| {
                        minijinja::Error::new(
                            ErrorKind::InvalidOperation,
                            format!("failed to read {}", path.display()),
                        )
                        .with_source(e)
                    });
                }
            }
            Ok(builtin::lookup(name).map(str::to_owned))
        });

        Ok(Self { override_dir, env })
    }

    /// Creates a manager that only uses the built-in templates.
    pub fn builtin() -> Self {
        let mut env = minijinja::Environment::new();
        env.set_loader(|name| Ok(builtin::lookup(name).map(str::to_owned)));
        Self {
            override_dir: None,
            env,
        }
    }

    /// Loads a template by name (without the `.j2` extension).
    fn load_template(&self, name: &str) -> Result<minijinja::Template<'_, '_>> {
        let template_name = format!("{name}.j2");
        self.env.get_template(&template_name).map_err(|e| {
            if e.kind() == ErrorKind::TemplateNotFound {
                GuidanceError::TemplateNotFound(name.to_string())
            } else {
                GuidanceError::TemplateRenderError(format!("{name}: {e}"))
            }
        })
    }
}

impl GuidanceEngine for GuidanceManager {
    fn render<T: Serialize>(&self, template: &str, ctx: &T) -> Result<String> {
        let tmpl = self.load_template(template)?;
        tmpl.render(ctx)
            .map(|text| text.trim().to_string())
            .map_err(|e| GuidanceError::TemplateRenderError(format!("{template}: {e}")))
    }

    fn blocked_message(&self, ctx: &GuidanceContext) -> Result<String> {
        match self.render(&format!("step_{}", ctx.step), ctx) {
            Err(GuidanceError::TemplateNotFound(_)) => self.render(FALLBACK_TEMPLATE, ctx),
            other => other,
        }
    }

    fn list_templates(&self) -> Result<Vec<String>> {
        let mut templates: Vec<String> = builtin::TEMPLATES
            .iter()
            .filter_map(|(file, _)| file.strip_suffix(".j2"))
            .map(str::to_string)
            .collect();

        if let Some(dir) = &self.override_dir {
            let entries = std::fs::read_dir(dir).map_err(|source| {
                GuidanceError::TemplateListError {
                    path: dir.clone(),
                    source,
                }
            })?;

            for entry in entries {
                let entry = entry.map_err(|source| GuidanceError::TemplateListError {
                    path: dir.clone(),
                    source,
                })?;
                let path = entry.path();
                if !path.is_file() || path.extension().is_none_or(|ext| ext != "j2") {
                    continue;
                }
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    templates.push(name.to_string());
                }
            }
        }

        templates.sort();
        templates.dedup();
        Ok(templates)
    }
}

impl Default for GuidanceManager {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_step_template_renders() {
        let manager = GuidanceManager::builtin();
        let ctx = GuidanceContext::new(8, "categorization").with_prompt("Protective equipment worn?");

        let message = manager.blocked_message(&ctx).unwrap();
        assert!(message.contains("gloves"));
        assert!(message.contains("Step 8 (categorization)"));
        assert!(message.contains("\"Protective equipment worn?\""));
    }

    #[test]
    fn test_missing_step_template_falls_back_to_generic() {
        let manager = GuidanceManager::builtin();
        let ctx = GuidanceContext::new(14, "categorization");

        let message = manager.blocked_message(&ctx).unwrap();
        assert!(message.starts_with("Step 14 (categorization) cannot be skipped."));
    }

    #[test]
    fn test_multiple_operator_hint() {
        let manager = GuidanceManager::builtin();
        let ctx = GuidanceContext::new(19, "repack").with_multiple_operators(true);

        let message = manager.blocked_message(&ctx).unwrap();
        assert!(message.contains("second operator"));
    }

    #[test]
    fn test_override_directory_takes_precedence() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("step_3.j2"),
            "Custom guidance for step {{ step }}",
        )
        .unwrap();

        let manager = GuidanceManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
        let message = manager
            .blocked_message(&GuidanceContext::new(3, "categorization"))
            .unwrap();
        assert_eq!(message, "Custom guidance for step 3");

        // Steps without an override still use the built-ins
        let message = manager
            .blocked_message(&GuidanceContext::new(8, "categorization"))
            .unwrap();
        assert!(message.contains("gloves"));
    }

    #[test]
    fn test_missing_override_directory_is_an_error() {
        let result = GuidanceManager::new(Some(PathBuf::from("/nonexistent/qcflow/templates")));
        assert!(matches!(
            result,
            Err(GuidanceError::TemplateDirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_template_is_not_found() {
        let manager = GuidanceManager::builtin();
        let result = manager.render("does_not_exist", &GuidanceContext::default());
        assert!(matches!(result, Err(GuidanceError::TemplateNotFound(_))));
    }

    #[test]
    fn test_list_templates_merges_overrides() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("step_14.j2"), "branch").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let manager = GuidanceManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
        let templates = manager.list_templates().unwrap();

        assert!(templates.contains(&"blocked".to_string()));
        assert!(templates.contains(&"step_14".to_string()));
        assert!(!templates.contains(&"notes".to_string()));
        assert_eq!(
            templates.iter().filter(|t| t.as_str() == "step_1").count(),
            1
        );
    }
}
