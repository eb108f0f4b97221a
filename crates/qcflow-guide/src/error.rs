//! Error types for the guidance crate.

use std::path::PathBuf;

/// Errors that can occur while rendering guidance messages.
#[derive(thiserror::Error, Debug)]
pub enum GuidanceError {
    /// Neither the override directory nor the built-in set has the template.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Error occurred while rendering a template.
    #[error("template render error: {0}")]
    TemplateRenderError(String),

    /// Failed to read an override template from disk.
    #[error("template load error: {path}")]
    TemplateLoadError {
        /// Path to the template that failed to load.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Override directory does not exist or is not a directory.
    #[error("template directory not found: {0}")]
    TemplateDirectoryNotFound(PathBuf),

    /// Override directory listing failed.
    #[error("failed to list templates in {path}")]
    TemplateListError {
        /// Path to the template directory.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for guidance operations.
pub type Result<T> = std::result::Result<T, GuidanceError>;
