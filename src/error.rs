//! Error types for snapplug.
//!
//! Plugin execution failures are reported as [`PluginError`](crate::plugins::PluginError)
//! and wrapped into [`Error::Plugin`] together with the part they belong to.

use crate::plugins::PluginError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for snapplug operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for snapplug.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Project Errors
    // ========================================================================
    /// Error parsing a project file.
    #[error("Failed to parse project '{path}': {message}")]
    ProjectParse {
        /// Path to the project file
        path: PathBuf,
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Project structure is invalid.
    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    /// Part not declared in the project.
    #[error("Part '{0}' not found in project")]
    PartNotFound(String),

    // ========================================================================
    // Plugin Errors
    // ========================================================================
    /// No plugin registered under this name.
    #[error("Plugin '{0}' not found")]
    PluginNotFound(String),

    /// A plugin step failed for a part.
    #[error("Part '{part}' failed during {step}: {source}")]
    Plugin {
        /// Part name
        part: String,
        /// Lifecycle step that failed
        step: &'static str,
        /// Plugin error
        #[source]
        source: PluginError,
    },

    /// A staged or packaged file pattern could not be compiled.
    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new project parse error.
    pub fn project_parse(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ProjectParse {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Wraps a plugin failure with the part and step it happened in.
    pub fn plugin(part: impl Into<String>, step: &'static str, source: PluginError) -> Self {
        Self::Plugin {
            part: part.into(),
            step,
            source,
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Plugin { .. } => 2,
            Error::ProjectParse { .. } | Error::ProjectValidation(_) | Error::PartNotFound(_) => 4,
            Error::PluginNotFound(_) => 5,
            Error::InvalidConfig { .. } => 6,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
