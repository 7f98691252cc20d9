//! Project files.
//!
//! A project names the package and lists its parts. Each part selects a
//! plugin and carries that plugin's options inline:
//!
//! ```yaml
//! name: robot
//! parts:
//!   ros:
//!     plugin: roscore
//!     rosversion: kinetic
//!   iot:
//!     plugin: awsiot
//!     thing: sensor1
//! ```

use crate::error::{Error, Result};
use crate::plugins::{PluginOptions, PluginRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One part of the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    /// Name of the plugin that builds the part
    pub plugin: String,
    /// Remaining keys, handed to the plugin as options
    #[serde(flatten)]
    pub options: PluginOptions,
}

/// A parsed project file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub parts: IndexMap<String, PartSpec>,
}

impl Project {
    /// Load a project from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            Error::project_parse(path, e.to_string(), Some(Box::new(e)))
        })
    }

    /// Parse a project from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Check every part's plugin and options
    pub fn validate(&self, registry: &PluginRegistry) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ProjectValidation(
                "project name cannot be empty".to_string(),
            ));
        }
        if self.parts.is_empty() {
            return Err(Error::ProjectValidation("project has no parts".to_string()));
        }

        for (name, part) in &self.parts {
            let factory = registry
                .get(&part.plugin)
                .ok_or_else(|| Error::PluginNotFound(part.plugin.clone()))?;
            factory
                .validate_options(&part.options)
                .map_err(|e| Error::plugin(name, "validate", e))?;
        }
        Ok(())
    }

    /// Look up parts by name, in the order given. An empty selection means
    /// every part, in declaration order.
    pub fn select<'a>(&'a self, names: &[String]) -> Result<Vec<(&'a str, &'a PartSpec)>> {
        if names.is_empty() {
            return Ok(self
                .parts
                .iter()
                .map(|(name, part)| (name.as_str(), part))
                .collect());
        }

        names
            .iter()
            .map(|name| {
                self.parts
                    .get_key_value(name)
                    .map(|(name, part)| (name.as_str(), part))
                    .ok_or_else(|| Error::PartNotFound(name.clone()))
            })
            .collect()
    }
}
