//! Plugin system for snapplug
//!
//! A plugin turns the options of one part into build output. Each plugin kind
//! is registered as a [`PluginFactory`], which owns the option schema and
//! builds a [`Plugin`] instance for a part. The instance then exposes the
//! lifecycle hooks the [`Lifecycle`](crate::lifecycle::Lifecycle) calls in
//! order: dependencies, fetch sources, build, staged files, packaged files and
//! service descriptors.

pub mod awsiot;
pub mod roscore;

use crate::config::AwsConfig;
use crate::runner::{CommandRunner, FetchError, Fetcher, HttpFetcher, SystemRunner};
use crate::service::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while validating or running a plugin
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' failed with exit code {code}: {message}")]
    CommandFailed {
        command: String,
        code: i32,
        message: String,
    },

    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Checksum mismatch for '{url}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Options of a single part, as written in the project file
pub type PluginOptions = HashMap<String, serde_json::Value>;

/// Helper trait for extracting options
pub trait ParamExt {
    fn get_string(&self, key: &str) -> PluginResult<Option<String>>;
    fn get_string_required(&self, key: &str) -> PluginResult<String>;
    fn get_bool(&self, key: &str) -> PluginResult<Option<bool>>;
}

impl ParamExt for PluginOptions {
    fn get_string(&self, key: &str) -> PluginResult<Option<String>> {
        match self.get(key) {
            Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(v) => Ok(Some(v.to_string().trim_matches('"').to_string())),
        }
    }

    fn get_string_required(&self, key: &str) -> PluginResult<String> {
        self.get_string(key)?
            .ok_or_else(|| PluginError::MissingParameter(key.to_string()))
    }

    fn get_bool(&self, key: &str) -> PluginResult<Option<bool>> {
        match self.get(key) {
            Some(serde_json::Value::Bool(b)) => Ok(Some(*b)),
            Some(serde_json::Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Some(true)),
                "false" | "no" | "0" | "off" => Ok(Some(false)),
                _ => Err(PluginError::InvalidParameter(format!(
                    "{} must be a boolean",
                    key
                ))),
            },
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(_) => Err(PluginError::InvalidParameter(format!(
                "{} must be a boolean",
                key
            ))),
        }
    }
}

/// Check `options` against a draft-04 style object schema.
///
/// Supports the subset the built-in plugins use: `properties` with `string`
/// and `boolean` types, `default` values and `required`. Unknown keys are
/// rejected. Returns the options with defaults filled in.
pub fn validate_options(
    schema: &serde_json::Value,
    options: &PluginOptions,
) -> PluginResult<PluginOptions> {
    let empty = serde_json::Map::new();
    let properties = schema
        .get("properties")
        .and_then(serde_json::Value::as_object)
        .unwrap_or(&empty);

    for (key, value) in options {
        let property = properties
            .get(key)
            .ok_or_else(|| PluginError::InvalidParameter(format!("unknown option '{}'", key)))?;

        let type_ok = match property.get("type").and_then(serde_json::Value::as_str) {
            Some("string") => value.is_string(),
            Some("boolean") => value.is_boolean(),
            Some("integer") => value.is_i64() || value.is_u64(),
            Some("array") => value.is_array(),
            _ => true,
        };
        if !type_ok {
            return Err(PluginError::InvalidParameter(format!(
                "'{}' must be of type {}",
                key,
                property["type"].as_str().unwrap_or("unknown")
            )));
        }
    }

    if let Some(required) = schema.get("required").and_then(serde_json::Value::as_array) {
        for key in required.iter().filter_map(serde_json::Value::as_str) {
            if !options.contains_key(key) {
                return Err(PluginError::MissingParameter(key.to_string()));
            }
        }
    }

    let mut validated = options.clone();
    for (key, property) in properties {
        if let Some(default) = property.get("default") {
            validated
                .entry(key.clone())
                .or_insert_with(|| default.clone());
        }
    }
    Ok(validated)
}

/// Packages and sources a part needs before it can build.
///
/// Evaluated by the lifecycle ahead of any build step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyManifest {
    /// Packages needed on the build host
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_packages: Vec<String>,
    /// Packages unpacked into the part's install tree
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stage_packages: Vec<String>,
    /// Package archive lines the stage packages come from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_sources: Vec<String>,
}

impl DependencyManifest {
    pub fn is_empty(&self) -> bool {
        self.build_packages.is_empty()
            && self.stage_packages.is_empty()
            && self.package_sources.is_empty()
    }
}

/// Result of a successful build step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginOutput {
    /// Human-readable message about what happened
    pub msg: String,
    /// Files the step wrote
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
    /// Additional data returned by the plugin
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
}

impl PluginOutput {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Self::default()
        }
    }

    /// Record a written file
    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(path.into());
        self
    }

    /// Add data to the output
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// Everything a plugin may touch while running for one part
#[derive(Clone)]
pub struct PluginContext {
    /// Name of the part being built
    pub part_name: String,
    /// Where sources are fetched to
    pub src_dir: PathBuf,
    /// Scratch directory for the build
    pub build_dir: PathBuf,
    /// Files installed by the build; the stage set is resolved here
    pub install_dir: PathBuf,
    /// Shared stage directory of the project
    pub stage_dir: PathBuf,
    /// AWS settings from the tool configuration
    pub aws: AwsConfig,
    /// Runs external commands
    pub runner: Arc<dyn CommandRunner>,
    /// Downloads remote files
    pub fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("part_name", &self.part_name)
            .field("src_dir", &self.src_dir)
            .field("build_dir", &self.build_dir)
            .field("install_dir", &self.install_dir)
            .field("stage_dir", &self.stage_dir)
            .field("aws", &self.aws)
            .finish_non_exhaustive()
    }
}

impl PluginContext {
    /// Context for `part_name` with its directories under `part_root`.
    pub fn new(part_name: impl Into<String>, part_root: &Path, stage_dir: &Path) -> Self {
        Self {
            part_name: part_name.into(),
            src_dir: part_root.join("src"),
            build_dir: part_root.join("build"),
            install_dir: part_root.join("install"),
            stage_dir: stage_dir.to_path_buf(),
            aws: AwsConfig::default(),
            runner: Arc::new(SystemRunner),
            fetcher: Arc::new(HttpFetcher::default()),
        }
    }

    pub fn with_aws(mut self, aws: AwsConfig) -> Self {
        self.aws = aws;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }
}

/// Lifecycle hooks of a plugin instance bound to one part
pub trait Plugin: Send + Sync {
    /// Returns the plugin kind this instance was created from
    fn kind(&self) -> &'static str;

    /// Packages this part needs, declared without side effects
    fn dependencies(&self) -> DependencyManifest {
        DependencyManifest::default()
    }

    /// Fetch sources into `src_dir`
    fn fetch_sources(&self, _context: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    /// Build the part
    fn build(&self, context: &PluginContext) -> PluginResult<PluginOutput>;

    /// Patterns selecting which installed files go to the stage directory
    fn staged_files(&self) -> Vec<String> {
        vec!["*".to_string()]
    }

    /// Patterns selecting which staged files end up in the package
    fn packaged_files(&self) -> Vec<String> {
        vec!["*".to_string()]
    }

    /// Add this part's services to `services`. Returns true if one was added.
    fn contribute_service_descriptor(&self, _services: &mut ServiceConfig) -> PluginResult<bool> {
        Ok(false)
    }
}

/// A plugin kind: owns the option schema and creates instances
pub trait PluginFactory: Send + Sync {
    /// Returns the name parts use to select this plugin
    fn name(&self) -> &'static str;

    /// Returns a description of what the plugin does
    fn description(&self) -> &'static str;

    /// Draft-04 JSON schema of the part options
    fn schema(&self) -> serde_json::Value;

    /// Validate raw options and fill defaults
    fn validate_options(&self, options: &PluginOptions) -> PluginResult<PluginOptions> {
        validate_options(&self.schema(), options)
    }

    /// Create an instance for `part_name` from validated options
    fn create(&self, part_name: &str, options: &PluginOptions) -> PluginResult<Box<dyn Plugin>>;
}

/// Registry for looking up plugins by name
pub struct PluginRegistry {
    factories: HashMap<String, Arc<dyn PluginFactory>>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with all built-in plugins
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(awsiot::AwsIotFactory));
        registry.register(Arc::new(roscore::RosCoreFactory));
        registry
    }

    /// Register a plugin kind
    pub fn register(&mut self, factory: Arc<dyn PluginFactory>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    /// Get a plugin kind by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginFactory>> {
        self.factories.get(name).cloned()
    }

    /// Check if a plugin exists
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// All plugin names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Validate options and create an instance in one go
    pub fn instantiate(
        &self,
        plugin: &str,
        part_name: &str,
        options: &PluginOptions,
    ) -> PluginResult<Box<dyn Plugin>> {
        let factory = self
            .get(plugin)
            .ok_or_else(|| PluginError::NotFound(plugin.to_string()))?;
        let validated = factory.validate_options(options)?;
        factory.create(part_name, &validated)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
