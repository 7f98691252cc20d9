//! Lifecycle driver.
//!
//! Runs each selected part through its plugin in a fixed order:
//!
//! 1. dependencies: the declared manifest is recorded before anything runs
//! 2. pull: [`Plugin::fetch_sources`]
//! 3. build: [`Plugin::build`]
//! 4. stage: [`Plugin::staged_files`] resolved in the install dir, copied to the stage dir
//! 5. prime: [`Plugin::packaged_files`] resolved in the stage dir, copied to the prime dir
//! 6. services: [`Plugin::contribute_service_descriptor`]
//!
//! The first error stops the run.

use crate::config::Config;
use crate::error::{Error, ErrorContext, Result};
use crate::fileset::FileSet;
use crate::plugins::{DependencyManifest, PluginContext, PluginOutput, PluginRegistry};
use crate::project::{PartSpec, Project};
use crate::runner::{CommandRunner, Fetcher, HttpFetcher, SystemRunner};
use crate::service::ServiceConfig;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What happened to one part
#[derive(Debug, Clone, Serialize)]
pub struct PartReport {
    pub part: String,
    pub plugin: String,
    pub dependencies: DependencyManifest,
    pub build: PluginOutput,
    /// Files copied into the stage dir, relative to it
    pub staged: Vec<PathBuf>,
    /// Files copied into the prime dir, relative to it
    pub packaged: Vec<PathBuf>,
    /// Whether the part contributed a service
    pub service: bool,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub parts: Vec<PartReport>,
    pub services: ServiceConfig,
    /// Where the service metadata was written, if any service was declared
    pub services_file: Option<PathBuf>,
}

/// Progress notifications emitted by [`Lifecycle::run_with`]
#[derive(Debug, Clone, Copy)]
pub enum PartEvent<'a> {
    /// A part is about to run
    Started { part: &'a str, plugin: &'a str },
    /// A part ran through every step
    Finished(&'a PartReport),
}

/// Drives plugins through the build lifecycle
pub struct Lifecycle {
    root: PathBuf,
    config: Config,
    registry: PluginRegistry,
    runner: Arc<dyn CommandRunner>,
    fetcher: Arc<dyn Fetcher>,
}

impl Lifecycle {
    /// Create a lifecycle whose relative directories resolve against `root`
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let timeout = Duration::from_secs(config.aws.download_timeout_secs);
        Self {
            root: root.into(),
            config,
            registry: PluginRegistry::with_builtins(),
            runner: Arc::new(SystemRunner),
            fetcher: Arc::new(HttpFetcher::new(timeout)),
        }
    }

    pub fn with_registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
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

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn part_dir(&self, part: &str) -> PathBuf {
        self.root.join(&self.config.work_dir).join(part)
    }

    pub fn stage_dir(&self) -> PathBuf {
        self.root.join(&self.config.stage_dir)
    }

    pub fn prime_dir(&self) -> PathBuf {
        self.root.join(&self.config.prime_dir)
    }

    /// Context handed to the plugin of `part`
    pub fn context_for(&self, part: &str) -> PluginContext {
        PluginContext::new(part, &self.part_dir(part), &self.stage_dir())
            .with_aws(self.config.aws.clone())
            .with_runner(Arc::clone(&self.runner))
            .with_fetcher(Arc::clone(&self.fetcher))
    }

    /// Run the selected parts of `project` (all when `parts` is empty)
    pub fn run(&self, project: &Project, parts: &[String]) -> Result<BuildReport> {
        self.run_with(project, parts, |_| {})
    }

    /// Like [`Lifecycle::run`], reporting each part as it starts and finishes
    pub fn run_with<F>(
        &self,
        project: &Project,
        parts: &[String],
        mut on_event: F,
    ) -> Result<BuildReport>
    where
        F: FnMut(PartEvent<'_>),
    {
        let selected = project.select(parts)?;
        let mut services = ServiceConfig::new();
        let mut reports = Vec::with_capacity(selected.len());

        for (name, spec) in selected {
            on_event(PartEvent::Started {
                part: name,
                plugin: &spec.plugin,
            });
            let report = self.run_part(name, spec, &mut services)?;
            on_event(PartEvent::Finished(&report));
            reports.push(report);
        }

        let services_file = if services.is_empty() {
            None
        } else {
            let meta = self.prime_dir().join("meta");
            let path = meta.join("services.yaml");
            let yaml = services.to_yaml()?;
            fs::create_dir_all(&meta)?;
            fs::write(&path, yaml)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(path = %path.display(), count = services.len(), "wrote service metadata");
            Some(path)
        };

        Ok(BuildReport {
            parts: reports,
            services,
            services_file,
        })
    }

    /// Run one part through every step
    pub fn run_part(
        &self,
        name: &str,
        spec: &PartSpec,
        services: &mut ServiceConfig,
    ) -> Result<PartReport> {
        let plugin = self
            .registry
            .instantiate(&spec.plugin, name, &spec.options)
            .map_err(|e| Error::plugin(name, "validate", e))?;
        let context = self.context_for(name);

        let dependencies = plugin.dependencies();
        if !dependencies.is_empty() {
            info!(
                part = name,
                build_packages = ?dependencies.build_packages,
                stage_packages = ?dependencies.stage_packages,
                "declared dependencies"
            );
        }

        for dir in [&context.src_dir, &context.build_dir, &context.install_dir] {
            fs::create_dir_all(dir)?;
        }

        info!(part = name, plugin = plugin.kind(), "pulling");
        plugin
            .fetch_sources(&context)
            .map_err(|e| Error::plugin(name, "pull", e))?;

        info!(part = name, "building");
        let build = plugin
            .build(&context)
            .map_err(|e| Error::plugin(name, "build", e))?;

        info!(part = name, "staging");
        let staged = copy_fileset(
            &FileSet::new(plugin.staged_files())?,
            &context.install_dir,
            &context.stage_dir,
        )?;

        info!(part = name, "priming");
        let packaged = copy_fileset(
            &FileSet::new(plugin.packaged_files())?,
            &context.stage_dir,
            &self.prime_dir(),
        )?;

        let service = plugin
            .contribute_service_descriptor(services)
            .map_err(|e| Error::plugin(name, "services", e))?;

        Ok(PartReport {
            part: name.to_string(),
            plugin: spec.plugin.clone(),
            dependencies,
            build,
            staged,
            packaged,
            service,
        })
    }
}

/// Copy every file of `set` found under `from` to the same relative path under `to`
fn copy_fileset(set: &FileSet, from: &Path, to: &Path) -> Result<Vec<PathBuf>> {
    let files = set.resolve(from)?;
    debug!(patterns = ?set.patterns(), count = files.len(), from = %from.display(), "resolved file set");
    for relative in &files {
        let target = to.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from.join(relative), &target)
            .with_context(|| format!("Failed to copy '{}' to '{}'", relative.display(), to.display()))?;
        debug!(file = %relative.display(), to = %to.display(), "copied");
    }
    Ok(files)
}
