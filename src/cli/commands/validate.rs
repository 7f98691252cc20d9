//! Validate command - check a project file without building

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use snapplug::plugins::PluginRegistry;
use snapplug::project::Project;
use std::path::PathBuf;

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Project file
    #[arg(short = 'p', long, default_value = "snapplug.yaml")]
    pub project: PathBuf,
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let project = match Project::from_file(&self.project) {
            Ok(project) => project,
            Err(e) => return Ok(ctx.fail(&e)),
        };

        let registry = PluginRegistry::with_builtins();
        if let Err(e) = project.validate(&registry) {
            return Ok(ctx.fail(&e));
        }

        if ctx.output.is_json() {
            ctx.output.json(&serde_json::json!({
                "project": project.name,
                "parts": project.parts.keys().collect::<Vec<_>>(),
                "valid": true,
            }))?;
        } else {
            ctx.output.line(&format!(
                "Project '{}' is valid ({} part(s))",
                project.name,
                project.parts.len()
            ));
        }
        Ok(0)
    }
}
