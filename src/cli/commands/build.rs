//! Build command - run parts through the lifecycle

use super::{project_root, CommandContext};
use crate::cli::output::PartStatus;
use anyhow::Result;
use clap::Parser;
use snapplug::lifecycle::{Lifecycle, PartEvent};
use snapplug::project::Project;
use std::path::PathBuf;

/// Arguments for the build command
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Project file
    #[arg(short = 'p', long, default_value = "snapplug.yaml")]
    pub project: PathBuf,

    /// Parts to build (all parts when omitted)
    pub parts: Vec<String>,
}

impl BuildArgs {
    /// Execute the build command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        ctx.output.banner("SNAPPLUG BUILD");

        let project = match Project::from_file(&self.project) {
            Ok(project) => project,
            Err(e) => return Ok(ctx.fail(&e)),
        };

        let lifecycle = Lifecycle::new(project_root(&self.project), ctx.config.clone());
        if let Err(e) = project.validate(lifecycle.registry()) {
            return Ok(ctx.fail(&e));
        }

        if let Err(e) = project.select(&self.parts) {
            return Ok(ctx.fail(&e));
        }

        let output = &ctx.output;
        let mut built = 0;
        let result = lifecycle.run_with(&project, &self.parts, |event| match event {
            PartEvent::Started { part, plugin } => output.part_header(part, plugin),
            PartEvent::Finished(part) => {
                built += 1;
                if output.is_json() {
                    return;
                }
                output.part_result(&part.part, PartStatus::Built, Some(&part.build.msg));
                for artifact in &part.build.artifacts {
                    output.detail("wrote", &artifact.display().to_string());
                }
                for file in &part.staged {
                    output.detail("staged", &file.display().to_string());
                }
                for package in &part.dependencies.stage_packages {
                    output.detail("stage package", package);
                }
            }
        });

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                let part = match e {
                    snapplug::Error::Plugin { ref part, .. } => part.clone(),
                    _ => project.name.clone(),
                };
                ctx.output
                    .part_result(&part, PartStatus::Failed, Some(&e.to_string()));
                let code = ctx.fail(&e);
                ctx.output.summary(built, 1);
                return Ok(code);
            }
        };

        if ctx.output.is_json() {
            ctx.output.json(&report)?;
            return Ok(0);
        }

        if let Some(ref path) = report.services_file {
            ctx.output.info(&format!(
                "Wrote {} service(s) to {}",
                report.services.len(),
                path.display()
            ));
        }

        ctx.output.summary(built, 0);
        Ok(0)
    }
}
