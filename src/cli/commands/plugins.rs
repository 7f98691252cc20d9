//! Plugin commands - list plugins and show their option schemas

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use snapplug::plugins::PluginRegistry;

/// Arguments for the schema command
#[derive(Parser, Debug, Clone)]
pub struct SchemaArgs {
    /// Plugin name
    pub plugin: String,
}

/// List every registered plugin
pub fn list(ctx: &mut CommandContext) -> Result<i32> {
    let registry = PluginRegistry::with_builtins();

    if ctx.output.is_json() {
        let plugins: Vec<serde_json::Value> = registry
            .names()
            .into_iter()
            .filter_map(|name| registry.get(name))
            .map(|factory| {
                serde_json::json!({
                    "name": factory.name(),
                    "description": factory.description(),
                })
            })
            .collect();
        ctx.output.json(&plugins)?;
        return Ok(0);
    }

    for name in registry.names() {
        if let Some(factory) = registry.get(name) {
            ctx.output
                .line(&format!("{:<12} {}", factory.name(), factory.description()));
        }
    }
    Ok(0)
}

impl SchemaArgs {
    /// Print the plugin's option schema
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let registry = PluginRegistry::with_builtins();
        match registry.get(&self.plugin) {
            Some(factory) => {
                ctx.output.json(&factory.schema())?;
                Ok(0)
            }
            None => Ok(ctx.fail(&snapplug::Error::PluginNotFound(self.plugin.clone()))),
        }
    }
}
