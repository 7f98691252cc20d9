//! snapplug - part plugins for snap builds
//!
//! This is the main entry point for the snapplug CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use snapplug::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity(), cli.is_json());

    if cli.verbosity() >= 2 {
        eprintln!("snapplug v{}", VERSION);
    }

    // An explicit config file must load; the default locations are best effort
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_some() => {
            let ctx = CommandContext::new(&cli, Config::default());
            std::process::exit(ctx.fail(&e));
        }
        Err(e) => {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }
    };

    let mut ctx = CommandContext::new(&cli, config);

    let exit_code = match &cli.command {
        Commands::Build(args) => args.execute(&mut ctx)?,
        Commands::Plugins => cli::commands::plugins::list(&mut ctx)?,
        Commands::Schema(args) => args.execute(&mut ctx)?,
        Commands::Validate(args) => args.execute(&mut ctx)?,
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
///
/// Logs always go to stderr; in JSON output mode they are JSON lines too.
fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity >= 3)
    });

    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(env_filter)
        .init();
}
