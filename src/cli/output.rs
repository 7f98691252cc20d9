//! Output formatting for the snapplug CLI
//!
//! Human output is colored unless disabled; JSON mode prints one object per
//! message so the output can be piped into other tools.

use colored::Colorize;
use serde::Serialize;
use std::time::Instant;

/// Outcome of one part, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartStatus {
    /// Part built and staged
    Built,
    /// Part failed
    Failed,
}

impl PartStatus {
    /// Get the colored string representation
    pub fn colored_string(&self) -> String {
        match self {
            PartStatus::Built => "built".green().to_string(),
            PartStatus::Failed => "failed".red().bold().to_string(),
        }
    }

    /// Get the plain string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PartStatus::Built => "built",
            PartStatus::Failed => "failed",
        }
    }
}

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
    /// Start time for duration calculations
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
            start_time: Instant::now(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print a part header
    pub fn part_header(&self, part: &str, plugin: &str) {
        if self.json_mode {
            return;
        }

        let header = format!("PART [{}] ({})", part, plugin);
        let stars = "*".repeat(80_usize.saturating_sub(header.len()));

        if self.use_color {
            println!("\n{} {}", header.bright_white().bold(), stars.bright_black());
        } else {
            println!("\n{} {}", header, stars);
        }
    }

    /// Print the result of a part
    pub fn part_result(&self, part: &str, status: PartStatus, message: Option<&str>) {
        if self.json_mode {
            let result = serde_json::json!({
                "part": part,
                "status": status.as_str(),
                "message": message
            });
            println!("{}", result);
            return;
        }

        let status_str = if self.use_color {
            status.colored_string()
        } else {
            status.as_str().to_string()
        };

        print!("{}: [{}]", status_str, part);
        if let Some(msg) = message {
            print!(" => {}", msg);
        }
        println!();
    }

    /// Print an indented key/value detail line (verbose only)
    pub fn detail(&self, key: &str, value: &str) {
        if self.json_mode || self.verbosity < 1 {
            return;
        }

        if self.use_color {
            println!("    {}: {}", key.bright_black(), value);
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let err = serde_json::json!({
                "type": "error",
                "message": message
            });
            eprintln!("{}", err);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }

        if self.json_mode {
            let info = serde_json::json!({
                "type": "info",
                "message": message
            });
            println!("{}", info);
            return;
        }

        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print a plain line (human mode only)
    pub fn line(&self, message: &str) {
        if !self.json_mode {
            println!("{}", message);
        }
    }

    /// Print a final summary with elapsed time
    pub fn summary(&self, built: usize, failed: usize) {
        if self.json_mode {
            return;
        }

        let elapsed = self.start_time.elapsed();
        let text = format!(
            "{} part(s) built, {} failed in {:.2}s",
            built,
            failed,
            elapsed.as_secs_f64()
        );
        if self.use_color {
            if failed > 0 {
                println!("\n{}", text.red().bold());
            } else {
                println!("\n{}", text.green().bold());
            }
        } else {
            println!("\n{}", text);
        }
    }
}
