//! Configuration module for snapplug
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/snapplug/snapplug.toml)
//! - User configuration (~/.config/snapplug/snapplug.toml)
//! - Project configuration (./snapplug.toml)
//! - Environment variables

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root CA certificate bundled with every provisioned thing.
pub const DEFAULT_ROOT_CA_URL: &str = "https://www.symantec.com/content/en/us/enterprise/verisign/roots/VeriSign-Class%203-Public-Primary-Certification-Authority-G5.pem";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the per-part directories
    pub work_dir: PathBuf,

    /// Shared stage directory
    pub stage_dir: PathBuf,

    /// Directory the package is assembled in
    pub prime_dir: PathBuf,

    /// AWS IoT settings
    pub aws: AwsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("parts"),
            stage_dir: PathBuf::from("stage"),
            prime_dir: PathBuf::from("prime"),
            aws: AwsConfig::default(),
        }
    }
}

/// AWS IoT settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Command line used to invoke the AWS CLI, e.g. `aws` or
    /// `python3 /opt/aws/bin/aws`. Detected when unset.
    pub cli: Option<String>,

    /// Where the root CA certificate is downloaded from
    pub root_ca_url: String,

    /// Expected SHA-256 of the root CA, lowercase hex
    pub root_ca_sha256: Option<String>,

    /// Timeout for the root CA download
    pub download_timeout_secs: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            cli: None,
            root_ca_url: DEFAULT_ROOT_CA_URL.to_string(),
            root_ca_sha256: None,
            download_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(Error::FileNotFound(path.clone()));
            }
        }

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge(Self::from_file(&path)?);
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        if let Ok(env_config) = std::env::var("SNAPPLUG_CONFIG") {
            return vec![PathBuf::from(env_config)];
        }

        let mut paths = vec![PathBuf::from("/etc/snapplug/snapplug.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("snapplug").join("snapplug.toml"));
        }
        paths.push(PathBuf::from("snapplug.toml"));
        paths
    }

    /// Parse a single configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        Ok(config)
    }

    /// Merge another config into this one
    fn merge(&self, other: Config) -> Config {
        // other takes precedence for non-default values
        let defaults = Config::default();
        let pick = |mine: &PathBuf, theirs: PathBuf, default: &PathBuf| {
            if &theirs != default {
                theirs
            } else {
                mine.clone()
            }
        };

        Config {
            work_dir: pick(&self.work_dir, other.work_dir, &defaults.work_dir),
            stage_dir: pick(&self.stage_dir, other.stage_dir, &defaults.stage_dir),
            prime_dir: pick(&self.prime_dir, other.prime_dir, &defaults.prime_dir),
            aws: AwsConfig {
                cli: other.aws.cli.or_else(|| self.aws.cli.clone()),
                root_ca_url: if other.aws.root_ca_url != defaults.aws.root_ca_url {
                    other.aws.root_ca_url
                } else {
                    self.aws.root_ca_url.clone()
                },
                root_ca_sha256: other
                    .aws
                    .root_ca_sha256
                    .or_else(|| self.aws.root_ca_sha256.clone()),
                download_timeout_secs: if other.aws.download_timeout_secs
                    != defaults.aws.download_timeout_secs
                {
                    other.aws.download_timeout_secs
                } else {
                    self.aws.download_timeout_secs
                },
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SNAPPLUG_WORK_DIR") {
            self.work_dir = PathBuf::from(dir);
        }
        if let Ok(cli) = std::env::var("SNAPPLUG_AWS_CLI") {
            self.aws.cli = Some(cli);
        }
        if let Ok(url) = std::env::var("SNAPPLUG_ROOT_CA_URL") {
            self.aws.root_ca_url = url;
        }
        if let Ok(digest) = std::env::var("SNAPPLUG_ROOT_CA_SHA256") {
            self.aws.root_ca_sha256 = Some(digest);
        }
    }

    /// Reject values that would only fail later, mid-build
    fn validate(&self) -> Result<()> {
        if let Some(ref digest) = self.aws.root_ca_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::InvalidConfig {
                    key: "aws.root_ca_sha256".to_string(),
                    message: "expected 64 hexadecimal characters".to_string(),
                });
            }
        }
        if let Some(ref cli) = self.aws.cli {
            let words = shell_words::split(cli).map_err(|e| Error::InvalidConfig {
                key: "aws.cli".to_string(),
                message: e.to_string(),
            })?;
            if words.is_empty() {
                return Err(Error::InvalidConfig {
                    key: "aws.cli".to_string(),
                    message: "command is empty".to_string(),
                });
            }
        }
        Ok(())
    }
}
