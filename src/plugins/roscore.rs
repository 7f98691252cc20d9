//! ROS core plugin - ship a ROS master as a package service
//!
//! Writes `bin/<part>-rosmaster-service` into the install directory and
//! registers a `<part>-rosmaster` service listening on the ROS master port.

use super::{
    DependencyManifest, ParamExt, Plugin, PluginContext, PluginFactory, PluginOptions,
    PluginOutput, PluginResult,
};
use crate::service::{PortSpec, ServiceConfig, ServiceDescriptor};
use std::fs;
use tracing::info;

/// ROS distribution used when `rosversion` is not set
pub const DEFAULT_ROS_VERSION: &str = "jade";

/// Well-known port of the ROS master
pub const ROSMASTER_PORT: u16 = 11311;

/// Archives the ROS core packages are pulled from
const PACKAGE_SOURCES: &[&str] = &[
    "deb http://packages.ros.org/ros/ubuntu/ vivid main",
    "deb http://archive.ubuntu.com/ubuntu/ vivid main universe",
    "deb http://archive.ubuntu.com/ubuntu/ vivid-updates main universe",
    "deb http://archive.ubuntu.com/ubuntu/ vivid-security main universe",
];

/// Factory for the `roscore` plugin
pub struct RosCoreFactory;

impl PluginFactory for RosCoreFactory {
    fn name(&self) -> &'static str {
        "roscore"
    }

    fn description(&self) -> &'static str {
        "Stage a ROS master and expose it as a service"
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "object",
            "properties": {
                "rosversion": {"type": "string"}
            }
        })
    }

    fn create(&self, part_name: &str, options: &PluginOptions) -> PluginResult<Box<dyn Plugin>> {
        let rosversion = options
            .get_string("rosversion")?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ROS_VERSION.to_string());
        Ok(Box::new(RosCorePlugin::new(part_name, rosversion)))
    }
}

/// The `roscore` plugin bound to one part
#[derive(Debug, Clone)]
pub struct RosCorePlugin {
    part_name: String,
    rosversion: String,
}

impl RosCorePlugin {
    pub fn new(part_name: impl Into<String>, rosversion: impl Into<String>) -> Self {
        Self {
            part_name: part_name.into(),
            rosversion: rosversion.into(),
        }
    }

    pub fn rosversion(&self) -> &str {
        &self.rosversion
    }

    /// Launcher path relative to the install directory
    pub fn launcher_path(&self) -> String {
        format!("bin/{}-rosmaster-service", self.part_name)
    }

    /// Name the service is registered under
    pub fn service_name(&self) -> String {
        format!("{}-rosmaster", self.part_name)
    }

    /// Shell script that sources the ROS environment and execs the master
    pub fn launcher_script(&self) -> String {
        let rosdir = format!("$SNAP_APP_PATH/opt/ros/{}", self.rosversion);
        [
            "#!/bin/sh".to_string(),
            format!("_CATKIN_SETUP_DIR={}", rosdir),
            format!(". {}/setup.sh", rosdir),
            format!("exec {}/bin/rosmaster", rosdir),
        ]
        .join("\n")
            + "\n"
    }
}

impl Plugin for RosCorePlugin {
    fn kind(&self) -> &'static str {
        "roscore"
    }

    fn dependencies(&self) -> DependencyManifest {
        DependencyManifest {
            stage_packages: vec![format!("ros-{}-ros-core", self.rosversion)],
            package_sources: PACKAGE_SOURCES.iter().map(|s| s.to_string()).collect(),
            ..DependencyManifest::default()
        }
    }

    fn build(&self, context: &PluginContext) -> PluginResult<PluginOutput> {
        let path = context.install_dir.join(self.launcher_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.launcher_script())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }

        info!(path = %path.display(), rosversion = %self.rosversion, "wrote rosmaster launcher");
        Ok(PluginOutput::new(format!(
            "Wrote ROS {} master launcher",
            self.rosversion
        ))
        .with_artifact(path))
    }

    fn packaged_files(&self) -> Vec<String> {
        vec![self.launcher_path()]
    }

    fn contribute_service_descriptor(&self, services: &mut ServiceConfig) -> PluginResult<bool> {
        let descriptor = ServiceDescriptor::new(self.launcher_path(), "ROS Master service")
            .with_internal_port("rosmaster", PortSpec::tcp(ROSMASTER_PORT), false);
        services.insert(self.service_name(), descriptor);
        Ok(true)
    }
}
