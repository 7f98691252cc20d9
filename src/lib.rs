//! # snapplug - Part Plugins for Snap Builds
//!
//! snapplug builds the parts of a snap package through plugins. Each part in
//! a project file names a plugin and carries its options; the
//! [`Lifecycle`](lifecycle::Lifecycle) runs the plugin's hooks in a fixed
//! order and collects staged files, packaged files and service descriptors.
//!
//! ## Built-in Plugins
//!
//! - **awsiot**: provisions an AWS IoT thing while the part builds. Creates or
//!   receives a certificate, downloads the root CA, creates and attaches a
//!   policy and registers the thing.
//! - **roscore**: writes a launcher for the ROS master and exposes it as a
//!   service on port 11311/tcp.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     CLI Interface                         │
//! │              (clap-based command parsing)                 │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Lifecycle                           │
//! │   dependencies → pull → build → stage → prime → services  │
//! └──────────────────────────────────────────────────────────┘
//!          │                   │                    │
//!          ▼                   ▼                    ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────────┐
//! │ Plugin Registry │ │    File Sets    │ │   Service Config    │
//! │ (awsiot,        │ │ (include and    │ │ (descriptors per    │
//! │  roscore)       │ │  exclude globs) │ │  service name)      │
//! └─────────────────┘ └─────────────────┘ └─────────────────────┘
//!          │
//!          ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │          CommandRunner / Fetcher (aws, openssl, HTTPS)    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use snapplug::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let project = Project::from_file("snapplug.yaml")?;
//!     let lifecycle = Lifecycle::new(".", Config::default());
//!
//!     let report = lifecycle.run(&project, &[])?;
//!     for part in &report.parts {
//!         println!("{}: {}", part.part, part.build.msg);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::lifecycle::{BuildReport, Lifecycle, PartEvent, PartReport};
    pub use crate::plugins::{
        Plugin, PluginContext, PluginError, PluginFactory, PluginOptions, PluginOutput,
        PluginRegistry, PluginResult,
    };
    pub use crate::project::{PartSpec, Project};
    pub use crate::runner::{CommandOutput, CommandRunner, Fetcher, Invocation};
    pub use crate::service::{ServiceConfig, ServiceDescriptor};
}

/// Error types and result aliases.
pub mod error;

/// Tool configuration: files, defaults and environment overrides.
pub mod config;

/// Project files declaring parts and their plugins.
pub mod project;

/// Subprocess and download access used by plugins.
pub mod runner;

/// Include/exclude file patterns.
pub mod fileset;

/// Service descriptors contributed by plugins.
pub mod service;

/// The plugin interface, option validation, registry and built-in plugins.
pub mod plugins;

/// Drives plugins through the build lifecycle.
pub mod lifecycle;

pub use error::{Error, Result};

/// Version of snapplug.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
