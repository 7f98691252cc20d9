//! Service descriptors contributed by plugins.
//!
//! A [`ServiceConfig`] is the mapping the packaging host writes into the
//! package metadata. Plugins insert [`ServiceDescriptor`]s keyed by service
//! name. Serialized shape:
//!
//! ```yaml
//! mypkg-rosmaster:
//!   start: bin/mypkg-rosmaster-service
//!   description: ROS Master service
//!   ports:
//!     internal:
//!       rosmaster:
//!         port: 11311/tcp
//!         negotiable: false
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Transport protocol of a port binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// A `<number>/<protocol>` port specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortSpec {
    pub number: u16,
    pub protocol: Protocol,
}

impl PortSpec {
    pub fn tcp(number: u16) -> Self {
        Self {
            number,
            protocol: Protocol::Tcp,
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.protocol)
    }
}

impl FromStr for PortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, protocol) = s
            .split_once('/')
            .ok_or_else(|| format!("port '{}' must look like <number>/<protocol>", s))?;
        let number = number
            .parse()
            .map_err(|_| format!("invalid port number in '{}'", s))?;
        let protocol = match protocol {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            other => return Err(format!("unsupported protocol '{}'", other)),
        };
        Ok(Self { number, protocol })
    }
}

impl Serialize for PortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A named port a service listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub port: PortSpec,
    /// Whether the host may remap the port number
    pub negotiable: bool,
}

/// Ports grouped by exposure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub internal: IndexMap<String, PortBinding>,
}

/// One long-running service inside the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Launcher path relative to the package root
    pub start: String,
    pub description: String,
    #[serde(default)]
    pub ports: Ports,
}

impl ServiceDescriptor {
    pub fn new(start: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            description: description.into(),
            ports: Ports::default(),
        }
    }

    /// Add an internal port binding.
    pub fn with_internal_port(
        mut self,
        name: impl Into<String>,
        port: PortSpec,
        negotiable: bool,
    ) -> Self {
        self.ports
            .internal
            .insert(name.into(), PortBinding { port, negotiable });
        self
    }
}

/// Services collected from every part, in contribution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceConfig {
    services: IndexMap<String, ServiceDescriptor>,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a service. Returns the descriptor it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        descriptor: ServiceDescriptor,
    ) -> Option<ServiceDescriptor> {
        self.services.insert(name.into(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ServiceDescriptor)> {
        self.services.iter()
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
