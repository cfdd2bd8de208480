// Floe: Orchestration for a Parallel Discrete-Event Network Simulator
// Copyright (C) 2026  The Floe Authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Configuration model and parser
//!
//! The configuration file is a YAML mapping with three reserved keys:
//!
//! - `simulation`: global simulation parameters ([`SimulationConfig`]),
//! - `topology`: must carry `filename`, the DOT graph resolved relative to
//!   the configuration file's directory,
//! - `site`: optional, currently unused.
//!
//! Every remaining top-level key declares one LP type ([`LpTypeConfig`]), in
//! declaration order. Inside an LP-type mapping, `type` selects the
//! [`ComponentKind`], `model` names the handler registered in the LP-type
//! registry (and selects a [`ModelKind`] by lookup against the known-family
//! table, falling back to [`ModelKind::Custom`]), `nodes` lists the graph
//! vertices belonging to this type (order defines each instance's relative
//! id), and any other scalar or sequence sub-key becomes a typed
//! [`Property`](crate::properties::Property) in the type's bag.

mod parser;

pub use parser::parse_config_file;

use crate::properties::PropertyBag;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::topology::{DotError, Topology};

/// The component kind of an LP type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// A switching element
    Switch,
    /// A routing element
    Router,
    /// An end host
    Host,
}

impl FromStr for ComponentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "switch" => Ok(ComponentKind::Switch),
            "router" => Ok(ComponentKind::Router),
            "host" => Ok(ComponentKind::Host),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Switch => write!(f, "switch"),
            ComponentKind::Router => write!(f, "router"),
            ComponentKind::Host => write!(f, "host"),
        }
    }
}

/// The known handler families, plus `Custom` for model names that match no
/// known family and `Unknown` for uninitialized slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Uninitialized
    Unknown,
    /// The shared-channel network family
    SimpleNet,
    /// The point-to-point latency/bandwidth network family
    SimpleP2p,
    /// The request/acknowledge server fixture
    SimpleServer,
    /// A model name that matches no known family; resolved through the
    /// custom tier of the registry.
    Custom,
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::Unknown
    }
}

/// Number of known handler families (the fixed tier of the registry).
pub const KNOWN_MODEL_COUNT: usize = 3;

impl ModelKind {
    /// Index into the known-family table, or `None` for `Custom`/`Unknown`.
    pub fn known_index(&self) -> Option<usize> {
        match self {
            ModelKind::SimpleNet => Some(0),
            ModelKind::SimpleP2p => Some(1),
            ModelKind::SimpleServer => Some(2),
            ModelKind::Unknown | ModelKind::Custom => None,
        }
    }

    /// Returns true for the network families (models wrapped by the
    /// model-net base LP).
    pub fn is_network(&self) -> bool {
        matches!(self, ModelKind::SimpleNet | ModelKind::SimpleP2p)
    }

    /// Resolve a model name against the fixed table of known names.
    pub fn from_model_name(name: &str) -> ModelKind {
        match name {
            "simplenet" => ModelKind::SimpleNet,
            "simplep2p" => ModelKind::SimpleP2p,
            "simple-server" => ModelKind::SimpleServer,
            _ => ModelKind::Custom,
        }
    }
}

/// Configuration of one declared LP type.
#[derive(Debug, Clone)]
pub struct LpTypeConfig {
    /// The top-level key that declared this type.
    pub name: String,
    /// Component kind (`switch`, `router` or `host`).
    pub kind: ComponentKind,
    /// Graph-side label (defaults to the declaring key).
    pub label: String,
    /// The model name, resolved through the LP-type registry.
    pub model_name: String,
    /// Model-type tag selected by looking `model_name` up against the table
    /// of known families.
    pub model_kind: ModelKind,
    /// Graph vertices belonging to this type; their order defines each
    /// instance's relative id.
    pub nodes: Vec<String>,
    /// Type-specific parameters.
    pub props: PropertyBag,
}

impl LpTypeConfig {
    /// The annotation of this type, if one was configured. Annotations are
    /// pass-through strings used for equality-based parameter dispatch.
    pub fn annotation(&self) -> Option<&str> {
        self.props.get_str("annotation")
    }
}

/// Global simulation parameters.
///
/// The recognized keys are parsed into typed fields; the full `simulation`
/// section (recognized keys included) is retained in [`SimulationConfig::bag`].
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Packet size in bytes (`packet_size`); 0 when unspecified.
    pub packet_size: u64,
    /// Size reserved for event payloads (`ross_message_size`). Validated but
    /// without effect on the embedded kernel, which transports typed
    /// payloads.
    pub ross_message_size: usize,
    /// Scheduler name (`modelnet_scheduler`), chosen from the fixed
    /// scheduler-name set.
    pub modelnet_scheduler: Option<String>,
    /// Latency matrix path for the point-to-point family
    /// (`net_latency_ns_file`), relative to the configuration file.
    pub net_latency_ns_file: Option<String>,
    /// Bandwidth matrix path for the point-to-point family
    /// (`net_bw_mbps_file`), relative to the configuration file.
    pub net_bw_mbps_file: Option<String>,
    /// Per-packet startup cost of the shared-channel family in nanoseconds
    /// (`net_startup_ns`).
    pub net_startup_ns: Option<f64>,
    /// Bandwidth of the shared-channel family in Mbit/s (`net_bw_mbps`).
    pub net_bw_mbps: Option<f64>,
    /// Ordered sequence of network-type names (`modelnet_order`); empty means
    /// declaration order.
    pub modelnet_order: Vec<String>,
    /// Node-local memory copy cost in ns per byte (`node_copy_ns_per_byte`).
    pub node_copy_ns_per_byte: f64,
    /// The raw `simulation` section.
    pub bag: PropertyBag,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            packet_size: 0,
            ross_message_size: 0,
            modelnet_scheduler: None,
            net_latency_ns_file: None,
            net_bw_mbps_file: None,
            net_startup_ns: None,
            net_bw_mbps: None,
            modelnet_order: Vec::new(),
            node_copy_ns_per_byte: 0.1,
            bag: PropertyBag::new("simulation"),
        }
    }
}

/// Everything the parser produces: the simulation parameters, the declared
/// LP types in declaration order, and the parsed topology graph.
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    /// Global simulation parameters.
    pub simulation: SimulationConfig,
    /// Declared LP types, in declaration order.
    pub lp_types: Vec<LpTypeConfig>,
    /// The parsed topology graph.
    pub topology: Topology,
    /// Directory of the configuration file; relative paths in the
    /// configuration resolve against it.
    pub config_dir: PathBuf,
}

/// Errors raised while reading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("cannot read configuration file {path}: {source}")]
    IoError {
        /// Path that could not be read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
    /// The configuration file is not valid YAML
    #[error("invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
    /// The top level of the configuration is not a mapping
    #[error("the top level of the configuration must be a mapping")]
    NotAMapping,
    /// The required `topology` block is missing
    #[error("missing required `topology` block")]
    MissingTopology,
    /// The `topology` block has no `filename` key
    #[error("the `topology` block must carry a `filename` string")]
    MissingTopologyFilename,
    /// The topology graph could not be parsed
    #[error("cannot read topology graph {path}: {source}")]
    TopologyError {
        /// Path of the graph file
        path: String,
        /// Underlying parse error
        source: DotError,
    },
    /// An LP-type definition is missing both `model` and `type`
    #[error("LP type `{section}` lacks both `model` and `type`")]
    MissingModelAndKind {
        /// The offending top-level key
        section: String,
    },
    /// An LP-type definition is missing its `type` key
    #[error("LP type `{section}` lacks the required `type` key")]
    MissingKind {
        /// The offending top-level key
        section: String,
    },
    /// An LP-type definition is missing its `model` key
    #[error("LP type `{section}` lacks the required `model` key")]
    MissingModel {
        /// The offending top-level key
        section: String,
    },
    /// The `type` key holds something other than `switch`, `router`, `host`
    #[error("LP type `{section}` has invalid component kind `{value}`")]
    InvalidComponentKind {
        /// The offending top-level key
        section: String,
        /// The value found
        value: String,
    },
    /// A vertex name appears in the `nodes` list of more than one LP type
    #[error("vertex `{vertex}` appears under both `{first}` and `{second}`")]
    DuplicateVertex {
        /// The vertex name
        vertex: String,
        /// First type claiming the vertex
        first: String,
        /// Second type claiming the vertex
        second: String,
    },
    /// A key holds a value of the wrong type
    #[error("key `{key}` in `{section}` must be {expected}")]
    WrongType {
        /// Enclosing section
        section: String,
        /// The offending key
        key: String,
        /// Description of the expected type
        expected: &'static str,
    },
    /// A value could not be turned into a property
    #[error("key `{key}` in `{section}` holds an unsupported value")]
    UnsupportedValue {
        /// Enclosing section
        section: String,
        /// The offending key
        key: String,
    },
}
