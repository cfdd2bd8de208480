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

//! The YAML walk that turns the configuration file into typed objects.

use super::{
    ComponentKind, ConfigError, LpTypeConfig, ModelKind, ParsedConfig, SimulationConfig,
};
use crate::properties::{Property, PropertyBag};
use crate::topology::parse_dot_file;

use log::*;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

/// Parse the configuration file at `path`, including the topology graph it
/// references. All errors are fatal at startup.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<ParsedConfig, ConfigError> {
    let path = path.as_ref();
    let text = read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    let doc: Value = serde_yaml::from_str(&text)?;
    let map = doc.as_mapping().ok_or(ConfigError::NotAMapping)?;
    let config_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let mut simulation = SimulationConfig::default();
    let mut topology_file: Option<String> = None;
    let mut lp_types: Vec<LpTypeConfig> = Vec::new();
    // vertex name -> claiming LP type, to reject duplicates
    let mut claimed: HashMap<String, String> = HashMap::new();

    for (key, value) in map {
        let key = key_str("<top-level>", key)?;
        match key {
            "simulation" => simulation = parse_simulation(value)?,
            "topology" => topology_file = Some(parse_topology_block(value)?),
            "site" => {
                // reserved; carries no simulation semantics
            }
            _ => lp_types.push(parse_lp_type(key, value, &mut claimed)?),
        }
    }

    let topology_file = topology_file.ok_or(ConfigError::MissingTopology)?;
    let graph_path = config_dir.join(&topology_file);
    let topology = parse_dot_file(&graph_path).map_err(|source| ConfigError::TopologyError {
        path: graph_path.display().to_string(),
        source,
    })?;

    info!(
        "parsed configuration: {} LP types, {} vertices, {} edges",
        lp_types.len(),
        topology.vertex_count(),
        topology.edge_count()
    );

    Ok(ParsedConfig { simulation, lp_types, topology, config_dir })
}

fn key_str<'a>(section: &str, key: &'a Value) -> Result<&'a str, ConfigError> {
    key.as_str().ok_or_else(|| ConfigError::WrongType {
        section: section.to_string(),
        key: format!("{:?}", key),
        expected: "a string key",
    })
}

fn parse_topology_block(value: &Value) -> Result<String, ConfigError> {
    let map = value.as_mapping().ok_or(ConfigError::MissingTopologyFilename)?;
    for (key, val) in map {
        if key.as_str() == Some("filename") {
            if let Some(filename) = val.as_str() {
                return Ok(filename.to_string());
            }
        }
    }
    Err(ConfigError::MissingTopologyFilename)
}

fn parse_simulation(value: &Value) -> Result<SimulationConfig, ConfigError> {
    let section = "simulation";
    let map = value.as_mapping().ok_or_else(|| ConfigError::WrongType {
        section: "<top-level>".to_string(),
        key: section.to_string(),
        expected: "a mapping",
    })?;

    let mut cfg = SimulationConfig::default();
    for (key, val) in map {
        let key = key_str(section, key)?;
        match key {
            "packet_size" => cfg.packet_size = uint_value(section, key, val)?,
            "ross_message_size" => cfg.ross_message_size = uint_value(section, key, val)? as usize,
            "modelnet_scheduler" => {
                cfg.modelnet_scheduler = Some(str_value(section, key, val)?.to_string())
            }
            "net_latency_ns_file" => {
                cfg.net_latency_ns_file = Some(str_value(section, key, val)?.to_string())
            }
            "net_bw_mbps_file" => {
                cfg.net_bw_mbps_file = Some(str_value(section, key, val)?.to_string())
            }
            "net_startup_ns" => cfg.net_startup_ns = Some(float_value(section, key, val)?),
            "net_bw_mbps" => cfg.net_bw_mbps = Some(float_value(section, key, val)?),
            "node_copy_ns_per_byte" => {
                cfg.node_copy_ns_per_byte = float_value(section, key, val)?
            }
            "modelnet_order" => cfg.modelnet_order = string_seq(section, key, val)?,
            _ => {}
        }
        if let Some(prop) = property_from(val) {
            cfg.bag.insert(key, prop);
        }
    }
    Ok(cfg)
}

fn parse_lp_type(
    name: &str,
    value: &Value,
    claimed: &mut HashMap<String, String>,
) -> Result<LpTypeConfig, ConfigError> {
    let map = value.as_mapping().ok_or_else(|| ConfigError::WrongType {
        section: "<top-level>".to_string(),
        key: name.to_string(),
        expected: "a mapping",
    })?;

    let mut kind: Option<ComponentKind> = None;
    let mut label: Option<String> = None;
    let mut model_name: Option<String> = None;
    let mut nodes: Vec<String> = Vec::new();
    let mut props = PropertyBag::new(name);

    for (key, val) in map {
        let key = key_str(name, key)?;
        match key {
            "type" => {
                let raw = str_value(name, key, val)?;
                kind = Some(raw.parse().map_err(|_| ConfigError::InvalidComponentKind {
                    section: name.to_string(),
                    value: raw.to_string(),
                })?);
            }
            "model" => model_name = Some(str_value(name, key, val)?.to_string()),
            "label" => label = Some(str_value(name, key, val)?.to_string()),
            "nodes" => nodes = string_seq(name, key, val)?,
            _ => match property_from(val) {
                Some(prop) => {
                    props.insert(key, prop);
                }
                None => {
                    return Err(ConfigError::UnsupportedValue {
                        section: name.to_string(),
                        key: key.to_string(),
                    })
                }
            },
        }
    }

    let (kind, model_name) = match (kind, model_name) {
        (Some(k), Some(m)) => (k, m),
        (None, None) => {
            return Err(ConfigError::MissingModelAndKind { section: name.to_string() })
        }
        (None, Some(_)) => return Err(ConfigError::MissingKind { section: name.to_string() }),
        (Some(_), None) => return Err(ConfigError::MissingModel { section: name.to_string() }),
    };

    for vertex in &nodes {
        if let Some(first) = claimed.insert(vertex.clone(), name.to_string()) {
            return Err(ConfigError::DuplicateVertex {
                vertex: vertex.clone(),
                first,
                second: name.to_string(),
            });
        }
    }

    let model_kind = ModelKind::from_model_name(&model_name);
    debug!("LP type `{}`: kind {}, model {} ({:?})", name, kind, model_name, model_kind);

    Ok(LpTypeConfig {
        name: name.to_string(),
        kind,
        label: label.unwrap_or_else(|| name.to_string()),
        model_name,
        model_kind,
        nodes,
        props,
    })
}

fn str_value<'a>(section: &str, key: &str, val: &'a Value) -> Result<&'a str, ConfigError> {
    val.as_str().ok_or_else(|| ConfigError::WrongType {
        section: section.to_string(),
        key: key.to_string(),
        expected: "a string",
    })
}

fn uint_value(section: &str, key: &str, val: &Value) -> Result<u64, ConfigError> {
    match val.as_u64() {
        Some(v) => Ok(v),
        None => Err(ConfigError::WrongType {
            section: section.to_string(),
            key: key.to_string(),
            expected: "a non-negative integer",
        }),
    }
}

fn float_value(section: &str, key: &str, val: &Value) -> Result<f64, ConfigError> {
    match val.as_f64() {
        Some(v) => Ok(v),
        None => Err(ConfigError::WrongType {
            section: section.to_string(),
            key: key.to_string(),
            expected: "a number",
        }),
    }
}

fn string_seq(section: &str, key: &str, val: &Value) -> Result<Vec<String>, ConfigError> {
    let seq = val.as_sequence().ok_or_else(|| ConfigError::WrongType {
        section: section.to_string(),
        key: key.to_string(),
        expected: "a sequence of names",
    })?;
    seq.iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or_else(|| ConfigError::WrongType {
                section: section.to_string(),
                key: key.to_string(),
                expected: "a sequence of names",
            })
        })
        .collect()
}

/// Turn a YAML scalar or sequence of scalars into a typed property.
///
/// Sequences infer their element type: integer if all elements are integers,
/// double if all are numeric, boolean if all are booleans, and string
/// otherwise. Mappings and nulls yield `None`.
fn property_from(val: &Value) -> Option<Property> {
    match val {
        Value::Bool(b) => Some(Property::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Property::Int(i))
            } else {
                n.as_f64().map(Property::Double)
            }
        }
        Value::String(s) => Some(Property::Str(s.clone())),
        Value::Sequence(seq) => sequence_property(seq),
        _ => None,
    }
}

fn sequence_property(seq: &[Value]) -> Option<Property> {
    if seq.iter().all(|v| v.as_i64().is_some()) {
        return Some(Property::IntVec(seq.iter().map(|v| v.as_i64().unwrap()).collect()));
    }
    if seq.iter().all(|v| v.as_f64().is_some()) {
        return Some(Property::DoubleVec(seq.iter().map(|v| v.as_f64().unwrap()).collect()));
    }
    if seq.iter().all(|v| v.as_bool().is_some()) {
        return Some(Property::BoolVec(seq.iter().map(|v| v.as_bool().unwrap()).collect()));
    }
    // fall back to strings; reject sequences containing nested collections
    let mut out = Vec::with_capacity(seq.len());
    for v in seq {
        match v {
            Value::String(s) => out.push(s.clone()),
            Value::Bool(b) => out.push(b.to_string()),
            Value::Number(n) => out.push(n.to_string()),
            _ => return None,
        }
    }
    Some(Property::StrVec(out))
}
