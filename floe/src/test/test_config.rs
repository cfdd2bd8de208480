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

use super::common::{ring_yaml, write_workspace, RING_DOT};
use crate::config::{parse_config_file, ComponentKind, ConfigError, ModelKind};
use crate::properties::Property;

#[test]
fn parse_ring_configuration() {
    let (_dir, config) = write_workspace(&ring_yaml("fcfs", 2, false), "ring.dot", RING_DOT);
    let parsed = parse_config_file(&config).unwrap();

    assert_eq!(parsed.simulation.packet_size, 512);
    assert_eq!(parsed.simulation.modelnet_scheduler.as_deref(), Some("fcfs"));
    assert_eq!(parsed.simulation.net_startup_ns, Some(100.0));
    assert_eq!(parsed.simulation.net_bw_mbps, Some(1000.0));
    assert_eq!(parsed.simulation.modelnet_order, vec!["simplenet".to_string()]);
    assert_eq!(parsed.topology.vertex_count(), 6);

    // declaration order of the LP types is preserved
    assert_eq!(parsed.lp_types.len(), 2);
    let server = &parsed.lp_types[0];
    assert_eq!(server.name, "server");
    assert_eq!(server.kind, ComponentKind::Host);
    assert_eq!(server.model_name, "simple-server");
    assert_eq!(server.model_kind, ModelKind::SimpleServer);
    assert_eq!(server.nodes, vec!["h0", "h1", "h2"]);
    assert_eq!(server.props.get_int("num_requests"), Some(2));
    assert_eq!(server.props.get_bool("notify_end"), Some(false));

    let nic = &parsed.lp_types[1];
    assert_eq!(nic.kind, ComponentKind::Switch);
    assert_eq!(nic.model_kind, ModelKind::SimpleNet);
}

#[test]
fn vector_properties_infer_their_element_type() {
    let yaml = "\
topology:
  filename: ring.dot
server:
  type: host
  model: simple-server
  ints: [1, 2, 3]
  doubles: [1, 2.5]
  strings: [a, 2, b]
  nodes: [h0, h1, h2]
nic:
  type: switch
  model: simplenet
  nodes: [n0, n1, n2]
";
    let (_dir, config) = write_workspace(yaml, "ring.dot", RING_DOT);
    let parsed = parse_config_file(&config).unwrap();
    let props = &parsed.lp_types[0].props;
    assert_eq!(props.get("ints"), Some(&Property::IntVec(vec![1, 2, 3])));
    assert_eq!(props.get("doubles"), Some(&Property::DoubleVec(vec![1.0, 2.5])));
    assert_eq!(
        props.get("strings"),
        Some(&Property::StrVec(vec!["a".to_string(), "2".to_string(), "b".to_string()]))
    );
}

#[test]
fn missing_topology_block_is_fatal() {
    let yaml = "\
server:
  type: host
  model: simple-server
  nodes: [h0]
";
    let (_dir, config) = write_workspace(yaml, "ring.dot", RING_DOT);
    assert!(matches!(parse_config_file(&config), Err(ConfigError::MissingTopology)));
}

#[test]
fn missing_graph_file_is_fatal() {
    let yaml = "\
topology:
  filename: nowhere.dot
server:
  type: host
  model: simple-server
  nodes: [h0]
";
    let (_dir, config) = write_workspace(yaml, "ring.dot", RING_DOT);
    assert!(matches!(parse_config_file(&config), Err(ConfigError::TopologyError { .. })));
}

#[test]
fn duplicate_vertex_is_fatal() {
    let yaml = "\
topology:
  filename: ring.dot
server:
  type: host
  model: simple-server
  nodes: [h0, h1]
other:
  type: host
  model: simple-server
  nodes: [h1]
";
    let (_dir, config) = write_workspace(yaml, "ring.dot", RING_DOT);
    match parse_config_file(&config) {
        Err(ConfigError::DuplicateVertex { vertex, first, second }) => {
            assert_eq!(vertex, "h1");
            assert_eq!(first, "server");
            assert_eq!(second, "other");
        }
        other => panic!("expected DuplicateVertex, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn lp_type_requires_model_and_kind() {
    let both = "\
topology:
  filename: ring.dot
server:
  nodes: [h0]
";
    let (_dir, config) = write_workspace(both, "ring.dot", RING_DOT);
    assert!(matches!(
        parse_config_file(&config),
        Err(ConfigError::MissingModelAndKind { .. })
    ));

    let no_model = "\
topology:
  filename: ring.dot
server:
  type: host
  nodes: [h0]
";
    let (_dir, config) = write_workspace(no_model, "ring.dot", RING_DOT);
    assert!(matches!(parse_config_file(&config), Err(ConfigError::MissingModel { .. })));

    let no_kind = "\
topology:
  filename: ring.dot
server:
  model: simple-server
  nodes: [h0]
";
    let (_dir, config) = write_workspace(no_kind, "ring.dot", RING_DOT);
    assert!(matches!(parse_config_file(&config), Err(ConfigError::MissingKind { .. })));
}

#[test]
fn invalid_component_kind_names_the_section() {
    let yaml = "\
topology:
  filename: ring.dot
server:
  type: mainframe
  model: simple-server
  nodes: [h0]
";
    let (_dir, config) = write_workspace(yaml, "ring.dot", RING_DOT);
    match parse_config_file(&config) {
        Err(ConfigError::InvalidComponentKind { section, value }) => {
            assert_eq!(section, "server");
            assert_eq!(value, "mainframe");
        }
        other => panic!("expected InvalidComponentKind, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_model_names_fall_back_to_custom() {
    let yaml = "\
topology:
  filename: ring.dot
nic:
  type: switch
  model: exotic-fabric
  nodes: [h0, h1, h2, n0, n1, n2]
";
    let (_dir, config) = write_workspace(yaml, "ring.dot", RING_DOT);
    let parsed = parse_config_file(&config).unwrap();
    assert_eq!(parsed.lp_types[0].model_kind, ModelKind::Custom);
}
