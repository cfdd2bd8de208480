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

//! Shared helpers for the test suite: temp-dir workspaces holding a
//! configuration file and its topology graph.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write a configuration file and one sibling topology file into a fresh
/// temporary directory. Returns the directory guard and the config path.
pub fn write_workspace(yaml: &str, dot_name: &str, dot: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(dot_name), dot).unwrap();
    let config = dir.path().join("network.yml");
    fs::write(&config, yaml).unwrap();
    (dir, config)
}

/// Like [`write_workspace`], with extra sibling files (e.g. matrices).
pub fn write_workspace_with(
    yaml: &str,
    files: &[(&str, &str)],
) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let config = dir.path().join("network.yml");
    fs::write(&config, yaml).unwrap();
    (dir, config)
}

/// Three hosts connected pairwise through their NICs.
pub const RING_DOT: &str = "\
graph ring {
  h0 -- n0;
  h1 -- n1;
  h2 -- n2;
  n0 -- n1;
  n1 -- n2;
  n2 -- n0;
}
";

/// The ring scenario over the shared-channel family.
pub fn ring_yaml(scheduler: &str, num_requests: u64, notify_end: bool) -> String {
    format!(
        "\
simulation:
  packet_size: 512
  modelnet_scheduler: {}
  net_startup_ns: 100.0
  net_bw_mbps: 1000.0
  modelnet_order: [simplenet]
topology:
  filename: ring.dot
server:
  type: host
  model: simple-server
  num_requests: {}
  request_size: 4096
  notify_end: {}
  nodes: [h0, h1, h2]
nic:
  type: switch
  model: simplenet
  nodes: [n0, n1, n2]
",
        scheduler, num_requests, notify_end
    )
}
