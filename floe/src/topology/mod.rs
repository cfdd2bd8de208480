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

//! The topology graph: named vertices, undirected edges, and optional vertex
//! groupings parsed from a DOT file.
//!
//! Subgraph groupings are a visual hint only; they influence the traversal
//! order of the [`Mapper`](crate::mapping::Mapper) (declaration order is
//! identity-bearing) but carry no semantics of their own. Adjacency is kept
//! in declaration order, since neighbor offsets are stable handles used by
//! the packet schedulers for the entire run.

mod dot_parser;

pub use dot_parser::{parse_dot_file, parse_dot_str, DotError};

use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// Index of a vertex inside the parsed graph.
pub type VertexId = NodeIndex<u32>;

/// A declaration-ordered group of vertices (a DOT `subgraph`, or the implicit
/// root group for statements outside of any subgraph).
#[derive(Debug, Clone)]
pub struct VertexGroup {
    /// The subgraph label, if one was given. `None` for the root group.
    pub label: Option<String>,
    pub(crate) vertices: Vec<VertexId>,
}

impl VertexGroup {
    /// The vertices declared in this group, in declaration order.
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }
}

/// An undirected topology graph with uniquely named vertices.
#[derive(Debug, Clone)]
pub struct Topology {
    name: String,
    graph: UnGraph<String, ()>,
    groups: Vec<VertexGroup>,
    adjacency: Vec<Vec<VertexId>>,
    edge_list: Vec<(VertexId, VertexId)>,
    lookup: HashMap<String, VertexId>,
}

impl Topology {
    fn new(name: String) -> Self {
        Self {
            name,
            graph: UnGraph::new_undirected(),
            groups: vec![VertexGroup { label: None, vertices: Vec::new() }],
            adjacency: Vec::new(),
            edge_list: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// The name given in the `graph <name> {` header (may be empty).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Total number of (undirected) edges.
    pub fn edge_count(&self) -> usize {
        self.edge_list.len()
    }

    /// All vertex groups in declaration order. The first group is the
    /// implicit root group; it may be empty.
    pub fn groups(&self) -> &[VertexGroup] {
        &self.groups
    }

    /// The name of a vertex.
    pub fn vertex_name(&self, v: VertexId) -> &str {
        &self.graph[v]
    }

    /// Look up a vertex by name.
    pub fn vertex_by_name(&self, name: &str) -> Option<VertexId> {
        self.lookup.get(name).copied()
    }

    /// The neighbors of `v` in edge declaration order.
    pub fn out_edges(&self, v: VertexId) -> &[VertexId] {
        &self.adjacency[v.index()]
    }

    /// All undirected edges in declaration order.
    pub fn edges(&self) -> &[(VertexId, VertexId)] {
        &self.edge_list
    }

    /// The underlying petgraph graph.
    pub fn graph(&self) -> &UnGraph<String, ()> {
        &self.graph
    }

    /// Intern a vertex into the group at `group_idx`, returning its index.
    /// Re-interning an existing name is a no-op.
    fn intern(&mut self, name: &str, group_idx: usize) -> VertexId {
        if let Some(idx) = self.lookup.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.adjacency.push(Vec::new());
        self.lookup.insert(name.to_string(), idx);
        self.groups[group_idx].vertices.push(idx);
        idx
    }

    /// Add an undirected edge; duplicates are silently ignored.
    fn add_edge(&mut self, a: VertexId, b: VertexId) {
        if self.graph.find_edge(a, b).is_some() {
            // ignoring the duplicate link
            return;
        }
        self.graph.add_edge(a, b, ());
        self.adjacency[a.index()].push(b);
        self.adjacency[b.index()].push(a);
        self.edge_list.push((a, b));
    }
}
