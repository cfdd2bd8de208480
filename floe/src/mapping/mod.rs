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

//! # The graph-derived mapper
//!
//! The [`Mapper`] owns the vertex table built from the topology graph and the
//! LP-type configurations. It assigns every vertex a dense global id in
//! traversal order (subgraphs in declaration order, vertices within each
//! subgraph in declaration order, unseen edge targets immediately after their
//! source), computes the LP-to-execution-unit block partition, and answers
//! every identity and neighbor query the other components need at runtime.
//!
//! Neighbor sequences hold integer indices into the same flat vertex table,
//! so the table carries no ownership cycles and the offset of a neighbor in a
//! vertex's sequence is a stable handle for the entire run.
//!
//! ## Partitioning
//!
//! With `N` vertices and `P` execution units, `floor = N / P` and
//! `rem = N mod P`: unit `u < rem` owns `floor + 1` LPs, every other unit
//! owns `floor`, and the ids owned by unit `u` form the contiguous range
//! `[u·floor + min(u, rem), (u+1)·floor + min(u+1, rem))`. The partition is
//! deterministic given `(N, P)`, and the inverses implemented by
//! [`Mapper::global_to_unit`] and [`Mapper::local_slot`] are exact.

pub mod context;

use crate::config::{ComponentKind, LpTypeConfig};
use crate::pdes::{Gid, Kernel};
use crate::registry::{LpTypeRegistry, RegistryError};
use crate::topology::Topology;

use log::*;
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;

/// One row of the vertex table.
#[derive(Debug, Clone)]
pub struct VertexRecord {
    /// Dense global id, assigned in traversal order.
    pub gid: Gid,
    /// The vertex name from the topology graph.
    pub name: String,
    /// Index into the LP-type-configuration list.
    pub type_idx: usize,
    /// Position of this vertex in its type's vertex-name list.
    pub rel_id: usize,
    /// Indices (into the vertex table) of the neighbors, in edge declaration
    /// order. Each undirected edge contributes exactly one entry per
    /// endpoint.
    pub neighbors: Vec<usize>,
}

/// The vertex table, the partition, and all identity/neighbor queries.
#[derive(Debug, Clone)]
pub struct Mapper {
    vertices: Vec<VertexRecord>,
    by_name: HashMap<String, Gid>,
    type_names: Vec<String>,
    type_members: Vec<Vec<Gid>>,
    num_units: usize,
    unit_floor: u64,
    unit_rem: u64,
    seed_offset: u64,
}

impl Mapper {
    /// Build the vertex table and the name→id index from the parsed graph
    /// and the LP-type configurations.
    pub fn build(topology: &Topology, lp_configs: &[LpTypeConfig]) -> Result<Self, MappingError> {
        // index every configured vertex name
        let mut name_info: HashMap<&str, (usize, usize)> = HashMap::new();
        for (t, cfg) in lp_configs.iter().enumerate() {
            for (rel, name) in cfg.nodes.iter().enumerate() {
                name_info.insert(name.as_str(), (t, rel));
            }
        }

        let n = topology.vertex_count();
        let mut vertices: Vec<VertexRecord> = Vec::with_capacity(n);
        let mut by_name: HashMap<String, Gid> = HashMap::with_capacity(n);
        // graph index -> table index, in traversal order
        let mut table_idx: HashMap<usize, usize> = HashMap::with_capacity(n);

        let append = |v: crate::topology::VertexId,
                          vertices: &mut Vec<VertexRecord>,
                          by_name: &mut HashMap<String, Gid>,
                          table_idx: &mut HashMap<usize, usize>|
         -> Result<(), MappingError> {
            let name = topology.vertex_name(v);
            let (type_idx, rel_id) = *name_info
                .get(name)
                .ok_or_else(|| MappingError::VertexWithoutType { name: name.to_string() })?;
            let gid = vertices.len() as Gid;
            by_name.insert(name.to_string(), gid);
            table_idx.insert(v.index(), vertices.len());
            vertices.push(VertexRecord {
                gid,
                name: name.to_string(),
                type_idx,
                rel_id,
                neighbors: Vec::new(),
            });
            Ok(())
        };

        // first walk: subgraphs in declaration order, vertices within each in
        // declaration order, unseen edge targets immediately after their
        // source
        for group in topology.groups() {
            for &v in group.vertices() {
                if !table_idx.contains_key(&v.index()) {
                    append(v, &mut vertices, &mut by_name, &mut table_idx)?;
                }
                for &w in topology.out_edges(v) {
                    if !table_idx.contains_key(&w.index()) {
                        append(w, &mut vertices, &mut by_name, &mut table_idx)?;
                    }
                }
            }
        }
        assert_eq!(vertices.len(), n, "vertex traversal must process every vertex");

        // second walk: each undirected edge appends each endpoint to the
        // other's neighbor sequence exactly once
        for &(a, b) in topology.edges() {
            let ia = table_idx[&a.index()];
            let ib = table_idx[&b.index()];
            vertices[ia].neighbors.push(ib);
            vertices[ib].neighbors.push(ia);
        }

        // relative-id index: position in the type's vertex-name list
        let mut type_names = Vec::with_capacity(lp_configs.len());
        let mut type_members = Vec::with_capacity(lp_configs.len());
        for cfg in lp_configs {
            let mut members = Vec::with_capacity(cfg.nodes.len());
            for name in &cfg.nodes {
                let gid = by_name.get(name).copied().ok_or_else(|| {
                    MappingError::ConfigVertexNotInGraph {
                        vertex: name.clone(),
                        section: cfg.name.clone(),
                    }
                })?;
                members.push(gid);
            }
            type_names.push(cfg.name.clone());
            type_members.push(members);
        }

        debug!("built vertex table with {} records", vertices.len());

        Ok(Self {
            vertices,
            by_name,
            type_names,
            type_members,
            num_units: 1,
            unit_floor: n as u64,
            unit_rem: 0,
            seed_offset: 0,
        })
    }

    /// Compute the per-unit LP counts for `num_units` execution units.
    /// `seed_offset` shifts the per-LP random seeds.
    pub fn setup(&mut self, num_units: usize, seed_offset: u64) -> Result<(), MappingError> {
        if num_units == 0 {
            return Err(MappingError::InvalidUnitCount);
        }
        let n = self.vertices.len() as u64;
        self.num_units = num_units;
        self.unit_floor = n / num_units as u64;
        self.unit_rem = n % num_units as u64;
        self.seed_offset = seed_offset;
        info!(
            "partitioned {} LPs over {} units (floor {}, rem {})",
            n, num_units, self.unit_floor, self.unit_rem
        );
        Ok(())
    }

    /// Bind the LPs of `unit` to the kernel, resolving each LP's handler
    /// table through the registry. The kernel requires units to be bound in
    /// order, so global ids and kernel slots coincide.
    pub fn init_unit(
        &self,
        unit: usize,
        lp_configs: &[LpTypeConfig],
        registry: &LpTypeRegistry,
        kernel: &mut Kernel,
    ) -> Result<(), RegistryError> {
        for gid in self.unit_range(unit) {
            let rec = &self.vertices[gid as usize];
            let entry = registry.lookup(&lp_configs[rec.type_idx])?;
            kernel.bind_lp(gid, entry.lp_type, self.seed_offset + gid);
        }
        Ok(())
    }

    /// Number of vertices (equal to the number of LPs).
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of execution units configured by [`Mapper::setup`].
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    /// The full vertex record for a global id.
    pub fn vertex(&self, gid: Gid) -> &VertexRecord {
        &self.vertices[gid as usize]
    }

    /// The global ids owned by `unit`, as a contiguous range.
    pub fn unit_range(&self, unit: usize) -> Range<Gid> {
        let u = unit as u64;
        let start = u * self.unit_floor + u.min(self.unit_rem);
        let end = (u + 1) * self.unit_floor + (u + 1).min(self.unit_rem);
        start..end
    }

    /// Number of LPs owned by `unit`.
    pub fn owned(&self, unit: usize) -> u64 {
        self.unit_floor + if (unit as u64) < self.unit_rem { 1 } else { 0 }
    }

    /// Inverse of the partition formula: the unit owning `gid`.
    pub fn global_to_unit(&self, gid: Gid) -> usize {
        let cut = self.unit_rem * (self.unit_floor + 1);
        if gid < cut {
            (gid / (self.unit_floor + 1)) as usize
        } else {
            (self.unit_rem + (gid - cut) / self.unit_floor) as usize
        }
    }

    /// The local slot index of `gid` on its owning unit.
    pub fn local_slot(&self, gid: Gid) -> usize {
        let unit = self.global_to_unit(gid) as u64;
        (gid - (unit * self.unit_floor + unit.min(self.unit_rem))) as usize
    }

    /// The LP-type name of `gid`.
    pub fn type_name(&self, gid: Gid) -> &str {
        &self.type_names[self.vertices[gid as usize].type_idx]
    }

    /// The LP-type name of `gid` together with its offset within the type.
    pub fn type_info(&self, gid: Gid) -> (&str, usize) {
        let rec = &self.vertices[gid as usize];
        (&self.type_names[rec.type_idx], rec.rel_id)
    }

    /// Number of distinct LP types.
    pub fn num_lp_types(&self) -> usize {
        self.type_names.len()
    }

    /// LP-type name by type index.
    pub fn type_name_by_index(&self, idx: usize) -> &str {
        &self.type_names[idx]
    }

    /// Number of LPs of the given type (0 for unknown type names).
    pub fn count_of_type(&self, type_name: &str) -> usize {
        match self.type_index(type_name) {
            Some(t) => self.type_members[t].len(),
            None => 0,
        }
    }

    /// The global id of the `relative_id`-th LP of the given type.
    pub fn gid_of(&self, type_name: &str, relative_id: usize) -> Result<Gid, MappingError> {
        let t = self
            .type_index(type_name)
            .ok_or_else(|| MappingError::UnknownType { name: type_name.to_string() })?;
        self.type_members[t].get(relative_id).copied().ok_or_else(|| {
            MappingError::RelativeIdOutOfRange {
                name: type_name.to_string(),
                relative_id,
                count: self.type_members[t].len(),
            }
        })
    }

    /// Position of `gid` within its type's declaration list.
    pub fn relative_id_of(&self, gid: Gid) -> usize {
        self.vertices[gid as usize].rel_id
    }

    /// The global id of a vertex by name.
    pub fn gid_by_name(&self, name: &str) -> Option<Gid> {
        self.by_name.get(name).copied()
    }

    /// Number of neighbors of `sender_gid` whose type matches `dest_type`.
    pub fn neighbor_count(&self, sender_gid: Gid, dest_type: &str) -> usize {
        let t = match self.type_index(dest_type) {
            Some(t) => t,
            None => return 0,
        };
        self.vertices[sender_gid as usize]
            .neighbors
            .iter()
            .filter(|&&n| self.vertices[n].type_idx == t)
            .count()
    }

    /// Number of neighbors of `sender_gid` whose component kind matches
    /// `kind`.
    pub fn neighbor_count_by_kind(
        &self,
        sender_gid: Gid,
        lp_configs: &[LpTypeConfig],
        kind: ComponentKind,
    ) -> usize {
        self.vertices[sender_gid as usize]
            .neighbors
            .iter()
            .filter(|&&n| lp_configs[self.vertices[n].type_idx].kind == kind)
            .count()
    }

    /// The `k`-th neighbor of `sender_gid` whose type matches `dest_type`.
    ///
    /// `k` is taken literally; wrapping it modulo the neighbor count is the
    /// business of the [mapping context](context::MapContext), never of the
    /// mapper.
    pub fn neighbor_gid(
        &self,
        sender_gid: Gid,
        dest_type: &str,
        k: usize,
    ) -> Result<Gid, MappingError> {
        let t = self
            .type_index(dest_type)
            .ok_or_else(|| MappingError::UnknownType { name: dest_type.to_string() })?;
        let rec = &self.vertices[sender_gid as usize];
        let mut seen = 0;
        for &n in &rec.neighbors {
            if self.vertices[n].type_idx == t {
                if seen == k {
                    return Ok(self.vertices[n].gid);
                }
                seen += 1;
            }
        }
        if seen == 0 {
            Err(MappingError::NoNeighborOfType {
                sender: sender_gid,
                dest_type: dest_type.to_string(),
            })
        } else {
            Err(MappingError::NeighborOffsetOutOfRange {
                sender: sender_gid,
                dest_type: dest_type.to_string(),
                k,
                count: seen,
            })
        }
    }

    fn type_index(&self, type_name: &str) -> Option<usize> {
        self.type_names.iter().position(|n| n == type_name)
    }
}

/// Errors raised while building the vertex table or answering queries
#[derive(Debug, Error, PartialEq)]
pub enum MappingError {
    /// A graph vertex belongs to no LP-type configuration
    #[error("vertex `{name}` does not appear in any LP type's vertex list")]
    VertexWithoutType {
        /// The vertex name
        name: String,
    },
    /// An LP-type configuration lists a vertex that the graph does not have
    #[error("LP type `{section}` lists vertex `{vertex}` which is not in the graph")]
    ConfigVertexNotInGraph {
        /// The vertex name
        vertex: String,
        /// The LP-type configuration naming it
        section: String,
    },
    /// Query for an unknown LP-type name
    #[error("unknown LP type `{name}`")]
    UnknownType {
        /// The type name
        name: String,
    },
    /// Relative id beyond the type's instance count
    #[error("LP type `{name}` has {count} instances, relative id {relative_id} out of range")]
    RelativeIdOutOfRange {
        /// The type name
        name: String,
        /// The requested relative id
        relative_id: usize,
        /// The number of instances
        count: usize,
    },
    /// A sender has no neighbor of the requested type
    #[error("LP {sender} has no neighbor of type `{dest_type}`")]
    NoNeighborOfType {
        /// The sender's global id
        sender: Gid,
        /// The requested destination type
        dest_type: String,
    },
    /// A neighbor offset beyond the matching-neighbor count
    #[error("LP {sender} has {count} neighbors of type `{dest_type}`, offset {k} out of range")]
    NeighborOffsetOutOfRange {
        /// The sender's global id
        sender: Gid,
        /// The requested destination type
        dest_type: String,
        /// The requested offset
        k: usize,
        /// The number of matching neighbors
        count: usize,
    },
    /// `setup` was called with zero execution units
    #[error("the execution-unit count must be at least 1")]
    InvalidUnitCount,
}
