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

//! # The mapping context
//!
//! A [`MapContext`] describes how "send to a destination of type T" resolves
//! to a concrete neighbor. Every variant except [`MapContext::GlobalDirect`]
//! goes through the mapper's neighbor queries; the context itself never holds
//! a raw global id otherwise.
//!
//! The base offset is fixed at 0: a terminal is connected to exactly one
//! network LP in the topologies handled here. Richer topologies must revisit
//! the offset selection before handling hosts of degree greater than one.

use super::{Mapper, MappingError};
use crate::pdes::Gid;

/// Translation policy from logical addressing intent to a concrete LP id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapContext {
    /// Use the carried global id unchanged.
    GlobalDirect(Gid),
    /// Pick neighbor index `0 mod n` (or its mirror when `reverse` is set),
    /// where `n` is the number of matching neighbors of the sender.
    GroupModulo {
        /// Mirror the picked index (`n - 1 - k`).
        reverse: bool,
    },
    /// Pick an index proportional to the ratio of the sender-type count to
    /// the destination-type count: `min(rel·n_dst/n_src, n_dst − 1)`,
    /// interpreted modulo the matching-neighbor count.
    GroupRatio {
        /// Mirror the picked index.
        reverse: bool,
    },
    /// Use the carried offset literally as the neighbor index.
    GroupDirect {
        /// The literal neighbor offset.
        offset: usize,
    },
}

impl Default for MapContext {
    fn default() -> Self {
        MapContext::GroupModulo { reverse: false }
    }
}

impl MapContext {
    /// Resolve the destination LP of type `dest_type` for `sender`.
    pub fn resolve(
        &self,
        mapper: &Mapper,
        dest_type: &str,
        sender: Gid,
    ) -> Result<Gid, MappingError> {
        match self {
            MapContext::GlobalDirect(gid) => Ok(*gid),
            MapContext::GroupModulo { reverse } => {
                let n = matching_neighbors(mapper, dest_type, sender)?;
                // single-connection hosts: base offset 0
                let mut k = 0 % n;
                if *reverse {
                    k = n - 1 - k;
                }
                mapper.neighbor_gid(sender, dest_type, k)
            }
            MapContext::GroupRatio { reverse } => {
                let n = matching_neighbors(mapper, dest_type, sender)?;
                let (sender_type, rel) = mapper.type_info(sender);
                let n_src = mapper.count_of_type(sender_type);
                let mut k = if n_src <= n { rel } else { (rel * n / n_src).min(n - 1) };
                k %= n;
                if *reverse {
                    k = n - 1 - k;
                }
                mapper.neighbor_gid(sender, dest_type, k)
            }
            MapContext::GroupDirect { offset } => mapper.neighbor_gid(sender, dest_type, *offset),
        }
    }
}

fn matching_neighbors(
    mapper: &Mapper,
    dest_type: &str,
    sender: Gid,
) -> Result<usize, MappingError> {
    match mapper.neighbor_count(sender, dest_type) {
        0 => Err(MappingError::NoNeighborOfType { sender, dest_type: dest_type.to_string() }),
        n => Ok(n),
    }
}
