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

#![deny(missing_docs)]

//! # Floe: Orchestration for a Parallel Discrete-Event Network Simulator
//!
//! Floe turns a declarative network description (a YAML file naming LP types and
//! their parameters, plus a DOT topology graph) into a running discrete-event
//! simulation: one logical process (LP) per graph vertex, block-partitioned over
//! parallel execution units, with every "network" vertex running a
//! packet-scheduling base LP that wraps a concrete network family.
//!
//! ## Structure
//!
//! - **[`properties`]**: typed key→value store ([`properties::PropertyBag`])
//!   used wherever a map of heterogeneous configuration values is needed.
//!
//! - **[`config`]**: the configuration parser. Reads the YAML description and
//!   the topology graph it references, and produces a
//!   [`SimulationConfig`](config::SimulationConfig) together with one
//!   [`LpTypeConfig`](config::LpTypeConfig) per declared LP type.
//!
//! - **[`topology`]**: a small parser for the DOT subset floe needs (named
//!   vertices, undirected `--` edges, optional `subgraph` groupings).
//!
//! - **[`mapping`]**: the [`Mapper`](mapping::Mapper), which owns the vertex
//!   table, computes the LP-to-unit partition, and answers every identity and
//!   neighbor query at runtime. [`mapping::context::MapContext`] translates
//!   logical addressing intent ("send to a destination of type T") into a
//!   concrete LP id.
//!
//! - **[`registry`]**: the two-tier LP-type registry, mapping known model
//!   families and custom names to their handler tables.
//!
//! - **[`pdes`]**: the embedded sequential PDES kernel: a timestamp-ordered
//!   event queue, per-LP reversible random streams, and synthetic rollback
//!   support used to exercise the reverse-computation contract.
//!
//! - **[`model_net`]**: the packet pipeline. Every LP whose model names a
//!   network family is an instance of the base LP in
//!   [`model_net::base`], which fragments messages into packets, sequences
//!   them through per-queue schedulers ([`model_net::sched`]), and dispatches
//!   to the family ([`model_net::simple_net`] or [`model_net::simple_p2p`])
//!   through the [`Method`](model_net::method::Method) table.
//!
//! - **[`orchestrator`]**: lifecycle glue. Owns the parsed configuration, the
//!   mapper, the registry and the model-net tables as one
//!   [`Runtime`](orchestrator::Runtime) value, drives the setup sequence, and
//!   bridges the kernel callbacks.
//!
//! - **[`models`]**: application LPs used as test fixtures (a simple
//!   request/acknowledge server).
//!
//! ## Usage
//!
//! ```no_run
//! use floe::orchestrator::{Orchestrator, RunOptions};
//!
//! fn main() -> Result<(), floe::Error> {
//!     let mut orch =
//!         Orchestrator::configure("network.yml", RunOptions::default(), |_registry| {})?;
//!     orch.run()?;
//!     let report = orch.report()?;
//!     println!("{:#?}", report);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod lp_io;
pub mod mapping;
pub mod model_net;
pub mod models;
pub mod orchestrator;
pub mod pdes;
pub mod properties;
pub mod registry;
pub mod topology;

mod error;
mod test;

pub use error::Error;
pub use pdes::{Gid, SimTime};
