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

//! # The orchestrator
//!
//! Lifecycle glue between the configuration, the mapper, the LP-type
//! registry, the model-net layer, and the kernel. The lifecycle is
//! `configure → run → report`; teardown is ordinary drop.
//!
//! There are no process-wide singletons: [`Orchestrator::configure`] builds a
//! single [`Runtime`] value, and every kernel callback receives it by
//! reference. After configure the runtime is read-only; per-LP state lives
//! in the kernel and is private to its owning unit.

use crate::config::{self, LpTypeConfig, ParsedConfig, SimulationConfig};
use crate::lp_io::{self, LpIoConfig};
use crate::mapping::Mapper;
use crate::model_net::{self, base::ModelNetBaseState, ModelNetRuntime, NetStats};
use crate::pdes::{Gid, Kernel, SimTime};
use crate::registry::LpTypeRegistry;
use crate::Error;

use log::*;
use std::path::Path;

/// Simulation end time used when the caller does not give one.
pub const DEFAULT_END_TIME: SimTime = 1e18;

/// The process-wide read-only state every LP callback receives.
#[derive(Debug)]
pub struct Runtime {
    /// Global simulation parameters.
    pub sim_config: SimulationConfig,
    /// Declared LP types, in declaration order.
    pub lp_configs: Vec<LpTypeConfig>,
    /// The vertex table and partition.
    pub mapper: Mapper,
    /// The LP-type registry.
    pub registry: LpTypeRegistry,
    /// The model-net tables.
    pub model_net: ModelNetRuntime,
}

impl Runtime {
    /// The LP-type configuration of an LP.
    pub fn lp_config(&self, gid: Gid) -> &LpTypeConfig {
        &self.lp_configs[self.mapper.vertex(gid).type_idx]
    }
}

/// Options of one simulation run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of execution units the LPs are partitioned over.
    pub num_units: usize,
    /// Simulation end timestamp.
    pub end_time: SimTime,
    /// Shift applied to the per-LP random seeds.
    pub seed_offset: u64,
    /// Sampling interval and end time, when sampling is wanted.
    pub sampling: Option<(SimTime, SimTime)>,
    /// Statistics output directory.
    pub lp_io: Option<LpIoConfig>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            num_units: 1,
            end_time: DEFAULT_END_TIME,
            seed_offset: 0,
            sampling: None,
            lp_io: None,
        }
    }
}

/// Aggregated statistics of one configured network.
#[derive(Debug, Clone)]
pub struct NetReport {
    /// The network's model name.
    pub name: String,
    /// Statistics summed over all LPs of the network.
    pub stats: NetStats,
}

/// Owns the runtime and the kernel, and drives the setup sequence.
pub struct Orchestrator {
    runtime: Runtime,
    kernel: Kernel,
    lp_io: Option<LpIoConfig>,
}

impl Orchestrator {
    /// Parse the configuration, register and validate all LP types, build
    /// the mapper and the model-net tables, and bind every LP to the kernel.
    ///
    /// `register_extra` runs against the registry before validation, so
    /// custom LP types can be added.
    pub fn configure(
        config_file: impl AsRef<Path>,
        opts: RunOptions,
        register_extra: impl FnOnce(&mut LpTypeRegistry),
    ) -> Result<Self, Error> {
        let ParsedConfig { simulation, lp_types, topology, config_dir } =
            config::parse_config_file(config_file)?;

        let mut registry = LpTypeRegistry::with_builtin_types();
        register_extra(&mut registry);

        // every declared type must resolve to a registered handler table
        for cfg in &lp_types {
            registry.lookup(cfg)?;
        }

        let mut model_net = model_net::configure(&simulation, &lp_types, &registry, &config_dir)?;
        if let Some((interval, end)) = opts.sampling {
            model_net.enable_sampling(interval, end);
        }
        // post-register hooks of the families that are actually referenced
        for net in &model_net.nets {
            if let Some(hook) = net.method.post_register {
                if let Some(cfg) = lp_types.iter().find(|c| c.name == net.lp_type_name) {
                    hook(cfg);
                }
            }
        }

        let mut mapper = Mapper::build(&topology, &lp_types)?;
        mapper.setup(opts.num_units, opts.seed_offset)?;

        let runtime =
            Runtime { sim_config: simulation, lp_configs: lp_types, mapper, registry, model_net };

        let mut kernel = Kernel::new(opts.end_time);
        for unit in 0..runtime.mapper.num_units() {
            runtime.mapper.init_unit(unit, &runtime.lp_configs, &runtime.registry, &mut kernel)?;
        }
        kernel.init(&runtime);
        info!(
            "configured {} LPs over {} units, {} networks",
            kernel.num_lps(),
            runtime.mapper.num_units(),
            runtime.model_net.num_nets()
        );

        Ok(Self { runtime, kernel, lp_io: opts.lp_io })
    }

    /// Run the simulation to completion. Returns the number of events
    /// processed.
    pub fn run(&mut self) -> Result<usize, Error> {
        let events = self.kernel.run(&self.runtime);
        info!("simulation done after {} events at t = {}", events, self.kernel.now());
        Ok(events)
    }

    /// Process at most `max_steps` events.
    pub fn run_steps(&mut self, max_steps: usize) -> usize {
        self.kernel.run_steps(&self.runtime, max_steps)
    }

    /// Roll back the `k` most recently processed events.
    pub fn rollback(&mut self, k: usize) {
        self.kernel.rollback(k, &self.runtime);
    }

    /// Enqueue an event directly, bypassing the model-net entry points.
    pub fn inject(&mut self, dest: Gid, ts: SimTime, sender: Gid, payload: crate::pdes::Payload) {
        self.kernel.inject(dest, ts, sender, payload);
    }

    /// Commit and finalize, aggregate the per-network statistics, and flush
    /// them to the statistics directory when one is configured.
    pub fn report(&mut self) -> Result<Vec<NetReport>, Error> {
        self.kernel.finalize(&self.runtime);
        let reports = self.collect_stats();
        for report in &reports {
            info!(
                "network `{}`: {} packets / {} bytes sent, {} packets / {} bytes received",
                report.name,
                report.stats.packets_sent,
                report.stats.bytes_sent,
                report.stats.packets_recvd,
                report.stats.bytes_recvd
            );
        }
        if let Some(cfg) = &self.lp_io {
            let dir = lp_io::flush(cfg, &reports)?;
            info!("statistics flushed to {}", dir.display());
        }
        Ok(reports)
    }

    /// The read-only runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The kernel (state inspection, mostly for tests).
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    fn collect_stats(&self) -> Vec<NetReport> {
        let rt = &self.runtime;
        let mut reports: Vec<NetReport> = rt
            .model_net
            .nets
            .iter()
            .map(|n| NetReport { name: n.model_name.clone(), stats: NetStats::default() })
            .collect();
        for gid in 0..rt.mapper.vertex_count() as Gid {
            let cfg = rt.lp_config(gid);
            if rt.model_net.net_id_for_model(&cfg.model_name).is_none() {
                continue;
            }
            let st = self.kernel.state::<ModelNetBaseState>(gid);
            if let Some(collect) = rt.model_net.method(st.net_id).model_stats {
                reports[st.net_id].stats.merge(&collect(st.sub_state.as_ref()));
            }
        }
        reports
    }
}
