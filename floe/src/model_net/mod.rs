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

//! # The model-net layer
//!
//! The packet pipeline on top of the topology-specific network families.
//! User LPs issue sends through [`event`]; the request travels to the
//! sender-side base LP (found through the default mapping context), is
//! fragmented and sequenced by the schedulers in [`sched`], and is carried by
//! the family to the destination-side base LP, which finally delivers the
//! remote completion payload to the destination LP (and the local completion
//! payload back to the source).
//!
//! [`configure`] builds the per-annotation base parameters and resolves the
//! configured networks in `modelnet_order`; the resulting [`ModelNetRuntime`]
//! is the read-only table every base LP consults at runtime.

pub mod base;
pub mod message;
pub mod method;
pub mod sched;
pub mod simple_net;
pub mod simple_p2p;

use crate::config::{LpTypeConfig, ModelKind, SimulationConfig};
use crate::mapping::context::MapContext;
use crate::orchestrator::Runtime;
use crate::pdes::{Effects, Gid, Payload, SimTime};
use crate::registry::LpTypeRegistry;

use itertools::Itertools;
use log::*;
use message::{BaseMsg, EventKind, MsgHeader, Request, WrapBody, WrapMsg};
use method::Method;
use sched::{SchedConfig, SchedulerKind};
use simple_net::SharedChannelParams;
use simple_p2p::P2pTables;
use std::path::Path;
use thiserror::Error;

/// Index of a configured network, in `modelnet_order` order.
pub type NetId = usize;

/// Packet size used when the configuration does not specify one (and the
/// scheduler is not FCFS-FULL).
pub const DEFAULT_PACKET_SIZE: u64 = 512;

/// Packet size forced by the FCFS-FULL policy, so whole messages travel as
/// one packet. Leaves headroom against overflow in size arithmetic.
pub const FULL_PACKET_SIZE: u64 = 1 << 62;

/// The base parameters of one annotation slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseParams {
    /// Scheduler configuration.
    pub sched: SchedConfig,
    /// Packet size in bytes (after the FCFS-FULL override).
    pub packet_size: u64,
    /// Number of NIC injection queues.
    pub num_queues: usize,
    /// NIC sequencing delay in nanoseconds.
    pub nic_seq_delay: SimTime,
    /// Number of node-local copy queues.
    pub node_copy_queues: usize,
}

/// Per-family traffic statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetStats {
    /// Packets issued by the send side.
    pub packets_sent: u64,
    /// Bytes issued by the send side.
    pub bytes_sent: u64,
    /// Packets accepted by the receive side.
    pub packets_recvd: u64,
    /// Bytes accepted by the receive side.
    pub bytes_recvd: u64,
    /// Cumulative send occupancy in nanoseconds.
    pub send_time: SimTime,
    /// Cumulative receive occupancy in nanoseconds.
    pub recv_time: SimTime,
    /// End notifications received.
    pub end_notifs: u64,
}

impl NetStats {
    /// Merge another record into this one.
    pub fn merge(&mut self, other: &NetStats) {
        self.packets_sent += other.packets_sent;
        self.bytes_sent += other.bytes_sent;
        self.packets_recvd += other.packets_recvd;
        self.bytes_recvd += other.bytes_recvd;
        self.send_time += other.send_time;
        self.recv_time += other.recv_time;
        self.end_notifs += other.end_notifs;
    }
}

/// Sampling configuration (interval and end time).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// Pulse interval in nanoseconds.
    pub interval: SimTime,
    /// No pulses are armed past this time.
    pub end: SimTime,
}

/// One configured network.
#[derive(Debug, Clone)]
pub struct ConfiguredNet {
    /// The LP-type (configuration section) name of this network.
    pub lp_type_name: String,
    /// The model name.
    pub model_name: String,
    /// The model kind.
    pub kind: ModelKind,
    /// The family's handler table.
    pub method: Method,
    /// Resolved parameters of the shared-channel family.
    pub shared: Option<SharedChannelParams>,
    /// Resolved matrices of the point-to-point family.
    pub p2p: Option<P2pTables>,
}

/// The read-only model-net tables assembled at configure time.
#[derive(Debug, Clone)]
pub struct ModelNetRuntime {
    /// Configured networks, indexed by [`NetId`] in `modelnet_order` order.
    pub nets: Vec<ConfiguredNet>,
    /// Per-annotation base parameters; the unannotated slot is always
    /// present.
    pub params: Vec<(Option<String>, BaseParams)>,
    /// Sampling configuration, when enabled.
    pub sampling: Option<Sampling>,
    /// Whether the congestion controller is active.
    pub congestion_enabled: bool,
    /// Node-local memory copy cost in ns per byte.
    pub node_copy_ns_per_byte: f64,
}

impl ModelNetRuntime {
    /// The handler table of a configured network.
    pub fn method(&self, net_id: NetId) -> &Method {
        &self.nets[net_id].method
    }

    /// The configured network record.
    pub fn net(&self, net_id: NetId) -> &ConfiguredNet {
        &self.nets[net_id]
    }

    /// Number of configured networks.
    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    /// Resolve a model name to its network id.
    pub fn net_id_for_model(&self, model_name: &str) -> Option<NetId> {
        self.nets.iter().position(|n| n.model_name == model_name)
    }

    /// The base parameters for an annotation, falling back to the
    /// unannotated slot.
    pub fn params_for(&self, annotation: Option<&str>) -> &BaseParams {
        self.params
            .iter()
            .find(|(a, _)| a.as_deref() == annotation)
            .or_else(|| self.params.iter().find(|(a, _)| a.is_none()))
            .map(|(_, p)| p)
            .expect("the unannotated parameter slot always exists")
    }

    /// Enable the sampling loop. Must be called before LP init.
    pub fn enable_sampling(&mut self, interval: SimTime, end: SimTime) {
        self.sampling = Some(Sampling { interval, end });
    }
}

/// Build the model-net tables: read the base parameters for every annotation
/// and resolve the configured networks in `modelnet_order` order.
pub fn configure(
    sim: &SimulationConfig,
    lp_configs: &[LpTypeConfig],
    registry: &LpTypeRegistry,
    config_dir: &Path,
) -> Result<ModelNetRuntime, ModelNetError> {
    // which LP types are networks (their registered entry carries a method)
    let networks: Vec<&LpTypeConfig> = lp_configs
        .iter()
        .filter(|cfg| {
            registry.lookup(cfg).ok().map(|entry| entry.method.is_some()).unwrap_or(false)
        })
        .collect();

    // annotation slots; the unannotated slot always exists
    let mut annos: Vec<Option<String>> =
        networks.iter().map(|cfg| cfg.annotation().map(str::to_string)).unique().collect();
    if !annos.contains(&None) {
        annos.push(None);
    }
    let params: Vec<(Option<String>, BaseParams)> =
        annos.into_iter().map(|a| Ok((a, read_base_params(sim)?))).collect::<Result<_, _>>()?;

    // resolve the network order
    let order: Vec<String> = if sim.modelnet_order.is_empty() {
        networks.iter().map(|cfg| cfg.model_name.clone()).collect()
    } else {
        sim.modelnet_order.clone()
    };

    let mut nets = Vec::with_capacity(order.len());
    for name in &order {
        let cfg = networks
            .iter()
            .find(|cfg| &cfg.model_name == name || &cfg.name == name)
            .ok_or_else(|| ModelNetError::UnknownNetwork { name: name.clone() })?;
        let method = registry
            .lookup(cfg)
            .ok()
            .and_then(|entry| entry.method)
            .ok_or_else(|| ModelNetError::UnknownNetwork { name: name.clone() })?;
        let shared = match cfg.model_kind {
            ModelKind::SimpleNet => Some(SharedChannelParams::resolve(sim)?),
            _ => None,
        };
        let p2p = match cfg.model_kind {
            ModelKind::SimpleP2p => Some(P2pTables::resolve(sim, config_dir, cfg.nodes.len())?),
            _ => None,
        };
        nets.push(ConfiguredNet {
            lp_type_name: cfg.name.clone(),
            model_name: cfg.model_name.clone(),
            kind: cfg.model_kind,
            method,
            shared,
            p2p,
        });
    }
    info!("configured {} network(s): {:?}", nets.len(), order);

    Ok(ModelNetRuntime {
        nets,
        params,
        sampling: None,
        congestion_enabled: false,
        node_copy_ns_per_byte: sim.node_copy_ns_per_byte,
    })
}

fn read_base_params(sim: &SimulationConfig) -> Result<BaseParams, ModelNetError> {
    let mut sched = SchedConfig::default();
    if let Some(name) = &sim.modelnet_scheduler {
        sched.kind = sched::scheduler_by_name(name)
            .ok_or_else(|| ModelNetError::UnknownScheduler { name: name.clone() })?;
    }
    if sched.kind == SchedulerKind::Prio {
        // priority scheduler uses default parameters
        sched.num_prios = 10;
        sched.sub = SchedulerKind::Fcfs;
    }

    let num_queues = 1;
    info!("NIC num injection port not specified, setting to {}", num_queues);
    let nic_seq_delay = 10.0;
    info!("NIC seq delay not specified, setting to {}", nic_seq_delay);
    let node_copy_queues = 1;
    info!("NIC num copy queues not specified, setting to {}", node_copy_queues);

    let full = sched.kind == SchedulerKind::FcfsFull
        || (sched.kind == SchedulerKind::Prio && sched.sub == SchedulerKind::FcfsFull);
    let packet_size = if full {
        // override to something huge so whole messages travel atomically
        FULL_PACKET_SIZE
    } else if sim.packet_size == 0 {
        warn!("no packet size specified, setting packet size to {}", DEFAULT_PACKET_SIZE);
        DEFAULT_PACKET_SIZE
    } else {
        sim.packet_size
    };

    Ok(BaseParams { sched, packet_size, num_queues, nic_seq_delay, node_copy_queues })
}

/// Issue a message through network `net_id` towards `final_dest_lp`.
///
/// The sender-side and destination-side base LPs are resolved through the
/// default mapping context. `remote_event` is delivered at `final_dest_lp`
/// once the payload has fully arrived; `self_event` is delivered back to the
/// caller once the message has locally completed. Returns the number of
/// random draws consumed, to be passed back through [`event_rc`] on
/// rollback.
#[allow(clippy::too_many_arguments)]
pub fn event(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    net_id: NetId,
    category: &str,
    final_dest_lp: Gid,
    msg_size: u64,
    offset: SimTime,
    remote_event: Option<Payload>,
    self_event: Option<Payload>,
) -> u8 {
    let mctx = MapContext::default();
    let lp_type_name = &rt.model_net.net(net_id).lp_type_name;
    let src_mn_lp = mctx
        .resolve(&rt.mapper, lp_type_name, eff.gid)
        .unwrap_or_else(|e| panic!("cannot resolve sender-side network LP: {}", e));
    let dest_mn_lp = mctx
        .resolve(&rt.mapper, lp_type_name, final_dest_lp)
        .unwrap_or_else(|e| panic!("cannot resolve destination-side network LP: {}", e));

    let req = Request {
        final_dest_lp,
        dest_mn_lp,
        src_lp: eff.gid,
        msg_start_time: eff.now,
        msg_size,
        packet_size: 0,
        msg_id: 0,
        net_id,
        queue_offset: 0,
        category: category.to_string(),
    };
    let base = BaseMsg {
        req,
        is_from_remote: false,
        is_queue_req: true,
        save_ts: 0.0,
        sched_params: Default::default(),
        rc: Default::default(),
        remote_event,
        self_event,
    };
    let wrap = WrapMsg {
        header: MsgHeader::new(EventKind::NewMsg, eff.gid, eff.now),
        body: WrapBody::Base(base),
    };
    let jitter = eff.local_latency();
    eff.send(src_mn_lp, offset + jitter, Payload::ModelNet(Box::new(wrap)));
    1
}

/// Reverse of [`event`]: rewinds the random draws it consumed.
pub fn event_rc(eff: &mut Effects<'_>, rng_draws: u8) {
    for _ in 0..rng_draws {
        eff.local_latency_reverse();
    }
}

/// Tell the scheduler when next to issue a packet. Families that track
/// their own idleness call this from their packet handlers; failing to do so
/// hangs the scheduler loop.
pub fn idle_event(eff: &mut Effects<'_>, offset: SimTime, is_recv: bool, queue_offset: usize) {
    let mut tick = BaseMsg::default();
    tick.is_from_remote = is_recv;
    tick.req.queue_offset = queue_offset;
    let wrap = WrapMsg {
        header: MsgHeader::new(EventKind::SchedNext, eff.gid, eff.now),
        body: WrapBody::Base(tick),
    };
    eff.send(eff.gid, offset, Payload::ModelNet(Box::new(wrap)));
}

/// Broadcast an end-of-workload notification to every LP of every configured
/// network family. Used by workload LPs once all ranks have completed, so
/// heartbeat-driven families stop re-arming themselves. Returns the number
/// of notifications sent.
pub fn end_sim_broadcast(rt: &Runtime, eff: &mut Effects<'_>, offset: SimTime) -> usize {
    let mut sent = 0;
    for cfg in &rt.lp_configs {
        if rt.model_net.net_id_for_model(&cfg.model_name).is_none() {
            continue;
        }
        for rel in 0..rt.mapper.count_of_type(&cfg.name) {
            let gid = rt
                .mapper
                .gid_of(&cfg.name, rel)
                .expect("relative ids below the type count always resolve");
            let wrap = WrapMsg {
                header: MsgHeader::new(EventKind::EndNotif, eff.gid, eff.now),
                body: WrapBody::Empty,
            };
            eff.send(gid, offset, Payload::ModelNet(Box::new(wrap)));
            sent += 1;
        }
    }
    debug!("end-of-simulation broadcast to {} network LPs", sent);
    sent
}

/// Errors raised while configuring the model-net layer
#[derive(Debug, Error)]
pub enum ModelNetError {
    /// `modelnet_scheduler` names no known policy
    #[error("unknown value for modelnet_scheduler: `{name}`")]
    UnknownScheduler {
        /// The unknown name
        name: String,
    },
    /// `modelnet_order` names no configured network
    #[error("modelnet_order names `{name}` which is not a configured network type")]
    UnknownNetwork {
        /// The unknown name
        name: String,
    },
    /// A family parameter is missing from the simulation configuration
    #[error("model `{model}` requires the simulation key `{key}`")]
    MissingParameter {
        /// The family needing the key
        model: &'static str,
        /// The missing key
        key: &'static str,
    },
    /// A latency/bandwidth matrix file could not be read
    #[error("cannot read matrix file {path}: {source}")]
    MatrixIo {
        /// Path of the matrix file
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
    /// A matrix file holds something other than numbers
    #[error("matrix file {path} holds a non-numeric entry: `{token}`")]
    MatrixParse {
        /// Path of the matrix file
        path: String,
        /// The offending token
        token: String,
    },
    /// A matrix file holds the wrong number of entries
    #[error("matrix file {path} holds {got} entries, expected {expected}")]
    MatrixShape {
        /// Path of the matrix file
        path: String,
        /// Expected entry count
        expected: usize,
        /// Actual entry count
        got: usize,
    },
}
