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

//! # The point-to-point network family
//!
//! Latency and bandwidth are given per LP pair by two N×N matrices
//! (`net_latency_ns_file` / `net_bw_mbps_file`, whitespace-separated,
//! indexed by relative id within the network LP type). The family does not
//! drive its own scheduler loop: the base LP re-arms `SchedNext` with the
//! offset each packet event returns.
//!
//! Per-destination idle times live in maps that start empty, which is the
//! all-zero state an absent entry stands for.

use super::message::{EventKind, MsgHeader, Request, WrapBody, WrapMsg};
use super::method::{Method, Packet, PacketRc};
use super::simple_net::ns_per_byte;
use super::{ModelNetError, NetId, NetStats};
use crate::config::{ModelKind, SimulationConfig};
use crate::orchestrator::Runtime;
use crate::pdes::{BitField, Effects, Gid, Payload, SimTime};
use crate::registry::{LpTypeRegistry, RegisteredType};

use log::*;
use std::any::Any;
use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

/// The per-pair latency and bandwidth tables.
#[derive(Debug, Clone, PartialEq)]
pub struct P2pTables {
    /// Number of LPs of the network type (the matrices are n×n).
    pub n: usize,
    latency_ns: Vec<f64>,
    bw_mbps: Vec<f64>,
}

impl P2pTables {
    /// Load both matrices named in the simulation configuration, resolved
    /// relative to the configuration file's directory.
    pub fn resolve(
        sim: &SimulationConfig,
        config_dir: &Path,
        n: usize,
    ) -> Result<Self, ModelNetError> {
        let latency_file = sim.net_latency_ns_file.as_ref().ok_or(
            ModelNetError::MissingParameter { model: "simplep2p", key: "net_latency_ns_file" },
        )?;
        let bw_file = sim.net_bw_mbps_file.as_ref().ok_or(ModelNetError::MissingParameter {
            model: "simplep2p",
            key: "net_bw_mbps_file",
        })?;
        let latency_ns = load_matrix(&config_dir.join(latency_file), n)?;
        let bw_mbps = load_matrix(&config_dir.join(bw_file), n)?;
        Ok(Self { n, latency_ns, bw_mbps })
    }

    /// Link latency between two relative ids, in nanoseconds.
    pub fn latency(&self, src_rel: usize, dest_rel: usize) -> f64 {
        self.latency_ns[src_rel * self.n + dest_rel]
    }

    /// Link bandwidth between two relative ids, in Mbit/s.
    pub fn bw(&self, src_rel: usize, dest_rel: usize) -> f64 {
        self.bw_mbps[src_rel * self.n + dest_rel]
    }
}

fn load_matrix(path: &Path, n: usize) -> Result<Vec<f64>, ModelNetError> {
    let text = read_to_string(path).map_err(|source| ModelNetError::MatrixIo {
        path: path.display().to_string(),
        source,
    })?;
    let mut values = Vec::with_capacity(n * n);
    for token in text.split_whitespace() {
        let value = token.parse::<f64>().map_err(|_| ModelNetError::MatrixParse {
            path: path.display().to_string(),
            token: token.to_string(),
        })?;
        values.push(value);
    }
    if values.len() != n * n {
        return Err(ModelNetError::MatrixShape {
            path: path.display().to_string(),
            expected: n * n,
            got: values.len(),
        });
    }
    Ok(values)
}

/// A packet in flight between two point-to-point LPs.
#[derive(Debug, Clone, PartialEq)]
pub struct SpMessage {
    /// The network this packet travels through.
    pub net_id: NetId,
    /// The sending base LP.
    pub src_nic: Gid,
    /// The LP the message payload is for.
    pub final_dest_lp: Gid,
    /// The user LP that issued the send.
    pub src_lp: Gid,
    /// The message this packet belongs to.
    pub msg_id: u64,
    /// Bytes carried.
    pub bytes: u64,
    /// True for the final packet of the message.
    pub is_last: bool,
    /// The remote completion payload (final packet only).
    pub remote_event: Option<Payload>,
    /// Saved receive-side timestamp for reverse computation.
    pub save_ts: SimTime,
    /// Saved receive-side cumulative occupancy.
    pub save_stat_ns: SimTime,
    /// Whether the receive-side slot existed before this packet.
    pub had_entry: bool,
    /// Category for statistics.
    pub category: String,
}

/// Per-LP state of the point-to-point family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleP2pState {
    /// Next time the link towards each destination (by relative id) is free.
    pub send_next_idle: HashMap<usize, SimTime>,
    /// Next time the link from each source (by relative id) is free.
    pub recv_next_idle: HashMap<usize, SimTime>,
    /// Traffic statistics.
    pub stats: NetStats,
}

/// The registered handler table of the point-to-point family.
pub const METHOD: Method = Method {
    name: "simplep2p",
    kind: ModelKind::SimpleP2p,
    self_scheduling: false,
    new_state: sp_new_state,
    init: sp_init,
    event: sp_event,
    revent: sp_revent,
    commit: None,
    finalize: Some(sp_finalize),
    packet_event: sp_packet_event,
    packet_event_rc: sp_packet_event_rc,
    sample: None,
    sample_rc: None,
    sample_init: None,
    sample_fini: None,
    end_notif: Some(sp_end_notif),
    end_notif_rc: Some(sp_end_notif_rc),
    congestion_event: None,
    congestion_event_rc: None,
    congestion_event_commit: None,
    post_register: None,
    model_stats: Some(sp_model_stats),
};

/// Register the family with the LP-type registry.
pub fn register(registry: &mut LpTypeRegistry) {
    registry.register_known(
        ModelKind::SimpleP2p,
        RegisteredType { lp_type: super::base::MODEL_NET_BASE_LP, method: Some(METHOD) },
    );
}

fn sp_new_state() -> Box<dyn Any> {
    Box::new(SimpleP2pState::default())
}

fn sp_init(_rt: &Runtime, _eff: &mut Effects<'_>, _state: &mut Box<dyn Any>) {}

fn state_of(sub: &mut Box<dyn Any>) -> &mut SimpleP2pState {
    sub.downcast_mut::<SimpleP2pState>().expect("point-to-point LP with foreign state")
}

fn tables_of<'a>(rt: &'a Runtime, net_id: NetId) -> &'a P2pTables {
    rt.model_net
        .net(net_id)
        .p2p
        .as_ref()
        .expect("point-to-point tables are resolved at configure time")
}

fn sp_packet_event(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    pkt: Packet<'_>,
) -> (SimTime, PacketRc) {
    let tables = tables_of(rt, pkt.req.net_id);
    let my_rel = rt.mapper.relative_id_of(eff.gid);
    let dest_rel = rt.mapper.relative_id_of(pkt.req.dest_mn_lp);
    let latency = tables.latency(my_rel, dest_rel);
    let xmit = pkt.bytes as f64 * ns_per_byte(tables.bw(my_rel, dest_rel));
    let st = state_of(sub);
    let now = eff.now;

    let save = st.send_next_idle.get(&dest_rel).copied();
    let save_stat_ns = st.stats.send_time;
    let end = save.unwrap_or(0.0).max(now) + xmit;
    st.send_next_idle.insert(dest_rel, end);
    st.stats.packets_sent += 1;
    st.stats.bytes_sent += pkt.bytes;
    st.stats.send_time += xmit;

    let arrival = SpMessage {
        net_id: pkt.req.net_id,
        src_nic: eff.gid,
        final_dest_lp: pkt.req.final_dest_lp,
        src_lp: pkt.req.src_lp,
        msg_id: pkt.req.msg_id,
        bytes: pkt.bytes,
        is_last: pkt.is_last,
        remote_event: pkt.remote_event,
        save_ts: 0.0,
        save_stat_ns: 0.0,
        had_entry: false,
        category: pkt.req.category.clone(),
    };
    let wrap = WrapMsg {
        header: MsgHeader::new(EventKind::Pass, eff.gid, now),
        body: WrapBody::SimpleP2p(arrival),
    };
    eff.send(pkt.req.dest_mn_lp, (end - now) + latency, Payload::ModelNet(Box::new(wrap)));

    let mut rng_draws = 0;
    if pkt.is_last {
        if let Some(self_event) = pkt.self_event {
            let jitter = eff.local_latency();
            rng_draws = 1;
            eff.send(pkt.req.src_lp, end - now + jitter, self_event);
        }
    }

    (
        end - now,
        PacketRc {
            save_ts: save.unwrap_or(0.0),
            save_stat_ns,
            slot: dest_rel,
            had_entry: save.is_some(),
            bytes: pkt.bytes,
            rng_draws,
        },
    )
}

fn sp_packet_event_rc(
    _rt: &Runtime,
    eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    _req: &Request,
    rc: &PacketRc,
) {
    let st = state_of(sub);
    for _ in 0..rc.rng_draws {
        eff.local_latency_reverse();
    }
    if rc.had_entry {
        st.send_next_idle.insert(rc.slot, rc.save_ts);
    } else {
        st.send_next_idle.remove(&rc.slot);
    }
    st.stats.send_time = rc.save_stat_ns;
    st.stats.packets_sent -= 1;
    st.stats.bytes_sent -= rc.bytes;
}

fn sp_event(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    _bf: &mut BitField,
    body: &mut WrapBody,
) {
    let m = match body {
        WrapBody::SimpleP2p(m) => m,
        _ => panic!("point-to-point LP received a foreign message"),
    };
    let my_rel = rt.mapper.relative_id_of(eff.gid);
    let src_rel = rt.mapper.relative_id_of(m.src_nic);
    let recv = {
        let tables = tables_of(rt, m.net_id);
        m.bytes as f64 * ns_per_byte(tables.bw(src_rel, my_rel))
    };
    let st = state_of(sub);
    let now = eff.now;

    let save = st.recv_next_idle.get(&src_rel).copied();
    m.save_ts = save.unwrap_or(0.0);
    m.save_stat_ns = st.stats.recv_time;
    m.had_entry = save.is_some();
    let end = save.unwrap_or(0.0).max(now) + recv;
    st.recv_next_idle.insert(src_rel, end);
    st.stats.packets_recvd += 1;
    st.stats.bytes_recvd += m.bytes;
    st.stats.recv_time += recv;

    if m.is_last {
        if let Some(remote) = &m.remote_event {
            let jitter = eff.local_latency();
            eff.send(m.final_dest_lp, end - now + jitter, remote.clone());
        }
    }
}

fn sp_revent(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    _bf: &mut BitField,
    body: &mut WrapBody,
) {
    let m = match body {
        WrapBody::SimpleP2p(m) => m,
        _ => panic!("point-to-point LP received a foreign message"),
    };
    let src_rel = rt.mapper.relative_id_of(m.src_nic);
    let st = state_of(sub);
    if m.is_last && m.remote_event.is_some() {
        eff.local_latency_reverse();
    }
    if m.had_entry {
        st.recv_next_idle.insert(src_rel, m.save_ts);
    } else {
        st.recv_next_idle.remove(&src_rel);
    }
    st.stats.recv_time = m.save_stat_ns;
    st.stats.packets_recvd -= 1;
    st.stats.bytes_recvd -= m.bytes;
}

fn sp_end_notif(_rt: &Runtime, _eff: &mut Effects<'_>, sub: &mut Box<dyn Any>, _bf: &mut BitField) {
    state_of(sub).stats.end_notifs += 1;
}

fn sp_end_notif_rc(
    _rt: &Runtime,
    _eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    _bf: &mut BitField,
) {
    state_of(sub).stats.end_notifs -= 1;
}

fn sp_finalize(_rt: &Runtime, gid: Gid, sub: &mut Box<dyn Any>) {
    let st = state_of(sub);
    debug!(
        "simplep2p LP {}: sent {} packets / {} bytes, recvd {} packets / {} bytes",
        gid, st.stats.packets_sent, st.stats.bytes_sent, st.stats.packets_recvd, st.stats.bytes_recvd
    );
}

fn sp_model_stats(sub: &dyn Any) -> NetStats {
    sub.downcast_ref::<SimpleP2pState>().map(|st| st.stats).unwrap_or_default()
}
