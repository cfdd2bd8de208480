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

//! # The shared-channel network family
//!
//! A simple model with a per-packet startup cost (`net_startup_ns`) and a
//! single shared bandwidth (`net_bw_mbps`). The send side tracks when its
//! channel frees up and drives the scheduler loop through idle events; the
//! receive side tracks its own occupancy and delivers the remote completion
//! payload with the final packet.
//!
//! All timing state an event overwrites is saved in the event itself (or in
//! the scheduler's reverse record), so the reverse handlers restore it
//! exactly.

use super::message::{EventKind, MsgHeader, Request, WrapBody, WrapMsg};
use super::method::{Method, Packet, PacketRc};
use super::{ModelNetError, NetId, NetStats};
use crate::config::{ModelKind, SimulationConfig};
use crate::orchestrator::Runtime;
use crate::pdes::{BitField, Effects, Gid, Payload, SimTime};
use crate::registry::{LpTypeRegistry, RegisteredType};

use log::*;
use std::any::Any;

/// Resolved parameters of the shared channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedChannelParams {
    /// Per-packet startup cost in nanoseconds.
    pub startup_ns: f64,
    /// Channel bandwidth in Mbit/s.
    pub bw_mbps: f64,
}

impl SharedChannelParams {
    /// Read the family parameters out of the simulation configuration.
    pub fn resolve(sim: &SimulationConfig) -> Result<Self, ModelNetError> {
        let startup_ns = sim.net_startup_ns.ok_or(ModelNetError::MissingParameter {
            model: "simplenet",
            key: "net_startup_ns",
        })?;
        let bw_mbps = sim.net_bw_mbps.ok_or(ModelNetError::MissingParameter {
            model: "simplenet",
            key: "net_bw_mbps",
        })?;
        Ok(Self { startup_ns, bw_mbps })
    }
}

/// Transmission time per byte in nanoseconds for a bandwidth in Mbit/s.
pub(crate) fn ns_per_byte(bw_mbps: f64) -> f64 {
    8e3 / bw_mbps
}

/// A packet in flight between two shared-channel LPs.
#[derive(Debug, Clone, PartialEq)]
pub struct SnMessage {
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
    /// Category for statistics.
    pub category: String,
}

/// Per-LP state of the shared-channel family. Relies on starting all-zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleNetState {
    /// Next time the send side of the channel is free.
    pub send_next_idle: SimTime,
    /// Next time the receive side of the channel is free.
    pub recv_next_idle: SimTime,
    /// Traffic statistics.
    pub stats: NetStats,
}

/// The registered handler table of the shared-channel family.
pub const METHOD: Method = Method {
    name: "simplenet",
    kind: ModelKind::SimpleNet,
    self_scheduling: true,
    new_state: sn_new_state,
    init: sn_init,
    event: sn_event,
    revent: sn_revent,
    commit: None,
    finalize: Some(sn_finalize),
    packet_event: sn_packet_event,
    packet_event_rc: sn_packet_event_rc,
    sample: None,
    sample_rc: None,
    sample_init: None,
    sample_fini: None,
    end_notif: Some(sn_end_notif),
    end_notif_rc: Some(sn_end_notif_rc),
    congestion_event: None,
    congestion_event_rc: None,
    congestion_event_commit: None,
    post_register: None,
    model_stats: Some(sn_model_stats),
};

/// Register the family with the LP-type registry.
pub fn register(registry: &mut LpTypeRegistry) {
    registry.register_known(
        ModelKind::SimpleNet,
        RegisteredType { lp_type: super::base::MODEL_NET_BASE_LP, method: Some(METHOD) },
    );
}

fn sn_new_state() -> Box<dyn Any> {
    Box::new(SimpleNetState::default())
}

fn sn_init(_rt: &Runtime, _eff: &mut Effects<'_>, _state: &mut Box<dyn Any>) {}

fn state_of(sub: &mut Box<dyn Any>) -> &mut SimpleNetState {
    sub.downcast_mut::<SimpleNetState>().expect("shared-channel LP with foreign state")
}

fn params_of(rt: &Runtime, net_id: NetId) -> SharedChannelParams {
    rt.model_net
        .net(net_id)
        .shared
        .expect("shared-channel parameters are resolved at configure time")
}

fn sn_packet_event(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    pkt: Packet<'_>,
) -> (SimTime, PacketRc) {
    let p = params_of(rt, pkt.req.net_id);
    let st = state_of(sub);
    let now = eff.now;

    let save_ts = st.send_next_idle;
    let save_stat_ns = st.stats.send_time;
    let xmit = p.startup_ns + pkt.bytes as f64 * ns_per_byte(p.bw_mbps);
    let end = st.send_next_idle.max(now) + xmit;
    st.send_next_idle = end;
    st.stats.packets_sent += 1;
    st.stats.bytes_sent += pkt.bytes;
    st.stats.send_time += xmit;

    let arrival = SnMessage {
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
        category: pkt.req.category.clone(),
    };
    let wrap = WrapMsg {
        header: MsgHeader::new(EventKind::Pass, eff.gid, now),
        body: WrapBody::SimpleNet(arrival),
    };
    eff.send(pkt.req.dest_mn_lp, end - now, Payload::ModelNet(Box::new(wrap)));

    let mut rng_draws = 0;
    if pkt.is_last {
        if let Some(self_event) = pkt.self_event {
            let jitter = eff.local_latency();
            rng_draws = 1;
            eff.send(pkt.req.src_lp, end - now + jitter, self_event);
        }
    }

    // keep the send loop alive once the channel frees up
    super::idle_event(eff, end - now, pkt.is_recv, pkt.req.queue_offset);

    (
        end - now,
        PacketRc { save_ts, save_stat_ns, slot: 0, had_entry: true, bytes: pkt.bytes, rng_draws },
    )
}

fn sn_packet_event_rc(
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
    st.send_next_idle = rc.save_ts;
    st.stats.send_time = rc.save_stat_ns;
    st.stats.packets_sent -= 1;
    st.stats.bytes_sent -= rc.bytes;
}

fn sn_event(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    _bf: &mut BitField,
    body: &mut WrapBody,
) {
    let m = match body {
        WrapBody::SimpleNet(m) => m,
        _ => panic!("shared-channel LP received a foreign message"),
    };
    let p = params_of(rt, m.net_id);
    let st = state_of(sub);
    let now = eff.now;

    m.save_ts = st.recv_next_idle;
    m.save_stat_ns = st.stats.recv_time;
    let recv = m.bytes as f64 * ns_per_byte(p.bw_mbps);
    let end = st.recv_next_idle.max(now) + recv;
    st.recv_next_idle = end;
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

fn sn_revent(
    _rt: &Runtime,
    eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    _bf: &mut BitField,
    body: &mut WrapBody,
) {
    let m = match body {
        WrapBody::SimpleNet(m) => m,
        _ => panic!("shared-channel LP received a foreign message"),
    };
    let st = state_of(sub);
    if m.is_last && m.remote_event.is_some() {
        eff.local_latency_reverse();
    }
    st.recv_next_idle = m.save_ts;
    st.stats.recv_time = m.save_stat_ns;
    st.stats.packets_recvd -= 1;
    st.stats.bytes_recvd -= m.bytes;
}

fn sn_end_notif(_rt: &Runtime, _eff: &mut Effects<'_>, sub: &mut Box<dyn Any>, _bf: &mut BitField) {
    state_of(sub).stats.end_notifs += 1;
}

fn sn_end_notif_rc(
    _rt: &Runtime,
    _eff: &mut Effects<'_>,
    sub: &mut Box<dyn Any>,
    _bf: &mut BitField,
) {
    state_of(sub).stats.end_notifs -= 1;
}

fn sn_finalize(_rt: &Runtime, gid: Gid, sub: &mut Box<dyn Any>) {
    let st = state_of(sub);
    debug!(
        "simplenet LP {}: sent {} packets / {} bytes, recvd {} packets / {} bytes",
        gid, st.stats.packets_sent, st.stats.bytes_sent, st.stats.packets_recvd, st.stats.bytes_recvd
    );
}

fn sn_model_stats(sub: &dyn Any) -> NetStats {
    sub.downcast_ref::<SimpleNetState>().map(|st| st.stats).unwrap_or_default()
}
