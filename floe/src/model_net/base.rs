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

//! # The model-net base LP
//!
//! Every LP whose model names a network family is an instance of this base
//! LP wrapping the family. All events pass through here before any
//! topology-specific work: packet scheduling, the NIC sequencing hop, the
//! node-local copy path, sampling, and dispatch into the family's handler
//! table.
//!
//! ## Reverse bitfield
//!
//! - bit 0: the scheduler loop finished (set by `SchedNext` when no packet
//!   was ready).
//! - bit 31: this `NewMsg` event started the scheduler loop.
//!
//! The per-call scheduler reverse structure travels inside the triggering
//! event ([`BaseMsg::rc`](super::message::BaseMsg)), so rolling an event back
//! always finds exactly the state its forward pass recorded. `msg_id` is the
//! one deliberate exception: it is never rewound, so optimistic reorderings
//! cannot observe a reused id.

use super::message::{BaseMsg, EventKind, MsgHeader, WrapBody, WrapMsg, BASE_MAGIC};
use super::method::Method;
use super::sched::{SchedEntry, Scheduler};
use super::{BaseParams, NetId};
use crate::config::ComponentKind;
use crate::orchestrator::Runtime;
use crate::pdes::{BitField, Effects, LpCtx, LpType, Payload, SimTime};

use log::*;
use std::any::Any;

/// Bit set by `SchedNext` when the scheduler loop finished.
pub const BF_SCHED_LOOP_DONE: u8 = 0;
/// Bit set by `NewMsg` when it started the scheduler loop.
pub const BF_NEW_MSG_STARTED_LOOP: u8 = 31;

/// Slack added to the sampling end time, so the final pulse is not lost to
/// floating-point noise.
const SAMPLE_EPS: SimTime = 1e-4;

/// Per-LP state of the base LP.
#[derive(Debug)]
pub struct ModelNetBaseState {
    /// The network family this LP implements.
    pub net_id: NetId,
    /// Concurrency factor of the physical node.
    pub nics_per_router: usize,
    /// Monotonically increasing message id counter; never decremented on
    /// rollback.
    pub msg_id: u64,
    /// Next time the NIC sequencing stage is available.
    pub next_available_time: SimTime,
    /// Next-available times of the node-local copy queues.
    pub node_copy_next_available_time: Vec<SimTime>,
    /// Whether the send scheduler loop is running, per injection queue.
    pub in_sched_send_loop: Vec<bool>,
    /// Whether the receive scheduler loop is running.
    pub in_sched_recv_loop: bool,
    /// One send scheduler per injection queue.
    pub sched_send: Vec<Scheduler>,
    /// The receive scheduler.
    pub sched_recv: Scheduler,
    /// Servers attached to this network LP.
    pub num_servers: usize,
    /// Servers per injection queue.
    pub servers_per_node: usize,
    /// Servers per node-copy queue.
    pub servers_per_node_queue: usize,
    /// Base parameters for this LP's annotation.
    pub params: BaseParams,
    /// The family's opaque state.
    pub sub_state: Box<dyn Any>,
}

/// The handler table installed on every base LP.
pub const MODEL_NET_BASE_LP: LpType = LpType {
    init: base_init,
    event: base_event,
    revent: base_event_rc,
    commit: Some(base_commit),
    finalize: Some(base_finalize),
};

fn base_init(ctx: &mut LpCtx<'_>) {
    let rt = ctx.rt;
    let gid = ctx.gid;
    let cfg = rt.lp_config(gid);
    let net_id = rt.model_net.net_id_for_model(&cfg.model_name).unwrap_or_else(|| {
        panic!("LP type `{}` (model `{}`) is not a configured network", cfg.name, cfg.model_name)
    });
    let method = *rt.model_net.method(net_id);
    let params = rt.model_net.params_for(cfg.annotation()).clone();

    // one NIC per physical node in the topologies handled here
    let nics_per_router = 1;
    let num_servers = rt.mapper.neighbor_count_by_kind(gid, &rt.lp_configs, ComponentKind::Host);
    let servers_per_node = (num_servers / params.num_queues).max(1);
    let servers_per_node_queue =
        (num_servers / nics_per_router / params.node_copy_queues).max(1);
    debug!(
        "LP {}: model `{}`, {} servers, {} per injection queue, {} per copy queue",
        gid, method.name, num_servers, servers_per_node, servers_per_node_queue
    );

    let sched_send =
        (0..params.num_queues).map(|_| Scheduler::new(&params.sched, false)).collect();
    let sched_recv = Scheduler::new(&params.sched, true);

    // some families rely on starting from the all-zero state
    let mut sub_state = (method.new_state)();
    (method.init)(rt, &mut ctx.eff, &mut sub_state);

    if let Some(sampling) = rt.model_net.sampling {
        match method.sample {
            Some(_) => {
                if let Some(sample_init) = method.sample_init {
                    sample_init(rt, &mut ctx.eff, &mut sub_state);
                }
                if sampling.interval < sampling.end + SAMPLE_EPS {
                    let wrap = WrapMsg {
                        header: MsgHeader::new(EventKind::Sample, gid, 0.0),
                        body: WrapBody::Empty,
                    };
                    ctx.eff.send(gid, sampling.interval, Payload::ModelNet(Box::new(wrap)));
                }
            }
            None => panic!(
                "sampling enabled for model `{}` which does not provide a sampler",
                method.name
            ),
        }
    }

    ctx.set_state(ModelNetBaseState {
        net_id,
        nics_per_router,
        msg_id: 0,
        next_available_time: 0.0,
        node_copy_next_available_time: vec![0.0; params.node_copy_queues],
        in_sched_send_loop: vec![false; params.num_queues],
        in_sched_recv_loop: false,
        sched_send,
        sched_recv,
        num_servers,
        servers_per_node,
        servers_per_node_queue,
        params,
        sub_state,
    });
}

fn base_event(ctx: &mut LpCtx<'_>, bf: &mut BitField, payload: &mut Payload) {
    let rt = ctx.rt;
    let gid = ctx.gid;
    let wrap = payload.model_net_mut();
    assert_eq!(wrap.header.magic, BASE_MAGIC, "envelope with wrong magic at LP {}", gid);
    let kind = wrap.header.kind;
    let (st, eff) = ctx.split_state::<ModelNetBaseState>();
    let method = *rt.model_net.method(st.net_id);
    match kind {
        EventKind::NewMsg => match &mut wrap.body {
            WrapBody::Base(m) => handle_new_msg(rt, eff, st, &method, bf, m),
            _ => panic!("NewMsg envelope without a base body"),
        },
        EventKind::SchedNext => match &mut wrap.body {
            WrapBody::Base(m) => handle_sched_next(rt, eff, st, &method, bf, m),
            _ => panic!("SchedNext envelope without a base body"),
        },
        EventKind::Sample => handle_sample(rt, eff, st, &method, bf),
        EventKind::Pass => (method.event)(rt, eff, &mut st.sub_state, bf, &mut wrap.body),
        EventKind::EndNotif => match method.end_notif {
            Some(end_notif) => end_notif(rt, eff, &mut st.sub_state, bf),
            None => panic!(
                "end notification delivered to model `{}` without an end_notif handler",
                method.name
            ),
        },
        EventKind::Congestion => {
            assert!(
                rt.model_net.congestion_enabled,
                "congestion event while congestion control is disabled"
            );
            let handler = method.congestion_event.unwrap_or_else(|| {
                panic!("congestion event for model `{}` without a handler", method.name)
            });
            match &mut wrap.body {
                WrapBody::Congestion(c) => handler(rt, eff, &mut st.sub_state, bf, c),
                _ => panic!("Congestion envelope without a congestion body"),
            }
        }
    }
}

fn base_event_rc(ctx: &mut LpCtx<'_>, bf: &mut BitField, payload: &mut Payload) {
    let rt = ctx.rt;
    let wrap = payload.model_net_mut();
    assert_eq!(wrap.header.magic, BASE_MAGIC);
    let kind = wrap.header.kind;
    let (st, eff) = ctx.split_state::<ModelNetBaseState>();
    let method = *rt.model_net.method(st.net_id);
    match kind {
        EventKind::NewMsg => match &mut wrap.body {
            WrapBody::Base(m) => handle_new_msg_rc(rt, eff, st, &method, bf, m),
            _ => panic!("NewMsg envelope without a base body"),
        },
        EventKind::SchedNext => match &mut wrap.body {
            WrapBody::Base(m) => handle_sched_next_rc(rt, eff, st, &method, bf, m),
            _ => panic!("SchedNext envelope without a base body"),
        },
        EventKind::Sample => {
            let sample_rc = method
                .sample_rc
                .unwrap_or_else(|| panic!("model `{}` has no reverse sampler", method.name));
            sample_rc(rt, eff, &mut st.sub_state, bf);
        }
        EventKind::Pass => (method.revent)(rt, eff, &mut st.sub_state, bf, &mut wrap.body),
        EventKind::EndNotif => {
            if let Some(end_notif_rc) = method.end_notif_rc {
                end_notif_rc(rt, eff, &mut st.sub_state, bf);
            }
        }
        EventKind::Congestion => {
            if let Some(congestion_rc) = method.congestion_event_rc {
                match &mut wrap.body {
                    WrapBody::Congestion(c) => congestion_rc(rt, eff, &mut st.sub_state, bf, c),
                    _ => panic!("Congestion envelope without a congestion body"),
                }
            }
        }
    }
}

fn base_commit(ctx: &mut LpCtx<'_>, bf: &mut BitField, payload: &mut Payload) {
    let rt = ctx.rt;
    let wrap = payload.model_net_mut();
    let kind = wrap.header.kind;
    let (st, eff) = ctx.split_state::<ModelNetBaseState>();
    let method = *rt.model_net.method(st.net_id);
    match kind {
        EventKind::Pass => {
            if let Some(commit) = method.commit {
                commit(rt, eff, &mut st.sub_state, bf, &mut wrap.body);
            }
        }
        EventKind::Congestion => {
            if let Some(commit) = method.congestion_event_commit {
                match &mut wrap.body {
                    WrapBody::Congestion(c) => commit(rt, eff, &mut st.sub_state, bf, c),
                    _ => panic!("Congestion envelope without a congestion body"),
                }
            }
        }
        _ => {}
    }
}

fn base_finalize(ctx: &mut LpCtx<'_>) {
    let rt = ctx.rt;
    let gid = ctx.gid;
    let st = ctx.state_mut::<ModelNetBaseState>();
    let method = *rt.model_net.method(st.net_id);
    if rt.model_net.sampling.is_some() {
        if let Some(sample_fini) = method.sample_fini {
            sample_fini(rt, gid, &mut st.sub_state);
        }
    }
    if let Some(finalize) = method.finalize {
        finalize(rt, gid, &mut st.sub_state);
    }
}

fn handle_new_msg(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    st: &mut ModelNetBaseState,
    method: &Method,
    bf: &mut BitField,
    m: &mut BaseMsg,
) {
    let now = eff.now;
    let gid = eff.gid;

    // node copy: the destination base LP is this very LP
    if gid == m.req.dest_mn_lp {
        let offset = 0; // single-connection hosts
        let queue = offset / st.nics_per_router / st.servers_per_node_queue;
        m.save_ts = st.node_copy_next_available_time[queue];
        let mut exp = st.node_copy_next_available_time[queue].max(now)
            + m.req.msg_size as f64 * rt.model_net.node_copy_ns_per_byte
            - now;
        let delay = eff.local_latency();
        st.node_copy_next_available_time[queue] = now + exp;
        if let Some(remote) = &m.remote_event {
            exp += delay;
            eff.send(m.req.final_dest_lp, exp, remote.clone());
        }
        if let Some(self_ev) = &m.self_event {
            exp += delay;
            eff.send(m.req.src_lp, exp, self_ev.clone());
        }
        return;
    }

    // first hop into this NIC: apply the sequencing delay and resend to
    // ourselves with the queued bit cleared
    if m.is_queue_req {
        m.save_ts = st.next_available_time;
        let exp = st.next_available_time.max(now) + st.params.nic_seq_delay + eff.local_latency();
        st.next_available_time = exp;
        let mut requeued = m.clone();
        requeued.is_queue_req = false;
        let wrap =
            WrapMsg { header: MsgHeader::new(EventKind::NewMsg, gid, now), body: WrapBody::Base(requeued) };
        eff.send(gid, exp - now, Payload::ModelNet(Box::new(wrap)));
        return;
    }

    // hand the request to the scheduler; we are responsible for the packet
    // size and the message id from here on
    st.msg_id += 1;
    m.req.msg_id = st.msg_id;
    m.req.packet_size = st.params.packet_size;
    let queue_offset = if !m.is_from_remote && st.params.num_queues != 1 {
        let offset = 0; // single-connection hosts
        (offset / st.servers_per_node) % st.params.num_queues
    } else {
        0
    };
    m.req.queue_offset = queue_offset;

    let entry = SchedEntry {
        req: m.req.clone(),
        params: m.sched_params,
        remaining: m.req.msg_size,
        remote_event: m.remote_event.take(),
        self_event: m.self_event.take(),
    };
    let started = {
        let (sched, in_loop) = select_sched(st, m.is_from_remote, queue_offset);
        sched.add(entry, &mut m.rc);
        let started = !*in_loop;
        *in_loop = true;
        started
    };
    if started {
        // no extra SchedNext event is needed while we are idle; the sched rc
        // slots for add and next do not overlap, so the tick can run inline
        bf.set(BF_NEW_MSG_STARTED_LOOP);
        handle_sched_next(rt, eff, st, method, bf, m);
    }
}

fn handle_new_msg_rc(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    st: &mut ModelNetBaseState,
    method: &Method,
    bf: &mut BitField,
    m: &mut BaseMsg,
) {
    let gid = eff.gid;

    if gid == m.req.dest_mn_lp {
        eff.local_latency_reverse();
        let queue = 0;
        st.node_copy_next_available_time[queue] = m.save_ts;
        return;
    }
    if m.is_queue_req {
        eff.local_latency_reverse();
        st.next_available_time = m.save_ts;
        return;
    }

    let is_recv = m.is_from_remote;
    let queue_offset = m.req.queue_offset;
    if bf.get(BF_NEW_MSG_STARTED_LOOP) {
        handle_sched_next_rc(rt, eff, st, method, bf, m);
        if is_recv {
            st.in_sched_recv_loop = false;
        } else {
            st.in_sched_send_loop[queue_offset] = false;
        }
    }
    let entry = if is_recv {
        st.sched_recv.add_rc(&m.rc)
    } else {
        st.sched_send[queue_offset].add_rc(&m.rc)
    };
    // the payloads moved into the queue return to the message, so a replay
    // finds the event exactly as it first arrived; msg_id stays advanced
    m.remote_event = entry.remote_event;
    m.self_event = entry.self_event;
}

fn handle_sched_next(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    st: &mut ModelNetBaseState,
    method: &Method,
    bf: &mut BitField,
    m: &mut BaseMsg,
) {
    let is_recv = m.is_from_remote;
    let queue_offset = m.req.queue_offset;
    let ret = if is_recv {
        st.sched_recv.next(rt, eff, &mut st.sub_state, method, &mut m.rc)
    } else {
        st.sched_send[queue_offset].next(rt, eff, &mut st.sub_state, method, &mut m.rc)
    };
    match ret {
        None => {
            bf.set(BF_SCHED_LOOP_DONE);
            if is_recv {
                st.in_sched_recv_loop = false;
            } else {
                st.in_sched_send_loop[queue_offset] = false;
            }
        }
        Some(poffset) => {
            // families using the callback-based loop re-enter through their
            // own idle events; for the others we schedule the next tick
            if !method.self_scheduling {
                let jitter = eff.local_latency();
                let gid = eff.gid;
                let now = eff.now;
                let mut tick = BaseMsg::default();
                tick.is_from_remote = is_recv;
                tick.req.queue_offset = queue_offset;
                let wrap = WrapMsg {
                    header: MsgHeader::new(EventKind::SchedNext, gid, now),
                    body: WrapBody::Base(tick),
                };
                eff.send(gid, poffset + jitter, Payload::ModelNet(Box::new(wrap)));
            }
        }
    }
}

fn handle_sched_next_rc(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    st: &mut ModelNetBaseState,
    method: &Method,
    bf: &mut BitField,
    m: &mut BaseMsg,
) {
    let is_recv = m.is_from_remote;
    let queue_offset = m.req.queue_offset;
    if bf.get(BF_SCHED_LOOP_DONE) {
        if is_recv {
            st.in_sched_recv_loop = true;
        } else {
            st.in_sched_send_loop[queue_offset] = true;
        }
    } else {
        if !method.self_scheduling {
            eff.local_latency_reverse();
        }
        if is_recv {
            st.sched_recv.next_rc(rt, eff, &mut st.sub_state, method, &mut m.rc);
        } else {
            st.sched_send[queue_offset].next_rc(rt, eff, &mut st.sub_state, method, &mut m.rc);
        }
    }
}

fn handle_sample(
    rt: &Runtime,
    eff: &mut Effects<'_>,
    st: &mut ModelNetBaseState,
    method: &Method,
    bf: &mut BitField,
) {
    let sampling = rt.model_net.sampling.expect("sample event while sampling is disabled");
    let sample = method
        .sample
        .unwrap_or_else(|| panic!("model `{}` does not provide a sampler", method.name));
    sample(rt, eff, &mut st.sub_state, bf);
    // re-arm precisely, no noise
    if eff.now + sampling.interval < sampling.end + SAMPLE_EPS {
        let gid = eff.gid;
        let wrap =
            WrapMsg { header: MsgHeader::new(EventKind::Sample, gid, eff.now), body: WrapBody::Empty };
        eff.send(gid, sampling.interval, Payload::ModelNet(Box::new(wrap)));
    }
}

fn select_sched<'s>(
    st: &'s mut ModelNetBaseState,
    is_recv: bool,
    queue_offset: usize,
) -> (&'s mut Scheduler, &'s mut bool) {
    if is_recv {
        (&mut st.sched_recv, &mut st.in_sched_recv_loop)
    } else {
        (&mut st.sched_send[queue_offset], &mut st.in_sched_send_loop[queue_offset])
    }
}
