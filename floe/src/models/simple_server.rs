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

//! # The simple server fixture
//!
//! Each server sends `num_requests` requests of `request_size` bytes to the
//! next server of its type (by relative id, wrapping around) and
//! acknowledges every request it receives. A server whose `notify_end`
//! property is set and whose relative id is 0 triggers the end-of-workload
//! broadcast once its last acknowledgement arrives.
//!
//! Reverse bitfield: bit 1 marks that the acknowledgement handler sent the
//! next request, bit 2 that it triggered the end broadcast.

use super::{AppMsg, AppMsgKind};
use crate::config::ModelKind;
use crate::model_net::{self, NetId};
use crate::pdes::{BitField, Effects, Gid, LpCtx, LpType, Payload};
use crate::registry::{LpTypeRegistry, RegisteredType};

use log::*;

/// Size of an acknowledgement in bytes.
pub const ACK_SIZE: u64 = 32;

const BF_SENT_NEXT_REQ: u8 = 1;
const BF_TRIGGERED_END: u8 = 2;

/// Per-LP state of the server fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleServerState {
    /// Relative id within the server type.
    pub rel_id: usize,
    /// The server we direct our requests to.
    pub dest_gid: Gid,
    /// The network the requests travel through.
    pub net_id: NetId,
    /// How many requests to issue.
    pub num_requests: u64,
    /// Size of each request in bytes.
    pub request_size: u64,
    /// Whether this server triggers the end-of-workload broadcast.
    pub notify_end: bool,
    /// Requests sent.
    pub msg_sent_count: u64,
    /// Requests received.
    pub msg_recvd_count: u64,
    /// Acknowledgements received.
    pub ack_recvd_count: u64,
    /// Local completions received.
    pub local_recvd_count: u64,
}

/// The handler table of the server fixture.
pub const SIMPLE_SERVER_LP: LpType = LpType {
    init: server_init,
    event: server_event,
    revent: server_event_rc,
    commit: None,
    finalize: Some(server_finalize),
};

/// Register the fixture with the LP-type registry.
pub fn register(registry: &mut LpTypeRegistry) {
    registry.register_known(
        ModelKind::SimpleServer,
        RegisteredType { lp_type: SIMPLE_SERVER_LP, method: None },
    );
}

fn server_init(ctx: &mut LpCtx<'_>) {
    let rt = ctx.rt;
    let gid = ctx.gid;
    let cfg = rt.lp_config(gid);
    let (type_name, rel_id) = rt.mapper.type_info(gid);
    let count = rt.mapper.count_of_type(type_name);
    let dest_gid = rt
        .mapper
        .gid_of(type_name, (rel_id + 1) % count)
        .expect("the next server by relative id always exists");
    assert!(rt.model_net.num_nets() > 0, "server LPs require a configured network");

    let mut state = SimpleServerState {
        rel_id,
        dest_gid,
        net_id: 0,
        num_requests: cfg.props.get_int("num_requests").unwrap_or(1) as u64,
        request_size: cfg.props.get_int("request_size").unwrap_or(1024) as u64,
        notify_end: cfg.props.get_bool("notify_end").unwrap_or(false),
        msg_sent_count: 0,
        msg_recvd_count: 0,
        ack_recvd_count: 0,
        local_recvd_count: 0,
    };
    if state.num_requests > 0 {
        send_request(rt, &mut ctx.eff, &mut state);
    }
    ctx.set_state(state);
}

fn send_request(
    rt: &crate::orchestrator::Runtime,
    eff: &mut Effects<'_>,
    st: &mut SimpleServerState,
) {
    let req_id = st.msg_sent_count;
    let remote = Payload::App(AppMsg { kind: AppMsgKind::Req, src: eff.gid, req_id });
    let local = Payload::App(AppMsg { kind: AppMsgKind::Local, src: eff.gid, req_id });
    model_net::event(
        rt,
        eff,
        st.net_id,
        "server",
        st.dest_gid,
        st.request_size,
        0.0,
        Some(remote),
        Some(local),
    );
    st.msg_sent_count += 1;
}

fn server_event(ctx: &mut LpCtx<'_>, bf: &mut BitField, payload: &mut Payload) {
    let rt = ctx.rt;
    let msg = *payload.app();
    let (st, eff) = ctx.split_state::<SimpleServerState>();
    match msg.kind {
        AppMsgKind::Req => {
            st.msg_recvd_count += 1;
            let remote = Payload::App(AppMsg { kind: AppMsgKind::Ack, src: eff.gid, req_id: msg.req_id });
            let local = Payload::App(AppMsg { kind: AppMsgKind::Local, src: eff.gid, req_id: msg.req_id });
            model_net::event(
                rt,
                eff,
                st.net_id,
                "server",
                msg.src,
                ACK_SIZE,
                0.0,
                Some(remote),
                Some(local),
            );
        }
        AppMsgKind::Ack => {
            st.ack_recvd_count += 1;
            if st.msg_sent_count < st.num_requests {
                bf.set(BF_SENT_NEXT_REQ);
                send_request(rt, eff, st);
            } else if st.ack_recvd_count == st.num_requests && st.notify_end && st.rel_id == 0 {
                bf.set(BF_TRIGGERED_END);
                model_net::end_sim_broadcast(rt, eff, 0.0);
            }
        }
        AppMsgKind::Local => st.local_recvd_count += 1,
    }
}

fn server_event_rc(ctx: &mut LpCtx<'_>, bf: &mut BitField, payload: &mut Payload) {
    let msg = *payload.app();
    let (st, eff) = ctx.split_state::<SimpleServerState>();
    match msg.kind {
        AppMsgKind::Req => {
            model_net::event_rc(eff, 1);
            st.msg_recvd_count -= 1;
        }
        AppMsgKind::Ack => {
            if bf.get(BF_SENT_NEXT_REQ) {
                model_net::event_rc(eff, 1);
                st.msg_sent_count -= 1;
            }
            // the broadcast events were cancelled by the kernel; only the
            // flag records that it happened
            st.ack_recvd_count -= 1;
        }
        AppMsgKind::Local => st.local_recvd_count -= 1,
    }
}

fn server_finalize(ctx: &mut LpCtx<'_>) {
    let gid = ctx.gid;
    let st = ctx.state_mut::<SimpleServerState>();
    debug!(
        "server LP {}: sent {}, recvd {}, acks {}, local {}",
        gid, st.msg_sent_count, st.msg_recvd_count, st.ack_recvd_count, st.local_recvd_count
    );
}
