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

//! The model-net message envelope.
//!
//! Every event delivered to a base LP is a [`WrapMsg`]: a four-field header
//! (magic number, event kind, source, timestamp) followed by either the base
//! control message or one of the sub-model messages. The C ancestry kept
//! these as a union sliced by precomputed offsets; here the body is a tagged
//! enum and each family receives its typed variant.

use super::sched::{SchedParams, SchedRc};
use super::simple_net::SnMessage;
use super::simple_p2p::SpMessage;
use super::NetId;
use crate::pdes::{Gid, Payload, SimTime};

/// Magic number stamped into every model-net envelope.
pub const BASE_MAGIC: u32 = 0x464c_4f45;

/// The event kinds a base LP handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// User-originated send: fragment and enqueue.
    NewMsg,
    /// Scheduler tick: emit the next packet if one is ready.
    SchedNext,
    /// Self-scheduled statistics pulse.
    Sample,
    /// Pre-wrapped event for the sub-model.
    Pass,
    /// Broadcast-initiated termination nudge for sub-models with infinite
    /// heartbeats.
    EndNotif,
    /// Out-of-band event for the congestion controller.
    Congestion,
}

/// The envelope header.
#[derive(Debug, Clone, PartialEq)]
pub struct MsgHeader {
    /// Must equal [`BASE_MAGIC`].
    pub magic: u32,
    /// The event kind.
    pub kind: EventKind,
    /// The LP that created the envelope.
    pub src: Gid,
    /// Creation timestamp.
    pub ts: SimTime,
}

impl MsgHeader {
    /// Stamp a fresh header.
    pub fn new(kind: EventKind, src: Gid, ts: SimTime) -> Self {
        Self { magic: BASE_MAGIC, kind, src, ts }
    }
}

/// A full model-net envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapMsg {
    /// The header.
    pub header: MsgHeader,
    /// The body: base control message or a sub-model message.
    pub body: WrapBody,
}

/// The envelope body.
#[derive(Debug, Clone, PartialEq)]
pub enum WrapBody {
    /// No payload (control pulses such as `Sample` and `EndNotif`).
    Empty,
    /// The base-LP control message.
    Base(BaseMsg),
    /// A shared-channel family message.
    SimpleNet(SnMessage),
    /// A point-to-point family message.
    SimpleP2p(SpMessage),
    /// A congestion-controller message.
    Congestion(CongestionMsg),
}

/// The base-LP control message carried by `NewMsg` and `SchedNext` events.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseMsg {
    /// The send request.
    pub req: Request,
    /// True when the request entered through the receive path of a remote
    /// base LP; selects the receive scheduler.
    pub is_from_remote: bool,
    /// True until the request has taken the NIC sequencing hop.
    pub is_queue_req: bool,
    /// Saved timestamp for reverse computation.
    pub save_ts: SimTime,
    /// Message-specific scheduler parameters.
    pub sched_params: SchedParams,
    /// Per-call reverse structure of the scheduler.
    pub rc: SchedRc,
    /// Event to deliver at the final destination when the payload has fully
    /// arrived.
    pub remote_event: Option<Payload>,
    /// Event to deliver at the source once local completion has occurred.
    pub self_event: Option<Payload>,
}

/// A send request, passed around by the model-net layer (not by users).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    /// The LP the message payload is for.
    pub final_dest_lp: Gid,
    /// The base LP that delivers the payload at the destination side.
    pub dest_mn_lp: Gid,
    /// The user LP that issued the send.
    pub src_lp: Gid,
    /// Time the send was issued.
    pub msg_start_time: SimTime,
    /// Total message size in bytes.
    pub msg_size: u64,
    /// Packet size stamped by the base LP.
    pub packet_size: u64,
    /// Unique message id, set at the base LP. Strictly monotone per LP and
    /// never rewound on rollback.
    pub msg_id: u64,
    /// The network this request travels through.
    pub net_id: NetId,
    /// The injection queue this request was assigned to.
    pub queue_offset: usize,
    /// Category name for statistics.
    pub category: String,
}

/// Out-of-band congestion-controller message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CongestionMsg {
    /// The LP the congestion query originated from.
    pub origin: Gid,
    /// Controller-defined code.
    pub code: u32,
}
