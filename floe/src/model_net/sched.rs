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

//! # Packet schedulers
//!
//! A [`Scheduler`] sequences queued send requests and fragments them into
//! packets. Three policies exist: FCFS, FCFS over full messages (realized by
//! the packet-size override in the base parameters, which makes one "packet"
//! cover the whole message), and a priority policy with an FCFS sub-policy
//! per priority level.
//!
//! Every mutating call fills a reverse record ([`SchedRc`], carried inside
//! the event that triggered the call) with exactly the information needed to
//! undo it.

use super::method::{Method, Packet, PacketRc};
use super::message::Request;
use crate::orchestrator::Runtime;
use crate::pdes::{Effects, Payload, SimTime};

use std::any::Any;
use std::collections::VecDeque;

/// The scheduler policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    /// First come, first served, fragmenting into packets.
    Fcfs,
    /// First come, first served over whole messages (no fragmentation).
    FcfsFull,
    /// Fixed priorities with an FCFS sub-policy.
    Prio,
}

/// The fixed scheduler-name set accepted by `modelnet_scheduler`.
pub const SCHED_NAMES: [(&str, SchedulerKind); 3] = [
    ("fcfs", SchedulerKind::Fcfs),
    ("fcfs-full", SchedulerKind::FcfsFull),
    ("priority", SchedulerKind::Prio),
];

/// Resolve a scheduler name against the fixed name set.
pub fn scheduler_by_name(name: &str) -> Option<SchedulerKind> {
    SCHED_NAMES.iter().find(|(n, _)| *n == name).map(|(_, k)| *k)
}

/// Scheduler configuration of one base-parameter record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedConfig {
    /// The policy.
    pub kind: SchedulerKind,
    /// Number of priority levels (priority policy only).
    pub num_prios: usize,
    /// Sub-policy of the priority scheduler.
    pub sub: SchedulerKind,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self { kind: SchedulerKind::Fcfs, num_prios: 1, sub: SchedulerKind::Fcfs }
    }
}

/// Per-message scheduler parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SchedParams {
    /// Requested priority; lower is served first. Unset requests go to the
    /// lowest priority level.
    pub prio: Option<usize>,
}

/// A queued request with its remaining byte count and completion payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedEntry {
    /// The request.
    pub req: Request,
    /// Message-specific parameters.
    pub params: SchedParams,
    /// Bytes not yet emitted.
    pub remaining: u64,
    /// Remote completion payload, issued with the final packet.
    pub remote_event: Option<Payload>,
    /// Local completion payload, issued with the final packet.
    pub self_event: Option<Payload>,
}

/// Reverse record of one scheduler interaction, carried in the event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchedRc {
    /// Priority level the `add` call used.
    pub add_prio: usize,
    /// Reverse record of the `next` call, if one was made.
    pub next: Option<NextRc>,
}

/// Reverse record of one `next` call that emitted a packet.
#[derive(Debug, Clone, PartialEq)]
pub struct NextRc {
    /// Priority level served.
    pub prio: usize,
    /// Bytes emitted.
    pub bytes: u64,
    /// The entry popped when the message finished, to be re-queued in
    /// reverse.
    pub entry: Option<Box<SchedEntry>>,
    /// The family's reverse record.
    pub pkt: PacketRc,
}

/// One send or receive scheduler of a base LP.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    kind: SchedulerKind,
    queues: Vec<VecDeque<SchedEntry>>,
    is_recv: bool,
}

impl Scheduler {
    /// Create a scheduler for the given configuration.
    pub fn new(cfg: &SchedConfig, is_recv: bool) -> Self {
        let levels = match cfg.kind {
            SchedulerKind::Prio => cfg.num_prios.max(1),
            _ => 1,
        };
        Self { kind: cfg.kind, queues: vec![VecDeque::new(); levels], is_recv }
    }

    /// True when no request is queued on any level.
    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    /// Number of queued requests across all levels.
    pub fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Queue a request.
    pub fn add(&mut self, entry: SchedEntry, rc: &mut SchedRc) {
        let prio = match self.kind {
            SchedulerKind::Prio => {
                entry.params.prio.unwrap_or(self.queues.len() - 1).min(self.queues.len() - 1)
            }
            _ => 0,
        };
        rc.add_prio = prio;
        self.queues[prio].push_back(entry);
    }

    /// Undo the matching `add`, returning the entry so its payloads can be
    /// restored into the message.
    pub fn add_rc(&mut self, rc: &SchedRc) -> SchedEntry {
        self.queues[rc.add_prio].pop_back().expect("scheduler reverse of add on empty queue")
    }

    /// Emit the next packet, if any request is queued. Returns the offset
    /// after which the next packet may be emitted.
    pub fn next(
        &mut self,
        rt: &Runtime,
        eff: &mut Effects<'_>,
        sub_state: &mut Box<dyn Any>,
        method: &Method,
        rc: &mut SchedRc,
    ) -> Option<SimTime> {
        let qi = self.queues.iter().position(|q| !q.is_empty())?;
        let (poffset, pkt_rc, bytes, finished) = {
            let entry = self.queues[qi].front_mut().unwrap();
            let bytes = entry.req.packet_size.min(entry.remaining);
            let finished = bytes == entry.remaining;
            let packet = Packet {
                req: &entry.req,
                bytes,
                is_last: finished,
                remote_event: if finished { entry.remote_event.clone() } else { None },
                self_event: if finished { entry.self_event.clone() } else { None },
                is_recv: self.is_recv,
            };
            let (poffset, pkt_rc) = (method.packet_event)(rt, eff, sub_state, packet);
            (poffset, pkt_rc, bytes, finished)
        };
        let popped = if finished {
            Some(Box::new(self.queues[qi].pop_front().unwrap()))
        } else {
            self.queues[qi].front_mut().unwrap().remaining -= bytes;
            None
        };
        rc.next = Some(NextRc { prio: qi, bytes, entry: popped, pkt: pkt_rc });
        Some(poffset)
    }

    /// Undo the matching `next`.
    pub fn next_rc(
        &mut self,
        rt: &Runtime,
        eff: &mut Effects<'_>,
        sub_state: &mut Box<dyn Any>,
        method: &Method,
        rc: &mut SchedRc,
    ) {
        let next = rc.next.take().expect("scheduler reverse without a forward record");
        match next.entry {
            Some(entry) => {
                (method.packet_event_rc)(rt, eff, sub_state, &entry.req, &next.pkt);
                self.queues[next.prio].push_front(*entry);
            }
            None => {
                let entry = self.queues[next.prio]
                    .front_mut()
                    .expect("scheduler reverse of next on empty queue");
                entry.remaining += next.bytes;
                let req = entry.req.clone();
                (method.packet_event_rc)(rt, eff, sub_state, &req, &next.pkt);
            }
        }
    }
}
