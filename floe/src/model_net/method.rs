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

//! # The sub-model capability table
//!
//! Every network family plugs into the base LP through a [`Method`]: a
//! tagged record of callbacks, registered by value and resolved once at LP
//! init so there is no dynamic dispatch on the hot path. Family state is an
//! opaque `Box<dyn Any>` built by the `new_state` slot; families derive
//! `Default` for their state, which is the typed counterpart of the
//! zero-initialized byte buffer the C ancestry hands its models.

use super::message::{CongestionMsg, Request, WrapBody};
use crate::config::{LpTypeConfig, ModelKind};
use crate::orchestrator::Runtime;
use crate::pdes::{BitField, Effects, Gid, Payload, SimTime};

use std::any::Any;

/// Forward/reverse event handler over the family's envelope variant.
pub type SubEventFn =
    fn(&Runtime, &mut Effects<'_>, &mut Box<dyn Any>, &mut BitField, &mut WrapBody);

/// Handler for control pulses that carry no body (sampling, end
/// notification).
pub type ControlFn = fn(&Runtime, &mut Effects<'_>, &mut Box<dyn Any>, &mut BitField);

/// Handler for congestion-controller messages.
pub type CongestionFn =
    fn(&Runtime, &mut Effects<'_>, &mut Box<dyn Any>, &mut BitField, &mut CongestionMsg);

/// One-shot state hook (family init, sampler init/fini).
pub type SubStateFn = fn(&Runtime, &mut Effects<'_>, &mut Box<dyn Any>);

/// End-of-simulation hook.
pub type SubFinalFn = fn(&Runtime, Gid, &mut Box<dyn Any>);

/// Issue one packet. Returns the offset after which the scheduler may emit
/// the next packet, together with the reverse record undoing the call.
pub type PacketEventFn =
    fn(&Runtime, &mut Effects<'_>, &mut Box<dyn Any>, Packet<'_>) -> (SimTime, PacketRc);

/// Reverse of [`PacketEventFn`].
pub type PacketEventRcFn = fn(&Runtime, &mut Effects<'_>, &mut Box<dyn Any>, &Request, &PacketRc);

/// One packet handed to the family by a scheduler.
#[derive(Debug)]
pub struct Packet<'a> {
    /// The request this packet belongs to.
    pub req: &'a Request,
    /// Bytes carried by this packet.
    pub bytes: u64,
    /// True for the final packet of the message.
    pub is_last: bool,
    /// The remote completion event (final packet only).
    pub remote_event: Option<Payload>,
    /// The local completion event (final packet only).
    pub self_event: Option<Payload>,
    /// True when the packet was issued by the receive scheduler.
    pub is_recv: bool,
}

/// Reverse record of one `packet_event` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PacketRc {
    /// Saved next-idle timestamp.
    pub save_ts: SimTime,
    /// Saved cumulative occupancy. Restored rather than recomputed, so the
    /// reversal is bit-exact.
    pub save_stat_ns: SimTime,
    /// Which per-destination slot `save_ts` belongs to (families with
    /// per-pair state).
    pub slot: usize,
    /// Whether the slot existed before the forward call.
    pub had_entry: bool,
    /// Bytes the forward call accounted.
    pub bytes: u64,
    /// Random draws the forward call consumed.
    pub rng_draws: u8,
}

/// The handler table a network family registers.
#[derive(Debug, Clone, Copy)]
pub struct Method {
    /// The family's model name.
    pub name: &'static str,
    /// The family's model kind.
    pub kind: ModelKind,
    /// True when the family drives its own scheduler loop through idle
    /// events; false makes the base LP re-arm `SchedNext` itself.
    pub self_scheduling: bool,
    /// Build a fresh (default, i.e. all-zero) family state.
    pub new_state: fn() -> Box<dyn Any>,
    /// Family init, called from the base LP's init.
    pub init: SubStateFn,
    /// Forward handler for `Pass` events.
    pub event: SubEventFn,
    /// Reverse handler for `Pass` events.
    pub revent: SubEventFn,
    /// Commit handler for `Pass` events.
    pub commit: Option<SubEventFn>,
    /// End-of-simulation hook.
    pub finalize: Option<SubFinalFn>,
    /// Issue one packet from a scheduler.
    pub packet_event: PacketEventFn,
    /// Undo one `packet_event`.
    pub packet_event_rc: PacketEventRcFn,
    /// Statistics sampler.
    pub sample: Option<ControlFn>,
    /// Reverse of the sampler.
    pub sample_rc: Option<ControlFn>,
    /// Sampler setup.
    pub sample_init: Option<SubStateFn>,
    /// Sampler teardown.
    pub sample_fini: Option<SubFinalFn>,
    /// Termination nudge for heartbeat-driven families.
    pub end_notif: Option<ControlFn>,
    /// Reverse of the termination nudge.
    pub end_notif_rc: Option<ControlFn>,
    /// Congestion-controller event.
    pub congestion_event: Option<CongestionFn>,
    /// Reverse of the congestion-controller event.
    pub congestion_event_rc: Option<CongestionFn>,
    /// Commit of the congestion-controller event.
    pub congestion_event_commit: Option<CongestionFn>,
    /// Post-registration hook (statistics/tracing setup).
    pub post_register: Option<fn(&LpTypeConfig)>,
    /// Read the family's traffic statistics out of its opaque state.
    pub model_stats: Option<fn(&dyn Any) -> super::NetStats>,
}
