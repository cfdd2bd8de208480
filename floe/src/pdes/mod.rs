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

//! # The embedded PDES kernel
//!
//! A sequential discrete-event kernel playing the role of the external PDES
//! runtime: a timestamp-ordered event queue with deterministic tie-breaking
//! (timestamp, then sender id, then sequence number), per-LP handler tables,
//! per-LP reversible random streams, and a processed-event stack supporting
//! synthetic rollback of the most recent events.
//!
//! Within a unit, event handlers run to completion and never suspend; the
//! only yield is emitting a future event through [`Effects::send`] and
//! returning. Events emitted by a rolled-back event are cancelled before the
//! reverse handler runs, so a reverse handler only ever undoes local state.

mod rng;

pub use rng::ReversibleRng;

use crate::model_net::message::WrapMsg;
use crate::models::AppMsg;
use crate::orchestrator::Runtime;

use std::any::Any;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// Process-wide unique integer identifying an LP.
pub type Gid = u64;

/// Simulated time, in nanoseconds.
pub type SimTime = f64;

/// Index of the random stream reserved for local latency jitter.
pub const LOCAL_LATENCY_STREAM: usize = 0;
/// Index of the random stream reserved for the congestion controller.
pub const CONGESTION_STREAM: usize = 1;
/// Number of independent random streams per LP.
pub const NUM_RNG_STREAMS: usize = 2;

/// Range of the local latency jitter, in nanoseconds.
pub const LOCAL_LATENCY_NS: SimTime = 1.0;

/// The per-event reverse bitfield (at most 32 bits). Each forward branch
/// that needs to be undone sets a documented bit; the matching reverse
/// handler consumes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitField(u32);

impl BitField {
    /// Set bit `bit`.
    pub fn set(&mut self, bit: u8) {
        debug_assert!(bit < 32);
        self.0 |= 1 << bit;
    }

    /// Clear bit `bit`.
    pub fn clear(&mut self, bit: u8) {
        debug_assert!(bit < 32);
        self.0 &= !(1 << bit);
    }

    /// Read bit `bit`.
    pub fn get(&self, bit: u8) -> bool {
        debug_assert!(bit < 32);
        self.0 & (1 << bit) != 0
    }
}

/// The payload of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A model-net envelope, delivered to a base LP.
    ModelNet(Box<WrapMsg>),
    /// An application-level message, delivered to a user LP.
    App(AppMsg),
}

impl Payload {
    /// The model-net envelope, or a panic if the payload is application
    /// level. Base LPs only ever receive model-net envelopes.
    pub fn model_net_mut(&mut self) -> &mut WrapMsg {
        match self {
            Payload::ModelNet(m) => m,
            Payload::App(_) => panic!("expected a model-net envelope"),
        }
    }

    /// Immutable access to the model-net envelope.
    pub fn model_net(&self) -> &WrapMsg {
        match self {
            Payload::ModelNet(m) => m,
            Payload::App(_) => panic!("expected a model-net envelope"),
        }
    }

    /// The application message, or a panic for model-net envelopes.
    pub fn app(&self) -> &AppMsg {
        match self {
            Payload::App(m) => m,
            Payload::ModelNet(_) => panic!("expected an application message"),
        }
    }
}

/// Handler table of an LP type, analogous to a PDES runtime function table.
#[derive(Debug, Clone, Copy)]
pub struct LpType {
    /// Called once per LP before the simulation starts. Builds the LP state
    /// (via [`LpCtx::set_state`]) and may emit kickoff events.
    pub init: fn(&mut LpCtx<'_>),
    /// Forward event handler.
    pub event: fn(&mut LpCtx<'_>, &mut BitField, &mut Payload),
    /// Reverse event handler; must exactly undo `event`.
    pub revent: fn(&mut LpCtx<'_>, &mut BitField, &mut Payload),
    /// Called when an event can no longer be rolled back.
    pub commit: Option<fn(&mut LpCtx<'_>, &mut BitField, &mut Payload)>,
    /// Called once per LP at the end of the simulation.
    pub finalize: Option<fn(&mut LpCtx<'_>)>,
}

/// A pending send recorded by a handler.
struct PendingSend {
    dest: Gid,
    offset: SimTime,
    payload: Payload,
}

/// The side-effect surface handlers use: emitting future events and drawing
/// from the LP's reversible random streams.
pub struct Effects<'a> {
    /// The LP this context belongs to.
    pub gid: Gid,
    /// Current simulated time.
    pub now: SimTime,
    rngs: &'a mut [ReversibleRng],
    sink: &'a mut Vec<PendingSend>,
}

impl Effects<'_> {
    /// Emit an event to `dest` at `now + offset`.
    pub fn send(&mut self, dest: Gid, offset: SimTime, payload: Payload) {
        assert!(offset >= 0.0, "cannot schedule an event into the past");
        self.sink.push(PendingSend { dest, offset, payload });
    }

    /// Draw a uniform value in `[low, high)` from the given stream.
    pub fn uniform(&mut self, stream: usize, low: f64, high: f64) -> f64 {
        self.rngs[stream].uniform(low, high)
    }

    /// Undo the most recent draw on the given stream.
    pub fn uniform_reverse(&mut self, stream: usize) {
        self.rngs[stream].reverse();
    }

    /// Draw the local latency jitter (stream 0).
    pub fn local_latency(&mut self) -> SimTime {
        self.rngs[LOCAL_LATENCY_STREAM].uniform(0.0, LOCAL_LATENCY_NS)
    }

    /// Undo one local latency draw.
    pub fn local_latency_reverse(&mut self) {
        self.rngs[LOCAL_LATENCY_STREAM].reverse();
    }
}

/// The context handed to every LP callback.
pub struct LpCtx<'a> {
    /// The LP's global id.
    pub gid: Gid,
    /// Current simulated time.
    pub now: SimTime,
    /// The process-wide runtime (mapper, registry, configuration). Read-only
    /// after configuration.
    pub rt: &'a Runtime,
    state: &'a mut Box<dyn Any>,
    /// Side effects: event emission and random streams.
    pub eff: Effects<'a>,
}

impl<'a> LpCtx<'a> {
    /// Install the LP state. Called from init handlers.
    pub fn set_state<T: Any>(&mut self, state: T) {
        *self.state = Box::new(state);
    }

    /// Downcast the LP state. Panics when the state has a different type,
    /// which indicates a broken handler-table binding.
    pub fn state_mut<T: Any>(&mut self) -> &mut T {
        self.state.downcast_mut::<T>().expect("LP state has unexpected type")
    }

    /// Split the context into the downcast state and the side-effect
    /// surface, so handlers can mutate both at once.
    pub fn split_state<T: Any>(&mut self) -> (&mut T, &mut Effects<'a>) {
        let state = self.state.downcast_mut::<T>().expect("LP state has unexpected type");
        (state, &mut self.eff)
    }
}

/// One event in flight.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    /// Kernel-wide unique sequence number; the final ordering tie-breaker.
    pub id: u64,
    /// Delivery timestamp.
    pub ts: SimTime,
    /// The LP that emitted the event.
    pub sender: Gid,
    /// The LP the event is delivered to.
    pub dest: Gid,
    /// The payload. Handlers may mutate it (reverse state is stored inside).
    pub payload: Payload,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ts
            .total_cmp(&other.ts)
            .then(self.sender.cmp(&other.sender))
            .then(self.id.cmp(&other.id))
    }
}

struct ProcessedEvent {
    ev: QueuedEvent,
    bf: BitField,
    emitted: Vec<u64>,
}

struct Lp {
    gid: Gid,
    ty: LpType,
    state: Box<dyn Any>,
    rngs: Vec<ReversibleRng>,
}

/// The sequential event kernel.
pub struct Kernel {
    end_time: SimTime,
    now: SimTime,
    next_id: u64,
    queue: BinaryHeap<Reverse<QueuedEvent>>,
    lps: Vec<Lp>,
    processed: Vec<ProcessedEvent>,
}

impl Kernel {
    /// Create a kernel that delivers events up to and including `end_time`.
    pub fn new(end_time: SimTime) -> Self {
        Self {
            end_time,
            now: 0.0,
            next_id: 0,
            queue: BinaryHeap::new(),
            lps: Vec::new(),
            processed: Vec::new(),
        }
    }

    /// Bind the next LP. LPs must be bound in global-id order, so kernel
    /// slots and global ids coincide.
    pub fn bind_lp(&mut self, gid: Gid, ty: LpType, seed: u64) {
        assert_eq!(gid as usize, self.lps.len(), "LPs must be bound in global-id order");
        let rngs = (0..NUM_RNG_STREAMS)
            .map(|s| ReversibleRng::new(seed * NUM_RNG_STREAMS as u64 + s as u64))
            .collect();
        self.lps.push(Lp { gid, ty, state: Box::new(()), rngs });
    }

    /// Number of bound LPs.
    pub fn num_lps(&self) -> usize {
        self.lps.len()
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The simulation end timestamp.
    pub fn end_time(&self) -> SimTime {
        self.end_time
    }

    /// Number of processed (not yet committed) events.
    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    /// Number of events still queued.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Run every LP's init handler, collecting kickoff events.
    pub fn init(&mut self, rt: &Runtime) {
        for i in 0..self.lps.len() {
            let mut sink = Vec::new();
            {
                let lp = &mut self.lps[i];
                let mut ctx = LpCtx {
                    gid: lp.gid,
                    now: 0.0,
                    rt,
                    state: &mut lp.state,
                    eff: Effects { gid: lp.gid, now: 0.0, rngs: &mut lp.rngs, sink: &mut sink },
                };
                (lp.ty.init)(&mut ctx);
            }
            let sender = self.lps[i].gid;
            for p in sink {
                self.push_event(p.dest, p.offset, sender, p.payload);
            }
        }
    }

    /// Enqueue an event directly. Mostly useful for tests.
    pub fn inject(&mut self, dest: Gid, ts: SimTime, sender: Gid, payload: Payload) -> u64 {
        self.push_event(dest, ts, sender, payload)
    }

    /// Process queued events until the queue drains or the end time passes.
    /// Returns the number of events processed.
    pub fn run(&mut self, rt: &Runtime) -> usize {
        self.run_steps(rt, usize::MAX)
    }

    /// Process at most `max_steps` events.
    pub fn run_steps(&mut self, rt: &Runtime, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps {
            match self.queue.peek() {
                Some(Reverse(ev)) if ev.ts <= self.end_time => {}
                _ => break,
            }
            let Reverse(ev) = self.queue.pop().unwrap();
            self.dispatch(rt, ev);
            steps += 1;
        }
        steps
    }

    /// Roll back the `k` most recently processed events, newest first. The
    /// events they emitted are cancelled, their reverse handlers run, and the
    /// events themselves return to the queue for re-execution.
    pub fn rollback(&mut self, k: usize, rt: &Runtime) {
        assert!(k <= self.processed.len(), "cannot roll back more events than were processed");
        for _ in 0..k {
            let mut pe = self.processed.pop().unwrap();
            if !pe.emitted.is_empty() {
                let ids: HashSet<u64> = pe.emitted.iter().copied().collect();
                self.queue.retain(|Reverse(e)| !ids.contains(&e.id));
            }
            self.now = pe.ev.ts;
            let mut sink = Vec::new();
            {
                let lp = &mut self.lps[pe.ev.dest as usize];
                let mut ctx = LpCtx {
                    gid: lp.gid,
                    now: pe.ev.ts,
                    rt,
                    state: &mut lp.state,
                    eff: Effects {
                        gid: lp.gid,
                        now: pe.ev.ts,
                        rngs: &mut lp.rngs,
                        sink: &mut sink,
                    },
                };
                (lp.ty.revent)(&mut ctx, &mut pe.bf, &mut pe.ev.payload);
            }
            assert!(sink.is_empty(), "reverse handlers must not send events");
            self.queue.push(Reverse(pe.ev));
        }
    }

    /// Commit all processed events in order, then run the per-LP finalize
    /// handlers.
    pub fn finalize(&mut self, rt: &Runtime) {
        let mut processed = std::mem::take(&mut self.processed);
        for pe in processed.iter_mut() {
            let mut sink = Vec::new();
            let lp = &mut self.lps[pe.ev.dest as usize];
            if let Some(commit) = lp.ty.commit {
                let mut ctx = LpCtx {
                    gid: lp.gid,
                    now: pe.ev.ts,
                    rt,
                    state: &mut lp.state,
                    eff: Effects {
                        gid: lp.gid,
                        now: pe.ev.ts,
                        rngs: &mut lp.rngs,
                        sink: &mut sink,
                    },
                };
                commit(&mut ctx, &mut pe.bf, &mut pe.ev.payload);
            }
            assert!(sink.is_empty(), "commit handlers must not send events");
        }
        for i in 0..self.lps.len() {
            let mut sink = Vec::new();
            let now = self.now;
            let lp = &mut self.lps[i];
            if let Some(finalize) = lp.ty.finalize {
                let mut ctx = LpCtx {
                    gid: lp.gid,
                    now,
                    rt,
                    state: &mut lp.state,
                    eff: Effects { gid: lp.gid, now, rngs: &mut lp.rngs, sink: &mut sink },
                };
                finalize(&mut ctx);
            }
            assert!(sink.is_empty(), "finalize handlers must not send events");
        }
    }

    /// Downcast the state of an LP. Panics on a type mismatch.
    pub fn state<T: Any>(&self, gid: Gid) -> &T {
        self.lps[gid as usize].state.downcast_ref::<T>().expect("LP state has unexpected type")
    }

    /// The position of one of an LP's random streams.
    pub fn rng_position(&self, gid: Gid, stream: usize) -> usize {
        self.lps[gid as usize].rngs[stream].position()
    }

    fn dispatch(&mut self, rt: &Runtime, mut ev: QueuedEvent) {
        self.now = ev.ts;
        let slot = ev.dest as usize;
        assert!(slot < self.lps.len(), "event addressed to unknown LP {}", ev.dest);
        let mut bf = BitField::default();
        let mut sink = Vec::new();
        {
            let lp = &mut self.lps[slot];
            let mut ctx = LpCtx {
                gid: lp.gid,
                now: ev.ts,
                rt,
                state: &mut lp.state,
                eff: Effects { gid: lp.gid, now: ev.ts, rngs: &mut lp.rngs, sink: &mut sink },
            };
            (lp.ty.event)(&mut ctx, &mut bf, &mut ev.payload);
        }
        let sender = ev.dest;
        let ts = ev.ts;
        let emitted =
            sink.into_iter().map(|p| self.push_event(p.dest, ts + p.offset, sender, p.payload)).collect();
        self.processed.push(ProcessedEvent { ev, bf, emitted });
    }

    fn push_event(&mut self, dest: Gid, ts: SimTime, sender: Gid, payload: Payload) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Reverse(QueuedEvent { id, ts, sender, dest, payload }));
        id
    }
}
