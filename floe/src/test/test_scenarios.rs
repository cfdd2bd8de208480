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

use super::common::{ring_yaml, write_workspace, write_workspace_with, RING_DOT};
use crate::config::ModelKind;
use crate::lp_io::LpIoConfig;
use crate::model_net::base::{ModelNetBaseState, MODEL_NET_BASE_LP};
use crate::model_net::message::{BaseMsg, EventKind, MsgHeader, Request, WrapBody, WrapMsg};
use crate::model_net::method::{Method, Packet, PacketRc};
use crate::model_net::sched::Scheduler;
use crate::model_net::simple_net::SimpleNetState;
use crate::model_net::simple_p2p::SimpleP2pState;
use crate::models::simple_server::SimpleServerState;
use crate::models::{AppMsg, AppMsgKind};
use crate::orchestrator::{Orchestrator, Runtime, RunOptions};
use crate::pdes::{BitField, Effects, Gid, Payload, NUM_RNG_STREAMS};
use crate::registry::RegisteredType;

use std::any::Any;

fn run_ring(scheduler: &str, num_requests: u64, notify_end: bool) -> Orchestrator {
    let (_dir, config) =
        write_workspace(&ring_yaml(scheduler, num_requests, notify_end), "ring.dot", RING_DOT);
    let mut orch = Orchestrator::configure(&config, RunOptions::default(), |_| {}).unwrap();
    orch.run().unwrap();
    orch
}

fn server_state(orch: &Orchestrator, rel: usize) -> SimpleServerState {
    let gid = orch.runtime().mapper.gid_of("server", rel).unwrap();
    orch.kernel().state::<SimpleServerState>(gid).clone()
}

fn nic_sub_state(orch: &Orchestrator, rel: usize) -> SimpleNetState {
    let gid = orch.runtime().mapper.gid_of("nic", rel).unwrap();
    let st = orch.kernel().state::<ModelNetBaseState>(gid);
    st.sub_state.downcast_ref::<SimpleNetState>().unwrap().clone()
}

#[test]
fn ring_of_three_hosts() {
    let mut orch = run_ring("fcfs", 2, false);

    for rel in 0..3 {
        let st = server_state(&orch, rel);
        assert_eq!(st.msg_sent_count, 2, "server {}", rel);
        assert_eq!(st.msg_recvd_count, 2, "server {}", rel);
        assert_eq!(st.ack_recvd_count, 2, "server {}", rel);
        assert_eq!(st.local_recvd_count, 4, "server {}", rel);
    }

    let reports = orch.report().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].name, "simplenet");
    // 6 requests of 4096 bytes (8 packets each) and 6 acks (1 packet each)
    assert_eq!(reports[0].stats.packets_sent, 54);
    assert_eq!(reports[0].stats.packets_recvd, 54);
    assert_eq!(reports[0].stats.bytes_sent, 6 * 4096 + 6 * 32);
}

#[test]
fn priority_scheduler_runs_the_ring() {
    let mut orch = run_ring("priority", 2, false);
    for rel in 0..3 {
        let st = server_state(&orch, rel);
        assert_eq!(st.msg_recvd_count, 2);
        assert_eq!(st.local_recvd_count, 4);
    }
    assert_eq!(orch.report().unwrap()[0].stats.packets_sent, 54);
}

#[test]
fn fcfs_full_does_not_split_messages() {
    let mut orch = run_ring("fcfs-full", 2, false);
    for rel in 0..3 {
        let st = server_state(&orch, rel);
        assert_eq!(st.msg_recvd_count, 2);
        assert_eq!(st.local_recvd_count, 4);
    }
    // per-LP emitted-packet count equals per-LP message-sent count
    let reports = orch.report().unwrap();
    assert_eq!(reports[0].stats.packets_sent, 12);
    for rel in 0..3 {
        assert_eq!(nic_sub_state(&orch, rel).stats.packets_sent, 4);
    }
}

#[test]
fn end_notification_reaches_every_network_lp_once() {
    let orch = run_ring("fcfs", 2, true);
    for rel in 0..3 {
        assert_eq!(nic_sub_state(&orch, rel).stats.end_notifs, 1, "nic {}", rel);
    }
    // the triggering server completed its workload
    assert_eq!(server_state(&orch, 0).ack_recvd_count, 2);
}

#[derive(Debug, Clone, PartialEq)]
struct NicSnap {
    next_avail: f64,
    node_copy: Vec<f64>,
    send_loops: Vec<bool>,
    recv_loop: bool,
    sched_send: Vec<Scheduler>,
    sched_recv: Scheduler,
    sub: SimpleNetState,
    rng: Vec<usize>,
}

fn snap_nic(orch: &Orchestrator, gid: Gid) -> NicSnap {
    let st = orch.kernel().state::<ModelNetBaseState>(gid);
    NicSnap {
        next_avail: st.next_available_time,
        node_copy: st.node_copy_next_available_time.clone(),
        send_loops: st.in_sched_send_loop.clone(),
        recv_loop: st.in_sched_recv_loop,
        sched_send: st.sched_send.clone(),
        sched_recv: st.sched_recv.clone(),
        sub: st.sub_state.downcast_ref::<SimpleNetState>().unwrap().clone(),
        rng: (0..NUM_RNG_STREAMS).map(|s| orch.kernel().rng_position(gid, s)).collect(),
    }
}

fn snap_server(orch: &Orchestrator, gid: Gid) -> (SimpleServerState, Vec<usize>) {
    (
        orch.kernel().state::<SimpleServerState>(gid).clone(),
        (0..NUM_RNG_STREAMS).map(|s| orch.kernel().rng_position(gid, s)).collect(),
    )
}

#[test]
fn rollback_restores_every_lp_state() {
    const PREFIX: usize = 30;

    let (_dir, config) = write_workspace(&ring_yaml("fcfs", 2, false), "ring.dot", RING_DOT);
    let mut orch = Orchestrator::configure(&config, RunOptions::default(), |_| {}).unwrap();

    assert_eq!(orch.run_steps(PREFIX), PREFIX);
    let nic_gids: Vec<Gid> =
        (0..3).map(|rel| orch.runtime().mapper.gid_of("nic", rel).unwrap()).collect();
    let server_gids: Vec<Gid> =
        (0..3).map(|rel| orch.runtime().mapper.gid_of("server", rel).unwrap()).collect();
    let nic_snaps: Vec<NicSnap> = nic_gids.iter().map(|&g| snap_nic(&orch, g)).collect();
    let server_snaps: Vec<_> = server_gids.iter().map(|&g| snap_server(&orch, g)).collect();

    orch.run().unwrap();
    let total = orch.kernel().processed_len();
    assert!(total > PREFIX, "the ring produces more than {} events", PREFIX);

    // force a synthetic rollback of everything after the snapshot
    orch.rollback(total - PREFIX);

    for (gid, snap) in nic_gids.iter().zip(&nic_snaps) {
        let now = snap_nic(&orch, *gid);
        assert_eq!(&now, snap, "nic LP {} after rollback", gid);
    }
    for (gid, snap) in server_gids.iter().zip(&server_snaps) {
        let now = snap_server(&orch, *gid);
        assert_eq!(&now, snap, "server LP {} after rollback", gid);
    }

    // resuming after the rollback reaches the same outcome as an untouched run
    orch.run().unwrap();
    let reference = run_ring("fcfs", 2, false);
    for rel in 0..3 {
        assert_eq!(server_state(&orch, rel), server_state(&reference, rel));
        assert_eq!(nic_sub_state(&orch, rel), nic_sub_state(&reference, rel));
    }
}

#[test]
fn msg_id_is_monotone_across_rollbacks() {
    let (_dir, config) = write_workspace(&ring_yaml("fcfs", 2, false), "ring.dot", RING_DOT);
    let mut orch = Orchestrator::configure(&config, RunOptions::default(), |_| {}).unwrap();
    orch.run().unwrap();
    let gid = orch.runtime().mapper.gid_of("nic", 0).unwrap();
    let before = orch.kernel().state::<ModelNetBaseState>(gid).msg_id;
    assert!(before > 0);

    let total = orch.kernel().processed_len();
    orch.rollback(total / 2);
    // rolled back, but the id counter never decreases
    assert_eq!(orch.kernel().state::<ModelNetBaseState>(gid).msg_id, before);
    orch.run().unwrap();
    assert!(orch.kernel().state::<ModelNetBaseState>(gid).msg_id >= before);
}

const SINGLE_DOT: &str = "graph single {\n  h0 -- n0;\n}\n";

fn single_yaml(num_requests: u64) -> String {
    format!(
        "\
simulation:
  packet_size: 512
  modelnet_scheduler: fcfs
  net_startup_ns: 100.0
  net_bw_mbps: 1000.0
topology:
  filename: single.dot
server:
  type: host
  model: simple-server
  num_requests: {}
  request_size: 256
  nodes: [h0]
nic:
  type: switch
  model: simplenet
  nodes: [n0]
",
        num_requests
    )
}

#[test]
fn node_copy_bypasses_the_schedulers() {
    let (_dir, config) = write_workspace(&single_yaml(1), "single.dot", SINGLE_DOT);
    let mut orch = Orchestrator::configure(&config, RunOptions::default(), |_| {}).unwrap();
    orch.run().unwrap();

    let st = server_state(&orch, 0);
    assert_eq!(st.msg_sent_count, 1);
    assert_eq!(st.msg_recvd_count, 1);
    assert_eq!(st.ack_recvd_count, 1);
    assert_eq!(st.local_recvd_count, 2);

    // everything went over the node-copy queues, never through the channel
    let nic = nic_sub_state(&orch, 0);
    assert_eq!(nic.stats.packets_sent, 0);
    let gid = orch.runtime().mapper.gid_of("nic", 0).unwrap();
    let base = orch.kernel().state::<ModelNetBaseState>(gid);
    assert!(base.node_copy_next_available_time[0] > 0.0);
    assert!(base.sched_send.iter().all(Scheduler::is_empty));
}

#[test]
fn receive_queue_requests_use_the_recv_scheduler() {
    let (_dir, config) = write_workspace(&ring_yaml("fcfs", 0, false), "ring.dot", RING_DOT);
    let mut orch = Orchestrator::configure(&config, RunOptions::default(), |_| {}).unwrap();

    let mapper = &orch.runtime().mapper;
    let n0 = mapper.gid_of("nic", 0).unwrap();
    let n1 = mapper.gid_of("nic", 1).unwrap();
    let h0 = mapper.gid_of("server", 0).unwrap();
    let h1 = mapper.gid_of("server", 1).unwrap();

    let mut req = Request::default();
    req.final_dest_lp = h1;
    req.dest_mn_lp = n1;
    req.src_lp = h0;
    req.msg_size = 64;
    req.category = "recv-test".to_string();
    let base = BaseMsg {
        req,
        is_from_remote: true,
        is_queue_req: false,
        save_ts: 0.0,
        sched_params: Default::default(),
        rc: Default::default(),
        remote_event: Some(Payload::App(AppMsg { kind: AppMsgKind::Req, src: h0, req_id: 0 })),
        self_event: None,
    };
    let wrap =
        WrapMsg { header: MsgHeader::new(EventKind::NewMsg, h0, 0.0), body: WrapBody::Base(base) };
    orch.inject(n0, 0.0, h0, Payload::ModelNet(Box::new(wrap)));
    orch.run().unwrap();

    // the request travelled through n0's receive scheduler and was delivered
    assert_eq!(server_state(&orch, 1).msg_recvd_count, 1);
    assert_eq!(nic_sub_state(&orch, 0).stats.packets_sent, 1);
    let base = orch.kernel().state::<ModelNetBaseState>(n0);
    assert!(!base.in_sched_recv_loop);
    assert!(base.sched_recv.is_empty());
}

const P2P_DOT: &str = "graph p2p {\n  h0 -- n0;\n  h1 -- n1;\n  n0 -- n1;\n}\n";

const P2P_YAML: &str = "\
simulation:
  packet_size: 512
  modelnet_scheduler: fcfs
  net_latency_ns_file: lat.txt
  net_bw_mbps_file: bw.txt
  modelnet_order: [simplep2p]
topology:
  filename: p2p.dot
server:
  type: host
  model: simple-server
  num_requests: 1
  request_size: 2048
  nodes: [h0, h1]
nic:
  type: switch
  model: simplep2p
  nodes: [n0, n1]
";

#[test]
fn point_to_point_delivery() {
    let (_dir, config) = write_workspace_with(
        P2P_YAML,
        &[
            ("p2p.dot", P2P_DOT),
            ("lat.txt", "0 500\n500 0\n"),
            ("bw.txt", "1000 1000\n1000 1000\n"),
        ],
    );
    let mut orch = Orchestrator::configure(&config, RunOptions::default(), |_| {}).unwrap();
    orch.run().unwrap();

    for rel in 0..2 {
        let st = server_state(&orch, rel);
        assert_eq!(st.msg_sent_count, 1);
        assert_eq!(st.msg_recvd_count, 1);
        assert_eq!(st.ack_recvd_count, 1);
        assert_eq!(st.local_recvd_count, 2);
    }
    for rel in 0..2 {
        let gid = orch.runtime().mapper.gid_of("nic", rel).unwrap();
        let st = orch.kernel().state::<ModelNetBaseState>(gid);
        let sub = st.sub_state.downcast_ref::<SimpleP2pState>().unwrap();
        // one 2048-byte request (4 packets) and one ack
        assert_eq!(sub.stats.packets_sent, 5);
        assert_eq!(sub.stats.bytes_sent, 2048 + 32);
    }
    let reports = orch.report().unwrap();
    assert_eq!(reports[0].name, "simplep2p");
    assert_eq!(reports[0].stats.packets_sent, 10);
}

#[test]
fn missing_p2p_matrix_is_fatal() {
    let (_dir, config) =
        write_workspace_with(P2P_YAML, &[("p2p.dot", P2P_DOT), ("lat.txt", "0 1\n1 0\n")]);
    assert!(matches!(
        Orchestrator::configure(&config, RunOptions::default(), |_| {}),
        Err(crate::Error::ModelNetError(_))
    ));
}

#[test]
fn unregistered_lp_type_is_fatal_at_configure_time() {
    let yaml = "\
topology:
  filename: ring.dot
server:
  type: host
  model: ghost-model
  nodes: [h0, h1, h2, n0, n1, n2]
";
    let (_dir, config) = write_workspace(yaml, "ring.dot", RING_DOT);
    assert!(matches!(
        Orchestrator::configure(&config, RunOptions::default(), |_| {}),
        Err(crate::Error::RegistryError(_))
    ));
}

#[test]
fn statistics_flush_to_the_io_directory() {
    let (_dir, config) = write_workspace(&ring_yaml("fcfs", 1, false), "ring.dot", RING_DOT);
    let io_dir = _dir.path().join("stats");
    let mut opts = RunOptions::default();
    opts.lp_io = Some(LpIoConfig { dir: io_dir.clone(), use_suffix: false });
    let mut orch = Orchestrator::configure(&config, opts, |_| {}).unwrap();
    orch.run().unwrap();
    orch.report().unwrap();

    let table = std::fs::read_to_string(io_dir.join("modelnet-stats")).unwrap();
    assert!(table.contains("simplenet"));
}

// A minimal custom family: packets are delivered directly with a fixed
// latency, and the sampler counts its pulses. Exercises the custom tier of
// the registry, the SchedNext re-arm path, and the sampling loop.

#[derive(Debug, Clone, Default, PartialEq)]
struct TestNetState {
    samples: u64,
    end_notifs: u64,
}

fn tn_new_state() -> Box<dyn Any> {
    Box::new(TestNetState::default())
}

fn tn_init(_rt: &Runtime, _eff: &mut Effects<'_>, _state: &mut Box<dyn Any>) {}

fn tn_event(
    _rt: &Runtime,
    _eff: &mut Effects<'_>,
    _state: &mut Box<dyn Any>,
    _bf: &mut BitField,
    _body: &mut WrapBody,
) {
    panic!("testnet delivers directly and never passes events");
}

fn tn_packet_event(
    _rt: &Runtime,
    eff: &mut Effects<'_>,
    _state: &mut Box<dyn Any>,
    pkt: Packet<'_>,
) -> (f64, PacketRc) {
    if pkt.is_last {
        if let Some(remote) = pkt.remote_event {
            eff.send(pkt.req.final_dest_lp, 50.0, remote);
        }
        if let Some(self_event) = pkt.self_event {
            eff.send(pkt.req.src_lp, 10.0, self_event);
        }
    }
    (5.0, PacketRc::default())
}

fn tn_packet_event_rc(
    _rt: &Runtime,
    _eff: &mut Effects<'_>,
    _state: &mut Box<dyn Any>,
    _req: &Request,
    _rc: &PacketRc,
) {
}

fn tn_sample(_rt: &Runtime, _eff: &mut Effects<'_>, state: &mut Box<dyn Any>, _bf: &mut BitField) {
    state.downcast_mut::<TestNetState>().unwrap().samples += 1;
}

fn tn_sample_rc(
    _rt: &Runtime,
    _eff: &mut Effects<'_>,
    state: &mut Box<dyn Any>,
    _bf: &mut BitField,
) {
    state.downcast_mut::<TestNetState>().unwrap().samples -= 1;
}

fn tn_end_notif(_rt: &Runtime, _eff: &mut Effects<'_>, state: &mut Box<dyn Any>, _bf: &mut BitField) {
    state.downcast_mut::<TestNetState>().unwrap().end_notifs += 1;
}

fn tn_end_notif_rc(
    _rt: &Runtime,
    _eff: &mut Effects<'_>,
    state: &mut Box<dyn Any>,
    _bf: &mut BitField,
) {
    state.downcast_mut::<TestNetState>().unwrap().end_notifs -= 1;
}

const TN_METHOD: Method = Method {
    name: "testnet",
    kind: ModelKind::Custom,
    self_scheduling: false,
    new_state: tn_new_state,
    init: tn_init,
    event: tn_event,
    revent: tn_event,
    commit: None,
    finalize: None,
    packet_event: tn_packet_event,
    packet_event_rc: tn_packet_event_rc,
    sample: Some(tn_sample),
    sample_rc: Some(tn_sample_rc),
    sample_init: None,
    sample_fini: None,
    end_notif: Some(tn_end_notif),
    end_notif_rc: Some(tn_end_notif_rc),
    congestion_event: None,
    congestion_event_rc: None,
    congestion_event_commit: None,
    post_register: None,
    model_stats: None,
};

const TESTNET_YAML: &str = "\
simulation:
  packet_size: 512
topology:
  filename: pair.dot
server:
  type: host
  model: simple-server
  num_requests: 2
  request_size: 4096
  nodes: [h0, h1]
nic:
  type: switch
  model: testnet
  nodes: [n0, n1]
";

const PAIR_DOT: &str = "graph pair {\n  h0 -- n0;\n  h1 -- n1;\n  n0 -- n1;\n}\n";

#[test]
fn custom_family_with_sampling() {
    let (_dir, config) = write_workspace(TESTNET_YAML, "pair.dot", PAIR_DOT);
    let mut opts = RunOptions::default();
    opts.sampling = Some((100.0, 1000.0));
    let mut orch = Orchestrator::configure(&config, opts, |registry| {
        let entry = RegisteredType { lp_type: MODEL_NET_BASE_LP, method: Some(TN_METHOD) };
        registry.register_custom("testnet", entry);
        // a duplicate registration is a warning and a no-op
        registry.register_custom("testnet", entry);
    })
    .unwrap();
    orch.run().unwrap();

    for rel in 0..2 {
        let st = server_state(&orch, rel);
        assert_eq!(st.msg_sent_count, 2);
        assert_eq!(st.msg_recvd_count, 2);
        assert_eq!(st.local_recvd_count, 4);
    }
    for rel in 0..2 {
        let gid = orch.runtime().mapper.gid_of("nic", rel).unwrap();
        let st = orch.kernel().state::<ModelNetBaseState>(gid);
        let sub = st.sub_state.downcast_ref::<TestNetState>().unwrap();
        // pulses at t = 100, 200, ..., 1000
        assert_eq!(sub.samples, 10);
    }
}
