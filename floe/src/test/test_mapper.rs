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

use crate::config::{ComponentKind, LpTypeConfig, ModelKind};
use crate::mapping::context::MapContext;
use crate::mapping::{Mapper, MappingError};
use crate::properties::PropertyBag;
use crate::topology::parse_dot_str;

fn lp_type(name: &str, kind: ComponentKind, model: &str, nodes: &[&str]) -> LpTypeConfig {
    LpTypeConfig {
        name: name.to_string(),
        kind,
        label: name.to_string(),
        model_name: model.to_string(),
        model_kind: ModelKind::from_model_name(model),
        nodes: nodes.iter().map(|s| s.to_string()).collect(),
        props: PropertyBag::new(name),
    }
}

/// A graph of N isolated, uniquely named vertices under a single type.
fn line_mapper(n: usize) -> Mapper {
    let mut dot = String::from("graph g {\n");
    for i in 0..n {
        dot.push_str(&format!("  v{};\n", i));
    }
    dot.push_str("}\n");
    let topo = parse_dot_str(&dot).unwrap();
    let names: Vec<String> = (0..n).map(|i| format!("v{}", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let configs = vec![lp_type("v", ComponentKind::Host, "simple-server", &name_refs)];
    Mapper::build(&topo, &configs).unwrap()
}

fn star_mapper() -> Mapper {
    let topo = parse_dot_str(
        "graph star {\n  h0 -- r0;\n  h1 -- r0;\n  h2 -- r0;\n  h3 -- r0;\n  h4 -- r0;\n  h5 -- r0;\n}\n",
    )
    .unwrap();
    let configs = vec![
        lp_type("host", ComponentKind::Host, "simple-server", &["h0", "h1", "h2", "h3", "h4", "h5"]),
        lp_type("router", ComponentKind::Router, "simplenet", &["r0"]),
    ];
    Mapper::build(&topo, &configs).unwrap()
}

#[test]
fn type_counts_and_identity_roundtrips() {
    // the a/b/c layout: 7 + 7 + 12 vertices
    let mut dot = String::from("graph g {\n");
    for i in 0..7 {
        dot.push_str(&format!("  a{};\n", i));
    }
    for i in 0..7 {
        dot.push_str(&format!("  b{};\n", i));
    }
    for i in 0..12 {
        dot.push_str(&format!("  c{};\n", i));
    }
    dot.push_str("}\n");
    let topo = parse_dot_str(&dot).unwrap();
    let a: Vec<String> = (0..7).map(|i| format!("a{}", i)).collect();
    let b: Vec<String> = (0..7).map(|i| format!("b{}", i)).collect();
    let c: Vec<String> = (0..12).map(|i| format!("c{}", i)).collect();
    let configs = vec![
        lp_type("a", ComponentKind::Host, "simple-server", &a.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
        lp_type("b", ComponentKind::Host, "simple-server", &b.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
        lp_type("c", ComponentKind::Switch, "simplenet", &c.iter().map(|s| s.as_str()).collect::<Vec<_>>()),
    ];
    let mapper = Mapper::build(&topo, &configs).unwrap();

    assert_eq!(mapper.vertex_count(), 26);
    assert_eq!(mapper.count_of_type("a"), 7);
    assert_eq!(mapper.count_of_type("b"), 7);
    assert_eq!(mapper.count_of_type("c"), 12);
    assert_eq!(mapper.count_of_type("d"), 0);
    assert_eq!(mapper.num_lp_types(), 3);

    for gid in 0..26 {
        let (type_name, offset) = mapper.type_info(gid);
        let type_name = type_name.to_string();
        assert_eq!(mapper.gid_of(&type_name, offset).unwrap(), gid);
        assert_eq!(mapper.relative_id_of(gid), offset);
        assert_eq!(mapper.type_name(gid), type_name);
    }
}

#[test]
fn partition_26_over_4() {
    let mut mapper = line_mapper(26);
    mapper.setup(4, 0).unwrap();

    // floor = 6, rem = 2
    assert_eq!(mapper.unit_range(0), 0..7);
    assert_eq!(mapper.unit_range(1), 7..14);
    assert_eq!(mapper.unit_range(2), 14..20);
    assert_eq!(mapper.unit_range(3), 20..26);
    assert_eq!(mapper.owned(0), 7);
    assert_eq!(mapper.owned(3), 6);

    assert_eq!(mapper.global_to_unit(0), 0);
    assert_eq!(mapper.global_to_unit(6), 0);
    assert_eq!(mapper.global_to_unit(7), 1);
    assert_eq!(mapper.global_to_unit(13), 1);
    assert_eq!(mapper.global_to_unit(14), 2);
    assert_eq!(mapper.global_to_unit(19), 2);
    assert_eq!(mapper.global_to_unit(20), 3);
    assert_eq!(mapper.global_to_unit(25), 3);

    assert_eq!(mapper.local_slot(0), 0);
    assert_eq!(mapper.local_slot(7), 0);
    assert_eq!(mapper.local_slot(13), 6);
    assert_eq!(mapper.local_slot(25), 5);
}

#[test]
fn partition_is_balanced_and_invertible() {
    for n in 1..=40 {
        let mut mapper = line_mapper(n);
        for p in 1..=10 {
            mapper.setup(p, 0).unwrap();
            let owned: Vec<u64> = (0..p).map(|u| mapper.owned(u)).collect();
            assert_eq!(owned.iter().sum::<u64>(), n as u64, "N={} P={}", n, p);
            let max = owned.iter().max().unwrap();
            let min = owned.iter().min().unwrap();
            assert!(max - min <= 1, "N={} P={}", n, p);

            for gid in 0..n as u64 {
                let unit = mapper.global_to_unit(gid);
                let range = mapper.unit_range(unit);
                assert!(range.contains(&gid), "N={} P={} gid={}", n, p, gid);
                assert_eq!(range.start + mapper.local_slot(gid) as u64, gid);
            }
        }
    }
}

#[test]
fn zero_units_is_rejected() {
    let mut mapper = line_mapper(4);
    assert_eq!(mapper.setup(0, 0), Err(MappingError::InvalidUnitCount));
}

#[test]
fn traversal_follows_declaration_order() {
    let topo = parse_dot_str(
        "graph g {\n\
         subgraph b {\n  x;\n  y;\n}\n\
         subgraph a {\n  z;\n}\n\
         w -- x;\n}\n",
    )
    .unwrap();
    let configs =
        vec![lp_type("t", ComponentKind::Host, "simple-server", &["w", "x", "y", "z"])];
    let mapper = Mapper::build(&topo, &configs).unwrap();

    // root group (w) first, its unseen neighbor x pulled in right after,
    // then the subgraphs in declaration order
    assert_eq!(mapper.gid_by_name("w"), Some(0));
    assert_eq!(mapper.gid_by_name("x"), Some(1));
    assert_eq!(mapper.gid_by_name("y"), Some(2));
    assert_eq!(mapper.gid_by_name("z"), Some(3));
}

#[test]
fn neighbor_sequences_mirror_every_edge_exactly_once() {
    let topo = parse_dot_str(super::common::RING_DOT).unwrap();
    let configs = vec![
        lp_type("server", ComponentKind::Host, "simple-server", &["h0", "h1", "h2"]),
        lp_type("nic", ComponentKind::Switch, "simplenet", &["n0", "n1", "n2"]),
    ];
    let mapper = Mapper::build(&topo, &configs).unwrap();

    for &(a, b) in topo.edges() {
        let ga = mapper.gid_by_name(topo.vertex_name(a)).unwrap();
        let gb = mapper.gid_by_name(topo.vertex_name(b)).unwrap();
        let in_a = mapper
            .vertex(ga)
            .neighbors
            .iter()
            .filter(|&&n| mapper.vertex(n as u64).gid == gb)
            .count();
        let in_b = mapper
            .vertex(gb)
            .neighbors
            .iter()
            .filter(|&&n| mapper.vertex(n as u64).gid == ga)
            .count();
        assert_eq!(in_a, 1);
        assert_eq!(in_b, 1);
    }
}

#[test]
fn star_neighbor_queries() {
    let mapper = star_mapper();
    for i in 0..6 {
        let host = mapper.gid_of("host", i).unwrap();
        assert_eq!(mapper.neighbor_count(host, "router"), 1);
        assert_eq!(mapper.relative_id_of(host), i);
    }
    let router = mapper.gid_of("router", 0).unwrap();
    assert_eq!(mapper.neighbor_count(router, "host"), 6);
    assert_eq!(mapper.neighbor_count(router, "router"), 0);
    assert_eq!(
        mapper.neighbor_count_by_kind(
            router,
            &[
                lp_type("host", ComponentKind::Host, "simple-server", &["h0", "h1", "h2", "h3", "h4", "h5"]),
                lp_type("router", ComponentKind::Router, "simplenet", &["r0"]),
            ],
            ComponentKind::Host
        ),
        6
    );

    // neighbor offsets follow edge declaration order
    for k in 0..6 {
        let host = mapper.gid_of("host", k).unwrap();
        assert_eq!(mapper.neighbor_gid(router, "host", k).unwrap(), host);
    }
    assert!(matches!(
        mapper.neighbor_gid(router, "host", 6),
        Err(MappingError::NeighborOffsetOutOfRange { .. })
    ));
    assert!(matches!(
        mapper.neighbor_gid(router, "router", 0),
        Err(MappingError::NoNeighborOfType { .. })
    ));
}

#[test]
fn build_rejects_unclaimed_and_unknown_vertices() {
    let topo = parse_dot_str("graph g {\n  a -- b;\n}\n").unwrap();
    let configs = vec![lp_type("t", ComponentKind::Host, "simple-server", &["a"])];
    assert!(matches!(
        Mapper::build(&topo, &configs),
        Err(MappingError::VertexWithoutType { .. })
    ));

    let configs = vec![lp_type("t", ComponentKind::Host, "simple-server", &["a", "b", "c"])];
    assert!(matches!(
        Mapper::build(&topo, &configs),
        Err(MappingError::ConfigVertexNotInGraph { .. })
    ));
}

#[test]
fn map_context_resolution() {
    let mapper = star_mapper();
    let router = mapper.gid_of("router", 0).unwrap();
    let h0 = mapper.gid_of("host", 0).unwrap();
    let h3 = mapper.gid_of("host", 3).unwrap();
    let h5 = mapper.gid_of("host", 5).unwrap();

    assert_eq!(MapContext::GlobalDirect(42).resolve(&mapper, "host", h0).unwrap(), 42);

    // every host reaches its single router
    for k in 0..6 {
        let host = mapper.gid_of("host", k).unwrap();
        assert_eq!(MapContext::default().resolve(&mapper, "router", host).unwrap(), router);
        assert_eq!(
            MapContext::GroupModulo { reverse: true }.resolve(&mapper, "router", host).unwrap(),
            router
        );
    }

    // modulo from the router picks the first host, reversed the last
    assert_eq!(
        MapContext::GroupModulo { reverse: false }.resolve(&mapper, "host", router).unwrap(),
        h0
    );
    assert_eq!(
        MapContext::GroupModulo { reverse: true }.resolve(&mapper, "host", router).unwrap(),
        h5
    );

    // ratio: more senders than destinations clamps towards the single router
    assert_eq!(
        MapContext::GroupRatio { reverse: false }.resolve(&mapper, "router", h3).unwrap(),
        router
    );
    // ratio: the router (1 sender) towards 6 hosts picks its relative id
    assert_eq!(
        MapContext::GroupRatio { reverse: false }.resolve(&mapper, "host", router).unwrap(),
        h0
    );

    assert_eq!(
        MapContext::GroupDirect { offset: 3 }.resolve(&mapper, "host", router).unwrap(),
        h3
    );
    assert!(MapContext::GroupDirect { offset: 9 }.resolve(&mapper, "host", router).is_err());
}
