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

use crate::topology::{parse_dot_str, DotError};

#[test]
fn parse_simple_graph() {
    let topo = parse_dot_str(
        "graph net {\n  a -- b;\n  b -- c;\n  d;\n}\n",
    )
    .unwrap();
    assert_eq!(topo.name(), "net");
    assert_eq!(topo.vertex_count(), 4);
    assert_eq!(topo.edge_count(), 2);

    let a = topo.vertex_by_name("a").unwrap();
    let b = topo.vertex_by_name("b").unwrap();
    let c = topo.vertex_by_name("c").unwrap();
    assert_eq!(topo.out_edges(a), &[b]);
    assert_eq!(topo.out_edges(b), &[a, c]);
    assert_eq!(topo.vertex_name(c), "c");
    assert!(topo.vertex_by_name("e").is_none());
}

#[test]
fn edge_chains_and_duplicates() {
    let topo = parse_dot_str("graph g {\n  a -- b -- c;\n  a -- b;\n}\n").unwrap();
    // the duplicate a -- b is ignored
    assert_eq!(topo.edge_count(), 2);
    let a = topo.vertex_by_name("a").unwrap();
    assert_eq!(topo.out_edges(a).len(), 1);
}

#[test]
fn subgraphs_group_vertices_in_declaration_order() {
    let topo = parse_dot_str(
        "graph g {\n\
         subgraph cluster_servers {\n  s0;\n  s1;\n}\n\
         subgraph cluster_switches {\n  w0;\n}\n\
         s0 -- w0;\n  s1 -- w0;\n}\n",
    )
    .unwrap();
    let groups = topo.groups();
    // root group plus the two subgraphs
    assert_eq!(groups.len(), 3);
    assert!(groups[0].label.is_none());
    assert!(groups[0].vertices().is_empty());
    assert_eq!(groups[1].label.as_deref(), Some("cluster_servers"));
    let names: Vec<&str> =
        groups[1].vertices().iter().map(|&v| topo.vertex_name(v)).collect();
    assert_eq!(names, vec!["s0", "s1"]);
    assert_eq!(groups[2].label.as_deref(), Some("cluster_switches"));
}

#[test]
fn attributes_and_comments_are_ignored() {
    let topo = parse_dot_str(
        "graph g {\n\
         // a comment\n\
         rankdir=LR;\n\
         node [shape=box];\n\
         a [label=\"Host A\"];\n\
         a -- b [weight=2];\n}\n",
    )
    .unwrap();
    assert_eq!(topo.vertex_count(), 2);
    assert_eq!(topo.edge_count(), 1);
}

#[test]
fn quoted_names() {
    let topo = parse_dot_str("graph g {\n  \"node 1\" -- \"node 2\";\n}\n").unwrap();
    assert!(topo.vertex_by_name("node 1").is_some());
}

#[test]
fn directed_graphs_are_rejected() {
    match parse_dot_str("digraph g {\n  a -> b;\n}\n") {
        Err(DotError::DirectedGraph { line: 0 }) => {}
        other => panic!("expected DirectedGraph, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unbalanced_and_trailing_content() {
    assert!(matches!(
        parse_dot_str("graph g {\n  a -- b;\n"),
        Err(DotError::UnexpectedEndOfFile)
    ));
    assert!(matches!(
        parse_dot_str("graph g {\n}\nleftover\n"),
        Err(DotError::TrailingContent { .. })
    ));
}

#[test]
fn empty_edge_endpoint_is_rejected() {
    assert!(matches!(
        parse_dot_str("graph g {\n  a -- ;\n}\n"),
        Err(DotError::EmptyVertexName { .. })
    ));
}
