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

//! Parses the DOT subset used for topology files.
//!
//! Supported statements, one or more per line, separated by `;`:
//! `graph <name> {`, `subgraph <name> {`, `}`, node statements (`a` or
//! `a [attrs]`), and undirected edge chains (`a -- b -- c`). Attribute
//! blocks, `key=value` graph attributes, and `node`/`edge`/`graph` defaults
//! are accepted and ignored. Directed graphs are rejected.

use super::Topology;

use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;

/// Parses a DOT topology file and returns the resulting graph.
pub fn parse_dot_file(filename: impl AsRef<Path>) -> Result<Topology, DotError> {
    let dot_str = read_to_string(filename.as_ref())?;
    parse_dot_str(&dot_str)
}

/// Parses a DOT topology description from a string.
pub fn parse_dot_str(dot_str: &str) -> Result<Topology, DotError> {
    let mut topo: Option<Topology> = None;
    // stack of group indices; the bottom entry is the implicit root group
    let mut scope: Vec<usize> = Vec::new();
    let mut finished = false;

    for (i, line) in dot_str.lines().enumerate() {
        let line = match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        };
        for stmt in line.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() || stmt.starts_with('#') {
                continue;
            }
            if finished {
                return Err(DotError::TrailingContent { line: i, content: stmt.to_string() });
            }
            match &mut topo {
                None => {
                    // expect the graph header
                    let mut tokens: Vec<&str> = stmt.split_whitespace().collect();
                    if tokens.first() == Some(&"strict") {
                        tokens.remove(0);
                    }
                    match tokens.as_slice() {
                        ["graph", "{"] => {
                            topo = Some(Topology::new(String::new()));
                            scope.push(0);
                        }
                        ["graph", name, "{"] => {
                            topo = Some(Topology::new(unquote(name).to_string()));
                            scope.push(0);
                        }
                        ["digraph", ..] => {
                            return Err(DotError::DirectedGraph { line: i });
                        }
                        _ => {
                            return Err(DotError::UnexpectedToken {
                                line: i,
                                content: stmt.to_string(),
                            })
                        }
                    }
                }
                Some(t) => {
                    if stmt == "}" {
                        scope.pop().ok_or(DotError::UnbalancedBrace { line: i })?;
                        if scope.is_empty() {
                            finished = true;
                        }
                        continue;
                    }
                    if let Some(rest) = stmt.strip_prefix("subgraph") {
                        let tokens: Vec<&str> = rest.split_whitespace().collect();
                        let label = match tokens.as_slice() {
                            ["{"] => None,
                            [name, "{"] => Some(unquote(name).to_string()),
                            _ => {
                                return Err(DotError::UnexpectedToken {
                                    line: i,
                                    content: stmt.to_string(),
                                })
                            }
                        };
                        t.groups.push(super::VertexGroup { label, vertices: Vec::new() });
                        scope.push(t.groups.len() - 1);
                        continue;
                    }
                    let group = *scope.last().ok_or(DotError::UnbalancedBrace { line: i })?;
                    let stmt = strip_attrs(stmt);
                    if stmt.is_empty() {
                        continue;
                    }
                    if stmt.contains("--") {
                        let endpoints: Result<Vec<&str>, DotError> = stmt
                            .split("--")
                            .map(|e| {
                                let e = unquote(e.trim());
                                if e.is_empty() {
                                    Err(DotError::EmptyVertexName { line: i })
                                } else {
                                    Ok(e)
                                }
                            })
                            .collect();
                        let endpoints = endpoints?;
                        let ids: Vec<_> =
                            endpoints.iter().map(|name| t.intern(name, group)).collect();
                        for pair in ids.windows(2) {
                            t.add_edge(pair[0], pair[1]);
                        }
                    } else if stmt.contains('=') {
                        // graph attribute, e.g. rankdir=LR
                    } else {
                        let tokens: Vec<&str> = stmt.split_whitespace().collect();
                        match tokens.as_slice() {
                            ["node"] | ["edge"] | ["graph"] => {
                                // defaults whose attribute block was stripped
                            }
                            [name] => {
                                t.intern(unquote(name), group);
                            }
                            _ => {
                                return Err(DotError::UnexpectedToken {
                                    line: i,
                                    content: stmt.to_string(),
                                })
                            }
                        }
                    }
                }
            }
        }
    }

    match topo {
        Some(t) if finished => Ok(t),
        Some(_) => Err(DotError::UnexpectedEndOfFile),
        None => Err(DotError::UnexpectedEndOfFile),
    }
}

/// Drop a trailing `[attr=...]` block from a statement.
fn strip_attrs(stmt: &str) -> &str {
    match stmt.find('[') {
        Some(pos) => stmt[..pos].trim(),
        None => stmt,
    }
}

fn unquote(token: &str) -> &str {
    token.trim_matches('"')
}

/// Errors raised while parsing a DOT topology file
#[derive(Debug, Error)]
pub enum DotError {
    /// Io Error
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    /// A token appeared that the parser cannot handle
    #[error("Unexpected token in dot file in line {line}: {content}")]
    UnexpectedToken {
        /// Line where the token occurred
        line: usize,
        /// Content of the offending statement
        content: String,
    },
    /// Topologies must be undirected
    #[error("Directed graph (digraph) in line {line}; topologies must be undirected")]
    DirectedGraph {
        /// Line of the digraph header
        line: usize,
    },
    /// A closing brace without a matching open scope
    #[error("Unbalanced closing brace in line {line}")]
    UnbalancedBrace {
        /// Line of the brace
        line: usize,
    },
    /// An edge statement with an empty endpoint
    #[error("Empty vertex name in edge statement in line {line}")]
    EmptyVertexName {
        /// Line of the statement
        line: usize,
    },
    /// Statements after the final closing brace
    #[error("Content after closing the graph in line {line}: {content}")]
    TrailingContent {
        /// Line of the statement
        line: usize,
        /// The offending content
        content: String,
    },
    /// The file ended before the graph was closed
    #[error("Unexpected end of file before the graph was closed")]
    UnexpectedEndOfFile,
}
