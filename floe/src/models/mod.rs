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

//! Application LPs used as test fixtures: a request/acknowledge server and
//! the message type it exchanges over the model-net layer.

pub mod simple_server;

use crate::pdes::Gid;

/// The application-level messages exchanged by the fixture LPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppMsg {
    /// What the message means.
    pub kind: AppMsgKind,
    /// The LP that created the message.
    pub src: Gid,
    /// Sequence number of the request this message belongs to.
    pub req_id: u64,
}

/// The message kinds of the fixture LPs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMsgKind {
    /// A request towards the next server.
    Req,
    /// The acknowledgement of a request.
    Ack,
    /// Local completion of one of our own sends.
    Local,
}
