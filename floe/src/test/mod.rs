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

#[cfg(test)]
mod common;
#[cfg(test)]
mod test_config;
#[cfg(test)]
mod test_dot_parser;
#[cfg(test)]
mod test_mapper;
#[cfg(test)]
mod test_properties;
#[cfg(test)]
mod test_scenarios;
