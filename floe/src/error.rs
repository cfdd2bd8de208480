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

//! Module containing all error types

use crate::config::ConfigError;
use crate::mapping::MappingError;
use crate::model_net::ModelNetError;
use crate::registry::RegistryError;
use crate::topology::DotError;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error while reading the configuration file
    #[error("Configuration Error: {0}")]
    ConfigError(#[from] ConfigError),
    /// Error while reading the topology graph
    #[error("Topology Error: {0}")]
    TopologyError(#[from] DotError),
    /// Error while building the vertex table or answering a mapping query
    #[error("Mapping Error: {0}")]
    MappingError(#[from] MappingError),
    /// An LP type was used in the configuration but never registered
    #[error("Registry Error: {0}")]
    RegistryError(#[from] RegistryError),
    /// Error while configuring the model-net layer
    #[error("Model-Net Error: {0}")]
    ModelNetError(#[from] ModelNetError),
    /// IO error (statistics output directory, ...)
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}
