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

//! # The LP-type registry
//!
//! A two-tier mapping from LP types to their handler tables:
//!
//! - **Known types**: a fixed array indexed by the known-family enumeration
//!   ([`ModelKind`]).
//! - **Custom types**: an open-ended mapping from model name to the same
//!   entry shape.
//!
//! Registering a custom name twice is a warning and a no-op. Looking up a
//! type that was declared in the configuration but never registered is fatal
//! at configuration time.

use crate::config::{LpTypeConfig, ModelKind, KNOWN_MODEL_COUNT};
use crate::model_net::method::Method;
use crate::pdes::LpType;

use log::*;
use std::collections::HashMap;
use thiserror::Error;

/// A registered LP type: the kernel handler table, plus the model-net
/// [`Method`] table for network families.
#[derive(Debug, Clone, Copy)]
pub struct RegisteredType {
    /// Handler table installed on every LP of this type.
    pub lp_type: LpType,
    /// The sub-model capability table; present only for network families.
    pub method: Option<Method>,
}

/// The two-tier LP-type registry.
#[derive(Debug)]
pub struct LpTypeRegistry {
    known: Vec<Option<RegisteredType>>,
    custom: HashMap<String, RegisteredType>,
}

impl Default for LpTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LpTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { known: vec![None; KNOWN_MODEL_COUNT], custom: HashMap::new() }
    }

    /// Create a registry with all built-in types registered: the
    /// shared-channel and point-to-point network families and the simple
    /// server fixture.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        crate::model_net::simple_net::register(&mut registry);
        crate::model_net::simple_p2p::register(&mut registry);
        crate::models::simple_server::register(&mut registry);
        registry
    }

    /// Register a known family. Re-registering a known slot is a programming
    /// error.
    pub fn register_known(&mut self, kind: ModelKind, entry: RegisteredType) {
        let idx = kind.known_index().expect("register_known requires a known model kind");
        assert!(self.known[idx].is_none(), "known model family {:?} registered twice", kind);
        self.known[idx] = Some(entry);
    }

    /// Register a custom type by model name. A registration attempt for an
    /// already-registered name is a warning and a no-op.
    pub fn register_custom(&mut self, name: &str, entry: RegisteredType) {
        if self.custom.contains_key(name) {
            warn!("custom LP type `{}` is already registered, ignoring", name);
            return;
        }
        self.custom.insert(name.to_string(), entry);
    }

    /// Look up the registered entry for a configured LP type. Known model
    /// kinds resolve through the fixed tier, everything else through the
    /// custom tier by model name.
    pub fn lookup(&self, config: &LpTypeConfig) -> Result<&RegisteredType, RegistryError> {
        let entry = match config.model_kind.known_index() {
            Some(idx) => self.known[idx].as_ref(),
            None => self.custom.get(&config.model_name),
        };
        entry.ok_or_else(|| RegistryError::Unregistered {
            section: config.name.clone(),
            model: config.model_name.clone(),
        })
    }

    /// Look up by model kind (known tier only).
    pub fn lookup_known(&self, kind: ModelKind) -> Option<&RegisteredType> {
        kind.known_index().and_then(|idx| self.known[idx].as_ref())
    }
}

/// Errors raised while resolving configured LP types
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// An LP type was declared in the configuration but never registered
    #[error("LP type `{section}` uses model `{model}` which was never registered")]
    Unregistered {
        /// The configuration section declaring the type
        section: String,
        /// The unregistered model name
        model: String,
    },
}
