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

//! Statistics output. When a directory is configured, the per-network
//! statistics are flushed there as a whitespace-separated table.

use crate::orchestrator::NetReport;

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Where (and how) to flush statistics.
#[derive(Debug, Clone)]
pub struct LpIoConfig {
    /// The output directory.
    pub dir: PathBuf,
    /// Append a process-id suffix to the directory name, so repeated runs do
    /// not clobber each other.
    pub use_suffix: bool,
}

/// Flush the per-network statistics. Returns the directory written to.
pub fn flush(cfg: &LpIoConfig, reports: &[NetReport]) -> io::Result<PathBuf> {
    let dir = if cfg.use_suffix {
        PathBuf::from(format!("{}-{}", cfg.dir.display(), std::process::id()))
    } else {
        cfg.dir.clone()
    };
    fs::create_dir_all(&dir)?;

    let mut table = String::from(
        "network packets_sent bytes_sent packets_recvd bytes_recvd send_time_ns recv_time_ns\n",
    );
    for report in reports {
        let s = &report.stats;
        writeln!(
            table,
            "{} {} {} {} {} {} {}",
            report.name,
            s.packets_sent,
            s.bytes_sent,
            s.packets_recvd,
            s.bytes_recvd,
            s.send_time,
            s.recv_time
        )
        .expect("writing to a string cannot fail");
    }
    fs::write(dir.join("modelnet-stats"), table)?;
    Ok(dir)
}
