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

use clap::Parser;
use floe::lp_io::LpIoConfig;
use floe::orchestrator::{Orchestrator, RunOptions};
use log::*;
use std::path::PathBuf;
use std::process::exit;

/// Configuration-driven orchestrator for a parallel discrete-event network
/// simulator.
#[derive(Parser, Debug)]
#[command(name = "floe", version, about)]
struct Args {
    /// The network description (YAML).
    #[arg(long)]
    config_file: PathBuf,

    /// Flush statistics to this directory.
    #[arg(long)]
    lp_io_dir: Option<PathBuf>,

    /// Append a process-id suffix to the statistics directory (0/1).
    #[arg(long, default_value_t = 0)]
    lp_io_use_suffix: u8,

    /// Number of execution units the LPs are partitioned over.
    #[arg(long, default_value_t = 1)]
    num_units: usize,

    /// Simulation end time in nanoseconds.
    #[arg(long)]
    end_time: Option<f64>,
}

fn main() {
    pretty_env_logger::init();
    let args = Args::parse();

    let mut opts = RunOptions::default();
    opts.num_units = args.num_units;
    if let Some(end_time) = args.end_time {
        opts.end_time = end_time;
    }
    let use_suffix = args.lp_io_use_suffix != 0;
    opts.lp_io = args.lp_io_dir.map(|dir| LpIoConfig { dir, use_suffix });

    if let Err(e) = run(&args.config_file, opts) {
        error!("{}", e);
        eprintln!("floe: {}", e);
        exit(1);
    }
}

fn run(config_file: &PathBuf, opts: RunOptions) -> Result<(), floe::Error> {
    let mut orch = Orchestrator::configure(config_file, opts, |_registry| {})?;
    orch.run()?;
    let reports = orch.report()?;
    for report in &reports {
        println!(
            "{}: {} packets sent ({} bytes), {} packets received ({} bytes)",
            report.name,
            report.stats.packets_sent,
            report.stats.bytes_sent,
            report.stats.packets_recvd,
            report.stats.bytes_recvd
        );
    }
    Ok(())
}
