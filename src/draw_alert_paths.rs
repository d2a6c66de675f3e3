// VANALYZE: Scenario Generation and Result Analysis for VANET Alert Broadcast Simulations
// Copyright (C) 2024-2025 The vanalyze authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Draw the alert forwarding paths of simulation runs.

use std::process;

use clap::Parser;

use vanalyze::{
    batch::{self, ToolSpec},
    config::{CommonArgs, SimulationConfig},
    render::render_alert_paths,
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Also plot every (non-)receiving node, not just the forwarders
    #[arg(long)]
    show_nodes: bool,

    /// Compare the reported circumference nodes against the recomputed ones
    #[arg(long)]
    debug: bool,
}

const TOOL: ToolSpec = ToolSpec {
    name: "Draw Alert Paths Tool",
    output_subfolder: "alertPaths",
    single_output_subfolder: "singlefileAlertPath",
};

fn main() {
    util::init_logging();
    let args = Args::parse();
    let mut config = SimulationConfig::from_common_args(&args.common);
    config.show_nodes = args.show_nodes;
    config.debug = args.debug;

    match batch::run(&args.common, config, &TOOL, &render_alert_paths) {
        Ok(stats) if stats.failed > 0 => process::exit(1),
        Ok(_) => {}
        Err(e) => {
            log::error!("{e}");
            process::exit(2);
        }
    }
}
