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
//! Draw the hop-by-hop alert propagation of simulation runs, one figure per
//! hop.

use std::process;

use clap::Parser;

use vanalyze::{
    batch::{self, ToolSpec},
    config::{CommonArgs, SimulationConfig},
    render::render_single_hops,
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

const TOOL: ToolSpec = ToolSpec {
    name: "Draw Single Hops Tool",
    output_subfolder: "hops",
    single_output_subfolder: "singlefileHops",
};

fn main() {
    util::init_logging();
    let args = Args::parse();
    let config = SimulationConfig::from_common_args(&args.common);

    match batch::run(&args.common, config, &TOOL, &render_single_hops) {
        Ok(stats) if stats.failed > 0 => process::exit(1),
        Ok(_) => {}
        Err(e) => {
            log::error!("{e}");
            process::exit(2);
        }
    }
}
