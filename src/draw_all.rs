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
//! Run all four drawing tools over the same input, one tool per worker
//! thread.

use std::process;

use clap::Parser;
use rayon::prelude::*;

use vanalyze::{
    batch::{self, BatchError, BatchStats, RenderFn, ToolSpec},
    config::{CommonArgs, SimulationConfig},
    render::{render_alert_paths, render_coverage, render_single_hops, render_transmissions},
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Also plot every (non-)receiving node in the alert path figures
    #[arg(long)]
    show_nodes: bool,
}

const TOOLS: [(ToolSpec, &RenderFn); 4] = [
    (
        ToolSpec {
            name: "Draw Coverage Tool",
            output_subfolder: "coverages",
            single_output_subfolder: "singlefileCoverages",
        },
        &render_coverage,
    ),
    (
        ToolSpec {
            name: "Draw Single Hops Tool",
            output_subfolder: "hops",
            single_output_subfolder: "singlefileHops",
        },
        &render_single_hops,
    ),
    (
        ToolSpec {
            name: "Draw Multiple Transmissions Tool",
            output_subfolder: "multipleTransmissions",
            single_output_subfolder: "singlefileMultipleTransmission",
        },
        &render_transmissions,
    ),
    (
        ToolSpec {
            name: "Draw Alert Paths Tool",
            output_subfolder: "alertPaths",
            single_output_subfolder: "singlefileAlertPath",
        },
        &render_alert_paths,
    ),
];

fn main() {
    util::init_logging();
    let args = Args::parse();
    let config = {
        let mut config = SimulationConfig::from_common_args(&args.common);
        config.show_nodes = args.show_nodes;
        config
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(TOOLS.len().min(num_cpus::get()))
        .build()
        .unwrap_or_else(|e| {
            log::error!("cannot build thread pool: {e}");
            process::exit(2);
        });

    let results: Vec<Result<BatchStats, BatchError>> = pool.install(|| {
        TOOLS
            .par_iter()
            .map(|(tool, render)| batch::run(&args.common, config.clone(), tool, *render))
            .collect()
    });

    let mut failed = false;
    for result in results {
        match result {
            Ok(stats) => failed |= stats.failed > 0,
            Err(e) => {
                log::error!("{e}");
                process::exit(2);
            }
        }
    }
    if failed {
        process::exit(1);
    }
}
