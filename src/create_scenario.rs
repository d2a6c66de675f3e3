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
//! Generate synthetic mobility scenarios (grid, line, cube).

use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};

use vanalyze::{
    mapgen::{self, GridScenario},
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Directory to place the scenario files in.
    #[arg(short, long, default_value = "./maps")]
    output: PathBuf,

    /// Scenario name; used as directory and file basename.
    #[arg(short, long)]
    name: String,

    #[command(subcommand)]
    kind: ScenarioKind,
}

#[derive(Subcommand, Debug)]
enum ScenarioKind {
    /// A Manhattan grid of roads with buildings between them.
    Grid {
        /// Length of each road in meters.
        #[arg(long, default_value_t = 2000)]
        road_length: u32,
        /// Number of roads per direction.
        #[arg(long, default_value_t = 9)]
        road_number: u32,
        /// Distance between adjacent parallel roads in meters.
        #[arg(long, default_value_t = 250)]
        road_distance: u32,
        /// Width of each road in meters.
        #[arg(long, default_value_t = 25)]
        road_size: u32,
        /// Distance between adjacent nodes along a road in meters.
        #[arg(long, default_value_t = 25)]
        node_distance: u32,
        /// Vary the road spacing by a uniform draw in +- this many meters.
        #[arg(long, default_value_t = 0)]
        road_variation: u32,
        /// Vary the node spacing by a uniform draw in +- this many meters.
        #[arg(long, default_value_t = 0)]
        node_variation: u32,
    },
    /// A single straight line of nodes (platoon).
    Line {
        /// Number of nodes on the line.
        #[arg(long)]
        num_nodes: u32,
        /// Distance between adjacent nodes in meters.
        #[arg(long, default_value_t = 25)]
        node_distance: u32,
    },
    /// A three-dimensional lattice of nodes.
    Cube {
        /// Number of nodes per cube edge.
        #[arg(long)]
        nodes_per_edge: u32,
        /// Distance between adjacent nodes in meters.
        #[arg(long, default_value_t = 25)]
        node_distance: u32,
    },
}

fn main() {
    util::init_logging();
    let args = Args::parse();
    let dir = args.output.join(&args.name);

    let result = match args.kind {
        ScenarioKind::Grid {
            road_length,
            road_number,
            road_distance,
            road_size,
            node_distance,
            road_variation,
            node_variation,
        } => mapgen::write_grid_scenario(
            &dir,
            &args.name,
            &GridScenario {
                road_length,
                road_number,
                road_distance,
                road_size,
                node_distance,
                road_variation,
                node_variation,
            },
        ),
        ScenarioKind::Line {
            num_nodes,
            node_distance,
        } => mapgen::write_line_scenario(&dir, &args.name, num_nodes, node_distance),
        ScenarioKind::Cube {
            nodes_per_edge,
            node_distance,
        } => mapgen::write_cube_scenario(&dir, &args.name, nodes_per_edge, node_distance),
    };

    match result {
        Ok(num_nodes) => log::info!("scenario {} has {num_nodes} nodes", args.name),
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    }
}
