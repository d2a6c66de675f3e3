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
//! Generate SLURM job files for the cross product of campaign parameters.

use std::{path::PathBuf, process};

use clap::Parser;

use vanalyze::{
    jobs::{self, JobBatch, Protocol},
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Scenarios to generate jobs for (comma separated).
    #[arg(short, long, value_delimiter = ',', default_value = "Padova-25")]
    scenarios: Vec<String>,

    /// Protocol ids to simulate (1=Fast-Broadcast, 2-5=STATIC-{100,300,500,700}, 6=ROFF).
    #[arg(short, long, value_delimiter = ',', default_values_t = [1, 2, 3, 4, 5, 6])]
    protocols: Vec<u8>,

    /// Actual transmission ranges in meters.
    #[arg(short, long, value_delimiter = ',', default_values_t = [100, 300, 500, 700])]
    tx_ranges: Vec<u32>,

    /// Building modes (0 and/or 1).
    #[arg(short, long, value_delimiter = ',', default_values_t = ["0".to_string(), "1".to_string()])]
    buildings: Vec<String>,

    /// Error rates in percent.
    #[arg(short, long, value_delimiter = ',', default_values_t = ["0".to_string()])]
    error_rates: Vec<String>,

    /// Smart junction modes.
    #[arg(short, long, value_delimiter = ',', default_values_t = ["0".to_string()])]
    junctions: Vec<String>,

    /// High building modes.
    #[arg(long, value_delimiter = ',', default_values_t = ["0".to_string()])]
    high_buildings: Vec<String>,

    /// Drone test modes.
    #[arg(long, value_delimiter = ',', default_values_t = ["0".to_string()])]
    drones: Vec<String>,

    /// Contention windows as a JSON list of {"cwMin": .., "cwMax": ..}.
    #[arg(short, long, default_value = r#"[{"cwMin": 32, "cwMax": 1024}]"#)]
    cws: String,

    /// Transmission powers per range, as range:power pairs (e.g. 300:4.6,500:7.1).
    #[arg(long, default_value = "")]
    tx_powers: String,

    /// SLURM array specification for each job.
    #[arg(long, default_value = "1-50")]
    job_array: String,

    /// Ask the simulator to print node coordinates.
    #[arg(long)]
    print_coords: bool,

    /// Generate obstacle shadowing loss files instead of using them. Forces
    /// buildings=1, tx range 500, Fast-Broadcast only, a single array job and
    /// coordinate printing.
    #[arg(long)]
    gen_loss_file: bool,

    /// Override the RAM request of every job.
    #[arg(long)]
    ram: Option<String>,

    /// Override the wall time request of every job.
    #[arg(long)]
    time: Option<String>,

    /// Folder with the scenario map files, as seen from the simulation folder.
    #[arg(long, default_value = "../maps")]
    maps_path: PathBuf,

    /// Folder to write the generated job files to.
    #[arg(short = 'o', long, default_value = "./jobs")]
    jobs_path: PathBuf,

    /// Job template file with {**..} placeholders.
    #[arg(long, default_value = "templates/job_template.slurm")]
    template: PathBuf,
}

fn batch_from_args(args: Args) -> Result<JobBatch, jobs::JobError> {
    let protocols = args
        .protocols
        .iter()
        .map(|id| Protocol::from_id(&id.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut batch = JobBatch {
        scenarios: args.scenarios,
        contention_windows: jobs::parse_contention_windows(&args.cws)?,
        high_buildings: args.high_buildings,
        drones: args.drones,
        buildings: args.buildings,
        error_rates: args.error_rates,
        junctions: args.junctions,
        protocols,
        tx_ranges: args.tx_ranges.iter().map(u32::to_string).collect(),
        tx_powers: jobs::parse_tx_powers(&args.tx_powers)?,
        job_array: args.job_array,
        print_coords: args.print_coords,
        gen_loss_file: args.gen_loss_file,
        ram: args.ram,
        needed_time: args.time,
        maps_path: args.maps_path,
        jobs_path: args.jobs_path,
        template_path: args.template,
    };

    // loss file generation needs exactly one building-aware Fast-Broadcast
    // run per scenario
    if batch.gen_loss_file {
        batch.buildings = vec!["1".to_string()];
        batch.tx_ranges = vec!["500".to_string()];
        batch.protocols = vec![Protocol::FastBroadcast];
        batch.job_array = "1".to_string();
        batch.print_coords = true;
    }

    Ok(batch)
}

fn main() {
    util::init_logging();
    let args = Args::parse();

    let batch = match batch_from_args(args) {
        Ok(batch) => batch,
        Err(e) => {
            log::error!("{e}");
            process::exit(2);
        }
    };

    if let Err(e) = batch.generate() {
        log::error!("{e}");
        process::exit(1);
    }
}
