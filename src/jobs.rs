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
//! SLURM job-file generation for simulation campaigns.
//!
//! One job file per point of the parameter cross product, written by
//! substituting placeholders in a template file. The template carries
//! `{**jobName}`, `{**command}`, `{**ram}`, `{**neededTime}`, `{**jobarray}`
//! and `{**sim_folder}` markers; everything else in it is opaque scheduler
//! syntax we do not interpret.

use std::{
    collections::HashMap,
    fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::iproduct;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("cannot write job files: {0}")]
    Io(#[from] io::Error),
    #[error("invalid contention window list: {0}")]
    ContentionWindows(#[from] serde_json::Error),
    #[error("invalid tx power entry {0:?}, expected range:power")]
    TxPower(String),
    #[error("unknown protocol id {0:?}, expected 1-6")]
    UnknownProtocol(String),
    #[error("no starting node known for scenario {0:?}")]
    UnknownScenario(String),
}

/// The broadcast protocols the simulator implements, by their CLI ids.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum_macros::EnumString,
)]
pub enum Protocol {
    #[strum(serialize = "Fast-Broadcast")]
    FastBroadcast,
    #[strum(serialize = "STATIC-100")]
    Static100,
    #[strum(serialize = "STATIC-300")]
    Static300,
    #[strum(serialize = "STATIC-500")]
    Static500,
    #[strum(serialize = "STATIC-700")]
    Static700,
    #[strum(serialize = "ROFF")]
    Roff,
}

impl Protocol {
    /// Resolve the numeric protocol id used on the command line.
    pub fn from_id(id: &str) -> Result<Self, JobError> {
        match id {
            "1" => Ok(Self::FastBroadcast),
            "2" => Ok(Self::Static100),
            "3" => Ok(Self::Static300),
            "4" => Ok(Self::Static500),
            "5" => Ok(Self::Static700),
            "6" => Ok(Self::Roff),
            other => Err(JobError::UnknownProtocol(other.to_string())),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::FastBroadcast => "1",
            Self::Static100 => "2",
            Self::Static300 => "3",
            Self::Static500 => "4",
            Self::Static700 => "5",
            Self::Roff => "6",
        }
    }

    /// STATIC variants use a fixed estimated range, so simulating error
    /// rates on them is meaningless.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Self::Static100 | Self::Static300 | Self::Static500 | Self::Static700
        )
    }

    /// Simulator binary (and its scratch folder) implementing this protocol.
    pub fn simulator(&self) -> &'static str {
        match self {
            Self::Roff => "roff-test",
            _ => "fb-vanet-urban",
        }
    }
}

/// One `cwMin`/`cwMax` pair, given on the command line as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ContentionWindow {
    #[serde(rename = "cwMin")]
    pub cw_min: u32,
    #[serde(rename = "cwMax")]
    pub cw_max: u32,
}

impl fmt::Display for ContentionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cw-{}-{}", self.cw_min, self.cw_max)
    }
}

/// Parse the JSON contention window list, e.g.
/// `[{"cwMin": 32, "cwMax": 1024}]`.
pub fn parse_contention_windows(json: &str) -> Result<Vec<ContentionWindow>, JobError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse `range:power` pairs, e.g. `300:4.6,500:7.1`.
pub fn parse_tx_powers(spec: &str) -> Result<HashMap<u32, f64>, JobError> {
    let mut powers = HashMap::new();
    for pair in spec.split(',').filter(|p| !p.trim().is_empty()) {
        let err = || JobError::TxPower(pair.to_string());
        let (range, power) = pair.split_once(':').ok_or_else(err)?;
        let range = u32::from_str(range.trim()).map_err(|_| err())?;
        let power = f64::from_str(power.trim()).map_err(|_| err())?;
        powers.insert(range, power);
    }
    Ok(powers)
}

/// Full parameter space of one generation run.
#[derive(Debug, Clone)]
pub struct JobBatch {
    pub scenarios: Vec<String>,
    pub contention_windows: Vec<ContentionWindow>,
    pub high_buildings: Vec<String>,
    pub drones: Vec<String>,
    pub buildings: Vec<String>,
    pub error_rates: Vec<String>,
    pub junctions: Vec<String>,
    pub protocols: Vec<Protocol>,
    pub tx_ranges: Vec<String>,
    pub tx_powers: HashMap<u32, f64>,
    pub job_array: String,
    pub print_coords: bool,
    /// Generate an obstacle shadowing loss file instead of using one.
    pub gen_loss_file: bool,
    /// Override the per-building-mode RAM default.
    pub ram: Option<String>,
    /// Override the per-scenario wall time default.
    pub needed_time: Option<String>,
    pub maps_path: PathBuf,
    pub jobs_path: PathBuf,
    pub template_path: PathBuf,
}

/// Per-scenario node id the alert broadcast starts from.
pub fn starting_node(scenario: &str) -> Option<u32> {
    let map: &[(&str, u32)] = &[
        ("Padova-5", 1212),
        ("Padova-15", 1182),
        ("Padova-25", 310),
        ("Padova-35", 1273),
        ("Padova-45", 824),
        ("LA-5", 124),
        ("LA-15", 2355),
        ("LA-25", 1009),
        ("LA-35", 459),
        ("LA-45", 354),
        ("Grid-200", 2024),
        ("Grid-300", 3136),
        ("Grid-300+-5", 4896),
        ("Grid-300-node+-5", 3366),
        ("Grid-400", 1248),
        ("Platoon", 0),
        ("Platoon-15km", 0),
        ("Cube-150", 4210),
        ("Cube-200", 2184),
        ("Cube-125", 7212),
    ];
    map.iter().find(|(s, _)| *s == scenario).map(|(_, n)| *n)
}

/// Per-scenario vehicle count override; 0 leaves the simulator default.
pub fn vehicles_number(scenario: &str) -> u32 {
    match scenario {
        "LA-5" => 2984,
        "LA-15" => 2396,
        "LA-25" => 1465,
        "LA-35" => 1083,
        "LA-45" => 861,
        _ => 0,
    }
}

/// Radius of the area of interest, by scenario family.
pub fn area_of_interest(scenario: &str) -> u32 {
    if scenario.contains("Platoon") {
        14000
    } else if scenario.contains("Grid") {
        2000
    } else if scenario.contains("Cube") && scenario != "Cube-75" {
        1300
    } else {
        1000
    }
}

/// The inter-vehicle distance encoded in the scenario name; grid and platoon
/// scenarios always use 25m.
pub fn vehicle_distance(scenario: &str) -> &str {
    if scenario.contains("Grid") || scenario.contains("Platoon") {
        "25"
    } else {
        scenario.split('-').nth(1).unwrap_or("25")
    }
}

/// Wall time by scenario family and protocol. STATIC runs are much cheaper,
/// loss-file generation on city maps much more expensive.
pub fn needed_time(scenario: &str, protocol: Protocol, gen_loss_file: bool) -> &'static str {
    if scenario.contains("Grid") {
        if protocol.is_static() {
            "02:00:00"
        } else {
            "10:00:00"
        }
    } else if scenario.contains("Padova") || scenario.contains("LA-") {
        if gen_loss_file {
            "48:00:00"
        } else if protocol.is_static() {
            "02:00:00"
        } else {
            "10:00:00"
        }
    } else if scenario.contains("Cube") {
        "48:00:00"
    } else if protocol.is_static() {
        "04:45:00"
    } else {
        "48:30:00"
    }
}

/// Building-aware simulations need far more memory.
pub fn ram_for(building: &str) -> &'static str {
    if building == "1" {
        "8G"
    } else {
        "2G"
    }
}

impl JobBatch {
    /// Generate all job files for this parameter space. Returns the number of
    /// files written.
    pub fn generate(&self) -> Result<usize, JobError> {
        let template = std::fs::read_to_string(&self.template_path)?;
        let extension = self
            .template_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        std::fs::create_dir_all(&self.jobs_path)?;

        let mut written = 0usize;
        for cw in &self.contention_windows {
            for scenario in &self.scenarios {
                written += self.generate_scenario(scenario, cw, &template, &extension)?;
            }
        }
        log::info!("generated {written} job files in {}", self.jobs_path.display());
        Ok(written)
    }

    fn generate_scenario(
        &self,
        scenario: &str,
        cw: &ContentionWindow,
        template: &str,
        extension: &str,
    ) -> Result<usize, JobError> {
        log::info!("processing scenario {scenario}");
        let starting_node = starting_node(scenario)
            .ok_or_else(|| JobError::UnknownScenario(scenario.to_string()))?;
        let distance = vehicle_distance(scenario);
        let area = area_of_interest(scenario);
        let map_base_path = self.maps_path.join(scenario).join(scenario);

        let mut written = 0usize;
        for (high_building, drone, building, tx_range, protocol, junction, error_rate) in iproduct!(
            &self.high_buildings,
            &self.drones,
            &self.buildings,
            &self.tx_ranges,
            &self.protocols,
            &self.junctions,
            &self.error_rates
        ) {
            // error rates only make sense for the adaptive protocols
            if error_rate != "0" && protocol.is_static() {
                continue;
            }

            let point = JobPoint {
                scenario,
                cw,
                high_building,
                drone,
                building,
                tx_range,
                protocol: *protocol,
                junction,
                error_rate,
                distance,
                area,
                starting_node,
                map_base_path: &map_base_path,
            };
            self.write_job(&point, template, extension)?;
            written += 1;
        }
        Ok(written)
    }

    fn write_job(
        &self,
        point: &JobPoint<'_>,
        template: &str,
        extension: &str,
    ) -> Result<(), JobError> {
        let job_name = self.job_name(point);
        let command = self.command(point);
        let ram = self.ram.clone().unwrap_or_else(|| ram_for(point.building).to_string());
        let needed_time = self
            .needed_time
            .clone()
            .unwrap_or_else(|| needed_time(point.scenario, point.protocol, self.gen_loss_file).to_string());

        let content = template
            .replace("{**jobName}", &job_name)
            .replace("{**command}", &command)
            .replace("{**ram}", &ram)
            .replace("{**neededTime}", &needed_time)
            .replace("{**jobarray}", &self.job_array)
            .replace("{**sim_folder}", point.protocol.simulator());

        let job_path = self.jobs_path.join(format!("{job_name}.{extension}"));
        std::fs::write(&job_path, content)?;
        log::debug!("wrote {}", job_path.display());
        Ok(())
    }

    fn tx_power_suffix(&self, tx_range: &str) -> Option<String> {
        let range: u32 = tx_range.parse().ok()?;
        self.tx_powers
            .get(&range)
            .map(|power| format!("--txPower={power}"))
    }

    fn job_name(&self, point: &JobPoint<'_>) -> String {
        let mut name = format!(
            "urban-{}{}-highBuildings{}-drones{}-d{}-{}-b{}-e{}-j{}-{}-{}",
            point.scenario,
            if self.gen_loss_file { "-losses" } else { "" },
            point.high_building,
            point.drone,
            point.distance,
            point.cw,
            point.building,
            point.error_rate,
            point.junction,
            point.protocol,
            point.tx_range,
        );
        if self.print_coords {
            name.push_str("-with-coords");
        }
        if let Some(power) = self.tx_power_suffix(point.tx_range) {
            name.push('-');
            name.push_str(&power.replace("--", ""));
        }
        name
    }

    fn command(&self, point: &JobPoint<'_>) -> String {
        let create_loss = u8::from(self.gen_loss_file);
        let use_loss = u8::from(!self.gen_loss_file);
        let print_coords = u8::from(self.gen_loss_file || self.print_coords);
        // indoor propagation makes no sense in the free-space cube lattice
        let propagation_loss = if point.scenario.contains("Cube") { 0 } else { 1 };

        let mut options = vec![
            format!("--buildings={}", point.building),
            format!("--actualRange={}", point.tx_range),
            format!("--mapBasePath={}", point.map_base_path.display()),
        ];
        if point.protocol != Protocol::Roff {
            options.push(format!("--cwMin={}", point.cw.cw_min));
            options.push(format!("--cwMax={}", point.cw.cw_max));
        }
        options.extend([
            format!("--vehicleDistance={}", point.distance),
            format!("--startingNode={}", point.starting_node),
            format!("--propagationLoss={propagation_loss}"),
        ]);
        if point.protocol != Protocol::Roff {
            options.push(format!("--protocol={}", point.protocol.id()));
        }
        options.extend([
            format!("--area={}", point.area),
            format!("--smartJunctionMode={}", point.junction),
            format!("--errorRate={}", point.error_rate),
            format!("--nVehicles={}", vehicles_number(point.scenario)),
            format!("--droneTest={}", point.drone),
            format!("--highBuildings={}", point.high_building),
        ]);
        if point.protocol != Protocol::Roff {
            options.push("--flooding=0".to_string());
        }
        options.extend([
            "--printToFile=1".to_string(),
            format!("--printCoords={print_coords}"),
            format!("--createObstacleShadowingLossFile={create_loss}"),
            format!("--useObstacleShadowingLossFile={use_loss}"),
        ]);
        if point.protocol == Protocol::Roff {
            options.extend([
                "--beaconInterval=100".to_string(),
                "--distanceRange=1".to_string(),
            ]);
        }
        options.extend([
            "--forgedCoordTest=0".to_string(),
            "--forgedCoordRate=0".to_string(),
            "--maxRun=1".to_string(),
        ]);
        if let Some(power) = self.tx_power_suffix(point.tx_range) {
            options.push(power);
        }

        let mut command = point.protocol.simulator().to_string();
        for option in options {
            command.push_str(" \\\n  ");
            command.push_str(&option);
        }
        command
    }
}

/// One point of the cross product, bundled to keep the loop nest readable.
struct JobPoint<'a> {
    scenario: &'a str,
    cw: &'a ContentionWindow,
    high_building: &'a str,
    drone: &'a str,
    building: &'a str,
    tx_range: &'a str,
    protocol: Protocol,
    junction: &'a str,
    error_rate: &'a str,
    distance: &'a str,
    area: u32,
    starting_node: u32,
    map_base_path: &'a Path,
}

#[cfg(test)]
mod test {
    use super::*;

    fn batch() -> JobBatch {
        JobBatch {
            scenarios: vec!["Padova-25".to_string()],
            contention_windows: vec![ContentionWindow {
                cw_min: 32,
                cw_max: 1024,
            }],
            high_buildings: vec!["0".to_string()],
            drones: vec!["0".to_string()],
            buildings: vec!["0".to_string(), "1".to_string()],
            error_rates: vec!["0".to_string()],
            junctions: vec!["0".to_string()],
            protocols: vec![Protocol::FastBroadcast, Protocol::Roff],
            tx_ranges: vec!["300".to_string()],
            tx_powers: HashMap::new(),
            job_array: "1-50".to_string(),
            print_coords: false,
            gen_loss_file: false,
            ram: None,
            needed_time: None,
            maps_path: PathBuf::from("../maps"),
            jobs_path: PathBuf::from("."),
            template_path: PathBuf::from("templates/job_template.slurm"),
        }
    }

    fn point<'a>(b: &'a JobBatch, protocol: Protocol) -> JobPoint<'a> {
        JobPoint {
            scenario: &b.scenarios[0],
            cw: &b.contention_windows[0],
            high_building: "0",
            drone: "0",
            building: "1",
            tx_range: "300",
            protocol,
            junction: "0",
            error_rate: "0",
            distance: "25",
            area: 1000,
            starting_node: 310,
            map_base_path: Path::new("../maps/Padova-25/Padova-25"),
        }
    }

    #[test]
    fn protocol_ids_round_trip() {
        for id in ["1", "2", "3", "4", "5", "6"] {
            assert_eq!(Protocol::from_id(id).unwrap().id(), id);
        }
        assert!(Protocol::from_id("7").is_err());
        assert_eq!(Protocol::from_id("6").unwrap().to_string(), "ROFF");
        assert_eq!(
            "Fast-Broadcast".parse::<Protocol>().unwrap(),
            Protocol::FastBroadcast
        );
    }

    #[test]
    fn parse_contention_window_json() {
        let cws =
            parse_contention_windows(r#"[{"cwMin": 16, "cwMax": 128}, {"cwMin": 32, "cwMax": 1024}]"#)
                .unwrap();
        assert_eq!(cws.len(), 2);
        assert_eq!(cws[0].cw_min, 16);
        assert_eq!(cws[1].to_string(), "cw-32-1024");
        assert!(parse_contention_windows("not json").is_err());
    }

    #[test]
    fn parse_tx_power_pairs() {
        let powers = parse_tx_powers("300:4.6, 500:7.1").unwrap();
        assert_eq!(powers[&300], 4.6);
        assert_eq!(powers[&500], 7.1);
        assert!(parse_tx_powers("").unwrap().is_empty());
        assert!(parse_tx_powers("oops").is_err());
    }

    #[test]
    fn fb_command_carries_cw_and_protocol() {
        let b = batch();
        let command = b.command(&point(&b, Protocol::FastBroadcast));
        assert!(command.starts_with("fb-vanet-urban \\\n"));
        assert!(command.contains("--cwMin=32"));
        assert!(command.contains("--cwMax=1024"));
        assert!(command.contains("--protocol=1"));
        assert!(command.contains("--flooding=0"));
        assert!(command.contains("--startingNode=310"));
        assert!(!command.contains("--beaconInterval"));
    }

    #[test]
    fn roff_command_has_no_cw() {
        let b = batch();
        let command = b.command(&point(&b, Protocol::Roff));
        assert!(command.starts_with("roff-test \\\n"));
        assert!(!command.contains("--cwMin"));
        assert!(!command.contains("--protocol="));
        assert!(command.contains("--beaconInterval=100"));
        assert!(command.contains("--distanceRange=1"));
    }

    #[test]
    fn job_name_encodes_the_parameter_point() {
        let b = batch();
        let name = b.job_name(&point(&b, Protocol::FastBroadcast));
        assert_eq!(
            name,
            "urban-Padova-25-highBuildings0-drones0-d25-cw-32-1024-b1-e0-j0-Fast-Broadcast-300"
        );
    }

    #[test]
    fn static_protocols_skip_error_rates() {
        assert!(Protocol::Static300.is_static());
        assert!(!Protocol::FastBroadcast.is_static());
        assert!(!Protocol::Roff.is_static());
    }

    #[test]
    fn time_and_ram_defaults() {
        assert_eq!(needed_time("Grid-300", Protocol::Static100, false), "02:00:00");
        assert_eq!(needed_time("Grid-300", Protocol::Roff, false), "10:00:00");
        assert_eq!(needed_time("Padova-25", Protocol::Roff, true), "48:00:00");
        assert_eq!(needed_time("Cube-150", Protocol::FastBroadcast, false), "48:00:00");
        assert_eq!(ram_for("1"), "8G");
        assert_eq!(ram_for("0"), "2G");
    }

    #[test]
    fn generate_substitutes_template_placeholders() {
        let dir = std::env::temp_dir().join("vanalyze-jobgen-test");
        std::fs::create_dir_all(&dir).unwrap();
        let template_path = dir.join("template.slurm");
        std::fs::write(
            &template_path,
            "#SBATCH --job-name={**jobName}\n\
             #SBATCH --mem={**ram}\n\
             #SBATCH --time={**neededTime}\n\
             #SBATCH --array={**jobarray}\n\
             cd $HOME/ns-3/{**sim_folder}\n\
             srun {**command}\n",
        )
        .unwrap();

        let b = JobBatch {
            protocols: vec![Protocol::FastBroadcast],
            buildings: vec!["1".to_string()],
            jobs_path: dir.join("jobs"),
            template_path,
            ..batch()
        };
        assert_eq!(b.generate().unwrap(), 1);

        let job_file = b.jobs_path.join(
            "urban-Padova-25-highBuildings0-drones0-d25-cw-32-1024-b1-e0-j0-Fast-Broadcast-300.slurm",
        );
        let content = std::fs::read_to_string(&job_file).unwrap();
        assert!(content.contains("--job-name=urban-Padova-25"));
        assert!(content.contains("--mem=8G"));
        assert!(content.contains("--time=10:00:00"));
        assert!(content.contains("--array=1-50"));
        assert!(content.contains("cd $HOME/ns-3/fb-vanet-urban"));
        assert!(content.contains("--startingNode=310"));
        assert!(content.contains("--cwMin=32"));
        // every placeholder was substituted
        assert!(!content.contains("{**"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn cube_scenarios_disable_propagation_loss() {
        let b = batch();
        let mut p = point(&b, Protocol::FastBroadcast);
        p.scenario = "Cube-150";
        let command = b.command(&p);
        assert!(command.contains("--propagationLoss=0"));
    }
}
