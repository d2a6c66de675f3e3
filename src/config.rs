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
//! Shared CLI arguments of the drawing tools and the per-run configuration
//! they resolve into.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::scenario::{self, PathStructure};

/// Arguments shared by all drawing binaries.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    #[command(flatten)]
    pub input: InputSource,

    #[command(flatten)]
    pub mobility_source: MobilitySource,

    /// Polygon/building file path
    #[arg(short, long)]
    pub poly: Option<PathBuf>,

    /// Transmission radius in meters (defaults to 2000 for Grid scenarios,
    /// 1000 otherwise)
    #[arg(short, long)]
    pub radius: Option<f64>,

    /// Output base directory
    #[arg(short, long, default_value = "./out")]
    pub output: PathBuf,

    /// Maximum files to process per protocol
    #[arg(long, default_value_t = 3)]
    pub maxfiles: usize,

    /// Resolution of the rendered figures
    #[arg(long, default_value_t = 150)]
    pub dpi: u32,

    /// Plot buildings even for runs recorded without them (b0)
    #[arg(long)]
    pub force_buildings: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// What to process; exactly one must be given.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct InputSource {
    /// Single CSV file to process
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Folder containing CSV files (non-recursive)
    #[arg(short = 'd', long)]
    pub folder: Option<PathBuf>,

    /// Base folder for recursive batch processing
    #[arg(short, long)]
    pub basefolder: Option<PathBuf>,
}

/// Where node positions come from; exactly one must be given.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct MobilitySource {
    /// NS2 mobility file path
    #[arg(short, long)]
    pub mobility: Option<PathBuf>,

    /// Base map folder containing scenario subdirectories
    #[arg(long)]
    pub mapfolder: Option<PathBuf>,
}

/// Resolved configuration for one invocation. Batch processing clones this
/// per file before applying file-specific building settings, so files never
/// leak state into each other.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub base_folder: Option<PathBuf>,
    pub folder: Option<PathBuf>,
    pub base_map_folder: Option<PathBuf>,
    pub scenario: Option<String>,
    pub mobility_file: Option<PathBuf>,
    pub poly_file: Option<PathBuf>,
    /// Remembered so `--force-buildings` can restore a disabled poly file.
    pub original_poly_file: Option<PathBuf>,
    pub circ_radius: f64,
    pub output_base: PathBuf,
    pub dpi: u32,
    pub force_buildings: bool,
    pub building_mode: Option<String>,
    pub verbose: bool,
    pub max_files_per_protocol: usize,
    /// Annotate node ids next to their markers (alert-path plots).
    pub show_nodes: bool,
    /// Extra diagnostics while rendering (alert-path plots).
    pub debug: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_folder: None,
            folder: None,
            base_map_folder: None,
            scenario: None,
            mobility_file: None,
            poly_file: None,
            original_poly_file: None,
            circ_radius: 1000.0,
            output_base: PathBuf::from("./out"),
            dpi: 150,
            force_buildings: false,
            building_mode: None,
            verbose: false,
            max_files_per_protocol: 3,
            show_nodes: false,
            debug: false,
        }
    }
}

impl SimulationConfig {
    /// Resolve common CLI arguments, deriving the scenario name (for the
    /// radius default and map paths) from whichever input was given.
    pub fn from_common_args(args: &CommonArgs) -> Self {
        let mut config = Self::default();

        let scenario_name = if let Some(file) = &args.input.file {
            scenario::parse_csv_path_structure(file).map(|info| info.scenario)
        } else if let Some(folder) = &args.input.folder {
            folder
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
        } else if let Some(basefolder) = &args.input.basefolder {
            let detection = scenario::detect_scenario_from_basepath(basefolder);
            Some(detection.scenario_name)
        } else {
            None
        };

        config.circ_radius = args.radius.unwrap_or_else(|| {
            scenario::determine_default_radius(scenario_name.as_deref().unwrap_or_default()) as f64
        });

        config.base_folder = args.input.basefolder.clone();
        config.folder = args.input.folder.clone();
        config.output_base = args.output.clone();
        config.base_map_folder = args.mobility_source.mapfolder.clone();
        config.dpi = args.dpi;
        config.verbose = args.verbose;
        config.force_buildings = args.force_buildings;
        config.max_files_per_protocol = args.maxfiles;

        if let Some(mobility) = &args.mobility_source.mobility {
            config.mobility_file = Some(mobility.clone());
        }
        if let Some(poly) = &args.poly {
            config.poly_file = Some(poly.clone());
            config.original_poly_file = Some(poly.clone());
        }

        // single file plus map folder: resolve scenario paths right away
        if let (Some(mapfolder), Some(file)) = (&args.mobility_source.mapfolder, &args.input.file)
        {
            if let Some(info) = scenario::parse_csv_path_structure(file) {
                config.set_paths_from_scenario(mapfolder, &info.scenario);
                config.configure_buildings(&info.building, Some(&info.csv_filename));
            }
        }

        config
    }

    /// Point the mobility and poly paths at
    /// `<map folder>/<scenario>/<scenario>.{ns2mobility,poly}.xml`.
    pub fn set_paths_from_scenario(&mut self, base_map_folder: &Path, scenario: &str) {
        self.base_map_folder = Some(base_map_folder.to_path_buf());
        self.scenario = Some(scenario.to_string());
        let scenario_dir = base_map_folder.join(scenario);
        self.mobility_file = Some(scenario_dir.join(format!("{scenario}.ns2mobility.xml")));
        let poly = scenario_dir.join(format!("{scenario}.poly.xml"));
        self.original_poly_file = Some(poly.clone());
        self.poly_file = Some(poly);
    }

    /// Apply the building mode detected from the folder structure (and,
    /// belt-and-braces, from the filename): `b0` disables building rendering
    /// unless `--force-buildings` overrides it.
    pub fn configure_buildings(&mut self, building_mode: &str, filename: Option<&str>) {
        self.building_mode = Some(building_mode.to_string());

        let filename_lower = filename.map(str::to_lowercase).unwrap_or_default();
        let should_disable = building_mode == "b0" || filename_lower.contains("b0");

        if should_disable && !self.force_buildings {
            log::debug!("building mode b0: buildings disabled");
            self.poly_file = None;
        } else if self.force_buildings && self.original_poly_file.is_some() {
            self.poly_file = self.original_poly_file.clone();
        } else if building_mode == "b1" || filename_lower.contains("b1") {
            self.poly_file = self.original_poly_file.clone();
        }
    }

    /// Check that the required inputs exist. A missing poly file is only a
    /// warning (buildings are skipped); everything else is an error the
    /// caller should skip the file over.
    pub fn validate_paths(&mut self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(mobility) = &self.mobility_file {
            if !mobility.exists() {
                errors.push(format!("mobility file not found: {}", mobility.display()));
            }
        }
        if let Some(poly) = &self.poly_file {
            if !poly.exists() {
                log::warn!("poly file not found: {}", poly.display());
                self.poly_file = None;
            }
        }
        if let Some(base) = &self.base_folder {
            if !base.exists() {
                errors.push(format!("base folder not found: {}", base.display()));
            }
        }
        if let Some(folder) = &self.folder {
            if !folder.exists() {
                errors.push(format!("folder not found: {}", folder.display()));
            }
        }

        errors
    }

    /// Suffix appended to output filenames when node ids are annotated.
    pub fn filename_suffix(&self) -> &'static str {
        if self.show_nodes {
            "-show-nodes"
        } else {
            ""
        }
    }

    /// Apply per-file building settings on a fresh copy of this config.
    pub fn for_file(&self, info: &PathStructure) -> Self {
        let mut copy = self.clone();
        if info.building != "unknown" {
            copy.configure_buildings(&info.building, Some(&info.csv_filename));
        }
        copy
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn b0_disables_buildings() {
        let mut config = SimulationConfig {
            poly_file: Some(PathBuf::from("maps/Padova-25/Padova-25.poly.xml")),
            original_poly_file: Some(PathBuf::from("maps/Padova-25/Padova-25.poly.xml")),
            ..Default::default()
        };
        config.configure_buildings("b0", Some("run1.csv"));
        assert_eq!(config.poly_file, None);
        assert_eq!(config.building_mode.as_deref(), Some("b0"));
    }

    #[test]
    fn force_buildings_overrides_b0() {
        let poly = PathBuf::from("maps/Padova-25/Padova-25.poly.xml");
        let mut config = SimulationConfig {
            poly_file: None,
            original_poly_file: Some(poly.clone()),
            force_buildings: true,
            ..Default::default()
        };
        config.configure_buildings("b0", None);
        assert_eq!(config.poly_file, Some(poly));
    }

    #[test]
    fn b0_in_filename_disables_buildings() {
        let mut config = SimulationConfig {
            poly_file: Some(PathBuf::from("p.xml")),
            original_poly_file: Some(PathBuf::from("p.xml")),
            ..Default::default()
        };
        config.configure_buildings("b1", Some("Padova-25-b0-run.csv"));
        assert_eq!(config.poly_file, None);
    }

    #[test]
    fn scenario_paths_are_derived() {
        let mut config = SimulationConfig::default();
        config.set_paths_from_scenario(Path::new("maps"), "Grid-300");
        assert_eq!(
            config.mobility_file,
            Some(PathBuf::from("maps/Grid-300/Grid-300.ns2mobility.xml"))
        );
        assert_eq!(
            config.poly_file,
            Some(PathBuf::from("maps/Grid-300/Grid-300.poly.xml"))
        );
    }
}
