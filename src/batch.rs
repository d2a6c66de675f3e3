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
//! The processing driver shared by all drawing binaries.
//!
//! Every tool supports the same three modes: a single file, one folder
//! (non-recursive), and a recursive batch over a campaign base folder. The
//! driver resolves per-file configuration and output paths and hands each
//! result file to the tool's render function.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use crate::{
    config::{CommonArgs, SimulationConfig},
    render::RenderError,
    scenario::{self, PathStructure},
};

/// Render callback of one drawing tool.
pub type RenderFn = dyn Fn(&Path, &Path, &SimulationConfig) -> Result<(), RenderError> + Sync;

/// Static description of a drawing tool, used for output layout.
pub struct ToolSpec {
    pub name: &'static str,
    /// Subfolder inside the mirrored hierarchy for batch/folder outputs.
    pub output_subfolder: &'static str,
    /// Subfolder for single files outside the campaign hierarchy.
    pub single_output_subfolder: &'static str,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("csv file does not exist: {0}")]
    MissingFile(PathBuf),
    #[error("csv file appears incomplete: {0}")]
    IncompleteFile(PathBuf),
    #[error(
        "either a map folder (--mapfolder) or an explicit mobility file (-m) \
         is required for folder and batch processing"
    )]
    MissingMobilitySource,
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Run one drawing tool over whatever input the CLI selected. Returns the
/// statistics of the run; a [`BatchError`] indicates a usage error rather
/// than a failed file.
pub fn run(
    args: &CommonArgs,
    config: SimulationConfig,
    tool: &ToolSpec,
    render: &RenderFn,
) -> Result<BatchStats, BatchError> {
    log::info!("{}", tool.name);
    log::info!("transmission radius: {}m", config.circ_radius);
    log::info!(
        "force buildings: {}",
        if config.force_buildings { "yes" } else { "no" }
    );

    if let Some(file) = &args.input.file {
        let mut stats = BatchStats {
            processed: 1,
            ..Default::default()
        };
        match process_single_file(file, config, tool, render) {
            Ok(()) => stats.successful = 1,
            Err(e) => {
                log::error!("{}: {e}", file.display());
                stats.failed = 1;
            }
        }
        return Ok(stats);
    }

    // folder and batch modes need a way to find mobility files
    if config.base_map_folder.is_none() && config.mobility_file.is_none() {
        return Err(BatchError::MissingMobilitySource);
    }

    if args.input.folder.is_some() {
        Ok(process_folder(config, tool, render))
    } else {
        Ok(process_batch(config, tool, render))
    }
}

/// Process a single result file, writing next to the mirrored hierarchy when
/// the file sits inside one, or under the tool's single-file subfolder
/// otherwise.
fn process_single_file(
    csv_file: &Path,
    mut config: SimulationConfig,
    tool: &ToolSpec,
    render: &RenderFn,
) -> Result<(), BatchError> {
    log::info!("processing single file {}", csv_file.display());

    if !csv_file.exists() {
        return Err(BatchError::MissingFile(csv_file.to_path_buf()));
    }
    if !scenario::is_file_complete(csv_file) {
        return Err(BatchError::IncompleteFile(csv_file.to_path_buf()));
    }

    let path_info = scenario::parse_csv_path_structure(csv_file);
    if let Some(info) = &path_info {
        if config.building_mode.is_none() {
            config.configure_buildings(&info.building, Some(&info.csv_filename));
        }
    }
    for error in config.validate_paths() {
        log::warn!("{error}");
    }

    let suffix = config.filename_suffix();
    let output_path = match &path_info {
        Some(info) => scenario::generate_output_path(
            info,
            &config.output_base,
            suffix,
            tool.output_subfolder,
        ),
        None => {
            let stem = csv_stem(csv_file);
            config
                .output_base
                .join(tool.single_output_subfolder)
                .join(format!("{stem}{suffix}.html"))
        }
    };

    render(csv_file, &output_path, &config)?;
    Ok(())
}

/// Process every complete result CSV directly inside the configured folder.
fn process_folder(mut config: SimulationConfig, tool: &ToolSpec, render: &RenderFn) -> BatchStats {
    let folder = config.folder.clone().unwrap_or_default();
    log::info!("processing csv files from folder {}", folder.display());

    let csv_files =
        scenario::find_csv_files_in_folder(&folder, Some(config.max_files_per_protocol));
    if csv_files.is_empty() {
        log::warn!("no valid csv files found in {}", folder.display());
        return BatchStats::default();
    }

    // scenario from the first structured file, else the folder name
    let scenario_name = csv_files
        .iter()
        .find(|info| info.scenario != "unknown")
        .map(|info| info.scenario.clone())
        .unwrap_or_else(|| {
            folder
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default()
        });
    log::info!("detected scenario: {scenario_name}");

    if let Some(map_folder) = config.base_map_folder.clone() {
        if scenario_name != "unknown" {
            config.set_paths_from_scenario(&map_folder, &scenario_name);
        }
    }

    process_files(&csv_files, &config, &scenario_name, render, |info, suffix| {
        if info.scenario != "unknown" {
            let mut info = info.clone();
            info.scenario = scenario_name.clone();
            scenario::generate_output_path(&info, &config.output_base, suffix, tool.output_subfolder)
        } else {
            // files without a recognizable hierarchy around them
            let stem = info
                .csv_filename
                .strip_suffix(".csv")
                .unwrap_or(&info.csv_filename);
            config
                .output_base
                .join(tool.output_subfolder)
                .join(&scenario_name)
                .join("unknown")
                .join(stem)
                .join(format!("{stem}{suffix}.html"))
        }
    })
}

/// Recursively process a campaign base folder, reusing the detected scenario
/// for every file below it.
fn process_batch(config: SimulationConfig, tool: &ToolSpec, render: &RenderFn) -> BatchStats {
    let base_folder = config.base_folder.clone().unwrap_or_default();
    log::info!("processing batch from base folder {}", base_folder.display());

    let detection = scenario::detect_scenario_from_basepath(&base_folder);
    let scenario_name = detection.scenario_name.clone();
    if detection.structure_valid {
        log::info!("detected scenario: {scenario_name}");
        if detection.is_sub_branch {
            log::info!("processing sub-branch {:?}", detection.sub_path);
        }
    } else {
        log::info!("using fallback scenario detection: {scenario_name}");
    }

    let csv_files = scenario::find_csv_files(&base_folder, config.max_files_per_protocol);
    if csv_files.is_empty() {
        log::warn!(
            "no valid csv files found below {}",
            base_folder.display()
        );
        return BatchStats::default();
    }

    process_files(&csv_files, &config, &scenario_name, render, |info, suffix| {
        let mut info = info.clone();
        info.scenario = scenario_name.clone();
        scenario::generate_output_path(&info, &config.output_base, suffix, tool.output_subfolder)
    })
}

/// Shared per-file loop of the folder and batch modes.
fn process_files(
    csv_files: &[PathStructure],
    config: &SimulationConfig,
    scenario_name: &str,
    render: &RenderFn,
    output_path_for: impl Fn(&PathStructure, &str) -> PathBuf,
) -> BatchStats {
    let mut stats = BatchStats::default();
    let progress = ProgressBar::new(csv_files.len() as u64).with_style(
        ProgressStyle::with_template("{wide_bar} {pos}/{len} {msg}").unwrap(),
    );

    for info in csv_files {
        stats.processed += 1;
        progress.set_message(info.csv_filename.clone());
        log::info!(
            "processing file {}/{}: {}",
            stats.processed,
            csv_files.len(),
            info.csv_filename
        );

        // per-file copy so building settings never leak between files
        let mut file_config = config.for_file(info);
        if let Some(map_folder) = file_config.base_map_folder.clone() {
            if file_config.mobility_file.is_none()
                || file_config.scenario.as_deref() != Some(scenario_name)
            {
                file_config.set_paths_from_scenario(&map_folder, scenario_name);
                file_config.configure_buildings(&info.building, Some(&info.csv_filename));
            }
        }

        let errors = file_config.validate_paths();
        if !errors.is_empty() {
            for error in &errors {
                log::error!("skipping {}: {error}", info.csv_filename);
            }
            stats.failed += 1;
            progress.inc(1);
            continue;
        }

        let output_path = output_path_for(info, file_config.filename_suffix());
        if file_config.verbose {
            log::info!("  output path: {}", output_path.display());
        }

        match render(&info.csv_path, &output_path, &file_config) {
            Ok(()) => stats.successful += 1,
            Err(e) => {
                log::error!("{}: {e}", info.csv_filename);
                stats.failed += 1;
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    log::info!(
        "processing completed: {} processed, {} successful, {} failed",
        stats.processed,
        stats.successful,
        stats.failed
    );
    stats
}

fn csv_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    fn tool() -> ToolSpec {
        ToolSpec {
            name: "Draw Coverage Tool",
            output_subfolder: "coverages",
            single_output_subfolder: "singlefileCoverages",
        }
    }

    #[test]
    fn single_file_must_exist() {
        let args_file = Path::new("/nonexistent/run1.csv");
        let err = process_single_file(
            args_file,
            SimulationConfig::default(),
            &tool(),
            &|_, _, _| Ok(()),
        )
        .unwrap_err();
        assert!(matches!(err, BatchError::MissingFile(_)));
    }

    #[test]
    fn empty_folder_yields_empty_stats() {
        let dir = std::env::temp_dir().join("vanalyze-empty-folder-test");
        std::fs::create_dir_all(&dir).unwrap();
        let config = SimulationConfig {
            folder: Some(dir.clone()),
            mobility_file: Some(PathBuf::from("trace.ns2mobility.xml")),
            ..Default::default()
        };
        let stats = process_folder(config, &tool(), &|_, _, _| Ok(()));
        assert_eq!(stats, BatchStats::default());
        std::fs::remove_dir_all(dir).ok();
    }
}
