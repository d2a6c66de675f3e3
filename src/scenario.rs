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
//! Detection of the campaign folder structure around result CSVs.
//!
//! Result files live in a fixed hierarchy, with the contention-window level
//! being optional (ROFF runs have none):
//!
//! ```text
//! <scenario>/b{0,1}/e<N>/r<N>/j<N>/cw[<spec>]/<protocol>/<run>.csv
//! <scenario>/b{0,1}/e<N>/r<N>/j<N>/<protocol>/<run>.csv
//! ```
//!
//! Detection is purely lexical, works on paths that do not exist on disk,
//! and never fails hard: unknown layouts degrade to `"unknown"` components
//! with `structure_valid == false`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Scenario folders look like "Padova-25" or "Grid-300".
    pub static ref SCENARIO_RE: Regex = Regex::new(r"^[A-Za-z]+-\d+$").unwrap();
    static ref BUILDING_RE: Regex = Regex::new(r"^b[01]$").unwrap();
    static ref ERROR_RATE_RE: Regex = Regex::new(r"^e\d+$").unwrap();
    static ref TX_RANGE_RE: Regex = Regex::new(r"^r\d+$").unwrap();
    static ref JUNCTION_RE: Regex = Regex::new(r"^j\d+$").unwrap();
    static ref CW_RE: Regex = Regex::new(r"^cw\[.*\]$").unwrap();
    static ref PROTOCOL_RE: Regex = Regex::new(r"^[A-Za-z-]+$").unwrap();
}

const UNKNOWN: &str = "unknown";

/// Where a result CSV sits inside the campaign hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStructure {
    pub scenario: String,
    pub building: String,
    pub error_rate: String,
    pub tx_range: String,
    pub junction: String,
    /// `None` for layouts without a contention-window level (e.g. ROFF).
    pub cw: Option<String>,
    pub protocol: String,
    pub csv_filename: String,
    pub csv_path: PathBuf,
}

impl PathStructure {
    /// All-unknown structure for files outside the expected hierarchy.
    pub fn unknown(csv_path: &Path) -> Self {
        Self {
            scenario: UNKNOWN.to_string(),
            building: UNKNOWN.to_string(),
            error_rate: UNKNOWN.to_string(),
            tx_range: UNKNOWN.to_string(),
            junction: UNKNOWN.to_string(),
            cw: None,
            protocol: UNKNOWN.to_string(),
            csv_filename: csv_path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default(),
            csv_path: csv_path.to_path_buf(),
        }
    }

    /// Label used wherever the cw level has to appear in text output.
    pub fn cw_label(&self) -> &str {
        self.cw.as_deref().unwrap_or("none")
    }
}

/// Result of walking a base folder up towards its scenario root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioDetection {
    pub scenario_path: PathBuf,
    pub scenario_name: String,
    /// Components between the scenario root and the base folder.
    pub sub_path: Vec<String>,
    pub is_sub_branch: bool,
    pub structure_valid: bool,
}

/// Walk up from `base_folder` (at most 10 levels) looking for the nearest
/// ancestor that matches the scenario naming pattern and from which the
/// remaining components validate against the expected hierarchy. Falls back
/// to the base name with `structure_valid == false`.
pub fn detect_scenario_from_basepath(base_folder: &Path) -> ScenarioDetection {
    let mut result = ScenarioDetection {
        scenario_path: base_folder.to_path_buf(),
        scenario_name: base_folder
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default(),
        sub_path: Vec::new(),
        is_sub_branch: false,
        structure_valid: false,
    };

    let components: Vec<String> = base_folder
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    let mut current = base_folder.to_path_buf();
    let mut levels_back = 0usize;

    loop {
        if levels_back >= 10 {
            break;
        }
        let Some(basename) = current.file_name().map(|f| f.to_string_lossy().to_string()) else {
            break;
        };

        if SCENARIO_RE.is_match(&basename) {
            // components of base_folder below the candidate scenario root
            let sub_path: Vec<String> = components[components.len() - levels_back..].to_vec();

            if sub_path.is_empty() {
                result.scenario_path = current.clone();
                result.scenario_name = basename;
                result.sub_path = Vec::new();
                result.is_sub_branch = false;
                result.structure_valid = true;
                break;
            }

            let parts: Vec<&str> = sub_path.iter().map(String::as_str).collect();
            if validate_structure_parts(&parts) {
                result.scenario_path = current.clone();
                result.scenario_name = basename;
                result.sub_path = sub_path;
                result.is_sub_branch = levels_back > 0;
                result.structure_valid = true;
                break;
            }
        }

        let Some(parent) = current.parent() else {
            break;
        };
        if parent == current {
            break;
        }
        current = parent.to_path_buf();
        levels_back += 1;
    }

    result
}

/// Validate components between scenario root and target against the expected
/// order, with the cw level made optional by probing index 4. Components
/// beyond the protocol level are tolerated.
pub fn validate_structure_parts(path_parts: &[&str]) -> bool {
    if path_parts.is_empty() {
        return true;
    }

    let has_cw_level = path_parts.len() >= 5 && CW_RE.is_match(path_parts[4]);

    let expected: &[&Regex] = if has_cw_level {
        &[
            &BUILDING_RE,
            &ERROR_RATE_RE,
            &TX_RANGE_RE,
            &JUNCTION_RE,
            &CW_RE,
            &PROTOCOL_RE,
        ]
    } else {
        &[
            &BUILDING_RE,
            &ERROR_RATE_RE,
            &TX_RANGE_RE,
            &JUNCTION_RE,
            &PROTOCOL_RE,
        ]
    };

    path_parts
        .iter()
        .zip(expected.iter())
        .all(|(part, pattern)| pattern.is_match(part))
}

/// Extract the campaign components around a result CSV path. Returns `None`
/// for non-CSV paths or paths where neither scenario detection nor the
/// positional fallback applies.
pub fn parse_csv_path_structure(csv_path: &Path) -> Option<PathStructure> {
    let csv_filename = csv_path.file_name()?.to_string_lossy().to_string();
    if !csv_filename.ends_with(".csv") {
        return None;
    }

    let dir_path = csv_path.parent().unwrap_or_else(|| Path::new(""));
    let detection = detect_scenario_from_basepath(dir_path);

    if detection.structure_valid {
        let parts = &detection.sub_path;
        let get = |i: usize| parts.get(i).cloned().unwrap_or_else(|| UNKNOWN.to_string());

        let has_cw_level = parts.len() >= 5 && CW_RE.is_match(&parts[4]);
        let (cw, protocol) = if has_cw_level {
            (Some(parts[4].clone()), get(5))
        } else {
            (None, get(4))
        };

        return Some(PathStructure {
            scenario: detection.scenario_name,
            building: get(0),
            error_rate: get(1),
            tx_range: get(2),
            junction: get(3),
            cw,
            protocol,
            csv_filename,
            csv_path: csv_path.to_path_buf(),
        });
    }

    // Positional fallback: count components from the right.
    let parts: Vec<String> = csv_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let n = parts.len();

    if n >= 8 && CW_RE.is_match(&parts[n - 3]) {
        return Some(PathStructure {
            scenario: parts[n - 8].clone(),
            building: parts[n - 7].clone(),
            error_rate: parts[n - 6].clone(),
            tx_range: parts[n - 5].clone(),
            junction: parts[n - 4].clone(),
            cw: Some(parts[n - 3].clone()),
            protocol: parts[n - 2].clone(),
            csv_filename,
            csv_path: csv_path.to_path_buf(),
        });
    }

    if n >= 7 {
        return Some(PathStructure {
            scenario: parts[n - 7].clone(),
            building: parts[n - 6].clone(),
            error_rate: parts[n - 5].clone(),
            tx_range: parts[n - 4].clone(),
            junction: parts[n - 3].clone(),
            cw: None,
            protocol: parts[n - 2].clone(),
            csv_filename,
            csv_path: csv_path.to_path_buf(),
        });
    }

    None
}

/// A result file is complete once the simulator has written both the header
/// and the data row.
pub fn is_file_complete(path: &Path) -> bool {
    use std::io::BufRead;
    let Ok(file) = fs::File::open(path) else {
        return false;
    };
    std::io::BufReader::new(file).lines().count() == 2
}

/// Recursively collect complete result CSVs below `base_folder`, capped at
/// `max_files_per_protocol` per directory (each protocol has its own leaf
/// directory).
pub fn find_csv_files(base_folder: &Path, max_files_per_protocol: usize) -> Vec<PathStructure> {
    let mut csv_files = Vec::new();
    if !base_folder.exists() {
        log::error!("base folder does not exist: {}", base_folder.display());
        return csv_files;
    }

    log::info!("scanning folder structure in {}", base_folder.display());
    // the base may contain a cw[..] level, so its glob metacharacters must
    // not be interpreted
    let escaped_base = glob::Pattern::escape(&base_folder.display().to_string());
    let pattern = format!("{escaped_base}/**/*.csv");
    let mut per_dir: std::collections::HashMap<PathBuf, usize> = std::collections::HashMap::new();

    let paths: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(e) => {
            log::error!("invalid glob pattern {pattern:?}: {e}");
            return csv_files;
        }
    };

    for csv_path in paths {
        let dir = csv_path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let count = per_dir.entry(dir).or_insert(0);
        if *count >= max_files_per_protocol {
            continue;
        }
        if !is_file_complete(&csv_path) {
            log::debug!("skipping incomplete file {}", csv_path.display());
            continue;
        }
        if let Some(info) = parse_csv_path_structure(&csv_path) {
            csv_files.push(info);
            *count += 1;
        }
    }

    log::info!("found {} valid result files", csv_files.len());
    csv_files
}

/// Collect complete result CSVs directly inside `folder_path` (non-recursive,
/// sorted for a stable processing order). Files outside the expected
/// hierarchy still get an all-unknown structure so they can be processed.
pub fn find_csv_files_in_folder(
    folder_path: &Path,
    max_files: Option<usize>,
) -> Vec<PathStructure> {
    let mut csv_files = Vec::new();
    let entries = match fs::read_dir(folder_path) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("cannot read folder {}: {e}", folder_path.display());
            return csv_files;
        }
    };

    let mut names: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    names.sort();

    for csv_path in names {
        if max_files.is_some_and(|max| csv_files.len() >= max) {
            break;
        }
        if !is_file_complete(&csv_path) {
            log::warn!("skipping incomplete file {}", csv_path.display());
            continue;
        }
        let info = parse_csv_path_structure(&csv_path)
            .unwrap_or_else(|| PathStructure::unknown(&csv_path));
        csv_files.push(info);
    }

    csv_files
}

/// Mirror the campaign hierarchy below the output base:
/// `<base>/<scenario>/<building>/<e>/<r>/<j>[/<cw>]/<protocol>/<stem>/<subfolder>/<stem><suffix>.html`.
pub fn generate_output_path(
    info: &PathStructure,
    output_base: &Path,
    suffix: &str,
    output_subfolder: &str,
) -> PathBuf {
    let stem = info
        .csv_filename
        .strip_suffix(".csv")
        .unwrap_or(&info.csv_filename);
    let output_filename = format!("{stem}{suffix}.html");

    let mut path = output_base.to_path_buf();
    path.push(&info.scenario);
    path.push(&info.building);
    path.push(&info.error_rate);
    path.push(&info.tx_range);
    path.push(&info.junction);
    if let Some(cw) = &info.cw {
        path.push(cw);
    }
    path.push(&info.protocol);
    path.push(stem);
    path.push(output_subfolder);
    path.push(output_filename);
    path
}

/// Grid scenarios are larger than the city imports and use a wider default
/// transmission radius.
pub fn determine_default_radius(scenario_name: &str) -> u32 {
    if scenario_name.contains("Grid") {
        2000
    } else {
        1000
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detect_full_structure_with_cw() {
        let path = Path::new("data/Padova-25/b0/e0/r300/j0/cw[32-1024]/Fast-Broadcast");
        let detection = detect_scenario_from_basepath(path);
        assert!(detection.structure_valid);
        assert!(detection.is_sub_branch);
        assert_eq!(detection.scenario_name, "Padova-25");
        assert_eq!(
            detection.sub_path,
            vec!["b0", "e0", "r300", "j0", "cw[32-1024]", "Fast-Broadcast"]
        );
    }

    #[test]
    fn detect_structure_without_cw() {
        let path = Path::new("data/Padova-25/b1/e0/r700/j0/ROFF");
        let detection = detect_scenario_from_basepath(path);
        assert!(detection.structure_valid);
        assert_eq!(detection.sub_path.len(), 5);
    }

    #[test]
    fn detect_at_scenario_level_is_idempotent() {
        let detection = detect_scenario_from_basepath(Path::new("maps/Grid-300"));
        assert!(detection.structure_valid);
        assert!(!detection.is_sub_branch);
        assert!(detection.sub_path.is_empty());
        assert_eq!(detection.scenario_name, "Grid-300");
    }

    #[test]
    fn detect_unknown_layout_falls_back() {
        let detection = detect_scenario_from_basepath(Path::new("some/random/folder"));
        assert!(!detection.structure_valid);
        assert_eq!(detection.scenario_name, "folder");
    }

    #[test]
    fn nearest_scenario_ancestor_wins() {
        // both "LA-25" and "Padova-10" match the scenario pattern; detection
        // stops at the nearest one with a valid sub-structure
        let path = Path::new("LA-25/Padova-10/b0/e0/r100/j0/ROFF");
        let detection = detect_scenario_from_basepath(path);
        assert!(detection.structure_valid);
        assert_eq!(detection.scenario_name, "Padova-10");
    }

    #[test]
    fn parse_csv_path_with_cw() {
        let path = Path::new("Padova-25/b0/e0/r300/j0/cw[32-1024]/Fast-Broadcast/run1.csv");
        let info = parse_csv_path_structure(path).unwrap();
        assert_eq!(info.scenario, "Padova-25");
        assert_eq!(info.building, "b0");
        assert_eq!(info.error_rate, "e0");
        assert_eq!(info.tx_range, "r300");
        assert_eq!(info.junction, "j0");
        assert_eq!(info.cw.as_deref(), Some("cw[32-1024]"));
        assert_eq!(info.protocol, "Fast-Broadcast");
        assert_eq!(info.csv_filename, "run1.csv");
    }

    #[test]
    fn parse_csv_path_without_cw() {
        let path = Path::new("Padova-25/b1/e0/r700/j0/ROFF/run2.csv");
        let info = parse_csv_path_structure(path).unwrap();
        assert_eq!(info.cw, None);
        assert_eq!(info.cw_label(), "none");
        assert_eq!(info.protocol, "ROFF");
    }

    #[test]
    fn parse_csv_shallow_path_uses_unknowns() {
        let path = Path::new("Padova-25/b0/run3.csv");
        let info = parse_csv_path_structure(path).unwrap();
        assert_eq!(info.scenario, "Padova-25");
        assert_eq!(info.building, "b0");
        assert_eq!(info.error_rate, "unknown");
        assert_eq!(info.tx_range, "unknown");
        assert_eq!(info.protocol, "unknown");
    }

    #[test]
    fn parse_non_csv_is_none() {
        assert_eq!(
            parse_csv_path_structure(Path::new("Padova-25/b0/e0/r300/j0/ROFF/notes.txt")),
            None
        );
    }

    #[test]
    fn validate_rejects_out_of_order_parts() {
        assert!(!validate_structure_parts(&["e0", "b0", "r300", "j0", "ROFF"]));
        assert!(validate_structure_parts(&["b1", "e0", "r300", "j0", "ROFF"]));
        assert!(validate_structure_parts(&[]));
    }

    #[test]
    fn output_path_mirrors_structure() {
        let info = parse_csv_path_structure(Path::new(
            "Padova-25/b0/e0/r300/j0/cw[32-1024]/Fast-Broadcast/run1.csv",
        ))
        .unwrap();
        let out = generate_output_path(&info, Path::new("./out"), "-coverage", "coverages");
        assert_eq!(
            out,
            Path::new(
                "./out/Padova-25/b0/e0/r300/j0/cw[32-1024]/Fast-Broadcast/run1/coverages/run1-coverage.html"
            )
        );
    }

    #[test]
    fn output_path_skips_missing_cw() {
        let info = parse_csv_path_structure(Path::new("Padova-25/b1/e0/r700/j0/ROFF/run2.csv"))
            .unwrap();
        let out = generate_output_path(&info, Path::new("out"), "", "alertPaths");
        assert_eq!(
            out,
            Path::new("out/Padova-25/b1/e0/r700/j0/ROFF/run2/alertPaths/run2.html")
        );
    }

    #[test]
    fn file_complete_needs_header_and_data_row() {
        let dir = std::env::temp_dir().join("vanalyze-complete-test");
        fs::create_dir_all(&dir).unwrap();
        let cases = [
            ("empty.csv", "", false),
            ("header-only.csv", "h\n", false),
            ("complete.csv", "h\nd\n", true),
            ("extra-rows.csv", "h\nd\nd\n", false),
        ];
        for (name, content, expected) in cases {
            let path = dir.join(name);
            fs::write(&path, content).unwrap();
            assert_eq!(is_file_complete(&path), expected, "{name}");
        }
        assert!(!is_file_complete(&dir.join("missing.csv")));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn find_csv_files_below_a_bracketed_base() {
        let base = std::env::temp_dir().join("vanalyze-bracket-test");
        let cw_level = base.join("Padova-25/b0/e0/r300/j0/cw[32-1024]");
        let leaf = cw_level.join("Fast-Broadcast");
        fs::create_dir_all(&leaf).unwrap();
        fs::write(leaf.join("run1.csv"), "h\nd\n").unwrap();

        // a base folder at the cw level contains glob metacharacters
        let files = find_csv_files(&cw_level, 3);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].cw.as_deref(), Some("cw[32-1024]"));
        assert_eq!(files[0].protocol, "Fast-Broadcast");

        // and it still works from the scenario root
        assert_eq!(find_csv_files(&base.join("Padova-25"), 3).len(), 1);
        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn default_radius_for_grid_scenarios() {
        assert_eq!(determine_default_radius("Grid-300"), 2000);
        assert_eq!(determine_default_radius("Padova-25"), 1000);
        assert_eq!(determine_default_radius(""), 1000);
    }
}
