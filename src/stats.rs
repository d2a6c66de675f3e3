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
//! Summary statistics over campaign result directories.
//!
//! Protocol comparisons aggregate the per-run summary columns of every
//! result CSV in a leaf directory into a mean and the amplitude of the 95%
//! Student-t confidence interval.

use std::{io, path::Path};

use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("cannot read results directory: {0}")]
    Io(#[from] io::Error),
    #[error("malformed results file: {0}")]
    Csv(#[from] csv::Error),
}

/// Mean and 95% confidence-interval amplitude of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricSummary {
    pub mean: f64,
    pub conf_int: f64,
}

/// Mean and 95% Student-t confidence-interval amplitude.
///
/// `static_adjust` scales the mean by 1.1 (the STATIC protocol variants pay
/// a fixed scheduling overhead that the simulator does not account to them);
/// `cast_to_int` rounds the mean to a whole number instead of 2 decimals.
/// With fewer than two samples, or no variation, the amplitude is 0.
pub fn mean_and_conf_int(data: &[f64], static_adjust: bool, cast_to_int: bool) -> MetricSummary {
    if data.is_empty() {
        return MetricSummary::default();
    }

    let n = data.len() as f64;
    let mut mean = data.iter().sum::<f64>() / n;
    if static_adjust {
        mean *= 1.1;
    }

    let conf_int = if data.len() <= 1 {
        0.0
    } else {
        let raw_mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - raw_mean).powi(2)).sum::<f64>() / (n - 1.0);
        let sem = (variance / n).sqrt();
        if sem == 0.0 || sem.is_nan() {
            0.0
        } else {
            let t = StudentsT::new(0.0, 1.0, n - 1.0)
                .expect("n > 1 gives positive degrees of freedom")
                .inverse_cdf(0.975);
            2.0 * t * sem
        }
    };

    let mean = if cast_to_int {
        mean.round()
    } else {
        (mean * 100.0).round() / 100.0
    };

    MetricSummary { mean, conf_int }
}

/// Aggregated metrics of one result directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryStats {
    /// Coverage over all nodes, in percent.
    pub tot_coverage: MetricSummary,
    /// Coverage over the nodes on the target circumference, in percent.
    pub cov_on_circ: MetricSummary,
    pub hops: MetricSummary,
    pub message_sent: MetricSummary,
    pub slots_waited: MetricSummary,
}

/// Per-run summary values pulled out of the positional columns 5..=12 of a
/// result row.
#[derive(Debug, Clone, Copy)]
struct SummaryRow {
    total_nodes: i64,
    nodes_on_circ: i64,
    total_coverage: i64,
    cov_on_circ: i64,
    hops: f64,
    slots: f64,
    message_sent: i64,
}

impl SummaryRow {
    fn from_record(row: &csv::StringRecord) -> Option<Self> {
        // rows with missing or nan cells are incomplete runs
        if row.iter().any(|cell| {
            let cell = cell.trim();
            cell.is_empty() || cell == "nan" || cell == "-nan"
        }) {
            return None;
        }
        Some(Self {
            total_nodes: row.get(5)?.parse().ok()?,
            nodes_on_circ: row.get(6)?.parse().ok()?,
            total_coverage: row.get(7)?.parse().ok()?,
            cov_on_circ: row.get(8)?.parse().ok()?,
            hops: row.get(10)?.parse().ok()?,
            slots: row.get(11)?.parse().ok()?,
            message_sent: row.get(12)?.parse().ok()?,
        })
    }
}

/// Aggregate every result CSV directly inside `path`. Combined summary files
/// written by earlier runs are excluded, as are incomplete rows.
pub fn read_csv_from_directory(path: &Path, static_adjust: bool) -> Result<DirectoryStats, StatsError> {
    let mut tot_coverage_percent = Vec::new();
    let mut cov_on_circ_percent = Vec::new();
    let mut hops = Vec::new();
    let mut slots = Vec::new();
    let mut message_sent = Vec::new();

    for entry in std::fs::read_dir(path)? {
        let file_path = entry?.path();
        let Some(name) = file_path.file_name().map(|f| f.to_string_lossy().to_string()) else {
            continue;
        };
        if !file_path.is_file() || !name.ends_with(".csv") || name.starts_with("Combined-") {
            continue;
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&file_path)?;
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let Some(summary) = SummaryRow::from_record(&row) else {
                log::debug!("skipping incomplete row {} in {name}", i + 2);
                continue;
            };
            if summary.total_nodes == 0 || summary.nodes_on_circ == 0 {
                log::debug!("skipping row with zero node counts in {name}");
                continue;
            }

            tot_coverage_percent
                .push(summary.total_coverage as f64 / summary.total_nodes as f64 * 100.0);
            cov_on_circ_percent
                .push(summary.cov_on_circ as f64 / summary.nodes_on_circ as f64 * 100.0);
            hops.push(summary.hops);
            slots.push(summary.slots);
            message_sent.push(summary.message_sent as f64);
        }
    }

    log::info!("finished reading {}", path.display());

    Ok(DirectoryStats {
        tot_coverage: mean_and_conf_int(&tot_coverage_percent, false, false),
        cov_on_circ: mean_and_conf_int(&cov_on_circ_percent, false, false),
        hops: mean_and_conf_int(&hops, static_adjust, false),
        message_sent: mean_and_conf_int(&message_sent, false, true),
        slots_waited: mean_and_conf_int(&slots, false, true),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_data_is_all_zero() {
        let summary = mean_and_conf_int(&[], false, false);
        assert_eq!(summary, MetricSummary::default());
    }

    #[test]
    fn single_sample_has_no_interval() {
        let summary = mean_and_conf_int(&[42.0], false, false);
        assert_eq!(summary.mean, 42.0);
        assert_eq!(summary.conf_int, 0.0);
    }

    #[test]
    fn constant_data_has_no_interval() {
        let summary = mean_and_conf_int(&[5.0, 5.0, 5.0], false, false);
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.conf_int, 0.0);
    }

    #[test]
    fn conf_int_amplitude_matches_t_distribution() {
        let summary = mean_and_conf_int(&[1.0, 2.0, 3.0, 4.0, 5.0], false, false);
        assert_eq!(summary.mean, 3.0);
        // 2 * t_{0.975, 4} * sem = 2 * 2.7764 * 0.7071
        assert!((summary.conf_int - 3.9266).abs() < 1e-3);
    }

    #[test]
    fn static_adjust_scales_the_mean() {
        let summary = mean_and_conf_int(&[10.0, 10.0], true, false);
        assert_eq!(summary.mean, 11.0);
    }

    #[test]
    fn cast_to_int_rounds() {
        let summary = mean_and_conf_int(&[1.0, 2.0, 2.0], false, true);
        assert_eq!(summary.mean, 2.0);
    }

    #[test]
    fn summary_row_rejects_nan_cells() {
        let record = csv::StringRecord::from(vec![
            "300", "0", "0", "5", "25", "48", "12", "40", "10", "x", "nan", "3.0", "7",
        ]);
        assert!(SummaryRow::from_record(&record).is_none());

        let record = csv::StringRecord::from(vec![
            "300", "0", "0", "5", "25", "48", "12", "40", "10", "x", "2.5", "3.0", "7",
        ]);
        let summary = SummaryRow::from_record(&record).unwrap();
        assert_eq!(summary.total_nodes, 48);
        assert_eq!(summary.hops, 2.5);
        assert_eq!(summary.message_sent, 7);
    }
}
