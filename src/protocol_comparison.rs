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
//! Aggregate campaign results into grouped per-metric bar charts comparing
//! the protocols across transmission ranges, plus a summary CSV.

use std::{collections::HashMap, path::PathBuf, process};

use clap::{Parser, ValueEnum};
use plotly::{
    common::{ErrorData, ErrorType},
    layout::{Axis, BarMode},
    Bar, Layout, Plot,
};

use vanalyze::{
    stats::{self, DirectoryStats, MetricSummary},
    util,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Base path of the campaign results (one subfolder per scenario).
    #[arg(short = 'p', long, default_value = "./simulations/scenario-urbano")]
    base_path: PathBuf,

    /// Folder where the output files will be saved.
    #[arg(short, long, default_value = "out")]
    out_folder: PathBuf,

    /// Scenarios to compare (comma separated).
    #[arg(short, long, value_delimiter = ',', default_values_t = ["LA-25".to_string()])]
    scenarios: Vec<String>,

    /// Building configurations.
    #[arg(short, long, value_delimiter = ',', default_values_t = ["1".to_string(), "0".to_string()])]
    buildings: Vec<String>,

    /// Error rate path component.
    #[arg(short, long, default_value = "e0")]
    error_rate: String,

    /// Transmission ranges in meters.
    #[arg(short, long, value_delimiter = ',', default_values_t = ["100".to_string(), "300".to_string(), "500".to_string(), "700".to_string()])]
    tx_ranges: Vec<String>,

    /// Protocols to compare, by their result-folder names.
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [
            "Fast-Broadcast".to_string(),
            "STATIC-100".to_string(),
            "STATIC-300".to_string(),
            "STATIC-500".to_string(),
            "STATIC-700".to_string(),
            "ROFF".to_string(),
        ]
    )]
    protocols: Vec<String>,

    /// Contention window path components.
    #[arg(short, long, value_delimiter = ',', default_values_t = ["cw[32-1024]".to_string()])]
    cws: Vec<String>,

    /// Junction configurations.
    #[arg(short, long, value_delimiter = ',', default_values_t = ["0".to_string()])]
    junctions: Vec<String>,

    /// Metrics to plot.
    #[arg(short, long, value_delimiter = ',', value_enum, default_values_t = Metric::all())]
    metrics: Vec<Metric>,

    /// Scale the mean hop count of STATIC protocols measured outside their
    /// design range by 1.1.
    #[arg(long)]
    adjust_static: bool,

    /// Enable the tx-range legend.
    #[arg(short = 'l', long)]
    show_legend: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
enum Metric {
    #[value(name = "totCoverage")]
    #[strum(serialize = "totCoverage")]
    TotCoverage,
    #[value(name = "covOnCirc")]
    #[strum(serialize = "covOnCirc")]
    CovOnCirc,
    #[value(name = "hops")]
    #[strum(serialize = "hops")]
    Hops,
    #[value(name = "slotsWaited")]
    #[strum(serialize = "slotsWaited")]
    SlotsWaited,
    #[value(name = "messageSent")]
    #[strum(serialize = "messageSent")]
    MessageSent,
}

impl Metric {
    fn all() -> Vec<Self> {
        vec![
            Self::TotCoverage,
            Self::CovOnCirc,
            Self::Hops,
            Self::SlotsWaited,
            Self::MessageSent,
        ]
    }

    fn y_label(&self) -> &'static str {
        match self {
            Self::TotCoverage => "Total Delivery Ratio (%)",
            Self::CovOnCirc => "Total Delivery Ratio On Circ. (%)",
            Self::Hops => "Number Of Hops",
            Self::SlotsWaited => "Number Of Slots",
            Self::MessageSent => "Forwarding Node Number",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::TotCoverage => "Total Delivery Ratio",
            Self::CovOnCirc => "Total Delivery Ratio On Circumference",
            Self::Hops => "Number Of Hops",
            Self::SlotsWaited => "Number Of Slots",
            Self::MessageSent => "Forwarding Node Number",
        }
    }

    fn is_coverage(&self) -> bool {
        matches!(self, Self::TotCoverage | Self::CovOnCirc)
    }

    fn pick(&self, stats: &DirectoryStats) -> MetricSummary {
        match self {
            Self::TotCoverage => stats.tot_coverage,
            Self::CovOnCirc => stats.cov_on_circ,
            Self::Hops => stats.hops,
            Self::SlotsWaited => stats.slots_waited,
            Self::MessageSent => stats.message_sent,
        }
    }
}

/// Aggregated stats of one scenario/building/cw/junction combination, indexed
/// by (tx range, protocol).
struct CompoundData {
    scenario: String,
    building: String,
    cw: String,
    junction: String,
    data: HashMap<(String, String), DirectoryStats>,
}

impl CompoundData {
    fn get(&self, tx_range: &str, protocol: &str) -> DirectoryStats {
        self.data
            .get(&(tx_range.to_string(), protocol.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

fn collect(args: &Args) -> Vec<CompoundData> {
    let mut compounds = Vec::new();
    for scenario in &args.scenarios {
        // platoons are simulated without buildings only
        let buildings: Vec<String> = if scenario.contains("Platoon") {
            vec!["0".to_string()]
        } else {
            args.buildings.clone()
        };

        for building in &buildings {
            for cw in &args.cws {
                for junction in &args.junctions {
                    let base = args
                        .base_path
                        .join(scenario)
                        .join(format!("b{building}"))
                        .join(&args.error_rate);

                    let mut data = HashMap::new();
                    for tx_range in &args.tx_ranges {
                        for protocol in &args.protocols {
                            let mut path =
                                base.join(format!("r{tx_range}")).join(format!("j{junction}"));
                            // ROFF has no contention window level
                            if protocol != "ROFF" {
                                path = path.join(cw);
                            }
                            let path = path.join(protocol);

                            let static_adjust = args.adjust_static
                                && protocol.contains("STATIC")
                                && !protocol.contains(tx_range.as_str());
                            let stats = match stats::read_csv_from_directory(&path, static_adjust)
                            {
                                Ok(stats) => stats,
                                Err(e) => {
                                    log::warn!("cannot aggregate {}: {e}", path.display());
                                    DirectoryStats::default()
                                }
                            };
                            data.insert((tx_range.clone(), protocol.clone()), stats);
                        }
                    }

                    compounds.push(CompoundData {
                        scenario: scenario.clone(),
                        building: building.clone(),
                        cw: cw.clone(),
                        junction: junction.clone(),
                        data,
                    });
                }
            }
        }
    }
    compounds
}

/// Shared y-axis maximum per metric, so figures of the same campaign are
/// comparable. Coverage metrics are always scaled to 100%.
fn max_metric_values(args: &Args, compounds: &[CompoundData]) -> HashMap<Metric, f64> {
    let mut max_values = HashMap::new();
    for metric in &args.metrics {
        let max = if metric.is_coverage() {
            100.0
        } else {
            compounds
                .iter()
                .flat_map(|c| c.data.values())
                .map(|stats| metric.pick(stats).mean)
                .fold(-1.0f64, f64::max)
        };
        max_values.insert(*metric, max);
    }
    max_values
}

fn additional_title(building: &str, junction: &str) -> &'static str {
    match (building, junction) {
        ("0", "1") => " (without buildings, with junctions)",
        ("0", _) => " (without buildings)",
        (_, "1") => " (with buildings, with junctions)",
        _ => " (with buildings)",
    }
}

fn render_metric(
    args: &Args,
    compound: &CompoundData,
    metric: Metric,
    max_y: f64,
    out_dir: &std::path::Path,
) {
    let protocol_labels: Vec<String> = if compound.junction == "1" {
        args.protocols.iter().map(|p| format!("SJ-{p}")).collect()
    } else {
        args.protocols.clone()
    };

    let mut plot = Plot::new();
    for tx_range in &args.tx_ranges {
        let mut means = Vec::new();
        let mut conf_ints = Vec::new();
        for protocol in &args.protocols {
            let summary = metric.pick(&compound.get(tx_range, protocol));
            means.push(summary.mean);
            conf_ints.push(if summary.conf_int.is_nan() {
                0.35
            } else {
                summary.conf_int
            });
        }
        plot.add_trace(
            Bar::new(protocol_labels.clone(), means)
                .name(format!("{tx_range}m"))
                .error_y(ErrorData::new(ErrorType::Data).array(conf_ints)),
        );
    }

    let max_y = if metric.is_coverage() {
        max_y * 1.07
    } else {
        max_y * 1.1
    };
    plot.set_layout(
        Layout::new()
            .title(format!(
                "<b>{}{}</b>",
                metric.title(),
                additional_title(&compound.building, &compound.junction)
            ))
            .bar_mode(BarMode::Group)
            .x_axis(Axis::new().title("Protocols"))
            .y_axis(Axis::new().title(metric.y_label()).range(vec![-0.1, max_y]))
            .show_legend(args.show_legend),
    );

    let out_path = out_dir.join(format!("{}_{metric}.html", compound.scenario));
    log::info!("saving figure in {}", out_path.display());
    plot.write_html(out_path);
}

fn write_summary_csv(
    args: &Args,
    compound: &CompoundData,
    out_dir: &std::path::Path,
) -> anyhow::Result<()> {
    let out_path = out_dir.join(format!("{}_summary.csv", compound.scenario));
    let mut writer = csv::Writer::from_path(&out_path)?;

    let mut header = vec!["txRange".to_string(), "protocol".to_string()];
    for metric in &args.metrics {
        header.push(format!("{metric}Mean"));
        header.push(format!("{metric}ConfInt"));
    }
    writer.write_record(&header)?;

    for tx_range in &args.tx_ranges {
        for protocol in &args.protocols {
            let stats = compound.get(tx_range, protocol);
            let mut row = vec![tx_range.clone(), protocol.clone()];
            for metric in &args.metrics {
                let summary = metric.pick(&stats);
                row.push(summary.mean.to_string());
                row.push(summary.conf_int.to_string());
            }
            writer.write_record(&row)?;
        }
    }
    writer.flush()?;
    log::info!("saved summary in {}", out_path.display());
    Ok(())
}

fn main() {
    util::init_logging();
    let args = Args::parse();

    let compounds = collect(&args);
    let max_values = max_metric_values(&args, &compounds);

    let mut failed = false;
    for compound in &compounds {
        let out_dir = args
            .out_folder
            .join(&compound.scenario)
            .join(format!("b{}", compound.building))
            .join(format!("j{}-{}", compound.junction, compound.cw));
        if let Err(e) = std::fs::create_dir_all(&out_dir) {
            log::error!("cannot create {}: {e}", out_dir.display());
            failed = true;
            continue;
        }

        for metric in &args.metrics {
            render_metric(&args, compound, *metric, max_values[metric], &out_dir);
        }
        if let Err(e) = write_summary_csv(&args, compound, &out_dir) {
            log::error!("cannot write summary for {}: {e}", compound.scenario);
            failed = true;
        }
    }

    if failed {
        process::exit(1);
    }
}
