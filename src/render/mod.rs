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
//! Plot rendering for simulation result files.
//!
//! Each sub-module turns one parsed result CSV into one or more interactive
//! HTML figures. This module holds the pieces they all share: input loading,
//! the base layout, node/segment traces, transmission-range circles, and
//! building outlines.

use std::{
    io,
    path::{Path, PathBuf},
};

use plotly::{
    common::{DashType, Fill, Line, Marker, MarkerSymbol, Mode},
    layout::{Axis, Shape, ShapeLine, ShapeType},
    Layout, Plot, Scatter,
};
use thiserror::Error;

use crate::{
    config::SimulationConfig,
    coords::{Bounds, MobilityError, MobilityIndex},
    poly::{self, PolyError},
    records::{ParseError, SimulationRecord},
};

pub mod alert_paths;
pub mod coverage;
pub mod hops;
pub mod transmissions;

pub use alert_paths::render_alert_paths;
pub use coverage::render_coverage;
pub use hops::render_single_hops;
pub use transmissions::render_transmissions;

/// Marker colors shared by all figures.
pub(crate) const NOT_REACHED_COLOR: &str = "#A00000";
pub(crate) const REACHED_COLOR: &str = "#32DC32";
pub(crate) const PREVIOUS_FORWARDER_COLOR: &str = "#560589";
pub(crate) const LATEST_FORWARDER_COLOR: &str = "#bf59ff";
/// Transmission line grays for previous and latest hops.
pub(crate) const PREVIOUS_LINE_COLOR: &str = "#cccccc";
pub(crate) const LATEST_LINE_COLOR: &str = "#595959";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot write plot: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Mobility(#[from] MobilityError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Poly(#[from] PolyError),
    #[error("mobility file not found: {0:?}")]
    MissingMobility(Option<PathBuf>),
    #[error("no transmissions recorded in {0}")]
    NoTransmissions(PathBuf),
}

/// Load the result record and the mobility index it resolves against.
pub(crate) fn load_inputs(
    csv_file: &Path,
    config: &SimulationConfig,
) -> Result<(SimulationRecord, MobilityIndex), RenderError> {
    let mobility_file = config
        .mobility_file
        .as_ref()
        .filter(|p| p.exists())
        .ok_or_else(|| RenderError::MissingMobility(config.mobility_file.clone()))?;

    let record = SimulationRecord::from_path(csv_file)?;
    let mobility = MobilityIndex::from_path(mobility_file)?;
    Ok((record, mobility))
}

/// Square figure with equal-scaled meter axes. The rendered size follows the
/// configured dpi at a 10x10 inch reference figure.
pub(crate) fn base_layout(title: &str, bounds: &Bounds, dpi: u32) -> Layout {
    let side = dpi as usize * 10;
    Layout::new()
        .title(format!("<b>{title}</b>"))
        .width(side)
        .height(side)
        .x_axis(
            Axis::new()
                .title("X Coordinate (m)")
                .range(vec![bounds.x_min, bounds.x_max]),
        )
        .y_axis(
            Axis::new()
                .title("Y Coordinate (m)")
                .range(vec![bounds.y_min, bounds.y_max])
                .scale_anchor("x"),
        )
        .show_legend(true)
}

/// Dot trace for a set of nodes.
pub(crate) fn node_trace(
    x: Vec<f64>,
    y: Vec<f64>,
    name: &str,
    color: &str,
) -> Box<Scatter<f64, f64>> {
    Scatter::new(x, y)
        .name(name)
        .mode(Mode::Markers)
        .marker(Marker::new().size(5).color(color.to_string()))
}

/// Star marker for the alert source.
pub(crate) fn source_trace(x: f64, y: f64) -> Box<Scatter<f64, f64>> {
    Scatter::new(vec![x], vec![y])
        .name("Source of Alert Message")
        .mode(Mode::Markers)
        .marker(
            Marker::new()
                .symbol(MarkerSymbol::Star)
                .size(12)
                .color("yellow")
                .line(Line::new().color("blue").width(2.0)),
        )
}

/// Plain line segment between two points, kept out of the legend.
pub(crate) fn segment_trace(
    from: (f64, f64),
    to: (f64, f64),
    color: &str,
    width: f64,
) -> Box<Scatter<f64, f64>> {
    Scatter::new(vec![from.0, to.0], vec![from.1, to.1])
        .mode(Mode::Lines)
        .line(Line::new().color(color.to_string()).width(width))
        .show_legend(false)
}

fn circle_shape(cx: f64, cy: f64, radius: f64, line: ShapeLine) -> Shape {
    Shape::new()
        .shape_type(ShapeType::Circle)
        .x_ref("x")
        .y_ref("y")
        .x0(cx - radius)
        .y0(cy - radius)
        .x1(cx + radius)
        .y1(cy + radius)
        .line(line)
}

/// Transmission-range circle around the source, with a dashed tolerance band
/// at `radius +- vehicle_distance` marking where circumference nodes may sit.
pub(crate) fn range_shapes(cx: f64, cy: f64, radius: f64, vehicle_distance: f64) -> Vec<Shape> {
    vec![
        circle_shape(cx, cy, radius, ShapeLine::new().color("black").width(1.5)),
        circle_shape(
            cx,
            cy,
            radius - vehicle_distance,
            ShapeLine::new()
                .color("black")
                .width(1.0)
                .dash(DashType::Dash),
        ),
        circle_shape(
            cx,
            cy,
            radius + vehicle_distance,
            ShapeLine::new()
                .color("black")
                .width(1.0)
                .dash(DashType::Dash),
        ),
    ]
}

/// Filled outlines of all buildings in the configured poly file. Empty when
/// buildings are disabled for this run.
pub(crate) fn building_traces(
    config: &SimulationConfig,
) -> Result<Vec<Box<Scatter<f64, f64>>>, RenderError> {
    let Some(poly_file) = config.poly_file.as_ref().filter(|p| p.exists()) else {
        return Ok(Vec::new());
    };

    let buildings = poly::parse_poly_file(poly_file)?;
    log::debug!("plotting {} buildings", buildings.len());

    Ok(buildings
        .into_iter()
        .map(|building| {
            let (x, y) = building.shape.into_iter().unzip();
            Scatter::new(x, y)
                .mode(Mode::Lines)
                .fill(Fill::ToSelf)
                .fill_color("rgba(255,0,0,0.15)")
                .line(Line::new().color("rgba(255,0,0,0.4)").width(0.5))
                .show_legend(false)
        })
        .collect())
}

/// Write the finished figure, creating the output directory if needed.
pub(crate) fn write_plot(plot: &Plot, output_path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    plot.write_html(output_path);
    log::info!("plot saved to {}", output_path.display());
    Ok(())
}

/// Derive a sibling output path by inserting `suffix` before the `.html`
/// extension (used by renderers that emit one file per hop or phase).
pub(crate) fn with_suffix(output_path: &Path, suffix: &str) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output_path.with_file_name(format!("{stem}{suffix}.html"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn suffix_is_inserted_before_extension() {
        let path = Path::new("out/run1/hops/run1.html");
        assert_eq!(
            with_suffix(path, "-hop3"),
            Path::new("out/run1/hops/run1-hop3.html")
        );
    }

    #[test]
    fn missing_mobility_is_an_error() {
        let config = SimulationConfig {
            mobility_file: Some(PathBuf::from("/nonexistent/trace.ns2mobility.xml")),
            ..Default::default()
        };
        let err = load_inputs(Path::new("run1.csv"), &config).unwrap_err();
        assert!(matches!(err, RenderError::MissingMobility(_)));
    }

    #[test]
    fn no_poly_file_means_no_building_traces() {
        let config = SimulationConfig::default();
        assert!(building_traces(&config).unwrap().is_empty());
    }
}
