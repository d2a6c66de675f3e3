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
//! Coverage figure: which nodes the alert message reached.

use std::path::Path;

use plotly::Plot;

use super::{
    base_layout, building_traces, load_inputs, node_trace, range_shapes, source_trace, write_plot,
    RenderError, NOT_REACHED_COLOR, REACHED_COLOR,
};
use crate::{config::SimulationConfig, coords::Bounds};

/// Render the coverage figure for one result file.
pub fn render_coverage(
    csv_file: &Path,
    output_path: &Path,
    config: &SimulationConfig,
) -> Result<(), RenderError> {
    log::info!("plotting coverage for {}", csv_file.display());

    let (record, mobility) = load_inputs(csv_file, config)?;
    let resolved = record.resolve(&mobility);

    let bounds = Bounds::around(
        &resolved.x_node_coords,
        &resolved.y_node_coords,
        record.starting_x,
        record.starting_y,
        config.circ_radius,
    );

    let mut plot = Plot::new();
    for trace in building_traces(config)? {
        plot.add_trace(trace);
    }
    plot.add_trace(node_trace(
        resolved.x_node_coords,
        resolved.y_node_coords,
        "Not reached by Alert Message",
        NOT_REACHED_COLOR,
    ));
    plot.add_trace(node_trace(
        resolved.x_received_coords,
        resolved.y_received_coords,
        "Reached by Alert Message",
        REACHED_COLOR,
    ));
    plot.add_trace(source_trace(record.starting_x, record.starting_y));

    let title = format!("Alert Message Coverage (Radius: {}m)", config.circ_radius);
    plot.set_layout(base_layout(&title, &bounds, config.dpi).shapes(range_shapes(
        record.starting_x,
        record.starting_y,
        config.circ_radius,
        record.vehicle_distance as f64,
    )));

    write_plot(&plot, output_path)
}
