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
//! Per-sender transmission phase figures.
//!
//! Phase `n` shows the transmissions of the first `n` forwarders in the order
//! they first sent, with the edges of the newest forwarder highlighted. This
//! is a finer slicing than the hop figures: two forwarders of the same hop
//! get separate phases.

use std::path::Path;

use plotly::Plot;

use super::{
    base_layout, building_traces, load_inputs, node_trace, range_shapes, segment_trace,
    source_trace, with_suffix, write_plot, RenderError, LATEST_FORWARDER_COLOR, LATEST_LINE_COLOR,
    NOT_REACHED_COLOR, PREVIOUS_FORWARDER_COLOR, PREVIOUS_LINE_COLOR, REACHED_COLOR,
};
use crate::{config::SimulationConfig, coords::Bounds};

/// Render one figure per transmission phase for one result file. The phase
/// number (1-based, zero padded) is appended to the output filename.
pub fn render_transmissions(
    csv_file: &Path,
    output_path: &Path,
    config: &SimulationConfig,
) -> Result<(), RenderError> {
    log::info!("plotting multiple transmissions for {}", csv_file.display());

    let (record, mobility) = load_inputs(csv_file, config)?;
    let resolved = record.resolve(&mobility);

    let ordered_sources = record.ordered_sources();
    if ordered_sources.is_empty() {
        return Err(RenderError::NoTransmissions(csv_file.to_path_buf()));
    }

    let bounds = Bounds::around(
        &resolved.x_node_coords,
        &resolved.y_node_coords,
        record.starting_x,
        record.starting_y,
        config.circ_radius,
    );

    for (count, latest_source) in ordered_sources.iter().enumerate().map(|(i, s)| (i + 1, s)) {
        log::info!("processing transmission phase {count}/{}", ordered_sources.len());

        let mut plot = Plot::new();
        for trace in building_traces(config)? {
            plot.add_trace(trace);
        }
        plot.add_trace(node_trace(
            resolved.x_node_coords.clone(),
            resolved.y_node_coords.clone(),
            "Not reached by Alert Message",
            NOT_REACHED_COLOR,
        ));

        let (mut reached_x, mut reached_y) = (Vec::new(), Vec::new());
        let (mut previous_x, mut previous_y) = (Vec::new(), Vec::new());
        let (mut latest_x, mut latest_y) = (Vec::new(), Vec::new());

        for edge in &record.transmission_vector {
            // only the forwarders active so far take part in this phase
            if !ordered_sources[..count].contains(&edge.source) {
                continue;
            }

            let source = mobility.get(&edge.source.to_string());
            let destination = mobility.get(&edge.destination.to_string());
            let (Some(source), Some(destination)) = (source, destination) else {
                log::warn!("coordinates not found for edge {edge}");
                continue;
            };

            reached_x.push(destination.x);
            reached_y.push(destination.y);
            if edge.source == *latest_source {
                latest_x.push(source.x);
                latest_y.push(source.y);
            } else {
                previous_x.push(source.x);
                previous_y.push(source.y);
            }

            let line_color = if edge.source == *latest_source {
                LATEST_LINE_COLOR
            } else {
                PREVIOUS_LINE_COLOR
            };
            plot.add_trace(segment_trace(
                (source.x, source.y),
                (destination.x, destination.y),
                line_color,
                0.5,
            ));
        }

        plot.add_trace(node_trace(
            reached_x,
            reached_y,
            "Reached by Alert Message",
            REACHED_COLOR,
        ));
        if !previous_x.is_empty() {
            plot.add_trace(node_trace(
                previous_x,
                previous_y,
                "Previous forwarder",
                PREVIOUS_FORWARDER_COLOR,
            ));
        }
        plot.add_trace(node_trace(
            latest_x,
            latest_y,
            "Latest forwarder",
            LATEST_FORWARDER_COLOR,
        ));
        plot.add_trace(source_trace(record.starting_x, record.starting_y));

        let title = format!(
            "Transmission Phase {count} (Radius: {}m)",
            config.circ_radius
        );
        plot.set_layout(base_layout(&title, &bounds, config.dpi).shapes(range_shapes(
            record.starting_x,
            record.starting_y,
            config.circ_radius,
            record.vehicle_distance as f64,
        )));

        write_plot(&plot, &with_suffix(output_path, &format!("-phase-{count:02}")))?;
    }

    Ok(())
}
