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
//! Hop-by-hop propagation figures, one file per hop.
//!
//! Hop `h` shows every transmission up to and including phase `h`. Edges of
//! the current phase are drawn darker and their senders in the latest
//! forwarder color, so the propagation front stands out against the history.

use std::path::Path;

use plotly::Plot;

use super::{
    base_layout, building_traces, load_inputs, node_trace, range_shapes, segment_trace,
    source_trace, with_suffix, write_plot, RenderError, LATEST_FORWARDER_COLOR, LATEST_LINE_COLOR,
    NOT_REACHED_COLOR, PREVIOUS_FORWARDER_COLOR, PREVIOUS_LINE_COLOR, REACHED_COLOR,
};
use crate::{config::SimulationConfig, coords::Bounds};

/// Render one figure per hop for one result file. The hop number (1-based) is
/// appended to the output filename.
pub fn render_single_hops(
    csv_file: &Path,
    output_path: &Path,
    config: &SimulationConfig,
) -> Result<(), RenderError> {
    log::info!("plotting hops for {}", csv_file.display());

    let (record, mobility) = load_inputs(csv_file, config)?;
    let resolved = record.resolve(&mobility);

    let max_hop = record
        .max_phase()
        .ok_or_else(|| RenderError::NoTransmissions(csv_file.to_path_buf()))?;

    let bounds = Bounds::around(
        &resolved.x_node_coords,
        &resolved.y_node_coords,
        record.starting_x,
        record.starting_y,
        config.circ_radius,
    );

    for hop in 0..=max_hop {
        if config.verbose {
            log::info!("processing hop {}", hop + 1);
        }

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

        for edge in record
            .transmission_vector
            .iter()
            .filter(|e| e.phase <= hop)
        {
            let source = mobility.get(&edge.source.to_string());
            let destination = mobility.get(&edge.destination.to_string());
            let (Some(source), Some(destination)) = (source, destination) else {
                log::warn!("coordinates not found for edge {edge}");
                continue;
            };

            reached_x.push(destination.x);
            reached_y.push(destination.y);
            if edge.phase == hop {
                latest_x.push(source.x);
                latest_y.push(source.y);
            } else {
                previous_x.push(source.x);
                previous_y.push(source.y);
            }

            let line_color = if edge.phase == hop {
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
            "Alert Message Propagation - Hop {} (Radius: {}m)",
            hop + 1,
            config.circ_radius
        );
        plot.set_layout(base_layout(&title, &bounds, config.dpi).shapes(range_shapes(
            record.starting_x,
            record.starting_y,
            config.circ_radius,
            record.vehicle_distance as f64,
        )));

        write_plot(&plot, &with_suffix(output_path, &format!("-hop{}", hop + 1)))?;
    }

    Ok(())
}
