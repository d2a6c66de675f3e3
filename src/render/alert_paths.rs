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
//! Alert propagation path figure.
//!
//! Shows the forwarding chain as arrows from each forwarder to the receivers
//! that forwarded in turn, with all arrows of one sender sharing a color, and
//! rays from the last forwarders to the nodes on the target circumference.
//! Nodes that only receive but never forward are not treated as forwarders.
//!
//! Some simulator builds leave the "Received on circ nodes" column empty or
//! zeroed. When that happens the circumference nodes are recomputed here from
//! the received coordinates, and the figure is marked with a warning.

use std::{collections::HashSet, path::Path};

use plotly::{common::Mode, layout::Annotation, Plot, Scatter};

use super::{
    base_layout, building_traces, load_inputs, node_trace, range_shapes, source_trace, write_plot,
    RenderError,
};
use crate::{
    config::SimulationConfig,
    coords::{Bounds, MobilityIndex, Vector},
};

/// Arrow colors cycled over the forwarders.
const PATH_COLORS: [&str; 8] = [
    "#FF0000", "#00FF00", "#0000FF", "#FF00FF", "#00FFFF", "#FF8000", "#8000FF", "#008000",
];

// TODO: make the node spacing a CLI parameter instead of assuming 25m.
const NODE_SPACING: f64 = 25.0;

/// Render the alert path figure for one result file.
pub fn render_alert_paths(
    csv_file: &Path,
    output_path: &Path,
    config: &SimulationConfig,
) -> Result<(), RenderError> {
    log::info!("plotting alert paths for {}", csv_file.display());

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

    if config.show_nodes {
        plot.add_trace(
            node_trace(
                resolved.x_node_coords.clone(),
                resolved.y_node_coords.clone(),
                "Not receiving nodes",
                "red",
            )
            .opacity(0.6),
        );
        plot.add_trace(
            node_trace(
                resolved.x_received_coords.clone(),
                resolved.y_received_coords.clone(),
                "Receiving nodes",
                "green",
            )
            .opacity(0.5),
        );
    }

    // arrows between forwarders, colored per sender
    let mut annotations = Vec::new();
    for (color_index, (sender, receivers)) in record
        .transmission_map
        .iter()
        .filter(|(_, receivers)| !receivers.is_empty())
        .enumerate()
    {
        let path_color = PATH_COLORS[color_index % PATH_COLORS.len()];
        let Some(sender_coord) = mobility.get(sender) else {
            log::warn!("coordinates not found for forwarder {sender}");
            continue;
        };

        plot.add_trace(
            Scatter::new(vec![sender_coord.x], vec![sender_coord.y])
                .mode(Mode::Markers)
                .marker(
                    plotly::common::Marker::new()
                        .size(6)
                        .color(path_color.to_string())
                        .line(plotly::common::Line::new().color("black").width(1.0)),
                )
                .show_legend(false),
        );

        // an arrow is only drawn when the receiver forwards in turn
        for receiver in receivers {
            let Some(receiver_coord) = mobility.get(receiver) else {
                continue;
            };
            if record
                .transmission_map
                .get(receiver)
                .is_some_and(|r| !r.is_empty())
            {
                annotations.push(arrow(sender_coord, receiver_coord, path_color));
            }
        }
    }

    let mut received_on_circ_ids = record.received_on_circ_ids.clone();
    let fallback_ids = find_node_ids_from_coords(
        &find_circumference_candidates(
            &resolved.x_received_coords,
            &resolved.y_received_coords,
            record.starting_x,
            record.starting_y,
            NODE_SPACING,
            config.circ_radius,
        ),
        &mobility,
    );

    if config.debug {
        let mut reported = received_on_circ_ids.clone();
        let mut computed = fallback_ids.clone();
        reported.sort();
        computed.sort();
        if reported == computed {
            log::info!("circumference nodes reported by the simulation match the fallback");
        } else {
            log::warn!("circumference nodes reported by the simulation DO NOT match the fallback");
        }
    }

    // Some simulator builds never fill the circumference column.
    let simulation_bug_detected =
        received_on_circ_ids.is_empty() || received_on_circ_ids == ["0"];
    if simulation_bug_detected {
        log::warn!(
            "'Nodes on circ' field is empty/zero, recomputing circumference nodes \
             (source ({}, {}), range {}m, radius {}m, node spacing {}m)",
            record.starting_x,
            record.starting_y,
            record.tx_range,
            config.circ_radius,
            NODE_SPACING
        );
        received_on_circ_ids = fallback_ids;
        log::info!(
            "found {} circumference nodes using the fallback",
            received_on_circ_ids.len()
        );
    }

    // rays from the last forwarders to the circumference nodes they reached
    let (mut circ_x, mut circ_y) = (Vec::new(), Vec::new());
    for circ_id in &received_on_circ_ids {
        for (sender, receivers) in record.transmission_map.iter() {
            if !receivers.contains(circ_id) {
                continue;
            }
            let (Some(forwarder), Some(circ_coord)) = (mobility.get(sender), mobility.get(circ_id))
            else {
                continue;
            };
            plot.add_trace(super::segment_trace(
                (forwarder.x, forwarder.y),
                (circ_coord.x, circ_coord.y),
                "black",
                1.5,
            ));
            circ_x.push(circ_coord.x);
            circ_y.push(circ_coord.y);
        }
    }
    plot.add_trace(
        node_trace(circ_x, circ_y, "Nodes on circumference", "green").opacity(0.5),
    );
    plot.add_trace(source_trace(record.starting_x, record.starting_y));

    let scenario = config.scenario.as_deref().unwrap_or("unknown");
    let title = format!(
        "{scenario} (Transmission range: {}m) - Alert Message Propagation Paths",
        record.tx_range
    );
    if simulation_bug_detected {
        annotations.push(
            Annotation::new()
                .x_ref("paper")
                .y_ref("paper")
                .x(0.02)
                .y(0.02)
                .text("SIMULATION BUG: 'Nodes on circ' field is empty/zero! Used fallback")
                .show_arrow(false)
                .background_color("yellow")
                .font(plotly::common::Font::new().color("red")),
        );
    }

    plot.set_layout(
        base_layout(&title, &bounds, config.dpi)
            .shapes(range_shapes(
                record.starting_x,
                record.starting_y,
                config.circ_radius,
                record.vehicle_distance as f64,
            ))
            .annotations(annotations),
    );

    write_plot(&plot, output_path)
}

fn arrow(from: &Vector, to: &Vector, color: &str) -> Annotation {
    Annotation::new()
        .x_ref("x")
        .y_ref("y")
        .ax_ref("x")
        .ay_ref("y")
        .ax(from.x)
        .ay(from.y)
        .x(to.x)
        .y(to.y)
        .text("")
        .show_arrow(true)
        .arrow_head(2)
        .arrow_width(1.5)
        .arrow_color(color.to_string())
        .opacity(0.8)
}

/// Received nodes within `radius +- node_spacing` of the source.
fn find_circumference_candidates(
    x_coords: &[f64],
    y_coords: &[f64],
    starting_x: f64,
    starting_y: f64,
    node_spacing: f64,
    radius: f64,
) -> Vec<(f64, f64)> {
    let min_distance = radius - node_spacing;
    let max_distance = radius + node_spacing;
    let source = Vector::new(starting_x, starting_y, 0.0);

    x_coords
        .iter()
        .zip(y_coords)
        .filter(|(x, y)| {
            let distance = Vector::new(**x, **y, 0.0).distance_2d(&source);
            (min_distance..=max_distance).contains(&distance)
        })
        .map(|(x, y)| (*x, *y))
        .collect()
}

/// Node ids whose xy position matches one of the candidate coordinates.
fn find_node_ids_from_coords(candidates: &[(f64, f64)], mobility: &MobilityIndex) -> Vec<String> {
    let candidate_set: HashSet<Vector> = candidates
        .iter()
        .map(|(x, y)| Vector::new(*x, *y, 0.0))
        .collect();

    mobility
        .iter()
        .filter(|(_, v)| candidate_set.contains(&Vector::new(v.x, v.y, 0.0)))
        .map(|(id, _)| id.clone())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn candidates_within_the_distance_band() {
        let xs = vec![1000.0, 980.0, 500.0, 1030.0];
        let ys = vec![0.0, 0.0, 0.0, 0.0];
        let candidates = find_circumference_candidates(&xs, &ys, 0.0, 0.0, 25.0, 1000.0);
        assert_eq!(candidates, vec![(1000.0, 0.0), (980.0, 0.0)]);
    }

    #[test]
    fn node_ids_resolved_from_candidate_coords() {
        let mobility: MobilityIndex = [
            ("3".to_string(), Vector::new(1000.0, 0.0, 0.0)),
            ("7".to_string(), Vector::new(500.0, 0.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let ids = find_node_ids_from_coords(&[(1000.0, 0.0)], &mobility);
        assert_eq!(ids, vec!["3".to_string()]);
    }
}
