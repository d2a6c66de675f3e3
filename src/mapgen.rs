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
//! Synthetic scenario generation: grid, line and cube node layouts.
//!
//! Grids place nodes along a square lattice of roads, optionally with
//! per-road and per-node spacing variation drawn from a fixed-seed RNG so
//! generated maps are reproducible. Node ids are assigned after sorting the
//! deduplicated positions, so intersections hold exactly one node.

use std::{
    collections::BTreeSet,
    io::{self, BufWriter, Write},
    path::Path,
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

use crate::{
    coords::{write_node_block, MobilityError, Vector},
    poly::{self, PolyError},
};

/// Seed for all variation draws, fixed for reproducible maps.
const VARIATION_SEED: u64 = 42;

const INITIAL_X: i64 = 100;
const INITIAL_Y: i64 = 100;
const INITIAL_Z: i64 = 100;

#[derive(Debug, Error)]
pub enum MapgenError {
    #[error("cannot write scenario files: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Mobility(#[from] MobilityError),
    #[error(transparent)]
    Poly(#[from] PolyError),
}

/// Parameters of a grid scenario, all distances in meters.
#[derive(Debug, Clone)]
pub struct GridScenario {
    pub road_length: u32,
    pub road_number: u32,
    pub road_distance: u32,
    pub road_size: u32,
    pub node_distance: u32,
    /// Per-road spacing variation, 0 for a regular grid.
    pub road_variation: u32,
    /// Per-node spacing variation along each road, 0 for regular spacing.
    pub node_variation: u32,
}

impl GridScenario {
    /// Road axis positions (vertical roads by x, horizontal roads by y).
    /// Variation shifts each spacing by a uniform draw in `+-road_variation`.
    fn road_positions(&self, rng: &mut StdRng) -> (Vec<i64>, Vec<i64>) {
        let mut vertical = Vec::with_capacity(self.road_number as usize);
        let mut horizontal = Vec::with_capacity(self.road_number as usize);

        for (positions, initial) in [(&mut vertical, INITIAL_X), (&mut horizontal, INITIAL_Y)] {
            let mut current = initial;
            for i in 0..self.road_number {
                if i > 0 {
                    current += self.road_distance as i64 + self.variation_draw(rng, self.road_variation);
                }
                positions.push(current);
            }
        }
        (vertical, horizontal)
    }

    fn variation_draw(&self, rng: &mut StdRng, variation: u32) -> i64 {
        if variation == 0 {
            0
        } else {
            let v = variation as i64;
            rng.gen_range(-v..=v)
        }
    }

    /// All node positions, deduplicated (road intersections appear on both a
    /// vertical and a horizontal road) and sorted.
    fn node_positions(&self, rng: &mut StdRng, vertical: &[i64], horizontal: &[i64]) -> Vec<(i64, i64)> {
        let mut positions = BTreeSet::new();
        let road_length = self.road_length as i64;

        if self.node_variation > 0 {
            for &road_x in vertical {
                let mut y = INITIAL_Y;
                positions.insert((road_x, y));
                loop {
                    let step = (self.node_distance as i64
                        + self.variation_draw(rng, self.node_variation))
                    .max(1);
                    y += step;
                    if y > INITIAL_Y + road_length {
                        break;
                    }
                    positions.insert((road_x, y));
                }
            }
            for &road_y in horizontal {
                let mut x = INITIAL_X;
                positions.insert((x, road_y));
                loop {
                    let step = (self.node_distance as i64
                        + self.variation_draw(rng, self.node_variation))
                    .max(1);
                    x += step;
                    if x > INITIAL_X + road_length {
                        break;
                    }
                    positions.insert((x, road_y));
                }
            }
        } else {
            // regular spacing, covering the full road length including endpoints
            let nodes_per_road = (self.road_length / self.node_distance) as i64 + 1;
            for &road_x in vertical {
                for i in 0..nodes_per_road {
                    let y = INITIAL_Y + i * self.node_distance as i64;
                    if y <= INITIAL_Y + road_length {
                        positions.insert((road_x, y));
                    }
                }
            }
            for &road_y in horizontal {
                for i in 0..nodes_per_road {
                    let x = INITIAL_X + i * self.node_distance as i64;
                    if x <= INITIAL_X + road_length {
                        positions.insert((x, road_y));
                    }
                }
            }
        }

        positions.into_iter().collect()
    }
}

/// Write `<dir>/<name>.ns2mobility.xml` and `<dir>/<name>.poly.xml` for a
/// grid scenario. Returns the number of nodes written.
pub fn write_grid_scenario(
    dir: &Path,
    name: &str,
    params: &GridScenario,
) -> Result<usize, MapgenError> {
    let mut rng = StdRng::seed_from_u64(VARIATION_SEED);
    if params.road_variation > 0 {
        log::info!("using road distance variation +-{}", params.road_variation);
    }
    if params.node_variation > 0 {
        log::info!("using node distance variation +-{}", params.node_variation);
    }

    let (vertical, horizontal) = params.road_positions(&mut rng);
    let positions = params.node_positions(&mut rng, &vertical, &horizontal);

    std::fs::create_dir_all(dir)?;
    let mobility_path = dir.join(format!("{name}.ns2mobility.xml"));
    let mut writer = BufWriter::new(std::fs::File::create(&mobility_path)?);
    for (id, (x, y)) in positions.iter().enumerate() {
        write_node_block(
            &mut writer,
            &id.to_string(),
            &Vector::new(*x as f64, *y as f64, 0.0),
        )?;
    }
    writer.flush()?;
    log::info!(
        "created grid {name} with {} unique nodes in {}",
        positions.len(),
        mobility_path.display()
    );

    let corner = (
        *vertical.last().unwrap_or(&INITIAL_X),
        *horizontal.last().unwrap_or(&INITIAL_Y),
    );
    if !positions.contains(&corner) {
        log::warn!("corner node missing at ({}, {})", corner.0, corner.1);
    }

    let poly_path = dir.join(format!("{name}.poly.xml"));
    let poly_file = BufWriter::new(std::fs::File::create(&poly_path)?);
    if params.road_variation > 0 {
        let vertical: Vec<f64> = vertical.iter().map(|v| *v as f64).collect();
        let horizontal: Vec<f64> = horizontal.iter().map(|v| *v as f64).collect();
        poly::write_grid_poly_file_with_variation(
            poly_file,
            &vertical,
            &horizontal,
            params.road_size as f64,
        )?;
    } else {
        poly::write_grid_poly_file(
            poly_file,
            params.road_number,
            params.road_distance as f64,
            params.road_size as f64,
            INITIAL_X as f64,
            INITIAL_Y as f64,
        )?;
    }
    log::info!("created buildings in {}", poly_path.display());

    Ok(positions.len())
}

/// Write `<dir>/<name>.ns2mobility.xml` with `num_nodes` nodes in a straight
/// line at fixed spacing. Returns the number of nodes written.
pub fn write_line_scenario(
    dir: &Path,
    name: &str,
    num_nodes: u32,
    node_distance: u32,
) -> Result<usize, MapgenError> {
    std::fs::create_dir_all(dir)?;
    let mobility_path = dir.join(format!("{name}.ns2mobility.xml"));
    let mut writer = BufWriter::new(std::fs::File::create(&mobility_path)?);

    for id in 0..num_nodes {
        let x = (id * node_distance) as f64;
        write_node_block(&mut writer, &id.to_string(), &Vector::new(x, 100.0, 0.0))?;
    }
    writer.flush()?;
    log::info!(
        "created line {name} with {num_nodes} nodes in {}",
        mobility_path.display()
    );
    Ok(num_nodes as usize)
}

/// Write `<dir>/<name>.ns2mobility.xml` with a `nodes_per_edge`³ lattice.
/// Returns the number of nodes written.
pub fn write_cube_scenario(
    dir: &Path,
    name: &str,
    nodes_per_edge: u32,
    node_distance: u32,
) -> Result<usize, MapgenError> {
    let edge_length = nodes_per_edge * node_distance;
    log::info!("edge of cube is {edge_length}m long");
    log::info!(
        "middle at {}",
        edge_length as f64 / 2.0 + INITIAL_X as f64
    );

    std::fs::create_dir_all(dir)?;
    let mobility_path = dir.join(format!("{name}.ns2mobility.xml"));
    let mut writer = BufWriter::new(std::fs::File::create(&mobility_path)?);

    let mut id = 0usize;
    for z in 0..nodes_per_edge {
        for y in 0..nodes_per_edge {
            for x in 0..nodes_per_edge {
                let pos = Vector::new(
                    (INITIAL_X + x as i64 * node_distance as i64) as f64,
                    (INITIAL_Y + y as i64 * node_distance as i64) as f64,
                    (INITIAL_Z + z as i64 * node_distance as i64) as f64,
                );
                write_node_block(&mut writer, &id.to_string(), &pos)?;
                id += 1;
            }
        }
    }
    writer.flush()?;
    log::info!(
        "created cube {name} with {id} nodes in {}",
        mobility_path.display()
    );
    Ok(id)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coords::MobilityIndex;

    fn small_grid() -> GridScenario {
        GridScenario {
            road_length: 200,
            road_number: 3,
            road_distance: 100,
            road_size: 10,
            node_distance: 50,
            road_variation: 0,
            node_variation: 0,
        }
    }

    #[test]
    fn regular_grid_positions_are_deduplicated() {
        let params = small_grid();
        let mut rng = StdRng::seed_from_u64(VARIATION_SEED);
        let (vertical, horizontal) = params.road_positions(&mut rng);
        assert_eq!(vertical, vec![100, 200, 300]);
        assert_eq!(horizontal, vec![100, 200, 300]);

        let positions = params.node_positions(&mut rng, &vertical, &horizontal);
        // 3 roads x 5 nodes per axis, minus the 9 shared intersections
        assert_eq!(positions.len(), 3 * 5 * 2 - 9);
        // each intersection appears exactly once
        assert_eq!(positions.iter().filter(|p| **p == (200, 200)).count(), 1);
        // the far corner exists
        assert!(positions.contains(&(300, 300)));
    }

    #[test]
    fn variation_is_reproducible() {
        let params = GridScenario {
            road_variation: 5,
            node_variation: 5,
            ..small_grid()
        };
        let mut rng1 = StdRng::seed_from_u64(VARIATION_SEED);
        let mut rng2 = StdRng::seed_from_u64(VARIATION_SEED);
        let (v1, h1) = params.road_positions(&mut rng1);
        let (v2, h2) = params.road_positions(&mut rng2);
        assert_eq!(v1, v2);
        assert_eq!(h1, h2);
        assert_eq!(
            params.node_positions(&mut rng1, &v1, &h1),
            params.node_positions(&mut rng2, &v2, &h2)
        );
        // variation keeps spacing within the configured band
        for pair in v1.windows(2) {
            let spacing = pair[1] - pair[0];
            assert!((95..=105).contains(&spacing));
        }
    }

    #[test]
    fn line_scenario_round_trips() {
        let dir = std::env::temp_dir().join("vanalyze-line-test");
        write_line_scenario(&dir, "Platoon-700", 5, 700).unwrap();
        let index =
            MobilityIndex::from_path(dir.join("Platoon-700.ns2mobility.xml")).unwrap();
        assert_eq!(index.len(), 5);
        assert_eq!(index.get("3").unwrap().x, 2100.0);
        assert_eq!(index.get("3").unwrap().y, 100.0);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn cube_scenario_counts_nodes() {
        let dir = std::env::temp_dir().join("vanalyze-cube-test");
        let count = write_cube_scenario(&dir, "Cube-150", 3, 150).unwrap();
        assert_eq!(count, 27);
        let index = MobilityIndex::from_path(dir.join("Cube-150.ns2mobility.xml")).unwrap();
        assert_eq!(index.len(), 27);
        // last node sits at the opposite corner
        assert_eq!(index.get("26"), Some(&Vector::new(400.0, 400.0, 400.0)));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn grid_scenario_writes_both_files() {
        let dir = std::env::temp_dir().join("vanalyze-grid-test");
        let count = write_grid_scenario(&dir, "Grid-100", &small_grid()).unwrap();
        assert_eq!(count, 21);
        assert!(dir.join("Grid-100.ns2mobility.xml").exists());
        let buildings =
            poly::parse_poly_file(&dir.join("Grid-100.poly.xml")).unwrap();
        assert_eq!(buildings.len(), 4);
        std::fs::remove_dir_all(dir).ok();
    }
}
