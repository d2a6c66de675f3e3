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
//! Building polygons in the SUMO `<additional>` poly format.
//!
//! The files we read and write are one self-closing `<poly .../>` element
//! per line with flat attributes, so they are matched with regular
//! expressions instead of pulling in a full XML parser.

use std::{
    fmt::Write as _,
    io::{self, Write},
    path::Path,
};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref POLY_RE: Regex = Regex::new(r"<poly\s+([^>]*?)/?>").unwrap();
    static ref ATTR_RE: Regex = Regex::new(r#"(\w+)="([^"]*)""#).unwrap();
}

const FILE_INTRO: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\n<additional xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:noNamespaceSchemaLocation=\"http://sumo.dlr.de/xsd/additional_file.xsd\">";

#[derive(Debug, Error)]
pub enum PolyError {
    #[error("cannot read poly file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid shape coordinate {0:?}")]
    BadShape(String),
}

/// One building polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub id: String,
    pub kind: String,
    /// Closed outline as (x, y) pairs.
    pub shape: Vec<(f64, f64)>,
}

impl Building {
    /// Axis-aligned bounding box, extended by `extension` meters per side.
    pub fn bounding_box(&self, extension: f64) -> (f64, f64, f64, f64) {
        let xs = self.shape.iter().map(|(x, _)| *x);
        let ys = self.shape.iter().map(|(_, y)| *y);
        let x_min = xs.clone().fold(f64::INFINITY, f64::min) - extension;
        let x_max = xs.fold(f64::NEG_INFINITY, f64::max) + extension;
        let y_min = ys.clone().fold(f64::INFINITY, f64::min) - extension;
        let y_max = ys.fold(f64::NEG_INFINITY, f64::max) + extension;
        (x_min, x_max, y_min, y_max)
    }
}

/// Parse the buildings of a poly file. Polygons whose `type` is neither
/// `building` nor `unknown` (bus stops, water, ...) are dropped.
pub fn parse_poly_file(path: &Path) -> Result<Vec<Building>, PolyError> {
    let content = std::fs::read_to_string(path)?;
    parse_poly_str(&content)
}

pub fn parse_poly_str(content: &str) -> Result<Vec<Building>, PolyError> {
    let mut buildings = Vec::new();

    for poly in POLY_RE.captures_iter(content) {
        let mut id = String::new();
        let mut kind = String::new();
        let mut shape_str = "";
        for attr in ATTR_RE.captures_iter(&poly[1]) {
            match &attr[1] {
                "id" => id = attr[2].to_string(),
                "type" => kind = attr[2].to_string(),
                "shape" => shape_str = attr.get(2).unwrap().as_str(),
                _ => {}
            }
        }
        if kind != "building" && kind != "unknown" {
            continue;
        }

        let shape = shape_str
            .split_whitespace()
            .map(|pair| {
                let (x, y) = pair
                    .split_once(',')
                    .ok_or_else(|| PolyError::BadShape(pair.to_string()))?;
                let x: f64 = x.parse().map_err(|_| PolyError::BadShape(pair.to_string()))?;
                let y: f64 = y.parse().map_err(|_| PolyError::BadShape(pair.to_string()))?;
                Ok((x, y))
            })
            .collect::<Result<Vec<_>, PolyError>>()?;

        buildings.push(Building { id, kind, shape });
    }

    Ok(buildings)
}

fn poly_line(id: usize, corners: &[(i64, i64)]) -> String {
    let mut shape = String::new();
    for (x, y) in corners.iter().chain(corners.first().into_iter()) {
        let _ = write!(shape, "{x},{y} ");
    }
    format!(
        "<poly id=\"b{id}\" type=\"building\" color=\"90,102,171\" fill=\"1\" layer=\"-1.00\" shape=\"{}\"/>",
        shape.trim_end()
    )
}

/// Write the building grid filling the blocks of a regular road grid:
/// `roadNumber - 1` buildings per row, inset half a road width from the
/// surrounding roads.
pub fn write_grid_poly_file(
    mut writer: impl Write,
    road_number: u32,
    road_distance: f64,
    road_size: f64,
    initial_x: f64,
    initial_y: f64,
) -> Result<(), PolyError> {
    let buildings_per_row = road_number.saturating_sub(1);
    let building_width = road_distance - road_size;
    let mut id = 0usize;

    writeln!(writer, "{FILE_INTRO}")?;
    for row in 0..buildings_per_row {
        for col in 0..buildings_per_row {
            let x0 = (initial_x + road_distance * col as f64 + road_size / 2.0) as i64;
            let y0 = (initial_y + road_distance * row as f64 + road_size / 2.0) as i64;
            let x1 = x0 + building_width as i64;
            let y1 = y0 + building_width as i64;
            writeln!(writer, "{}", poly_line(id, &[(x0, y0), (x1, y0), (x1, y1), (x0, y1)]))?;
            id += 1;
        }
    }
    write!(writer, "</additional>")?;
    Ok(())
}

/// Variant for grids with per-road position variation: building extents are
/// taken from the actual road positions instead of a fixed spacing.
pub fn write_grid_poly_file_with_variation(
    mut writer: impl Write,
    vertical_road_positions: &[f64],
    horizontal_road_positions: &[f64],
    road_size: f64,
) -> Result<(), PolyError> {
    let mut id = 0usize;

    writeln!(writer, "{FILE_INTRO}")?;
    for row in 0..horizontal_road_positions.len().saturating_sub(1) {
        for col in 0..vertical_road_positions.len().saturating_sub(1) {
            let left = vertical_road_positions[col];
            let right = vertical_road_positions[col + 1];
            let bottom = horizontal_road_positions[row];
            let top = horizontal_road_positions[row + 1];

            let x0 = (left + road_size / 2.0) as i64;
            let y0 = (bottom + road_size / 2.0) as i64;
            let width = (right - left - road_size) as i64;
            let height = (top - bottom - road_size) as i64;
            let (x1, y1) = (x0 + width, y0 + height);

            writeln!(writer, "{}", poly_line(id, &[(x0, y0), (x1, y0), (x1, y1), (x0, y1)]))?;
            id += 1;
        }
    }
    write!(writer, "</additional>")?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    const POLY_FILE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>

<additional xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<poly id="b0" type="building" color="90,102,171" fill="1" layer="-1.00" shape="12,12 87,12 87,87 12,87 12,12"/>
<poly id="w1" type="water" color="0,0,255" fill="1" layer="-1.00" shape="0,0 5,0 5,5"/>
<poly id="u2" type="unknown" shape="100,100 200,100 200,200"/>
</additional>"#;

    #[test]
    fn parse_keeps_buildings_and_unknown() {
        let buildings = parse_poly_str(POLY_FILE).unwrap();
        assert_eq!(buildings.len(), 2);
        assert_eq!(buildings[0].id, "b0");
        assert_eq!(buildings[0].shape.len(), 5);
        assert_eq!(buildings[0].shape[0], (12.0, 12.0));
        assert_eq!(buildings[1].kind, "unknown");
    }

    #[test]
    fn parse_rejects_bad_shape() {
        let content = r#"<poly id="b0" type="building" shape="12;12 87,12"/>"#;
        assert!(parse_poly_str(content).is_err());
    }

    #[test]
    fn bounding_box_with_extension() {
        let buildings = parse_poly_str(POLY_FILE).unwrap();
        let (x_min, x_max, y_min, y_max) = buildings[0].bounding_box(10.0);
        assert_eq!((x_min, x_max, y_min, y_max), (2.0, 97.0, 2.0, 97.0));
    }

    #[test]
    fn grid_poly_round_trip() {
        let mut buf = Vec::new();
        write_grid_poly_file(&mut buf, 3, 100.0, 25.0, 0.0, 0.0).unwrap();
        let content = String::from_utf8(buf).unwrap();
        let buildings = parse_poly_str(&content).unwrap();
        // (roadNumber - 1)^2 buildings
        assert_eq!(buildings.len(), 4);
        // first building inset by roadSize / 2, width roadDistance - roadSize
        assert_eq!(buildings[0].shape[0], (12.0, 12.0));
        assert_eq!(buildings[0].shape[1], (87.0, 12.0));
        // outline is closed
        assert_eq!(buildings[0].shape.first(), buildings[0].shape.last());
    }

    #[test]
    fn variation_poly_uses_road_positions() {
        let mut buf = Vec::new();
        write_grid_poly_file_with_variation(&mut buf, &[0.0, 120.0, 200.0], &[0.0, 90.0, 210.0], 20.0)
            .unwrap();
        let buildings = parse_poly_str(&String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(buildings.len(), 4);
        // first block spans from road 0 to road 1 minus the road width
        assert_eq!(buildings[0].shape[0], (10.0, 10.0));
        assert_eq!(buildings[0].shape[1], (110.0, 10.0));
    }
}
