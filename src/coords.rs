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
//! Node coordinates and the ns2mobility trace format.
//!
//! A mobility trace stores one 4-line block per node:
//!
//! ```text
//! $node_(7) set X_ 1200.0
//! $node_(7) set Y_ 300.0
//! $node_(7) set Z_ 0.0
//! $ns_ at 0.0 "$node_(7) setdest 0 0 0.00"
//! ```
//!
//! The reader does not rely on block adjacency: every coordinate line is
//! parsed on its own as (node id, axis, value) and grouped by node id, so
//! interleaved or reordered blocks still resolve correctly. A node that ends
//! up with a missing axis is a format error, not a silently shifted
//! coordinate.

use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use ordered_float::OrderedFloat;
use thiserror::Error;

/// A point in the simulation plane. `z` is carried along but almost always 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the xy-plane, ignoring `z`.
    pub fn distance_2d(&self, other: &Vector) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl PartialEq for Vector {
    fn eq(&self, other: &Self) -> bool {
        OrderedFloat(self.x) == OrderedFloat(other.x)
            && OrderedFloat(self.y) == OrderedFloat(other.y)
            && OrderedFloat(self.z) == OrderedFloat(other.z)
    }
}

impl Eq for Vector {}

impl Hash for Vector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        OrderedFloat(self.x).hash(state);
        OrderedFloat(self.y).hash(state);
        OrderedFloat(self.z).hash(state);
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "X_"),
            Axis::Y => write!(f, "Y_"),
            Axis::Z => write!(f, "Z_"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MobilityError {
    #[error("cannot read mobility file: {0}")]
    Io(#[from] io::Error),
    #[error("node {node} is missing its {axis} coordinate")]
    MissingAxis { node: String, axis: Axis },
    #[error("invalid coordinate value {value:?} on line {line}")]
    BadCoordinate { line: usize, value: String },
}

/// All node positions of a mobility trace, indexed by node id.
///
/// Built by a single scan of the file; lookups afterwards are O(1). Callers
/// that resolve many ids against the same trace should build the index once
/// and reuse it.
#[derive(Debug, Clone, Default)]
pub struct MobilityIndex {
    nodes: HashMap<String, Vector>,
}

impl MobilityIndex {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MobilityError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, MobilityError> {
        let mut partial: HashMap<String, (Option<f64>, Option<f64>, Option<f64>)> = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let words: Vec<&str> = line.split_whitespace().collect();
            // Coordinate lines have exactly 4 tokens; everything else
            // (setdest commands, comments, blanks) is line noise.
            if words.len() != 4 {
                continue;
            }
            let Some(node) = parse_node_tag(words[0]) else {
                continue;
            };
            let axis = match words[2] {
                "X_" => Axis::X,
                "Y_" => Axis::Y,
                "Z_" => Axis::Z,
                _ => continue,
            };
            let value: f64 = words[3].parse().map_err(|_| MobilityError::BadCoordinate {
                line: line_no + 1,
                value: words[3].to_string(),
            })?;

            let entry = partial.entry(node.to_string()).or_default();
            match axis {
                Axis::X => entry.0 = Some(value),
                Axis::Y => entry.1 = Some(value),
                Axis::Z => entry.2 = Some(value),
            }
        }

        let mut nodes = HashMap::with_capacity(partial.len());
        for (node, (x, y, z)) in partial {
            let missing = |axis| MobilityError::MissingAxis {
                node: node.clone(),
                axis,
            };
            let v = Vector::new(
                x.ok_or_else(|| missing(Axis::X))?,
                y.ok_or_else(|| missing(Axis::Y))?,
                z.ok_or_else(|| missing(Axis::Z))?,
            );
            nodes.insert(node, v);
        }

        Ok(Self { nodes })
    }

    pub fn get(&self, node: &str) -> Option<&Vector> {
        self.nodes.get(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vector)> {
        self.nodes.iter()
    }

    /// Resolve a list of node ids to positions, skipping unknown ids.
    pub fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> Vec<Vector> {
        ids.into_iter()
            .filter_map(|id| self.nodes.get(id.as_str()).copied())
            .collect()
    }

    /// Split resolved positions into x and y coordinate lists for plotting.
    pub fn xy_coords<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> (Vec<f64>, Vec<f64>) {
        self.resolve(ids).iter().map(|v| (v.x, v.y)).unzip()
    }

    /// Write the trace back out, one 4-line block per node, in natural id
    /// order so generated files are reproducible.
    pub fn write_to(&self, mut writer: impl Write) -> Result<(), MobilityError> {
        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort_by(|a, b| human_sort::compare(a, b));
        for id in ids {
            let v = &self.nodes[id];
            write_node_block(&mut writer, id, v)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, Vector)> for MobilityIndex {
    fn from_iter<T: IntoIterator<Item = (String, Vector)>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// Emit the canonical 4-line block for one node.
pub fn write_node_block(
    mut writer: impl Write,
    id: &str,
    pos: &Vector,
) -> Result<(), MobilityError> {
    writeln!(writer, "$node_({id}) set X_ {}", pos.x)?;
    writeln!(writer, "$node_({id}) set Y_ {}", pos.y)?;
    writeln!(writer, "$node_({id}) set Z_ {}", pos.z)?;
    writeln!(writer, "$ns_ at 0.0 \"$node_({id}) setdest 0 0 0.00\"")?;
    Ok(())
}

/// Extract the node id out of a `$node_(<id>)` token.
fn parse_node_tag(token: &str) -> Option<&str> {
    token.strip_prefix("$node_(")?.strip_suffix(')')
}

/// Plot-area bounds around a set of node positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    /// Bounds enclosing all nodes plus the alert source, padded by
    /// `max(5% of the radius, 100m)` and squared up so range circles stay
    /// circular under an equal-range axis pair.
    pub fn around(
        x_coords: &[f64],
        y_coords: &[f64],
        starting_x: f64,
        starting_y: f64,
        radius: f64,
    ) -> Self {
        let fold =
            |init: f64, values: &[f64], f: fn(f64, f64) -> f64| values.iter().copied().fold(init, f);
        let x_min = fold(starting_x, x_coords, f64::min);
        let x_max = fold(starting_x, x_coords, f64::max);
        let y_min = fold(starting_y, y_coords, f64::min);
        let y_max = fold(starting_y, y_coords, f64::max);

        let margin = (radius * 0.05).max(100.0);
        let (x_min, x_max) = (x_min - margin, x_max + margin);
        let (y_min, y_max) = (y_min - margin, y_max + margin);

        let max_range = (x_max - x_min).max(y_max - y_min);
        let x_center = (x_min + x_max) / 2.0;
        let y_center = (y_min + y_max) / 2.0;

        Self {
            x_min: x_center - max_range / 2.0,
            x_max: x_center + max_range / 2.0,
            y_min: y_center - max_range / 2.0,
            y_max: y_center + max_range / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TRACE: &str = "\
$node_(0) set X_ 100.0
$node_(0) set Y_ 200.0
$node_(0) set Z_ 0.0
$ns_ at 0.0 \"$node_(0) setdest 0 0 0.00\"
$node_(1) set X_ 150.5
$node_(1) set Y_ 200.0
$node_(1) set Z_ 0.0
$ns_ at 0.0 \"$node_(1) setdest 0 0 0.00\"
";

    #[test]
    fn read_trace() {
        let index = MobilityIndex::from_reader(TRACE.as_bytes()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("0"), Some(&Vector::new(100.0, 200.0, 0.0)));
        assert_eq!(index.get("1"), Some(&Vector::new(150.5, 200.0, 0.0)));
        assert_eq!(index.get("2"), None);
    }

    #[test]
    fn read_interleaved_blocks() {
        // coordinate lines of different nodes mixed together
        let trace = "\
$node_(0) set X_ 1.0
$node_(1) set X_ 2.0
$node_(1) set Y_ 3.0
$node_(0) set Y_ 4.0
$node_(0) set Z_ 0.0
$node_(1) set Z_ 0.0
";
        let index = MobilityIndex::from_reader(trace.as_bytes()).unwrap();
        assert_eq!(index.get("0"), Some(&Vector::new(1.0, 4.0, 0.0)));
        assert_eq!(index.get("1"), Some(&Vector::new(2.0, 3.0, 0.0)));
    }

    #[test]
    fn missing_axis_is_an_error() {
        let trace = "\
$node_(0) set X_ 1.0
$node_(0) set Z_ 0.0
";
        let err = MobilityIndex::from_reader(trace.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            MobilityError::MissingAxis { axis: Axis::Y, .. }
        ));
    }

    #[test]
    fn noise_lines_are_skipped() {
        let trace = "\
# a comment line
$node_(0) set X_ 1.0

$node_(0) set Y_ 2.0
$node_(0) set Z_ 0.0
$ns_ at 0.0 \"$node_(0) setdest 0 0 0.00\"
";
        let index = MobilityIndex::from_reader(trace.as_bytes()).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn write_then_read_round_trip() {
        let nodes: MobilityIndex = (0..17)
            .map(|i| (i.to_string(), Vector::new(i as f64 * 25.0, 100.0, 0.0)))
            .collect();
        let mut buf = Vec::new();
        nodes.write_to(&mut buf).unwrap();
        let reread = MobilityIndex::from_reader(buf.as_slice()).unwrap();
        assert_eq!(reread.len(), nodes.len());
        for (id, v) in nodes.iter() {
            assert_eq!(reread.get(id), Some(v));
        }
    }

    #[test]
    fn empty_round_trip() {
        let mut buf = Vec::new();
        MobilityIndex::default().write_to(&mut buf).unwrap();
        assert!(buf.is_empty());
        let reread = MobilityIndex::from_reader(buf.as_slice()).unwrap();
        assert!(reread.is_empty());
    }

    #[test]
    fn bounds_are_square() {
        let xs = vec![0.0, 1000.0];
        let ys = vec![0.0, 200.0];
        let bounds = Bounds::around(&xs, &ys, 500.0, 100.0, 1000.0);
        assert!((bounds.width() - bounds.height()).abs() < 1e-9);
        // margin is max(5% of 1000, 100) = 100
        assert_eq!(bounds.x_min, -100.0);
        assert_eq!(bounds.x_max, 1100.0);
    }

    #[test]
    fn bounds_without_nodes_cover_the_source() {
        let bounds = Bounds::around(&[], &[], 300.0, 300.0, 1000.0);
        assert!(bounds.x_min < 300.0 && bounds.x_max > 300.0);
        assert!(bounds.y_min < 300.0 && bounds.y_max > 300.0);
    }
}
