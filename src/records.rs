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
//! Record data types to (de-)serialize simulation result CSVs.
//!
//! A result file holds one header row and exactly one data row. List-valued
//! columns are packed into single cells with small delimiter grammars:
//! node id lists are underscore-joined, the transmission map uses
//! `src:{dst;dst;}` groups, and the transmission vector joins
//! `source-destination*phase` edges with underscores.

use std::{fmt, io, path::Path, str::FromStr};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::coords::{MobilityIndex, Vector};

/// One directed transmission: `source` reached `destination` in `phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: u32,
    pub destination: u32,
    pub phase: u32,
}

impl Edge {
    pub fn new(source: u32, destination: u32, phase: u32) -> Self {
        Self {
            source,
            destination,
            phase,
        }
    }
}

impl FromStr for Edge {
    type Err = String;

    /// Parses the `source-destination*phase` wire syntax, e.g. `12-7*2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || format!("invalid edge {s:?}");
        let (source, rest) = s.split_once('-').ok_or_else(err)?;
        let (destination, phase) = rest.split_once('*').ok_or_else(err)?;
        Ok(Self {
            source: source.trim().parse().map_err(|_| err())?,
            destination: destination.trim().parse().map_err(|_| err())?,
            phase: phase.trim().parse().map_err(|_| err())?,
        })
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}*{}", self.source, self.destination, self.phase)
    }
}

/// Which sender reached which receivers, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransmissionMap {
    entries: Vec<(String, Vec<String>)>,
}

impl TransmissionMap {
    pub fn get(&self, sender: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(s, _)| s == sender)
            .map(|(_, d)| d.as_slice())
    }

    pub fn senders(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(s, _)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter().map(|(s, d)| (s, d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for TransmissionMap {
    type Err = String;

    /// Grammar: groups are closed by `}`; within a group the part before the
    /// first `{` carries the sender id (up to the first `:`), the part after
    /// holds `;`-separated receivers. Empty fragments are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for group in s.split('}') {
            if group.is_empty() {
                continue;
            }
            let (key_part, destinations) = group
                .split_once('{')
                .ok_or_else(|| format!("transmission map group without '{{': {group:?}"))?;
            let sender = key_part
                .split(':')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            let receivers = destinations
                .split(';')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
            entries.push((sender, receivers));
        }
        Ok(Self { entries })
    }
}

impl fmt::Display for TransmissionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (sender, receivers) in &self.entries {
            write!(f, "{sender}:{{")?;
            for receiver in receivers {
                write!(f, "{receiver};")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read result file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed result file: {0}")]
    Csv(#[from] csv::Error),
    #[error("result file has a header but no data row")]
    NoDataRow,
}

/// The single data row of a simulation result CSV.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SimulationRecord {
    #[serde(rename = "Actual Range")]
    pub tx_range: u32,
    #[serde(rename = "Starting x")]
    pub starting_x: f64,
    #[serde(rename = "Starting y")]
    pub starting_y: f64,
    #[serde(rename = "Starting node")]
    pub starting_node: u32,
    #[serde(rename = "Vehicle distance")]
    pub vehicle_distance: u32,
    #[serde(
        rename = "Received node ids",
        with = "vanalyze_utils::serde::delimited::underscore_list"
    )]
    pub received_ids: Vec<String>,
    #[serde(
        rename = "Node ids",
        with = "vanalyze_utils::serde::delimited::underscore_list"
    )]
    pub node_ids: Vec<String>,
    #[serde(
        rename = "Transmission map",
        serialize_with = "serialize_display",
        deserialize_with = "deserialize_from_str"
    )]
    pub transmission_map: TransmissionMap,
    #[serde(
        rename = "Received on circ nodes",
        with = "vanalyze_utils::serde::delimited::underscore_list"
    )]
    pub received_on_circ_ids: Vec<String>,
    #[serde(
        rename = "Transmission vector",
        with = "vanalyze_utils::serde::delimited::underscore_list"
    )]
    pub transmission_vector: Vec<Edge>,
}

impl SimulationRecord {
    /// Read the one-and-only data row of a result file. A file with a header
    /// but no data row is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;
        let record = reader.deserialize().next().ok_or(ParseError::NoDataRow)??;
        Ok(record)
    }

    /// Resolve id lists against a mobility index built once for this file.
    pub fn resolve(&self, mobility: &MobilityIndex) -> ResolvedRecord {
        let (x_node_coords, y_node_coords) = mobility.xy_coords(&self.node_ids);
        let (x_received_coords, y_received_coords) = mobility.xy_coords(&self.received_ids);
        let received_coords_on_circ = mobility.resolve(&self.received_on_circ_ids);
        ResolvedRecord {
            x_node_coords,
            y_node_coords,
            x_received_coords,
            y_received_coords,
            received_coords_on_circ,
        }
    }

    /// Senders of the transmission vector in order of first appearance.
    pub fn ordered_sources(&self) -> Vec<u32> {
        let mut sources = Vec::new();
        for edge in &self.transmission_vector {
            if !sources.contains(&edge.source) {
                sources.push(edge.source);
            }
        }
        sources
    }

    /// Highest phase number seen in the transmission vector.
    pub fn max_phase(&self) -> Option<u32> {
        self.transmission_vector.iter().map(|e| e.phase).max()
    }
}

/// Node positions of a [`SimulationRecord`], split per plotting role.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRecord {
    pub x_node_coords: Vec<f64>,
    pub y_node_coords: Vec<f64>,
    pub x_received_coords: Vec<f64>,
    pub y_received_coords: Vec<f64>,
    pub received_coords_on_circ: Vec<Vector>,
}

fn serialize_display<S: Serializer, T: fmt::Display>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn deserialize_from_str<'de, D: Deserializer<'de>, T: FromStr>(
    deserializer: D,
) -> Result<T, D::Error>
where
    T::Err: fmt::Display,
{
    let buf = String::deserialize(deserializer)?;
    buf.parse().map_err(D::Error::custom)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_edge() {
        assert_eq!("1-2*0".parse::<Edge>().unwrap(), Edge::new(1, 2, 0));
        assert_eq!("12-7*3".parse::<Edge>().unwrap(), Edge::new(12, 7, 3));
        assert!("1-2".parse::<Edge>().is_err());
        assert!("1*2-0".parse::<Edge>().is_err());
    }

    #[test]
    fn parse_transmission_vector_cell() {
        let edges: Vec<Edge> = vanalyze_utils::serde::delimited::split_nonempty("1-2*0_2-3*1_", '_')
            .map(|e| e.parse().unwrap())
            .collect();
        assert_eq!(edges, vec![Edge::new(1, 2, 0), Edge::new(2, 3, 1)]);
    }

    #[test]
    fn parse_transmission_map_cell() {
        let map: TransmissionMap = "0:{1;2;}5:{7;}".parse().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("0"), Some(&["1".to_string(), "2".to_string()][..]));
        assert_eq!(map.get("5"), Some(&["7".to_string()][..]));
        assert_eq!(map.get("9"), None);
        // insertion order is preserved
        assert_eq!(map.senders().collect::<Vec<_>>(), vec!["0", "5"]);
    }

    #[test]
    fn transmission_map_round_trip() {
        let map: TransmissionMap = "0:{1;2;}5:{7;}".parse().unwrap();
        assert_eq!(map.to_string(), "0:{1;2;}5:{7;}");
    }

    #[test]
    fn deserialize_record() {
        let csv_data = "\
Actual Range,Starting x,Starting y,Starting node,Vehicle distance,Received node ids,Node ids,Transmission map,Received on circ nodes,Transmission vector
300,1000.0,2000.0,5,25,1_2_3_,0_1_2_3_4_,0:{1;2;}1:{3;},3_,0-1*0_0-2*0_1-3*1_
";
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());
        let record: SimulationRecord = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(record.tx_range, 300);
        assert_eq!(record.starting_x, 1000.0);
        assert_eq!(record.starting_node, 5);
        assert_eq!(record.vehicle_distance, 25);
        assert_eq!(record.received_ids, vec!["1", "2", "3"]);
        assert_eq!(record.node_ids.len(), 5);
        assert_eq!(
            record.transmission_map.get("1"),
            Some(&["3".to_string()][..])
        );
        assert_eq!(record.received_on_circ_ids, vec!["3"]);
        assert_eq!(
            record.transmission_vector,
            vec![Edge::new(0, 1, 0), Edge::new(0, 2, 0), Edge::new(1, 3, 1)]
        );
        assert_eq!(record.ordered_sources(), vec![0, 1]);
        assert_eq!(record.max_phase(), Some(1));
    }

    #[test]
    fn deserialize_record_with_empty_lists() {
        let csv_data = "\
Actual Range,Starting x,Starting y,Starting node,Vehicle distance,Received node ids,Node ids,Transmission map,Received on circ nodes,Transmission vector
300,0.0,0.0,0,25,,0_1_,,,
";
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());
        let record: SimulationRecord = reader.deserialize().next().unwrap().unwrap();
        assert!(record.received_ids.is_empty());
        assert!(record.transmission_map.is_empty());
        assert!(record.transmission_vector.is_empty());
        assert_eq!(record.max_phase(), None);
    }

    #[test]
    fn missing_data_row_is_an_error() {
        let csv_data = "Actual Range,Starting x,Starting y,Starting node,Vehicle distance,Received node ids,Node ids,Transmission map,Received on circ nodes,Transmission vector\n";
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());
        assert!(reader.deserialize::<SimulationRecord>().next().is_none());
    }

    #[test]
    fn resolve_against_mobility() {
        let mobility: MobilityIndex = [
            ("0".to_string(), Vector::new(0.0, 0.0, 0.0)),
            ("1".to_string(), Vector::new(10.0, 0.0, 0.0)),
            ("2".to_string(), Vector::new(20.0, 0.0, 0.0)),
        ]
        .into_iter()
        .collect();

        let record = SimulationRecord {
            tx_range: 100,
            starting_x: 0.0,
            starting_y: 0.0,
            starting_node: 0,
            vehicle_distance: 25,
            received_ids: vec!["1".into(), "2".into(), "42".into()],
            node_ids: vec!["0".into(), "1".into(), "2".into()],
            transmission_map: TransmissionMap::default(),
            received_on_circ_ids: vec!["2".into()],
            transmission_vector: vec![],
        };

        let resolved = record.resolve(&mobility);
        assert_eq!(resolved.x_node_coords.len(), 3);
        // unknown id 42 is skipped
        assert_eq!(resolved.x_received_coords, vec![10.0, 20.0]);
        assert_eq!(
            resolved.received_coords_on_circ,
            vec![Vector::new(20.0, 0.0, 0.0)]
        );
    }
}
