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
//! Library for generating VANET simulation scenarios and analyzing the
//! result files of alert broadcast simulation campaigns.

pub mod batch;
pub mod config;
pub mod coords;
pub mod jobs;
pub mod mapgen;
pub mod poly;
pub mod records;
pub mod render;
pub mod scenario;
pub mod stats;
pub mod util;

/// Serde helpers for delimiter-joined CSV list cells, re-exported from the
/// utils sub-crate.
pub use vanalyze_utils::serde::delimited as serde_delimited;

pub mod prelude {
    pub use super::{
        batch::{BatchStats, ToolSpec},
        config::{CommonArgs, SimulationConfig},
        coords::{MobilityIndex, Vector},
        records::SimulationRecord,
        scenario::PathStructure,
    };
}
