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
//! Utility module collection of functions

use std::path::Path;

/// Initialize logging from `log4rs.yml` if present, falling back to an
/// env-controlled stderr logger otherwise (e.g. when a binary is run outside
/// the repository root).
pub fn init_logging() {
    if Path::new("log4rs.yml").exists() {
        log4rs::init_file("log4rs.yml", Default::default()).unwrap();
    } else {
        let mut builder = pretty_env_logger::formatted_builder();
        builder.filter_level(log::LevelFilter::Info);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        builder.try_init().ok();
    }
}

#[cfg(test)]
mod test {
    #[test]
    fn fallback_builder_honors_filter_directives() {
        let logger = pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Info)
            .parse_filters("vanalyze=debug")
            .build();
        assert_eq!(logger.filter(), log::LevelFilter::Debug);
    }
}
