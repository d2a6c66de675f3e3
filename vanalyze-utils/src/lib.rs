//! Utility library for the vanalyze project

pub mod serde;
