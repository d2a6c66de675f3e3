//! Utility module for serde of types.

pub mod delimited;
