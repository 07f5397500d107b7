//! CLI command definitions.

pub mod check;
pub mod namespace;
