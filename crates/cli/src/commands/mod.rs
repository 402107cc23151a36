//! CLI subcommand implementations

pub mod fare;
pub mod model;
