//! Subcommand implementations

pub mod embed;
pub mod serve;
