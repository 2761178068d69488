//! Subcommand implementations.

pub mod config;
pub mod scroll;
pub mod simulate;
