//! Command handlers -- one module per subcommand

pub mod compile;
pub mod config;
pub mod features;
