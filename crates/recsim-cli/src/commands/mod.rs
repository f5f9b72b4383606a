//! CLI subcommands.

pub mod metrics;
pub mod run;
pub mod validate;
