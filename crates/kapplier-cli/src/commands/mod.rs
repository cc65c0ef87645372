//! CLI commands

pub mod daemon;
pub mod policy;
pub mod run;
pub mod targets;
