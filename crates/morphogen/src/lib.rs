//! Command-line front-end for morphogen
//!
//! Layered configuration plus the robot, evolution and DNA maintenance
//! commands the `morphogen` binary dispatches to.

pub mod commands;
pub mod config;

pub use config::{MorphogenConfig, PathsConfig, CONFIG_FILE};
