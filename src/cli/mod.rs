//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands.

pub mod config;
pub mod decode;
pub mod libpath;
pub mod run;
