//! Library half of the `omop-link` binary: argument definitions, logging
//! setup and configuration file handling.

pub mod cli;
pub mod config;
pub mod logging;
