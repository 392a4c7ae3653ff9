//! Data models: output records and pipeline configuration.

pub mod config;
pub mod entry;
