//! Command-line interface modules.

pub mod classify;
pub mod config;
pub mod models;
pub mod serve;
