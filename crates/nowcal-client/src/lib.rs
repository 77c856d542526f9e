//! CLI printing the current hour's calendar events
//!
//! This crate provides the `nowcal` command-line interface.

pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
