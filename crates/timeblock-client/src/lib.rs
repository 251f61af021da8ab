//! CLI, configuration and scheduling orchestration
//!
//! This crate provides the `timeblock` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use scheduler::{ScheduleOptions, Scheduler};
