//! oc-migrate CLI - command-line runner for OpenCart database migrations.
//!
//! Provides the `migrate`, `rollback` and `status` commands on top of the
//! `oc-migrate` engine.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
