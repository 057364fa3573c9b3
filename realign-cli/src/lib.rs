//! realign CLI - command-line interface for the realign script generator.
//!
//! This crate provides the `realign` binary: it reads metadata snapshots,
//! ranks tables, validates models and writes reconciliation scripts.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
