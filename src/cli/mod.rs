//! CLI module - command-line interface
//!
//! Subcommand handlers for `ask`, `serve`, `docs` and `config`.

pub mod commands;
