//! Terminal commands behind the `thinkchat` subcommands.
//!
//! - `repl`: the interactive chat loop (default)
//! - `models`: model listing and model information
//! - `check`: installation health check

pub mod check;
pub mod models;
pub mod repl;
