//! Command-line interface definitions and helpers.
//!
//! This module contains CLI argument parsing, enums, subcommand handlers and
//! the terminal renderer for generation progress.

mod args;
mod commands;
mod enums;
mod render;

pub use args::{Args, Command, ConfigAction, GenerateArgs};
pub use commands::{build_options, describe_config, handle_config_action, load_config, run_generate};
pub use enums::{AmbienceArg, AspectArg, ResolutionArg};
pub use render::render_events;
