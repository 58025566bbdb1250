//! Command line interface for pushmanager.

mod args;
pub mod commands;
mod confirmer;
mod output;

pub use args::{Args, Command, PushCommand, RequestCommand, RequestFieldArgs, RuntimeConfig};
pub use commands::execute_command;
pub use confirmer::TerminalConfirmer;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
