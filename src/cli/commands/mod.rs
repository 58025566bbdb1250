//! Command execution.
//!
//! Each command opens what it needs from the state file, runs one operation
//! and reports the outcome. Failures are reported here with recovery hints
//! and turned into a non-zero exit code.

mod display;
mod push;
mod request;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

/// Execute the command named by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from_args(&args)?;
    log::debug!(
        "Running '{}' as {} against {}",
        args.command.name(),
        config.settings().user,
        config.settings().state_file.display()
    );

    let result = match &args.command {
        Command::Push(command) => push::execute(command, &config).await,
        Command::Request(command) => request::execute(command, &config).await,
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {}", args.command.name(), e));
            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                config.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    config.println(&format!("  • {}", suggestion));
                }
            }
            Ok(if e.is_recoverable() { 1 } else { 2 })
        }
    }
}
