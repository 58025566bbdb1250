//! Interactive confirmation on the controlling terminal.

use super::OutputManager;
use crate::confirm::{CommandConfirmer, Confirmation, ReleaseCommand};
use crate::error::{CliError, Result};
use std::future::Future;

/// Whether a typed answer confirms the command
pub fn is_confirmation(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes" | "done")
}

/// Shows the command and reads the operator's answer from stdin
#[derive(Debug, Clone)]
pub struct TerminalConfirmer {
    output: OutputManager,
    assume_yes: bool,
}

impl TerminalConfirmer {
    /// Create a confirmer; `assume_yes` skips the prompt
    pub fn new(output: OutputManager, assume_yes: bool) -> Self {
        Self { output, assume_yes }
    }
}

impl CommandConfirmer for TerminalConfirmer {
    fn confirm(&self, command: &ReleaseCommand) -> impl Future<Output = Result<Confirmation>> {
        let rendered = command.render();
        let header = if command.is_shell_command() {
            "Run this command, then confirm:"
        } else {
            "About to:"
        };

        async move {
            self.output.command(header, &rendered)?;
            if self.assume_yes {
                log::debug!("Confirmation assumed for '{}'", rendered);
                return Ok(Confirmation::Confirmed);
            }

            self.output.prompt("Done? [y/N]:")?;
            let answer = tokio::task::spawn_blocking(|| -> std::io::Result<String> {
                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;
                Ok(input)
            })
            .await
            .map_err(|e| CliError::ExecutionFailed {
                command: rendered.clone(),
                reason: format!("prompt task failed: {}", e),
            })??;

            Ok(if is_confirmation(&answer) {
                Confirmation::Confirmed
            } else {
                Confirmation::Cancelled
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers() {
        assert!(is_confirmation("y\n"));
        assert!(is_confirmation(" Done "));
        assert!(is_confirmation("YES"));
        assert!(!is_confirmation(""));
        assert!(!is_confirmation("n"));
        assert!(!is_confirmation("yep"));
    }

    #[tokio::test]
    async fn test_assume_yes_confirms_without_reading() {
        let confirmer = TerminalConfirmer::new(OutputManager::new(true), true);
        let command = ReleaseCommand::Certify {
            branch: "deploy".to_string(),
        };
        assert_eq!(confirmer.confirm(&command).await.unwrap(), Confirmation::Confirmed);
    }
}
