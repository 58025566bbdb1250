//! Confirm-then-commit protocol for irreversible release actions.
//!
//! The operator is shown the exact command to run and the state change is
//! recorded only after they confirm having run it. Cancelling makes no
//! store call and changes nothing.

mod command;
mod scripted;

pub use command::{DEPLOY_TAG_PLACEHOLDER, ReleaseCommand};
pub use scripted::ScriptedConfirmer;

use crate::error::Result;
use std::future::Future;

/// Operator's answer to a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The command was run
    Confirmed,
    /// The operator backed out
    Cancelled,
}

/// Presents a release command and waits for the operator's answer
pub trait CommandConfirmer {
    /// Show `command` and suspend until it is confirmed or cancelled
    fn confirm(&self, command: &ReleaseCommand) -> impl Future<Output = Result<Confirmation>>;
}

/// Result of a confirm-then-commit action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome<T> {
    /// Confirmed and recorded
    Committed(T),
    /// Cancelled by the operator; nothing recorded
    Cancelled,
    /// Nothing to do; no prompt shown
    Skipped,
}

impl<T> CommandOutcome<T> {
    /// Whether the state change was recorded
    pub fn is_committed(&self) -> bool {
        matches!(self, CommandOutcome::Committed(_))
    }

    /// Committed value, if any
    pub fn committed(self) -> Option<T> {
        match self {
            CommandOutcome::Committed(value) => Some(value),
            _ => None,
        }
    }

    /// Map the committed value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CommandOutcome<U> {
        match self {
            CommandOutcome::Committed(value) => CommandOutcome::Committed(f(value)),
            CommandOutcome::Cancelled => CommandOutcome::Cancelled,
            CommandOutcome::Skipped => CommandOutcome::Skipped,
        }
    }
}

/// Show `command`, then run `on_confirmed` only if the operator confirms.
///
/// A failure from `on_confirmed` is returned as is; it is never retried.
pub async fn run_confirmed_command<C, F, Fut, T>(
    confirmer: &C,
    command: &ReleaseCommand,
    on_confirmed: F,
) -> Result<CommandOutcome<T>>
where
    C: CommandConfirmer + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    log::debug!("Awaiting confirmation for {}: {}", command.action(), command);

    match confirmer.confirm(command).await? {
        Confirmation::Cancelled => {
            log::info!("Cancelled {}; nothing recorded", command.action());
            Ok(CommandOutcome::Cancelled)
        }
        Confirmation::Confirmed => {
            let value = on_confirmed().await?;
            log::info!("Recorded {}", command.action());
            Ok(CommandOutcome::Committed(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PushError, StoreError};
    use std::cell::Cell;

    fn certify() -> ReleaseCommand {
        ReleaseCommand::Certify {
            branch: "deploy".to_string(),
        }
    }

    #[tokio::test]
    async fn test_cancel_never_runs_continuation() {
        let confirmer = ScriptedConfirmer::new([Confirmation::Cancelled]);
        let ran = Cell::new(false);
        let outcome = run_confirmed_command(&confirmer, &certify(), || async {
            ran.set(true);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(outcome, CommandOutcome::Cancelled);
        assert!(!ran.get());
        assert_eq!(confirmer.shown(), vec!["certify-push deploy".to_string()]);
    }

    #[tokio::test]
    async fn test_confirm_runs_continuation_once() {
        let confirmer = ScriptedConfirmer::always_confirm();
        let calls = Cell::new(0);
        let outcome = run_confirmed_command(&confirmer, &certify(), || async {
            calls.set(calls.get() + 1);
            Ok(7)
        })
        .await
        .unwrap();

        assert_eq!(outcome, CommandOutcome::Committed(7));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_is_surfaced() {
        let confirmer = ScriptedConfirmer::always_confirm();
        let result: Result<CommandOutcome<()>> =
            run_confirmed_command(&confirmer, &certify(), || async {
                Err(PushError::remote("certify")(StoreError::Unavailable {
                    reason: "timeout".to_string(),
                }))
            })
            .await;

        assert!(matches!(result, Err(PushError::Remote { ref action, .. }) if action == "certify"));
    }
}
