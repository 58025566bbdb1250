//! Pre-scripted confirmer for non-interactive runs and tests.

use super::{CommandConfirmer, Confirmation, ReleaseCommand};
use crate::error::Result;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

/// Answers prompts from a fixed script, recording every command shown
#[derive(Debug)]
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<Confirmation>>,
    fallback: Confirmation,
    shown: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    /// Answer with `answers` in order, then cancel everything after
    pub fn new(answers: impl IntoIterator<Item = Confirmation>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            fallback: Confirmation::Cancelled,
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Confirm every prompt
    pub fn always_confirm() -> Self {
        Self {
            fallback: Confirmation::Confirmed,
            ..Self::new([])
        }
    }

    /// Cancel every prompt
    pub fn always_cancel() -> Self {
        Self::new([])
    }

    /// Commands shown so far
    pub fn shown(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CommandConfirmer for ScriptedConfirmer {
    fn confirm(&self, command: &ReleaseCommand) -> impl Future<Output = Result<Confirmation>> {
        self.shown
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(command.render());
        let answer = self
            .answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(self.fallback);
        std::future::ready(Ok(answer))
    }
}
