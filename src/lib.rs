//! # Pushmanager
//!
//! Push coordination for code-review-backed release requests.
//!
//! Engineers submit requests (a branch plus review metadata), a pushmaster
//! collects them into a push, merges them into a deploy branch, deploys to
//! stage, waits for owners to verify, deploys to production and certifies.
//!
//! ## Features
//!
//! - **Request lifecycle**: a closed transition table; illegal or stale moves are rejected
//! - **Push gates**: prod deploy and certify refuse to run past unverified work
//! - **Merge sets**: merge commands rebuilt from every member, with the localization step
//! - **Confirm then commit**: nothing is recorded until the operator confirms the command ran
//!
//! ## Usage
//!
//! ```bash
//! pushmanager push new "Morning push" deploy-2024-06-01
//! pushmanager push add 1 12 14     # show merge command, confirm, record
//! pushmanager push stage 1
//! pushmanager request verify --push 1 12
//! pushmanager push prod 1
//! pushmanager push certify 1
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod confirm;
pub mod error;
pub mod merge;
pub mod notify;
pub mod poller;
pub mod push;
pub mod request;
pub mod session;
pub mod store;

pub use cli::{Args, TerminalConfirmer};
pub use config::Settings;
pub use confirm::{
    CommandConfirmer, CommandOutcome, Confirmation, ReleaseCommand, ScriptedConfirmer,
    run_confirmed_command,
};
pub use error::{
    CliError, GateViolation, PushError, Result, StateError, StoreError, TransitionError,
    ValidationError,
};
pub use merge::{MergeSet, MergeSetBuilder};
pub use poller::{ChecklistPoller, ChecklistStatus};
pub use push::{Push, PushAction, PushEdit, PushStatus, SectionBoard, SectionCounts};
pub use request::{PushId, Request, RequestForm, RequestId, RequestState, RequestTransition};
pub use session::{PushSession, TransitionReport, comment_request, create_push, submit_request};
pub use store::{FileStore, InMemoryStore, PushAdvance, PushSnapshot, PushStore};
