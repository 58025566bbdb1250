//! Command line argument parsing.

use crate::config::Settings;
use super::TerminalConfirmer;
use crate::error::Result;
use crate::request::{PushId, RequestId, RequestState};
use crate::session::PushSession;
use crate::store::FileStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Push coordination for release requests
#[derive(Parser, Debug)]
#[command(
    name = "pushmanager",
    version,
    about = "Coordinate pushes: collect requests, merge, deploy, verify, certify",
    long_about = "Coordinate release pushes.

Every irreversible step prints the command to run and records the change
only after you confirm it ran.

Usage:
  pushmanager push new \"Morning push\" deploy-morning
  pushmanager push add 1 12 14
  pushmanager push stage 1
  pushmanager request verify --push 1 12"
)]
pub struct Args {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Treat every prompt as confirmed (the commands were run already)
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Settings file
    #[arg(long, global = true, env = "PUSHMANAGER_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// State file backing the store
    #[arg(long, global = true, env = "PUSHMANAGER_STATE_FILE", value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Act as this user
    #[arg(long, global = true, env = "PUSHMANAGER_USER")]
    pub user: Option<String>,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Work with pushes
    #[command(subcommand)]
    Push(PushCommand),

    /// Work with requests
    #[command(subcommand)]
    Request(RequestCommand),
}

/// Push commands
#[derive(Subcommand, Debug)]
pub enum PushCommand {
    /// Create a push owned by the acting user
    New {
        /// Title
        title: String,
        /// Deploy branch
        branch: String,
    },

    /// List pushes, newest first
    List,

    /// Show a push and its sections
    Show {
        /// Push id
        push: PushId,
        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change title, branch or stage environment
    Edit {
        /// Push id
        push: PushId,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New deploy branch
        #[arg(long)]
        branch: Option<String>,
        /// New stage environment
        #[arg(long)]
        stage_env: Option<String>,
    },

    /// Set the stage environment
    StageEnv {
        /// Push id
        push: PushId,
        /// Environment name
        env: String,
    },

    /// Merge requests into the deploy branch
    Add {
        /// Push id
        push: PushId,
        /// Requests to add
        #[arg(required = true)]
        requests: Vec<RequestId>,
    },

    /// Take requests out of the push
    Remove {
        /// Push id
        push: PushId,
        /// Requests to remove
        #[arg(required = true)]
        requests: Vec<RequestId>,
    },

    /// Show the command rebuilding the deploy branch
    Rebuild {
        /// Push id
        push: PushId,
    },

    /// Deploy to stage
    Stage {
        /// Push id
        push: PushId,
    },

    /// Deploy to production
    Prod {
        /// Push id
        push: PushId,
    },

    /// Merge to master and mark the push live
    Certify {
        /// Push id
        push: PushId,
    },

    /// Delete the deploy branch and abandon the push
    Discard {
        /// Push id
        push: PushId,
    },

    /// Follow the checklist until interrupted
    Watch {
        /// Push id
        push: PushId,
        /// Print the checklist once and exit
        #[arg(long)]
        once: bool,
    },

    /// Tick a checklist item
    Check {
        /// Push id
        push: PushId,
        /// Checklist item id
        item: u64,
        /// Mark the item incomplete instead
        #[arg(long)]
        undo: bool,
    },

    /// Message the users involved in a push
    Message {
        /// Push id
        push: PushId,
        /// Only users of this section
        #[arg(long)]
        section: Option<RequestState>,
        /// Message text
        text: String,
    },
}

/// Request fields shared by `new` and `edit`
#[derive(clap::Args, Debug, Default)]
pub struct RequestFieldArgs {
    /// Title
    #[arg(long)]
    pub title: Option<String>,
    /// Source branch; leave out for l10n-only requests
    #[arg(long)]
    pub branch: Option<String>,
    /// Source repository (defaults to the main repository)
    #[arg(long)]
    pub repo: Option<String>,
    /// Review id
    #[arg(long)]
    pub review: Option<String>,
    /// Tags, e.g. "l10n search-backend"
    #[arg(long)]
    pub tags: Option<String>,
    /// Description
    #[arg(long)]
    pub description: Option<String>,
    /// Comma-separated watchers
    #[arg(long)]
    pub watchers: Option<String>,
}

/// Request commands
#[derive(Subcommand, Debug)]
pub enum RequestCommand {
    /// Submit a request
    New {
        /// Request fields
        #[command(flatten)]
        fields: RequestFieldArgs,
    },

    /// Edit a request
    Edit {
        /// Request id
        id: RequestId,
        /// Fields to change
        #[command(flatten)]
        fields: RequestFieldArgs,
        /// Take over ownership
        #[arg(long)]
        takeover: bool,
    },

    /// Mark a request as a pick for a push
    Pickme {
        /// Push id
        #[arg(long)]
        push: PushId,
        /// Request id
        id: RequestId,
    },

    /// Withdraw a pick
    Unpickme {
        /// Push id
        #[arg(long)]
        push: PushId,
        /// Request id
        id: RequestId,
    },

    /// Mark a staged request verified
    Verify {
        /// Push id
        #[arg(long)]
        push: PushId,
        /// Request id
        id: RequestId,
    },

    /// Hold a request back
    Delay {
        /// Push id
        #[arg(long)]
        push: PushId,
        /// Request id
        id: RequestId,
    },

    /// Return a delayed request to requested
    Undelay {
        /// Push id
        #[arg(long)]
        push: PushId,
        /// Request id
        id: RequestId,
    },

    /// Drop a request for good
    Discard {
        /// Push id
        #[arg(long)]
        push: PushId,
        /// Request id
        id: RequestId,
    },

    /// Comment on a request
    Comment {
        /// Request id
        id: RequestId,
        /// Comment text
        text: String,
    },
}

impl Command {
    /// Short name for error reporting
    pub fn name(&self) -> &'static str {
        match self {
            Command::Push(cmd) => match cmd {
                PushCommand::New { .. } => "push new",
                PushCommand::List => "push list",
                PushCommand::Show { .. } => "push show",
                PushCommand::Edit { .. } => "push edit",
                PushCommand::StageEnv { .. } => "push stage-env",
                PushCommand::Add { .. } => "push add",
                PushCommand::Remove { .. } => "push remove",
                PushCommand::Rebuild { .. } => "push rebuild",
                PushCommand::Stage { .. } => "push stage",
                PushCommand::Prod { .. } => "push prod",
                PushCommand::Certify { .. } => "push certify",
                PushCommand::Discard { .. } => "push discard",
                PushCommand::Watch { .. } => "push watch",
                PushCommand::Check { .. } => "push check",
                PushCommand::Message { .. } => "push message",
            },
            Command::Request(cmd) => match cmd {
                RequestCommand::New { .. } => "request new",
                RequestCommand::Edit { .. } => "request edit",
                RequestCommand::Pickme { .. } => "request pickme",
                RequestCommand::Unpickme { .. } => "request unpickme",
                RequestCommand::Verify { .. } => "request verify",
                RequestCommand::Delay { .. } => "request delay",
                RequestCommand::Undelay { .. } => "request undelay",
                RequestCommand::Discard { .. } => "request discard",
                RequestCommand::Comment { .. } => "request comment",
            },
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Settings with command line overrides applied
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(path) = &self.state_file {
            settings.state_file = path.clone();
        }
        if let Some(user) = &self.user {
            settings.user = user.clone();
        }
        Ok(settings)
    }
}

/// Everything a command needs at run time
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
    settings: Settings,
    assume_yes: bool,
}

impl RuntimeConfig {
    /// Resolve settings and output from the parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        Ok(Self {
            output: super::OutputManager::new(args.quiet),
            settings: args.settings()?,
            assume_yes: args.yes,
        })
    }

    /// Output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Resolved settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Store backed by the configured state file
    pub fn store(&self) -> Arc<FileStore> {
        Arc::new(FileStore::new(&self.settings.state_file))
    }

    /// Confirmer prompting on the terminal unless `--yes` was given
    pub fn confirmer(&self) -> TerminalConfirmer {
        TerminalConfirmer::new(self.output.clone(), self.assume_yes)
    }

    /// Open a session on `push`
    pub async fn open_session(&self, push: PushId) -> Result<PushSession<FileStore, TerminalConfirmer>> {
        PushSession::open(self.store(), self.confirmer(), self.settings.clone(), push).await
    }

    /// Print a plain line
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print a success line
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print a warning line
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print an error line
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print an indented line
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let args = Args::try_parse_from(["pushmanager", "push", "add", "3", "12", "14", "--yes"]).unwrap();
        assert!(args.yes);
        match args.command {
            Command::Push(PushCommand::Add { push, requests }) => {
                assert_eq!(push, 3);
                assert_eq!(requests, vec![12, 14]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_add_needs_requests() {
        assert!(Args::try_parse_from(["pushmanager", "push", "add", "3"]).is_err());
    }

    #[test]
    fn test_message_section_parsed() {
        let args = Args::try_parse_from([
            "pushmanager",
            "push",
            "message",
            "1",
            "--section",
            "staged",
            "please verify",
        ])
        .unwrap();
        assert_eq!(args.command.name(), "push message");
        match args.command {
            Command::Push(PushCommand::Message { section, text, .. }) => {
                assert_eq!(section, Some(RequestState::Staged));
                assert_eq!(text, "please verify");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides_applied() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let args = Args::try_parse_from([
            "pushmanager",
            "--user",
            "carol",
            "--state-file",
            state.to_str().unwrap(),
            "push",
            "list",
        ])
        .unwrap();
        let settings = args.settings().unwrap();
        assert_eq!(settings.user, "carol");
        assert_eq!(settings.state_file, state);
    }
}
