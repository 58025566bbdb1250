//! Push entity and aggregate status.

use crate::request::PushId;
use serde::{Deserialize, Serialize};

/// Aggregate status of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushStatus {
    /// Accepting and merging requests
    Open,
    /// Deployed to stage at least once
    DeployedToStage,
    /// Certified and merged to master
    Live,
    /// Abandoned
    Discarded,
}

impl PushStatus {
    /// Whether requests may still be picked, merged and deployed
    pub fn accepts_requests(self) -> bool {
        matches!(self, PushStatus::Open | PushStatus::DeployedToStage)
    }

    /// No further status change is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, PushStatus::Live | PushStatus::Discarded)
    }

    /// Forward-only check: advance along open -> deployed-to-stage -> live,
    /// or terminate from a non-terminal status.
    pub fn can_become(self, next: PushStatus) -> bool {
        match (self, next) {
            (PushStatus::Open, PushStatus::DeployedToStage)
            | (PushStatus::Open, PushStatus::Live)
            | (PushStatus::DeployedToStage, PushStatus::Live) => true,
            (from, PushStatus::Discarded) => !from.is_terminal(),
            (from, to) => from == to,
        }
    }

    /// Wire name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            PushStatus::Open => "open",
            PushStatus::DeployedToStage => "deployed-to-stage",
            PushStatus::Live => "live",
            PushStatus::Discarded => "discarded",
        }
    }
}

impl std::fmt::Display for PushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One release cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Push {
    /// Unique id
    pub id: PushId,
    /// Title
    pub title: String,
    /// Deploy branch
    pub branch: String,
    /// Stage environment; empty until chosen
    #[serde(default)]
    pub stage_env: String,
    /// Owning user
    pub pushmaster: String,
    /// Aggregate status
    pub status: PushStatus,
    /// Users pinged on stage and prod deploys
    #[serde(default)]
    pub extra_pings: Vec<String>,
    /// Creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last modification time
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

impl Push {
    /// Create a new open push
    pub fn new(id: PushId, title: &str, branch: &str, pushmaster: &str) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            title: title.to_string(),
            branch: branch.to_string(),
            stage_env: String::new(),
            pushmaster: pushmaster.to_string(),
            status: PushStatus::Open,
            extra_pings: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Stage environment, if one has been chosen
    pub fn stage_env(&self) -> Option<&str> {
        let env = self.stage_env.trim();
        (!env.is_empty()).then_some(env)
    }
}

/// Changes to a push's editable fields; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushEdit {
    /// New title
    pub title: Option<String>,
    /// New deploy branch
    pub branch: Option<String>,
    /// New stage environment
    pub stage_env: Option<String>,
}

impl PushEdit {
    /// Edit only the stage environment
    pub fn stage_env(env: impl Into<String>) -> Self {
        Self {
            stage_env: Some(env.into()),
            ..Default::default()
        }
    }

    /// Apply the edit
    pub fn apply_to(&self, push: &mut Push) {
        if let Some(title) = &self.title {
            push.title = title.clone();
        }
        if let Some(branch) = &self.branch {
            push.branch = branch.clone();
        }
        if let Some(env) = &self.stage_env {
            push.stage_env = env.trim().to_string();
        }
        push.modified_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_forward_only() {
        assert!(PushStatus::Open.can_become(PushStatus::DeployedToStage));
        assert!(PushStatus::DeployedToStage.can_become(PushStatus::Live));
        assert!(!PushStatus::DeployedToStage.can_become(PushStatus::Open));
        assert!(!PushStatus::Live.can_become(PushStatus::DeployedToStage));
        assert!(!PushStatus::Live.can_become(PushStatus::Discarded));
        assert!(PushStatus::DeployedToStage.can_become(PushStatus::Discarded));
        assert!(!PushStatus::Discarded.can_become(PushStatus::Open));
    }

    #[test]
    fn test_stage_env_unset_when_blank() {
        let mut push = Push::new(1, "Morning push", "deploy-1", "pm");
        assert_eq!(push.stage_env(), None);
        PushEdit::stage_env(" stage-a ").apply_to(&mut push);
        assert_eq!(push.stage_env(), Some("stage-a"));
    }
}
