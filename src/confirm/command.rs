//! External release commands shown to the operator.

use crate::merge::MergeSet;
use crate::request::RequestId;

/// Placeholder the operator fills in with the deploy tag
pub const DEPLOY_TAG_PLACEHOLDER: &str = "<deploytag>";

/// A command run out of band before a state change is recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseCommand {
    /// Merge request branches into the deploy branch
    Merge(MergeSet),
    /// Deploy the deploy branch to the stage environment
    DeployStage {
        /// Stage environment
        stage_env: String,
        /// Deploy branch
        branch: String,
    },
    /// Deploy the staged build to production
    DeployProd {
        /// Stage environment the build is promoted from
        stage_env: String,
    },
    /// Merge the deploy branch into master
    Certify {
        /// Deploy branch
        branch: String,
    },
    /// Delete the deploy branch from the remote
    DeleteBranch {
        /// Remote name
        remote: String,
        /// Deploy branch
        branch: String,
    },
    /// Drop a request for good
    DiscardRequest {
        /// Request id
        request: RequestId,
        /// Request title
        title: String,
    },
}

impl ReleaseCommand {
    /// Rendered command text
    pub fn render(&self) -> String {
        match self {
            ReleaseCommand::Merge(set) => set.render(),
            ReleaseCommand::DeployStage { stage_env, branch } => {
                format!("deploy-stage --target {} -b {}", stage_env, branch)
            }
            ReleaseCommand::DeployProd { stage_env } => {
                format!("deploy-prod --source {} {}", stage_env, DEPLOY_TAG_PLACEHOLDER)
            }
            ReleaseCommand::Certify { branch } => format!("certify-push {}", branch),
            ReleaseCommand::DeleteBranch { remote, branch } => {
                format!("git push --delete {} {}", remote, branch)
            }
            ReleaseCommand::DiscardRequest { request, title } => {
                format!("discard request {} ({})", request, title)
            }
        }
    }

    /// Short label for logs and error messages
    pub fn action(&self) -> &'static str {
        match self {
            ReleaseCommand::Merge(_) => "merge",
            ReleaseCommand::DeployStage { .. } => "deploy to stage",
            ReleaseCommand::DeployProd { .. } => "deploy to prod",
            ReleaseCommand::Certify { .. } => "certify",
            ReleaseCommand::DeleteBranch { .. } => "discard push",
            ReleaseCommand::DiscardRequest { .. } => "discard request",
        }
    }

    /// Whether the operator runs this in a shell
    pub fn is_shell_command(&self) -> bool {
        !matches!(self, ReleaseCommand::DiscardRequest { .. })
    }
}

impl std::fmt::Display for ReleaseCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_deploy_commands() {
        let stage = ReleaseCommand::DeployStage {
            stage_env: "stagea".to_string(),
            branch: "deploy-2026".to_string(),
        };
        assert_eq!(stage.render(), "deploy-stage --target stagea -b deploy-2026");

        let prod = ReleaseCommand::DeployProd {
            stage_env: "stagea".to_string(),
        };
        assert_eq!(prod.render(), "deploy-prod --source stagea <deploytag>");

        let certify = ReleaseCommand::Certify {
            branch: "deploy-2026".to_string(),
        };
        assert_eq!(certify.to_string(), "certify-push deploy-2026");
    }

    #[test]
    fn test_render_branch_deletion() {
        let delete = ReleaseCommand::DeleteBranch {
            remote: "canon".to_string(),
            branch: "deploy-2026".to_string(),
        };
        assert_eq!(delete.render(), "git push --delete canon deploy-2026");
        assert_eq!(delete.action(), "discard push");
    }
}
