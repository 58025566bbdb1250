//! Merge-set synthesis.
//!
//! Turns a selection of requests into the exact merge command an operator
//! runs against the deploy branch.

use crate::config::Settings;
use crate::request::Request;

/// Assembled merge command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSet {
    base: String,
    tokens: Vec<String>,
    localization_step: Option<String>,
}

impl MergeSet {
    /// Branch tokens in selection order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether the localization build step is appended
    pub fn localization_needed(&self) -> bool {
        self.localization_step.is_some()
    }

    /// Selection contributed no branch and no localization work
    pub fn is_trivial(&self) -> bool {
        self.tokens.is_empty() && self.localization_step.is_none()
    }

    /// Full shell command
    pub fn render(&self) -> String {
        let mut command = self.base.clone();
        for token in &self.tokens {
            command.push(' ');
            command.push_str(token);
        }
        if let Some(step) = &self.localization_step {
            command.push_str(" && ");
            command.push_str(step);
        }
        command
    }
}

impl std::fmt::Display for MergeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Builds merge commands under the localization policy
#[derive(Debug, Clone)]
pub struct MergeSetBuilder {
    merge_command: String,
    main_repository: String,
    localization_step: String,
}

impl MergeSetBuilder {
    /// Builder with explicit tokens
    pub fn new(
        merge_command: impl Into<String>,
        main_repository: impl Into<String>,
        localization_step: impl Into<String>,
    ) -> Self {
        Self {
            merge_command: merge_command.into(),
            main_repository: main_repository.into(),
            localization_step: localization_step.into(),
        }
    }

    /// Builder configured from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.merge_command,
            &settings.main_repository,
            &settings.localization_step,
        )
    }

    /// Build the merge set for `requests`.
    ///
    /// `l10n-only` requests contribute nothing to merge but force the
    /// localization step; `l10n` requests contribute their branch and force
    /// it too. Duplicate branch tokens are merged once.
    pub fn build<'a>(&self, requests: impl IntoIterator<Item = &'a Request>) -> MergeSet {
        let mut tokens: Vec<String> = Vec::new();
        let mut localization_needed = false;

        for request in requests {
            if request.tags.needs_localization() {
                localization_needed = true;
            }
            if request.tags.is_l10n_only() {
                continue;
            }
            let token = request.cherry_string(&self.main_repository);
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }

        MergeSet {
            base: self.merge_command.clone(),
            tokens,
            localization_step: localization_needed.then(|| self.localization_step.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestFields, TagSet};

    fn request(id: u64, repo: &str, branch: &str, tags: &str) -> Request {
        RequestFields {
            id: None,
            title: format!("request {id}"),
            branch: branch.to_string(),
            repo: repo.to_string(),
            review_id: None,
            tags: TagSet::parse(tags),
            comments: String::new(),
            description: String::new(),
            watchers: Vec::new(),
            takeover: false,
        }
        .into_request(id, "alice")
    }

    fn builder() -> MergeSetBuilder {
        MergeSetBuilder::from_settings(&Settings::default())
    }

    #[test]
    fn test_l10n_only_contributes_step_not_branch() {
        let r1 = request(1, "main", "a", "");
        let r2 = request(2, "main", "", "l10n-only");
        let set = builder().build([&r1, &r2]);

        assert_eq!(set.tokens(), ["a".to_string()]);
        let command = set.render();
        assert_eq!(command, "merge-branches a && localizables_push_website.py");
        assert_eq!(command.matches("localizables_push_website.py").count(), 1);
    }

    #[test]
    fn test_l10n_contributes_both() {
        let r1 = request(1, "bob", "strings", "l10n");
        let r2 = request(2, "main", "", "l10n-only");
        let set = builder().build([&r1, &r2]);
        assert_eq!(
            set.render(),
            "merge-branches bob/strings && localizables_push_website.py"
        );
    }

    #[test]
    fn test_no_localization_without_tags() {
        let r1 = request(1, "main", "a", "buildbot");
        let r2 = request(2, "carol", "b", "");
        let set = builder().build([&r1, &r2]);
        assert!(!set.localization_needed());
        assert_eq!(set.render(), "merge-branches a carol/b");
    }

    #[test]
    fn test_empty_selection_is_base_only() {
        let set = builder().build(std::iter::empty());
        assert!(set.is_trivial());
        assert_eq!(set.render(), "merge-branches");
    }
}
