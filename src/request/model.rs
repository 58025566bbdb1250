//! Request entity and its tag set.

use super::RequestState;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Identifier of a request
pub type RequestId = u64;

/// Identifier of a push
pub type PushId = u64;

/// Tag marking a change that carries both code and translations
pub const L10N_TAG: &str = "l10n";

/// Tag marking a translation-only change with no branch to merge
pub const L10N_ONLY_TAG: &str = "l10n-only";

/// Tags managed by conflict checking; never accepted from user input
const CONFLICT_TAGS: [&str; 2] = ["conflict-pickme", "conflict-master"];

static TAG_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9_-]+").expect("tag pattern is a valid regex"));

/// Unordered set of unique tag tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    /// Extract tag tokens from free text, dropping conflict-check tags
    pub fn parse(input: &str) -> Self {
        let tags = TAG_TOKEN
            .find_iter(input)
            .map(|m| m.as_str())
            .filter(|tag| !CONFLICT_TAGS.contains(tag))
            .map(str::to_string)
            .collect();
        Self(tags)
    }

    /// Whether the tag is present
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Translation-only change
    pub fn is_l10n_only(&self) -> bool {
        self.contains(L10N_ONLY_TAG)
    }

    /// Any localization-bearing change
    pub fn needs_localization(&self) -> bool {
        self.contains(L10N_TAG) || self.is_l10n_only()
    }

    /// Iterate tags in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No tags at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(" "))
    }
}

/// A unit of change proposed for release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Unique id
    pub id: RequestId,
    /// Title shown in push views
    pub title: String,
    /// Owning user
    pub user: String,
    /// Source branch; empty for translation-only requests
    pub branch: String,
    /// Source repository
    pub repo: String,
    /// Code review id
    pub review_id: Option<u64>,
    /// Free-text tags
    #[serde(default)]
    pub tags: TagSet,
    /// Append-only comment log
    #[serde(default)]
    pub comments: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Users to keep informed besides the owner
    #[serde(default)]
    pub watchers: Vec<String>,
    /// Revision hash used for CI lookups
    #[serde(default)]
    pub revision: Option<String>,
    /// Lifecycle state
    pub state: RequestState,
    /// Push this request belongs to, once it is a member
    #[serde(default)]
    pub push: Option<PushId>,
    /// Creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last modification time
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

impl Request {
    /// Token naming how this request's branch merges into a deploy branch.
    ///
    /// Branches in the main repository are named bare, anything else is
    /// qualified with its repository.
    pub fn cherry_string(&self, main_repository: &str) -> String {
        if self.repo == main_repository {
            self.branch.clone()
        } else {
            format!("{}/{}", self.repo, self.branch)
        }
    }

    /// Owner annotated with watchers, e.g. `alice (bob,carol)`
    pub fn user_string(&self) -> String {
        if self.watchers.is_empty() {
            self.user.clone()
        } else {
            format!("{} ({})", self.user, self.watchers.join(","))
        }
    }

    /// Owner followed by watchers
    pub fn involved_users(&self) -> Vec<String> {
        std::iter::once(self.user.clone())
            .chain(self.watchers.iter().cloned())
            .collect()
    }

    /// Append a comment to the log
    pub fn append_comment(&mut self, author: &str, text: &str) {
        if !self.comments.is_empty() {
            self.comments.push_str("\n\n");
        }
        self.comments.push_str(&format!("{}: {}", author, text.trim()));
        self.modified_at = chrono::Utc::now();
    }
}

/// Validated fields for creating or updating a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFields {
    /// Existing request to update; `None` creates a new one
    pub id: Option<RequestId>,
    /// Title
    pub title: String,
    /// Source branch
    pub branch: String,
    /// Source repository
    pub repo: String,
    /// Code review id
    pub review_id: Option<u64>,
    /// Tags
    pub tags: TagSet,
    /// Comments
    pub comments: String,
    /// Description
    pub description: String,
    /// Watchers
    pub watchers: Vec<String>,
    /// Take over ownership of an existing request
    pub takeover: bool,
}

impl RequestFields {
    /// Build the stored request for a new submission
    pub fn into_request(self, id: RequestId, user: &str) -> Request {
        let now = chrono::Utc::now();
        Request {
            id,
            title: self.title,
            user: user.to_string(),
            branch: self.branch,
            repo: self.repo,
            review_id: self.review_id,
            tags: self.tags,
            comments: self.comments,
            description: self.description,
            watchers: self.watchers,
            revision: None,
            state: RequestState::Requested,
            push: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Overwrite editable fields of an existing request
    pub fn apply_to(self, request: &mut Request, user: &str) {
        request.title = self.title;
        request.branch = self.branch;
        request.repo = self.repo;
        request.review_id = self.review_id;
        request.tags = self.tags;
        request.comments = self.comments;
        request.description = self.description;
        request.watchers = self.watchers;
        request.revision = None;
        if self.takeover {
            request.user = user.to_string();
        }
        request.modified_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(repo: &str, branch: &str) -> Request {
        RequestFields {
            id: None,
            title: "Fix checkout".to_string(),
            branch: branch.to_string(),
            repo: repo.to_string(),
            review_id: None,
            tags: TagSet::default(),
            comments: String::new(),
            description: String::new(),
            watchers: Vec::new(),
            takeover: false,
        }
        .into_request(1, "alice")
    }

    #[test]
    fn test_cherry_string_main_repository() {
        assert_eq!(request("main", "fix_checkout").cherry_string("main"), "fix_checkout");
    }

    #[test]
    fn test_cherry_string_dev_repository() {
        assert_eq!(
            request("alice", "fix_checkout").cherry_string("main"),
            "alice/fix_checkout"
        );
    }

    #[test]
    fn test_tag_parse_strips_conflict_tags() {
        let tags = TagSet::parse("l10n, buildbot conflict-master  l10n");
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["buildbot", "l10n"]);
        assert!(tags.needs_localization());
        assert!(!tags.is_l10n_only());
    }

    #[test]
    fn test_user_string_with_watchers() {
        let mut req = request("main", "b");
        assert_eq!(req.user_string(), "alice");
        req.watchers = vec!["bob".to_string(), "carol".to_string()];
        assert_eq!(req.user_string(), "alice (bob,carol)");
        assert_eq!(req.involved_users(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_comments_are_appended() {
        let mut req = request("main", "b");
        req.append_comment("alice", "first");
        req.append_comment("bob", " second ");
        assert_eq!(req.comments, "alice: first\n\nbob: second");
    }
}
