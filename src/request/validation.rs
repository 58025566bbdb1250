//! Boundary validation for request submissions.
//!
//! Everything here runs before a store call is attempted.

use super::{RequestFields, RequestId, TagSet};
use crate::error::ValidationError;

/// Parse a review id: all digits, or empty for none
pub fn parse_review_id(input: &str) -> Result<Option<u64>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidReviewId {
            value: input.to_string(),
        });
    }
    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidReviewId {
            value: input.to_string(),
        })
}

/// Split a comma-separated watcher list, trimming and dropping empties
pub fn parse_watchers(input: &str) -> Vec<String> {
    let mut watchers: Vec<String> = Vec::new();
    for watcher in input.split(',').map(str::trim).filter(|w| !w.is_empty()) {
        if !watchers.iter().any(|w| w == watcher) {
            watchers.push(watcher.to_string());
        }
    }
    watchers
}

/// Raw request form as entered by a user
#[derive(Debug, Clone, Default)]
pub struct RequestForm {
    /// Request to edit; `None` submits a new one
    pub id: Option<RequestId>,
    /// Title
    pub title: String,
    /// Source branch
    pub branch: String,
    /// Source repository
    pub repo: String,
    /// Review id, digits only or empty
    pub review: String,
    /// Free-text tags
    pub tags: String,
    /// Comments
    pub comments: String,
    /// Description
    pub description: String,
    /// Comma-separated watchers
    pub watchers: String,
    /// Take over ownership when editing someone else's request
    pub takeover: bool,
}

impl RequestForm {
    /// Validate the form into storable fields
    pub fn validate(&self) -> Result<RequestFields, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField { field: "title" });
        }
        let repo = self.repo.trim();
        if repo.is_empty() {
            return Err(ValidationError::MissingField { field: "repo" });
        }

        let review_id = parse_review_id(&self.review)?;
        let tags = TagSet::parse(&self.tags);
        let branch = self.branch.trim();

        if tags.is_l10n_only() {
            if !branch.is_empty() {
                return Err(ValidationError::L10nOnlyWithBranch {
                    branch: branch.to_string(),
                });
            }
        } else if branch.is_empty() {
            return Err(ValidationError::MissingField { field: "branch" });
        }

        Ok(RequestFields {
            id: self.id,
            title: title.to_string(),
            branch: branch.to_string(),
            repo: repo.to_string(),
            review_id,
            tags,
            comments: self.comments.clone(),
            description: self.description.clone(),
            watchers: parse_watchers(&self.watchers),
            takeover: self.takeover,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RequestForm {
        RequestForm {
            title: "Speed up search".to_string(),
            branch: "search_speedup".to_string(),
            repo: "main".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_review_id_digits_accepted() {
        assert_eq!(parse_review_id("123"), Ok(Some(123)));
    }

    #[test]
    fn test_review_id_mixed_rejected() {
        assert_eq!(
            parse_review_id("12a"),
            Err(ValidationError::InvalidReviewId {
                value: "12a".to_string()
            })
        );
        assert!(parse_review_id("-4").is_err());
    }

    #[test]
    fn test_review_id_empty_accepted() {
        assert_eq!(parse_review_id(""), Ok(None));
    }

    #[test]
    fn test_watchers_trimmed() {
        assert_eq!(parse_watchers(" bob, ,carol ,bob"), vec!["bob", "carol"]);
        assert!(parse_watchers("").is_empty());
    }

    #[test]
    fn test_l10n_only_excludes_branch() {
        let mut f = form();
        f.tags = "l10n-only".to_string();
        assert_eq!(
            f.validate(),
            Err(ValidationError::L10nOnlyWithBranch {
                branch: "search_speedup".to_string()
            })
        );

        f.branch = "  ".to_string();
        let fields = f.validate().unwrap();
        assert!(fields.branch.is_empty());
        assert!(fields.tags.is_l10n_only());
    }

    #[test]
    fn test_code_requests_need_branch() {
        let mut f = form();
        f.branch.clear();
        assert_eq!(
            f.validate(),
            Err(ValidationError::MissingField { field: "branch" })
        );
    }

    #[test]
    fn test_invalid_review_blocks_form() {
        let mut f = form();
        f.review = "r123".to_string();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::InvalidReviewId { .. })
        ));
    }
}
