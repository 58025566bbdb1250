//! Section membership of a push.
//!
//! The board mirrors the last acknowledged state of every request shown in
//! a push view. It is only written after the store confirms a transition;
//! the section a request appears in is read straight from its state field.

use crate::error::TransitionError;
use crate::request::{Request, RequestId, RequestState};
use std::collections::{BTreeMap, BTreeSet};

/// Per-section request counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionCounts(BTreeMap<RequestState, usize>);

impl SectionCounts {
    /// Count for one section
    pub fn get(&self, section: RequestState) -> usize {
        self.0.get(&section).copied().unwrap_or(0)
    }

    /// Non-empty sections in lifecycle order
    pub fn iter(&self) -> impl Iterator<Item = (RequestState, usize)> + '_ {
        self.0.iter().map(|(s, n)| (*s, *n))
    }
}

/// A request owner together with its watchers
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InvolvedUser {
    /// Owning user
    pub user: String,
    /// Watchers of the request
    pub watchers: Vec<String>,
}

impl std::fmt::Display for InvolvedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.watchers.is_empty() {
            write!(f, "{}", self.user)
        } else {
            write!(f, "{} ({})", self.user, self.watchers.join(","))
        }
    }
}

/// Flatten involved users into unique notification recipients
pub fn recipients(users: &[InvolvedUser]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in users
        .iter()
        .flat_map(|u| std::iter::once(&u.user).chain(u.watchers.iter()))
    {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

/// Join involved users for display, e.g. `alice (bob), carol`
pub fn format_involved(users: &[InvolvedUser]) -> String {
    users
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Acknowledged section membership for one push view
#[derive(Debug, Clone, Default)]
pub struct SectionBoard {
    requests: BTreeMap<RequestId, Request>,
}

impl SectionBoard {
    /// Build a board from acknowledged requests
    pub fn from_requests(requests: impl IntoIterator<Item = Request>) -> Self {
        Self {
            requests: requests.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Track a request, replacing any previous copy
    pub fn insert(&mut self, request: Request) {
        self.requests.insert(request.id, request);
    }

    /// Replace the whole board after a refresh
    pub fn replace_all(&mut self, requests: impl IntoIterator<Item = Request>) {
        *self = Self::from_requests(requests);
    }

    /// Look up a request
    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    /// Recorded section of a request
    pub fn section_of(&self, id: RequestId) -> Option<RequestState> {
        self.requests.get(&id).map(|r| r.state)
    }

    /// Confirm a request is recorded in `expected`
    pub fn expect(&self, id: RequestId, expected: RequestState) -> Result<&Request, TransitionError> {
        match self.requests.get(&id) {
            Some(request) if request.state == expected => Ok(request),
            other => Err(TransitionError::Conflict {
                request: id,
                expected,
                actual: other.map(|r| r.state),
            }),
        }
    }

    /// Move one request between sections.
    ///
    /// Fails with a conflict, leaving the board untouched, when the request
    /// is not recorded in `from`.
    pub fn move_request(
        &mut self,
        id: RequestId,
        from: RequestState,
        to: RequestState,
    ) -> Result<(), TransitionError> {
        self.expect(id, from)?;
        if let Some(request) = self.requests.get_mut(&id) {
            request.state = to;
            request.modified_at = chrono::Utc::now();
        }
        Ok(())
    }

    /// Move several requests at once; all or none
    pub fn move_many(
        &mut self,
        ids: &[RequestId],
        from: RequestState,
        to: RequestState,
    ) -> Result<(), TransitionError> {
        for id in ids {
            self.expect(*id, from)?;
        }
        for id in ids {
            self.move_request(*id, from, to)?;
        }
        Ok(())
    }

    /// Move a whole section, returning the moved ids
    pub fn move_section(&mut self, from: RequestState, to: RequestState) -> Vec<RequestId> {
        let ids = self.ids_in(from);
        for id in &ids {
            if let Some(request) = self.requests.get_mut(id) {
                request.state = to;
            }
        }
        ids
    }

    /// Ids recorded in a section
    pub fn ids_in(&self, section: RequestState) -> Vec<RequestId> {
        self.requests_in(section).map(|r| r.id).collect()
    }

    /// Requests recorded in a section
    pub fn requests_in(&self, section: RequestState) -> impl Iterator<Item = &Request> + '_ {
        self.requests.values().filter(move |r| r.state == section)
    }

    /// Requests merged into the deploy branch (added through live)
    pub fn in_push(&self) -> impl Iterator<Item = &Request> + '_ {
        self.requests.values().filter(|r| r.state.is_in_push())
    }

    /// All tracked requests
    pub fn iter(&self) -> impl Iterator<Item = &Request> + '_ {
        self.requests.values()
    }

    /// Number of requests in a section
    pub fn count(&self, section: RequestState) -> usize {
        self.requests_in(section).count()
    }

    /// Counts for every non-empty section
    pub fn counts(&self) -> SectionCounts {
        let mut counts = BTreeMap::new();
        for request in self.requests.values() {
            *counts.entry(request.state).or_insert(0) += 1;
        }
        SectionCounts(counts)
    }

    /// Unique involved users of one section
    pub fn section_involved_users(&self, section: RequestState) -> Vec<InvolvedUser> {
        unique_users(self.requests_in(section))
    }

    /// Unique involved users across every merged section
    pub fn all_involved_users(&self) -> Vec<InvolvedUser> {
        unique_users(self.in_push())
    }
}

fn unique_users<'a>(requests: impl Iterator<Item = &'a Request>) -> Vec<InvolvedUser> {
    let set: BTreeSet<InvolvedUser> = requests
        .map(|r| InvolvedUser {
            user: r.user.clone(),
            watchers: r.watchers.clone(),
        })
        .collect();
    set.into_iter().collect()
}
