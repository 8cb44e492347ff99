//! Client-side job filtering.
//!
//! Postings arrive newest first from the store; [`JobFilter`] narrows them with
//! three independent, case-insensitive predicates and keeps the input order.
//! Which collection gets fetched in the first place is decided by
//! [`ListingScope`].

use uuid::Uuid;

use crate::db::models::{Identity, JobPosting};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    query: String,
    location: String,
    job_type: Option<String>,
}

impl JobFilter {
    /// Empty strings disable the corresponding predicate.
    pub fn new(query: &str, location: &str, job_type: Option<&str>) -> Self {
        Self {
            query: query.to_lowercase(),
            location: location.to_lowercase(),
            job_type: job_type
                .filter(|t| !t.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.location.is_empty() && self.job_type.is_none()
    }

    pub fn matches(&self, job: &JobPosting) -> bool {
        if let Some(job_type) = &self.job_type {
            let same = job
                .job_type
                .as_deref()
                .is_some_and(|t| t.to_lowercase() == *job_type);
            if !same {
                return false;
            }
        }

        if !self.query.is_empty() {
            let hit = contains(Some(&job.title), &self.query)
                || contains(Some(&job.company), &self.query)
                || contains(job.description.as_deref(), &self.query);
            if !hit {
                return false;
            }
        }

        if !self.location.is_empty() && !contains(job.location.as_deref(), &self.location) {
            return false;
        }

        true
    }

    pub fn apply(&self, jobs: Vec<JobPosting>) -> Vec<JobPosting> {
        if self.is_empty() {
            return jobs;
        }
        jobs.into_iter().filter(|job| self.matches(job)).collect()
    }
}

/// `needle` is already lower-cased. A missing field never matches.
fn contains(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

/// Which postings a listing visit fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScope {
    All,
    PostedBy(Uuid),
}

impl ListingScope {
    /// "My postings" only applies with a signed-in user; otherwise the toggle is inert.
    pub fn resolve(mine: bool, user: Option<&Identity>) -> Self {
        match (mine, user) {
            (true, Some(user)) => ListingScope::PostedBy(user.id),
            _ => ListingScope::All,
        }
    }

    pub fn owner(&self) -> Option<Uuid> {
        match self {
            ListingScope::All => None,
            ListingScope::PostedBy(id) => Some(*id),
        }
    }
}
