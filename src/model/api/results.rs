use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

use super::category::NomineeProfile;

/// Acknowledgement of a successfully cast ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastReceipt {
    pub category: Id,
    pub nominee: Id,
    /// The nominee's tally including this ballot.
    pub vote_count: u64,
}

/// A nominee's display name and tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NomineeTally {
    pub name: String,
    pub votes: u64,
}

/// Per-category tally overview for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub id: Id,
    pub label: String,
    pub nominees: Vec<NomineeTally>,
    /// Number of ballots cast, i.e. the size of the voter set.
    pub total_votes: u64,
    pub result_published: bool,
    /// Whether the voting window has ended.
    pub ended: bool,
    /// Leading nominee's display name, derived only once the window has
    /// ended. Display-only; publication stays explicit.
    pub winner: Option<String>,
}

/// The currently-active contest, from a member's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentVote {
    pub id: Id,
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Whether the calling user has already cast a ballot here.
    pub has_voted: bool,
    pub nominees: Vec<NomineeProfile>,
}

/// An open contest with the caller's voting status, for the nominee listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCategory {
    pub id: Id,
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub user_has_voted: bool,
    pub nominees: Vec<NomineeProfile>,
}

/// The outcome of publishing a category's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedResult {
    pub category: Id,
    pub label: String,
    pub winner: NomineeProfile,
    pub votes: u64,
}
