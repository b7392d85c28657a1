use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A nominee embedded in a vote category: a user reference plus a tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nominee {
    /// The user this nominee represents.
    pub user: Id,
    /// Number of ballots cast for this nominee.
    pub vote_count: u64,
}

impl Nominee {
    /// A fresh nominee with no ballots.
    pub fn new(user: Id) -> Self {
        Self {
            user,
            vote_count: 0,
        }
    }
}

impl From<Nominee> for Bson {
    fn from(nominee: Nominee) -> Self {
        to_bson(&nominee).expect("Serialisation is infallible")
    }
}

/// Core vote category data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCore {
    /// Display label of the contest.
    pub label: String,
    /// Nominees in stored order. The order is significant: it breaks ties.
    pub nominees: Vec<Nominee>,
    /// Users who have cast a ballot. A user appears at most once.
    pub voters: Vec<Id>,
    /// When the category was created.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// Casting is permitted from this instant...
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// ...up to, but not including, this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// Whether the result has been published.
    pub result_published: bool,
    /// The published winner's user reference.
    pub winner: Option<Id>,
}

impl CategoryCore {
    /// Create a new category with all tallies at zero and nobody voted.
    pub fn new(
        label: String,
        nominee_users: impl IntoIterator<Item = Id>,
        created_at: DateTime<Utc>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            label,
            nominees: nominee_users.into_iter().map(Nominee::new).collect(),
            voters: Vec::new(),
            created_at,
            start_time,
            end_time,
            result_published: false,
            winner: None,
        }
    }

    /// Is casting permitted at the given instant?
    pub fn window_active(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    /// Has the voting window ended, for display purposes?
    pub fn ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }

    /// Has the given user already cast a ballot here?
    pub fn has_voted(&self, user: Id) -> bool {
        self.voters.contains(&user)
    }

    /// Is the given user nominated in this category?
    pub fn has_nominee(&self, user: Id) -> bool {
        self.nominees.iter().any(|n| n.user == user)
    }

    /// The nominee currently leading the tally.
    ///
    /// Ties are broken by stored order: the first nominee with the maximum
    /// count wins. Published winners must be reproducible from stored state
    /// alone, so this rule is part of the contract.
    pub fn leading_nominee(&self) -> Option<&Nominee> {
        self.nominees
            .iter()
            .reduce(|max, n| if n.vote_count > max.vote_count { n } else { max })
    }

    /// Lifecycle state at the given instant.
    pub fn state(&self, now: DateTime<Utc>) -> CategoryState {
        if self.result_published {
            CategoryState::Published
        } else if now < self.end_time {
            CategoryState::Open
        } else {
            CategoryState::Closed
        }
    }
}

/// A category without an ID, ready for insertion.
pub type NewCategory = CategoryCore;

/// A vote category from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub category: CategoryCore,
}

impl Deref for Category {
    type Target = CategoryCore;

    fn deref(&self) -> &Self::Target {
        &self.category
    }
}

impl DerefMut for Category {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.category
    }
}

/// States in the category lifecycle.
///
/// `Open -> Closed` is derived from timestamps at read time; `Closed ->
/// Published` is the only stored transition and never reverses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryState {
    /// The voting window has not ended.
    Open,
    /// The window has ended but no result is published.
    Closed,
    /// The result has been published.
    Published,
}
