use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::{Category, User};
use crate::model::mongodb::Id;

/// A new vote contest, as submitted by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    /// Contest label.
    pub label: String,
    /// Users to nominate, in the order they should appear.
    pub nominee_ids: Vec<Id>,
    /// End of the voting window (exclusive).
    pub end_time: DateTime<Utc>,
    /// Scheduled start of the voting window; subject to the deployment's
    /// window-start policy.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// A nominee entry with its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NomineeEntry {
    pub user: Id,
    pub vote_count: u64,
}

/// A category as returned to administrative callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescription {
    pub id: Id,
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub nominees: Vec<NomineeEntry>,
    pub result_published: bool,
    pub winner: Option<Id>,
}

impl From<Category> for CategoryDescription {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            label: category.category.label,
            start_time: category.category.start_time,
            end_time: category.category.end_time,
            nominees: category
                .category
                .nominees
                .into_iter()
                .map(|n| NomineeEntry {
                    user: n.user,
                    vote_count: n.vote_count,
                })
                .collect(),
            result_published: category.category.result_published,
            winner: category.category.winner,
        }
    }
}

/// Public profile fields for a nominee, joined from the member directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NomineeProfile {
    pub user: Id,
    pub name: String,
    pub profile_img: String,
    pub department: String,
    pub position: String,
}

impl NomineeProfile {
    /// Build a profile from a directory record.
    pub fn from_user(user: &User) -> Self {
        Self {
            user: user.id,
            name: user.full_name(),
            profile_img: user.profile_img.clone(),
            department: user.department.clone(),
            position: user.position.clone(),
        }
    }

    /// Fallback profile for a user no longer present in the directory.
    pub fn unknown(user: Id) -> Self {
        Self {
            user,
            name: user.to_string(),
            profile_img: String::new(),
            department: String::new(),
            position: String::new(),
        }
    }
}

/// Label, window and nominee profiles for a single category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNominees {
    pub id: Id,
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub nominees: Vec<NomineeProfile>,
}
