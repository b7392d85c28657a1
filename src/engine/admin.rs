use chrono::{DateTime, Utc};
use log::{info, warn};
use mongodb::bson::doc;

use crate::config::WindowStartPolicy;
use crate::error::{Error, Result};
use crate::model::{
    api::{CategoryDescription, CategorySpec, NomineeProfile, PublishedResult},
    auth::Identity,
    db::{
        user::{resolve_users, users_by_ids},
        Category, CategoryCore, Nominee,
    },
    mongodb::Id,
};
use crate::notify::ResultPublished;

use super::BallotEngine;

impl BallotEngine {
    /// Create a new vote category with all tallies at zero.
    pub async fn create_category(
        &self,
        identity: &Identity,
        spec: CategorySpec,
    ) -> Result<CategoryDescription> {
        identity.require_admin()?;

        let label = spec.label.trim();
        if label.is_empty() {
            return Err(Error::Validation(
                "category label must not be empty".to_string(),
            ));
        }
        check_nominee_ids(&spec.nominee_ids)?;
        resolve_users(&self.users(), &spec.nominee_ids).await?;

        let now = Utc::now();
        let start_time = resolve_window_start(self.window_start(), spec.start_time, now)?;
        if spec.end_time <= start_time {
            return Err(Error::Validation(
                "end time must fall after the start of the voting window".to_string(),
            ));
        }

        let category = CategoryCore::new(
            label.to_string(),
            spec.nominee_ids,
            now,
            start_time,
            spec.end_time,
        );
        let new_id: Id = self
            .new_categories()
            .insert_one(&category, None)
            .await?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into();

        info!("Created vote category {new_id} ({label})");
        Ok(Category {
            id: new_id,
            category,
        }
        .into())
    }

    /// Replace a category's nominees with fresh zero-count entries.
    ///
    /// Tallies are NOT carried over for nominees that remain: editing the
    /// list resets the contest. The voter set is retained, so a user who
    /// voted before the edit cannot vote again after it.
    pub async fn replace_nominees(
        &self,
        identity: &Identity,
        category_id: Id,
        nominee_ids: Vec<Id>,
    ) -> Result<CategoryDescription> {
        identity.require_admin()?;
        check_nominee_ids(&nominee_ids)?;
        resolve_users(&self.users(), &nominee_ids).await?;

        // Read first so an unknown category is reported as such rather
        // than as a zero-match update.
        let mut category = self.category_by_id(category_id).await?;

        let nominees: Vec<Nominee> = nominee_ids.into_iter().map(Nominee::new).collect();
        let update = doc! {
            "$set": { "nominees": nominees.clone() }
        };
        let result = self
            .categories()
            .update_one(category_id.as_doc(), update, None)
            .await?;
        if result.matched_count == 0 {
            // Deleted between the read and the update.
            return Err(Error::not_found(format!("Vote category {category_id}")));
        }

        info!("Replaced nominees for vote category {category_id}; tallies reset");
        category.category.nominees = nominees;
        Ok(category.into())
    }

    /// Permanently delete a category, at any lifecycle stage.
    pub async fn delete_category(&self, identity: &Identity, category_id: Id) -> Result<()> {
        identity.require_admin()?;

        let result = self
            .categories()
            .delete_one(category_id.as_doc(), None)
            .await?;
        if result.deleted_count == 0 {
            return Err(Error::not_found(format!("Vote category {category_id}")));
        }
        info!("Deleted vote category {category_id}");
        Ok(())
    }

    /// Publish the result of a closed category.
    ///
    /// One-way and guarded: when two publishers race, exactly one performs
    /// the transition and the other observes `AlreadyPublished`.
    pub async fn publish_result(
        &self,
        identity: &Identity,
        category_id: Id,
    ) -> Result<PublishedResult> {
        identity.require_admin()?;

        let category = self.category_by_id(category_id).await?;

        let now = Utc::now();
        if now < category.end_time {
            return Err(Error::VotingStillOpen);
        }
        if category.result_published {
            return Err(Error::AlreadyPublished);
        }
        let (winner, votes) = match category.leading_nominee() {
            Some(nominee) => (nominee.user, nominee.vote_count),
            None => return Err(Error::NoNominees),
        };

        // Tallies are frozen once the window has ended, so the winner
        // computed from the read above stays valid under this guard.
        let filter = doc! {
            "_id": category_id,
            "result_published": false,
        };
        let update = doc! {
            "$set": {
                "result_published": true,
                "winner": winner,
            }
        };
        let result = self.categories().update_one(filter, update, None).await?;
        if result.modified_count != 1 {
            // Another publisher got there first.
            return Err(Error::AlreadyPublished);
        }
        info!("Published result for vote category {category_id}: winner {winner}");

        let event = ResultPublished {
            category: category_id,
            label: category.label.clone(),
            winner,
            votes,
            published_at: now,
        };
        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.result_published(&event).await {
                warn!("Failed to notify result publication for category {category_id}: {err}");
            }
        }

        let winner_profile = users_by_ids(&self.users(), std::slice::from_ref(&winner))
            .await?
            .remove(&winner)
            .map(|user| NomineeProfile::from_user(&user))
            .unwrap_or_else(|| NomineeProfile::unknown(winner));

        Ok(PublishedResult {
            category: category_id,
            label: category.category.label,
            winner: winner_profile,
            votes,
        })
    }
}

/// Nominee lists must be non-empty. Unknown and duplicate ids are caught
/// later by directory resolution.
fn check_nominee_ids(ids: &[Id]) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::Validation(
            "at least one nominee is required".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the window start for a new category under the given policy.
fn resolve_window_start(
    policy: WindowStartPolicy,
    explicit: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    match policy {
        WindowStartPolicy::CreationTime => match explicit {
            None => Ok(now),
            Some(_) => Err(Error::Validation(
                "this deployment opens voting at creation; an explicit start time is not accepted"
                    .to_string(),
            )),
        },
        WindowStartPolicy::Scheduled => Ok(explicit.unwrap_or(now)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn creation_time_policy_rejects_explicit_starts() {
        let now = Utc::now();
        let later = now + Duration::hours(1);

        assert_eq!(
            resolve_window_start(WindowStartPolicy::CreationTime, None, now).unwrap(),
            now
        );
        assert!(matches!(
            resolve_window_start(WindowStartPolicy::CreationTime, Some(later), now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn scheduled_policy_defaults_to_creation() {
        let now = Utc::now();
        let later = now + Duration::hours(1);

        assert_eq!(
            resolve_window_start(WindowStartPolicy::Scheduled, Some(later), now).unwrap(),
            later
        );
        assert_eq!(
            resolve_window_start(WindowStartPolicy::Scheduled, None, now).unwrap(),
            now
        );
    }

    #[test]
    fn empty_nominee_lists_are_rejected() {
        assert!(matches!(
            check_nominee_ids(&[]),
            Err(Error::Validation(_))
        ));
        assert!(check_nominee_ids(&[Id::new()]).is_ok());
    }
}
