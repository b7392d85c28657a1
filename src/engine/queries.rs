use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        CategoryNominees, CategoryTally, CurrentVote, NomineeProfile, NomineeTally, OpenCategory,
    },
    auth::Identity,
    db::{user::users_by_ids, Category},
    mongodb::Id,
};

use super::BallotEngine;

impl BallotEngine {
    /// Tally overview of every category, for administrators.
    ///
    /// Once a window has ended, a winner is derived for display with the
    /// same tie-break rule as publication, but nothing is mutated here;
    /// publication stays explicit and one-time.
    pub async fn get_votes(&self, identity: &Identity) -> Result<Vec<CategoryTally>> {
        identity.require_admin()?;

        let categories: Vec<Category> = self
            .categories()
            .find(None, None)
            .await?
            .try_collect()
            .await?;

        // One directory fetch covering every nominee of every category.
        let mut ids: Vec<Id> = categories
            .iter()
            .flat_map(|c| c.nominees.iter().map(|n| n.user))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        let users = users_by_ids(&self.users(), &ids).await?;
        let display_name = |user: Id| {
            users
                .get(&user)
                .map(|u| u.full_name())
                .unwrap_or_else(|| user.to_string())
        };

        let now = Utc::now();
        let mut tallies = Vec::with_capacity(categories.len());
        for category in &categories {
            let ended = category.ended(now);
            let winner = if ended {
                category.leading_nominee().map(|n| display_name(n.user))
            } else {
                None
            };
            tallies.push(CategoryTally {
                id: category.id,
                label: category.label.clone(),
                nominees: category
                    .nominees
                    .iter()
                    .map(|n| NomineeTally {
                        name: display_name(n.user),
                        votes: n.vote_count,
                    })
                    .collect(),
                total_votes: category.voters.len() as u64,
                result_published: category.result_published,
                ended,
                winner,
            });
        }
        Ok(tallies)
    }

    /// The currently-active contest, with the caller's voting status.
    pub async fn get_current_vote(&self, identity: &Identity) -> Result<CurrentVote> {
        let now = Utc::now();
        let category = self
            .categories()
            .find_one(active_window_filter(now), None)
            .await?
            .ok_or_else(|| Error::not_found("An active vote"))?;

        let nominees = self.nominee_profiles(&category).await?;
        Ok(CurrentVote {
            id: category.id,
            label: category.label.clone(),
            start_time: category.start_time,
            end_time: category.end_time,
            has_voted: category.has_voted(identity.user),
            nominees,
        })
    }

    /// Label, window and nominee profiles for one category.
    pub async fn get_nominees(
        &self,
        _identity: &Identity,
        category_id: Id,
    ) -> Result<CategoryNominees> {
        let category = self.category_by_id(category_id).await?;
        let nominees = self.nominee_profiles(&category).await?;
        Ok(CategoryNominees {
            id: category.id,
            label: category.label.clone(),
            start_time: category.start_time,
            end_time: category.end_time,
            nominees,
        })
    }

    /// Every currently-open contest, with a per-category voting flag for
    /// the caller.
    pub async fn get_user_nominees(&self, identity: &Identity) -> Result<Vec<OpenCategory>> {
        let now = Utc::now();
        let categories: Vec<Category> = self
            .categories()
            .find(active_window_filter(now), None)
            .await?
            .try_collect()
            .await?;

        let mut open = Vec::with_capacity(categories.len());
        for category in &categories {
            let nominees = self.nominee_profiles(category).await?;
            open.push(OpenCategory {
                id: category.id,
                label: category.label.clone(),
                start_time: category.start_time,
                end_time: category.end_time,
                user_has_voted: category.has_voted(identity.user),
                nominees,
            });
        }
        Ok(open)
    }

    /// Join nominee profiles from the member directory, in stored order.
    async fn nominee_profiles(&self, category: &Category) -> Result<Vec<NomineeProfile>> {
        let ids: Vec<Id> = category.nominees.iter().map(|n| n.user).collect();
        let users = users_by_ids(&self.users(), &ids).await?;
        Ok(category
            .nominees
            .iter()
            .map(|n| {
                users
                    .get(&n.user)
                    .map(NomineeProfile::from_user)
                    .unwrap_or_else(|| NomineeProfile::unknown(n.user))
            })
            .collect())
    }
}

/// Filter matching categories whose voting window contains `now`.
fn active_window_filter(now: DateTime<Utc>) -> Document {
    doc! {
        "start_time": { "$lte": BsonDateTime::from_chrono(now) },
        "end_time": { "$gt": BsonDateTime::from_chrono(now) },
    }
}
