use chrono::{DateTime, Utc};
use log::debug;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{FindOneAndUpdateOptions, ReturnDocument},
};

use crate::error::{Error, Result, WindowStatus};
use crate::model::{api::CastReceipt, auth::Identity, db::Category, mongodb::Id};

use super::BallotEngine;

impl BallotEngine {
    /// Cast the caller's ballot for a nominee in the given category.
    ///
    /// All four preconditions (category exists, window active, caller has
    /// not voted, nominee belongs to the category) sit in the filter of a
    /// single conditional update, so racing callers can neither lose an
    /// increment nor vote twice: the store applies the tally increment and
    /// the voter-set insertion together or not at all. A failed attempt
    /// changes nothing and is cheap to retry after the rejection below.
    pub async fn cast_vote(
        &self,
        identity: &Identity,
        category_id: Id,
        nominee: Id,
    ) -> Result<CastReceipt> {
        let voter = identity.user;
        let now = Utc::now();

        // The nominee clause both scopes the positional increment and
        // guarantees the array filter matches whenever the document does,
        // so the push can never land without the increment.
        let filter = doc! {
            "_id": category_id,
            "start_time": { "$lte": BsonDateTime::from_chrono(now) },
            "end_time": { "$gt": BsonDateTime::from_chrono(now) },
            "voters": { "$ne": voter },
            "nominees.user": nominee,
        };
        let update = doc! {
            "$inc": { "nominees.$[elem].vote_count": 1 },
            "$push": { "voters": voter },
        };
        let options = FindOneAndUpdateOptions::builder()
            .array_filters(vec![doc! { "elem.user": nominee }])
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .categories()
            .find_one_and_update(filter, update, options)
            .await?;

        match updated {
            Some(category) => {
                debug!("User {voter} cast a ballot in vote category {category_id}");
                let vote_count = category
                    .nominees
                    .iter()
                    .find(|n| n.user == nominee)
                    .map(|n| n.vote_count)
                    .unwrap(); // Presence enforced by the update filter.
                Ok(CastReceipt {
                    category: category_id,
                    nominee,
                    vote_count,
                })
            }
            None => {
                // The conditional update missed; find out why without
                // granting any effect.
                let category = self
                    .categories()
                    .find_one(category_id.as_doc(), None)
                    .await?;
                Err(cast_rejection(
                    category_id,
                    category.as_ref(),
                    voter,
                    nominee,
                    now,
                ))
            }
        }
    }
}

/// Classify a failed cast attempt: missing category, duplicate ballot,
/// inactive window, then unknown nominee, checked in that order.
fn cast_rejection(
    category_id: Id,
    category: Option<&Category>,
    voter: Id,
    nominee: Id,
    now: DateTime<Utc>,
) -> Error {
    let category = match category {
        Some(category) => category,
        None => return Error::not_found(format!("Vote category {category_id}")),
    };
    if category.has_voted(voter) {
        return Error::AlreadyVoted;
    }
    if !category.window_active(now) {
        return if now < category.start_time {
            Error::WindowInactive(WindowStatus::NotYetOpen)
        } else {
            Error::WindowInactive(WindowStatus::Ended)
        };
    }
    if !category.has_nominee(nominee) {
        return Error::not_found(format!("Nominee {nominee} in vote category {category_id}"));
    }
    // Every precondition re-checks as castable: the state changed between
    // the update and the diagnostic read. The attempt had no effect and
    // may simply be retried.
    Error::Internal(format!(
        "ballot for vote category {category_id} was rejected but no failed precondition was found"
    ))
}
