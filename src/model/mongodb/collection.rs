use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{Category, NewCategory, User};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Vote category collections
const VOTE_CATEGORIES: &str = "vote_categories";
impl MongoCollection for Category {
    const NAME: &'static str = VOTE_CATEGORIES;
}
impl MongoCollection for NewCategory {
    const NAME: &'static str = VOTE_CATEGORIES;
}

// Member directory collection; this crate only ever reads it.
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    // Vote category collection: the active-window queries filter on both bounds.
    let window_index = IndexModel::builder()
        .keys(doc! {"start_time": 1, "end_time": 1})
        .build();
    Coll::<Category>::from_db(db)
        .create_index(window_index, None)
        .await?;

    // Member directory.
    let unique = IndexOptions::builder().unique(true).build();
    let user_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique)
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    Ok(())
}
