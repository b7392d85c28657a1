use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use futures::TryStreamExt;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{Coll, Id};

/// Core member-directory data, as maintained by the accounts service.
///
/// This crate never writes users; it resolves nominee references against
/// the directory and joins profile fields into read-side projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub position: String,
    #[serde(default)]
    pub profile_img: String,
}

impl UserCore {
    /// Display name, the way the membership frontend shows it.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A directory user from the database, with their unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Fetch directory records for the given ids, keyed by id.
///
/// Unknown ids are simply absent from the result; read-side joins tolerate
/// users that have since left the directory.
pub async fn users_by_ids(users: &Coll<User>, ids: &[Id]) -> Result<HashMap<Id, User>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let filter = doc! { "_id": { "$in": ids.to_vec() } };
    let found: Vec<User> = users.find(filter, None).await?.try_collect().await?;
    Ok(found.into_iter().map(|user| (user.id, user)).collect())
}

/// Resolve nominee ids strictly against the directory.
///
/// The count comparison rejects unknown and duplicate ids alike.
pub async fn resolve_users(users: &Coll<User>, ids: &[Id]) -> Result<HashMap<Id, User>> {
    let resolved = users_by_ids(users, ids).await?;
    if resolved.len() != ids.len() {
        return Err(Error::Validation(
            "one or more nominee ids are invalid".to_string(),
        ));
    }
    Ok(resolved)
}
