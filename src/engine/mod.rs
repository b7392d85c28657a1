use std::sync::Arc;

use log::info;
use mongodb::{Client, Database};

use crate::config::{Config, WindowStartPolicy};
use crate::error::{Error, Result};
use crate::model::{
    db::{Category, NewCategory, User},
    mongodb::{ensure_indexes_exist, Coll, Id},
};
use crate::notify::ResultNotifier;

mod admin;
mod casting;
mod queries;

/// The ballot engine. Every vote-subsystem operation goes through here.
///
/// Cheap to clone; clones share the same connection pool and notifier.
/// All cross-request invariants are enforced by the store's conditional
/// updates, never by in-process state, so any number of engine instances
/// in any number of processes may serve the same database.
#[derive(Clone)]
pub struct BallotEngine {
    db: Database,
    window_start: WindowStartPolicy,
    notifier: Option<Arc<dyn ResultNotifier>>,
}

impl BallotEngine {
    /// Connect to the configured database and prepare the engine.
    pub async fn connect(config: &Config) -> Result<Self> {
        info!("Loaded database config, connecting...");
        let client = Client::with_uri_str(config.db_uri()).await?;
        let db = client.database(config.db_name());
        ensure_indexes_exist(&db).await?;
        info!("...database connection online!");
        Ok(Self::for_database(db, config.window_start()))
    }

    /// Build an engine over an existing database handle.
    pub fn for_database(db: Database, window_start: WindowStartPolicy) -> Self {
        Self {
            db,
            window_start,
            notifier: None,
        }
    }

    /// Attach a best-effort sink for result-published events.
    pub fn with_notifier(mut self, notifier: Arc<dyn ResultNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// The window-start policy in force.
    pub fn window_start(&self) -> WindowStartPolicy {
        self.window_start
    }

    pub(crate) fn categories(&self) -> Coll<Category> {
        Coll::from_db(&self.db)
    }

    pub(crate) fn new_categories(&self) -> Coll<NewCategory> {
        Coll::from_db(&self.db)
    }

    pub(crate) fn users(&self) -> Coll<User> {
        Coll::from_db(&self.db)
    }

    /// Fetch a category or report it missing.
    pub(crate) async fn category_by_id(&self, category_id: Id) -> Result<Category> {
        self.categories()
            .find_one(category_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Vote category {}", category_id)))
    }
}
