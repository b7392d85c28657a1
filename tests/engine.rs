//! End-to-end engine tests against a real MongoDB instance.
//!
//! Ignored by default so the suite passes where no store is reachable;
//! run them next to a local `mongod` with:
//!
//! ```text
//! MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored
//! ```
//!
//! Each test uses a randomly-named throwaway database, dropped at the end.

use chapel_votes::{
    error::WindowStatus,
    model::{
        api::CategorySpec,
        db::{Category, User, UserCore},
        mongodb::{Coll, Id},
    },
    BallotEngine, Error, Identity, WindowStartPolicy,
};
use chrono::{DateTime, Duration, Utc};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    Client, Database,
};

async fn setup() -> (BallotEngine, Database) {
    let _ = env_logger::builder().is_test(true).try_init();
    let uri = std::env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let client = Client::with_uri_str(&uri).await.unwrap();
    // Use a random name to avoid collisions between tests.
    let db = client.database(&format!("test{}", rand::random::<u32>()));
    let engine = BallotEngine::for_database(db.clone(), WindowStartPolicy::Scheduled);
    (engine, db)
}

async fn insert_users(db: &Database, count: usize) -> Vec<Id> {
    let users: Vec<User> = (0..count)
        .map(|i| User {
            id: Id::new(),
            user: UserCore {
                first_name: format!("Member{i}"),
                last_name: "Example".to_string(),
                email: format!("member{i}@example.org"),
                department: "Choir".to_string(),
                position: "Member".to_string(),
                profile_img: String::new(),
            },
        })
        .collect();
    Coll::<User>::from_db(db)
        .insert_many(&users, None)
        .await
        .unwrap();
    users.into_iter().map(|u| u.id).collect()
}

async fn create_category(
    engine: &BallotEngine,
    admin: &Identity,
    nominees: &[Id],
    end_time: DateTime<Utc>,
) -> Id {
    let spec = CategorySpec {
        label: "BestChoir".to_string(),
        nominee_ids: nominees.to_vec(),
        end_time,
        start_time: None,
    };
    engine.create_category(admin, spec).await.unwrap().id
}

/// Force a category's window into the past, directly in the store.
async fn end_category(db: &Database, category_id: Id) {
    let past = BsonDateTime::from_chrono(Utc::now() - Duration::hours(1));
    let result = Coll::<Category>::from_db(db)
        .update_one(
            category_id.as_doc(),
            doc! { "$set": { "end_time": past } },
            None,
        )
        .await
        .unwrap();
    assert_eq!(result.matched_count, 1);
}

async fn fetch_category(db: &Database, category_id: Id) -> Category {
    Coll::<Category>::from_db(db)
        .find_one(category_id.as_doc(), None)
        .await
        .unwrap()
        .unwrap()
}

fn total_votes(category: &Category) -> u64 {
    category.nominees.iter().map(|n| n.vote_count).sum()
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn casting_is_exactly_once_per_user() {
    let (engine, db) = setup().await;
    let admin = Identity::admin(Id::new());

    let users = insert_users(&db, 3).await;
    let category_id =
        create_category(&engine, &admin, &users[..2], Utc::now() + Duration::hours(1)).await;

    // First ballot lands.
    let voter = Identity::member(users[2]);
    let receipt = engine.cast_vote(&voter, category_id, users[0]).await.unwrap();
    assert_eq!(receipt.vote_count, 1);

    // Second ballot from the same user is rejected, even for another nominee.
    let err = engine.cast_vote(&voter, category_id, users[1]).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyVoted));

    let category = fetch_category(&db, category_id).await;
    assert_eq!(total_votes(&category), 1);
    assert_eq!(category.voters, vec![users[2]]);

    db.drop(None).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn concurrent_casts_neither_lose_nor_double_count() {
    let (engine, db) = setup().await;
    let admin = Identity::admin(Id::new());

    const VOTERS: usize = 16;
    let nominees = insert_users(&db, 2).await;
    let category_id =
        create_category(&engine, &admin, &nominees, Utc::now() + Duration::hours(1)).await;

    // N distinct users cast concurrently, alternating between nominees.
    let voters: Vec<Id> = (0..VOTERS).map(|_| Id::new()).collect();
    let mut handles = Vec::new();
    for (i, voter) in voters.iter().enumerate() {
        let engine = engine.clone();
        let identity = Identity::member(*voter);
        let nominee = nominees[i % 2];
        handles.push(tokio::spawn(async move {
            engine.cast_vote(&identity, category_id, nominee).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let category = fetch_category(&db, category_id).await;
    assert_eq!(total_votes(&category), VOTERS as u64);
    assert_eq!(category.voters.len(), VOTERS);
    // Every increment went to the nominee it was cast for.
    assert_eq!(category.nominees[0].vote_count, (VOTERS as u64 + 1) / 2);
    assert_eq!(category.nominees[1].vote_count, VOTERS as u64 / 2);

    db.drop(None).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn casting_outside_the_window_changes_nothing() {
    let (engine, db) = setup().await;
    let admin = Identity::admin(Id::new());
    let users = insert_users(&db, 2).await;

    // Not yet open: scheduled to start in an hour.
    let spec = CategorySpec {
        label: "BestChoir".to_string(),
        nominee_ids: users.clone(),
        end_time: Utc::now() + Duration::hours(2),
        start_time: Some(Utc::now() + Duration::hours(1)),
    };
    let early_id = engine.create_category(&admin, spec).await.unwrap().id;
    let voter = Identity::member(Id::new());
    let err = engine.cast_vote(&voter, early_id, users[0]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::WindowInactive(WindowStatus::NotYetOpen)
    ));

    // Already over.
    let late_id =
        create_category(&engine, &admin, &users, Utc::now() + Duration::hours(1)).await;
    end_category(&db, late_id).await;
    let err = engine.cast_vote(&voter, late_id, users[0]).await.unwrap_err();
    assert!(matches!(err, Error::WindowInactive(WindowStatus::Ended)));

    for id in [early_id, late_id] {
        let category = fetch_category(&db, id).await;
        assert_eq!(total_votes(&category), 0);
        assert!(category.voters.is_empty());
    }

    db.drop(None).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn unknown_categories_and_nominees_are_distinguished() {
    let (engine, db) = setup().await;
    let admin = Identity::admin(Id::new());
    let users = insert_users(&db, 2).await;
    let category_id =
        create_category(&engine, &admin, &users[..1], Utc::now() + Duration::hours(1)).await;

    let voter = Identity::member(Id::new());
    let err = engine.cast_vote(&voter, Id::new(), users[0]).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // users[1] exists in the directory but is not nominated here.
    let err = engine.cast_vote(&voter, category_id, users[1]).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Nominating an unknown user is a validation failure.
    let spec = CategorySpec {
        label: "BestUsher".to_string(),
        nominee_ids: vec![users[0], Id::new()],
        end_time: Utc::now() + Duration::hours(1),
        start_time: None,
    };
    let err = engine.create_category(&admin, spec).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    db.drop(None).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn publication_is_one_time_and_tie_breaks_by_stored_order() {
    let (engine, db) = setup().await;
    let admin = Identity::admin(Id::new());
    let users = insert_users(&db, 2).await;
    let category_id =
        create_category(&engine, &admin, &users, Utc::now() + Duration::hours(1)).await;

    // One ballot each: a tie, which stored order must break.
    for nominee in &users {
        engine
            .cast_vote(&Identity::member(Id::new()), category_id, *nominee)
            .await
            .unwrap();
    }

    // Too early to publish.
    let err = engine.publish_result(&admin, category_id).await.unwrap_err();
    assert!(matches!(err, Error::VotingStillOpen));

    end_category(&db, category_id).await;
    let result = engine.publish_result(&admin, category_id).await.unwrap();
    assert_eq!(result.winner.user, users[0]);
    assert_eq!(result.votes, 1);

    // A second publication is rejected and the winner stays put.
    let err = engine.publish_result(&admin, category_id).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyPublished));
    let category = fetch_category(&db, category_id).await;
    assert!(category.result_published);
    assert_eq!(category.winner, Some(users[0]));

    db.drop(None).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn replacing_nominees_resets_tallies_but_not_voters() {
    let (engine, db) = setup().await;
    let admin = Identity::admin(Id::new());
    let users = insert_users(&db, 3).await;
    let category_id =
        create_category(&engine, &admin, &users[..2], Utc::now() + Duration::hours(1)).await;

    let voter = Identity::member(Id::new());
    engine.cast_vote(&voter, category_id, users[0]).await.unwrap();

    // Replace with an overlapping list; the surviving nominee loses its tally.
    let description = engine
        .replace_nominees(&admin, category_id, vec![users[0], users[2]])
        .await
        .unwrap();
    assert!(description.nominees.iter().all(|n| n.vote_count == 0));

    // The voter set survives the edit: no second ballot.
    let err = engine.cast_vote(&voter, category_id, users[2]).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyVoted));

    db.drop(None).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn projections_report_voting_status() {
    let (engine, db) = setup().await;
    let admin = Identity::admin(Id::new());
    let users = insert_users(&db, 2).await;
    let category_id =
        create_category(&engine, &admin, &users, Utc::now() + Duration::hours(1)).await;

    let voter = Identity::member(Id::new());
    let current = engine.get_current_vote(&voter).await.unwrap();
    assert_eq!(current.id, category_id);
    assert!(!current.has_voted);
    assert_eq!(current.nominees.len(), 2);
    assert_eq!(current.nominees[0].name, "Member0 Example");

    engine.cast_vote(&voter, category_id, users[1]).await.unwrap();

    let open = engine.get_user_nominees(&voter).await.unwrap();
    assert_eq!(open.len(), 1);
    assert!(open[0].user_has_voted);

    // Tallies are admin-only and derive a winner only once ended.
    assert!(matches!(
        engine.get_votes(&voter).await.unwrap_err(),
        Error::Forbidden(_)
    ));
    let tallies = engine.get_votes(&admin).await.unwrap();
    assert_eq!(tallies.len(), 1);
    assert!(!tallies[0].ended);
    assert_eq!(tallies[0].winner, None);
    assert_eq!(tallies[0].total_votes, 1);

    end_category(&db, category_id).await;
    let tallies = engine.get_votes(&admin).await.unwrap();
    assert!(tallies[0].ended);
    assert_eq!(tallies[0].winner.as_deref(), Some("Member1 Example"));
    // Deriving a display winner must not publish anything.
    let category = fetch_category(&db, category_id).await;
    assert!(!category.result_published);

    db.drop(None).await.unwrap();
}

/// The full lifecycle scenario: cast, duplicate, close, publish, republish.
#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn best_choir_scenario() {
    let (engine, db) = setup().await;
    let admin = Identity::admin(Id::new());
    let users = insert_users(&db, 3).await;
    let (a, b) = (users[0], users[1]);
    let category_id =
        create_category(&engine, &admin, &[a, b], Utc::now() + Duration::hours(1)).await;

    let user1 = Identity::member(users[2]);
    engine.cast_vote(&user1, category_id, a).await.unwrap();

    let category = fetch_category(&db, category_id).await;
    assert_eq!(category.nominees[0].vote_count, 1);
    assert_eq!(category.nominees[1].vote_count, 0);
    assert_eq!(category.voters, vec![users[2]]);

    let err = engine.cast_vote(&user1, category_id, a).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyVoted));
    assert_eq!(fetch_category(&db, category_id).await, category);

    end_category(&db, category_id).await;
    let result = engine.publish_result(&admin, category_id).await.unwrap();
    assert_eq!(result.winner.user, a);

    let err = engine.publish_result(&admin, category_id).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyPublished));

    db.drop(None).await.unwrap();
}
