use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use uuid::Uuid;

use super::conference::{Conference, CreateConference};
use super::paper::{CreatePaper, Paper};
use super::user::{CreateUser, User};

pub(crate) async fn setup_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("invalid sqlite config")
        .create_if_missing(true)
        .foreign_keys(true);

    // One connection keeps the private in-memory database alive for the
    // whole test.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to open sqlite memory db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

pub(crate) async fn create_test_user(pool: &SqlitePool, username: &str) -> User {
    User::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{}-{}@example.org", username, Uuid::new_v4().simple()),
            password_hash: "$2b$12$test-hash".to_string(),
            full_name: format!("Test {}", username),
            affiliation: None,
        },
    )
    .await
    .expect("failed to create test user")
}

pub(crate) async fn create_test_conference(pool: &SqlitePool, chair_id: Uuid) -> Conference {
    Conference::create(
        pool,
        chair_id,
        &CreateConference {
            name: format!("Test Conference {}", Uuid::new_v4().simple()),
            venue: Some("Online".into()),
            description: None,
            start_date: None,
            end_date: None,
            submission_deadline: None,
        },
    )
    .await
    .expect("failed to create test conference")
}

pub(crate) async fn create_test_paper(
    pool: &SqlitePool,
    conference_id: Uuid,
    author_id: Uuid,
) -> Paper {
    Paper::create(
        pool,
        conference_id,
        author_id,
        &CreatePaper {
            title: "A Test Paper".into(),
            abstract_text: "We evaluate nothing in particular.".into(),
            file_path: None,
            track_id: None,
        },
    )
    .await
    .expect("failed to create test paper")
}
