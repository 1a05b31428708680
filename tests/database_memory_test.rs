// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Storage tests: in-memory isolation, file persistence and cascading deletes

use anyhow::Result;
use fitness_tracker_api::database::{ActivityFilter, Database};
use fitness_tracker_api::models::{Activity, ActivityKind, Notification, NotificationKind, User};
use std::fs;
use tempfile::TempDir;

fn user(name: &str) -> User {
    User::new(name.to_string(), format!("{name}@example.com"), "password_hash".to_string())
}

#[tokio::test]
async fn test_memory_database_no_physical_files() -> Result<()> {
    let database = Database::new("sqlite::memory:").await?;

    for entry in fs::read_dir(std::env::current_dir()?)? {
        let filename = entry?.file_name();
        let filename = filename.to_string_lossy();
        assert!(
            !filename.starts_with("sqlite::memory:") && !filename.starts_with(":memory:"),
            "Found physical file for in-memory database: {filename}"
        );
    }

    let alice = user("alice");
    let user_id = database.create_user(&alice).await?;
    let retrieved = database.get_user(user_id).await?.unwrap();
    assert_eq!(retrieved.username, "alice");
    assert_eq!(retrieved.email, "alice@example.com");

    Ok(())
}

#[tokio::test]
async fn test_multiple_memory_databases_isolated() -> Result<()> {
    let database1 = Database::new("sqlite::memory:").await?;
    let database2 = Database::new("sqlite::memory:").await?;

    let user1_id = database1.create_user(&user("user1")).await?;
    let user2_id = database2.create_user(&user("user2")).await?;

    assert!(database1.get_user(user1_id).await?.is_some());
    assert!(database2.get_user(user2_id).await?.is_some());
    assert!(database2.get_user(user1_id).await?.is_none());
    assert!(database1.get_user(user2_id).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_file_database_persists_across_reopen() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let database_url = format!("sqlite:{}", temp_dir.path().join("fitness.db").display());

    let alice = user("alice");
    let activity = Activity::new(alice.id, ActivityKind::Swimming, 45, 1.5, 400);
    {
        let database = Database::new(&database_url).await?;
        database.create_user(&alice).await?;
        database.create_activity(&activity).await?;
    }

    let reopened = Database::new(&database_url).await?;
    let stored = reopened.get_activity(activity.id).await?.unwrap();
    assert_eq!(stored.owner_id, alice.id);
    assert_eq!(stored.activity_type, ActivityKind::Swimming);
    assert_eq!(stored.duration_minutes, 45);
    assert_eq!(stored.calories_burned, 400);

    Ok(())
}

#[tokio::test]
async fn test_delete_user_removes_owned_records() -> Result<()> {
    let database = Database::new("sqlite::memory:").await?;
    let alice = user("alice");
    let bob = user("bob");
    database.create_user(&alice).await?;
    database.create_user(&bob).await?;

    database
        .create_activity(&Activity::new(alice.id, ActivityKind::Running, 30, 5.0, 300))
        .await?;
    database
        .create_activity(&Activity::new(bob.id, ActivityKind::Walking, 60, 4.0, 200))
        .await?;
    database
        .create_notification(&Notification::new(
            alice.id,
            "Weekly summary ready".to_string(),
            NotificationKind::General,
        ))
        .await?;

    assert!(database.delete_user(alice.id).await?);

    assert!(database.get_user(alice.id).await?.is_none());
    assert!(database
        .list_activities(alice.id, &ActivityFilter::default())
        .await?
        .is_empty());
    assert!(database.list_notifications(alice.id, None).await?.is_empty());

    // bob keeps his data
    assert_eq!(
        database
            .list_activities(bob.id, &ActivityFilter::default())
            .await?
            .len(),
        1
    );

    Ok(())
}
