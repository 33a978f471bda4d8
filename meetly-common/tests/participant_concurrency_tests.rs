//! Concurrent join/leave/checkpoint on a multi-connection file database
//!
//! Leaves and checkpoints race on the same rows; every stretch must be
//! counted exactly once whatever order the writes land in.

use chrono::{DateTime, Duration, Utc};
use meetly_common::db::init::init_database;
use meetly_common::db::meetings::create_meeting;
use meetly_common::db::participants::{checkpoint_active, find_participant, join, leave};
use meetly_common::db::users::create_user;
use meetly_common::time::now;
use tempfile::TempDir;

const GUESTS: usize = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_leave_and_checkpoint_count_each_stretch_once() {
    let temp = TempDir::new().unwrap();
    let pool = init_database(&temp.path().join("meetly.db")).await.unwrap();
    let t0 = DateTime::<Utc>::from_timestamp(now().timestamp(), 0).unwrap();
    let presence_timeout = std::time::Duration::from_secs(3600);

    let host = create_user(&pool, "host", "host@example.com", "password", t0)
        .await
        .unwrap();
    let meeting = create_meeting(&pool, &host.id, "Load", None, None, t0)
        .await
        .unwrap();

    let mut guest_ids = Vec::new();
    for i in 0..GUESTS {
        let guest = create_user(
            &pool,
            &format!("guest{}", i),
            &format!("guest{}@example.com", i),
            "password",
            t0,
        )
        .await
        .unwrap();
        join(&pool, &meeting, &guest.id, t0).await.unwrap();
        guest_ids.push(guest.id);
    }

    let mut tasks = Vec::new();
    for offset in [50, 70, 50, 70] {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            checkpoint_active(&pool, t0 + Duration::seconds(offset), presence_timeout)
                .await
                .map(|_| ())
        }));
    }
    for guest_id in &guest_ids {
        let pool = pool.clone();
        let meeting = meeting.clone();
        let guest_id = guest_id.clone();
        tasks.push(tokio::spawn(async move {
            leave(&pool, &meeting, &guest_id, t0 + Duration::seconds(100))
                .await
                .map(|_| ())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for guest_id in &guest_ids {
        let p = find_participant(&pool, &meeting.id, guest_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!p.is_active);
        assert_eq!(p.duration_in_secs, 100, "guest {}", guest_id);
    }
}
