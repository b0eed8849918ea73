//! Dispatch pool behaviour under concurrency

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use agora_core::commands::{NewCommunity, NewPost, NewVote};
use agora_core::logging_facility::test_capture::init_test_capture;
use agora_core::model::{CommunityId, PostId, TargetKind, UserId, VoteTarget, VoteValue};
use agora_core::{Actor, ExErrorKind, Mutation, MutationOutcome};
use agora_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use agora_engine::{PoolConfig, SaturationPolicy, VotePolicy};
use agora_store::queries;
use common::{hold_write_lock, TestDb};

fn user(id: i64) -> Actor {
    Actor::User(UserId::new(id))
}

fn upvote_post(post: i64) -> Mutation {
    Mutation::CastVote(NewVote {
        target: VoteTarget {
            id: post,
            kind: TargetKind::Post,
        },
        value: VoteValue::Up,
    })
}

fn new_post(title: &str) -> Mutation {
    Mutation::CreatePost(NewPost {
        title: title.to_string(),
        content: "body".to_string(),
        community_id: CommunityId::new(1),
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_example_scenario_membership_and_karma() {
    let db = TestDb::new();
    db.seed_users(3);
    let pool = Arc::new(db.pool(2));

    let created = pool
        .submit(
            user(1),
            Mutation::CreateCommunity(NewCommunity {
                name: "go".to_string(),
                description: "gophers".to_string(),
            }),
        )
        .await
        .unwrap();
    assert!(matches!(
        created.outcome,
        MutationOutcome::CommunityCreated { community_id, .. } if community_id == CommunityId::new(1)
    ));
    for _ in 0..7 {
        db.seed_post(1, 1);
    }

    let voters = [2, 3].map(|voter| {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.submit(user(voter), upvote_post(7)).await })
    });
    for handle in voters {
        handle.await.unwrap().unwrap();
    }

    let store = db.store();
    assert_eq!(
        queries::community_members(&store, CommunityId::new(1)).unwrap(),
        vec![UserId::new(1)]
    );
    assert_eq!(queries::user_karma(&store, UserId::new(1)).unwrap(), Some(2));
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_karma_invariant_under_concurrent_votes() {
    let db = TestDb::new();
    db.seed_users(21);
    db.seed_community("go", 1);
    let post = db.seed_post(1, 1);
    let comment = db.seed_comment(1, post);
    let pool = Arc::new(db.pool(4));

    let tasks: Vec<_> = (0..200i64)
        .map(|i| {
            let pool = Arc::clone(&pool);
            let target = if i % 2 == 0 {
                VoteTarget { id: post, kind: TargetKind::Post }
            } else {
                VoteTarget { id: comment, kind: TargetKind::Comment }
            };
            let value = if i % 3 == 0 { VoteValue::Down } else { VoteValue::Up };
            tokio::spawn(async move {
                pool.submit(user(2 + i % 20), Mutation::CastVote(NewVote { target, value }))
                    .await
            })
        })
        .collect();

    let mut applied = 0;
    for task in tasks {
        let receipt = task.await.unwrap().unwrap();
        match receipt.outcome {
            MutationOutcome::VoteRecorded { karma_delta, .. } => applied += karma_delta,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    let store = db.store();
    assert_eq!(queries::user_karma(&store, UserId::new(1)).unwrap(), Some(applied));
    assert_eq!(queries::row_count(&store, "votes").unwrap(), 200);
    assert!(queries::karma_drift(&store).unwrap().is_empty());
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_round_robin_assignment_is_cyclic() {
    let db = TestDb::new();
    db.seed_users(1);
    db.seed_community("go", 1);
    let pool = db.pool(3);

    let mut pending = Vec::new();
    for n in 0..9 {
        pending.push(pool.dispatch(user(1), new_post(&format!("p{}", n))).await.unwrap());
    }

    let assigned: Vec<usize> = pending.iter().map(|p| p.worker_id()).collect();
    assert_eq!(assigned, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);

    for p in pending {
        let expected = p.worker_id();
        let receipt = p.wait().await.unwrap();
        assert_eq!(receipt.worker_id, expected);
    }
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_same_worker_runs_in_submission_order() {
    let db = TestDb::new();
    db.seed_users(1);
    db.seed_community("go", 1);
    let pool = db.pool(1);

    let mut pending = Vec::new();
    for n in 0..5 {
        pending.push(pool.dispatch(user(1), new_post(&format!("p{}", n))).await.unwrap());
    }

    let mut ids = Vec::new();
    for p in pending {
        match p.wait().await.unwrap().outcome {
            MutationOutcome::PostCreated { post_id, .. } => ids.push(post_id),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(ids, (1..=5).map(PostId::new).collect::<Vec<_>>());
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_exactly_one_completion_under_errors_and_load() {
    let capture = init_test_capture();
    let db = TestDb::new();
    db.seed_users(2);
    db.seed_community("go", 1);
    let post = db.seed_post(1, 1);
    let pool = Arc::new(db.pool(4));

    let tasks: Vec<_> = (0..120i64)
        .map(|i| {
            let pool = Arc::clone(&pool);
            // Every third vote targets a post that does not exist
            let target = if i % 3 == 0 { 9_999 } else { post };
            tokio::spawn(async move {
                let pending = pool.dispatch(user(2), upvote_post(target)).await.unwrap();
                let request_id = pending.request_id().clone();
                (request_id, pending.wait().await)
            })
        })
        .collect();

    let mut ok = 0;
    let mut failed = 0;
    let mut request_ids = HashSet::new();
    for task in tasks {
        let (request_id, result) = task.await.unwrap();
        match result {
            Ok(receipt) => {
                assert_eq!(receipt.request_id, request_id);
                ok += 1;
            }
            Err(err) => {
                assert_eq!(err.kind(), ExErrorKind::NotFound);
                assert_eq!(err.request_id(), Some(&request_id));
                failed += 1;
            }
        }
        assert!(request_ids.insert(request_id));
    }
    assert_eq!((ok, failed), (80, 40));
    pool.shutdown();

    for request_id in &request_ids {
        let events = capture.events_for_request(request_id.as_str());
        let count = |kind: &str| events.iter().filter(|e| e.event.as_deref() == Some(kind)).count();
        assert_eq!(count(EVENT_START), 1);
        assert_eq!(count(EVENT_END) + count(EVENT_END_ERROR), 1);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_keeps_serving_after_failures() {
    let db = TestDb::new();
    db.seed_users(1);
    db.seed_community("go", 1);
    let pool = db.pool(1);

    for _ in 0..3 {
        let err = pool.submit(user(1), upvote_post(404)).await.unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }
    let receipt = pool.submit(user(1), new_post("still alive")).await.unwrap();
    assert_eq!(receipt.worker_id, 0);
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_validation_errors_never_reach_a_worker() {
    let db = TestDb::new();
    db.seed_users(1);
    db.seed_community("go", 1);
    let pool = db.pool(2);

    let err = pool.dispatch(Actor::Anonymous, new_post("t")).await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Unauthorised);

    let err = pool.dispatch(user(1), new_post("   ")).await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);

    let err = pool
        .dispatch(user(1), Mutation::SubscribeUser { user_id: UserId::new(1) })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);

    // Rejected submissions did not advance the round-robin counter
    let first = pool.dispatch(user(1), new_post("ok")).await.unwrap();
    assert_eq!(first.worker_id(), 0);
    first.wait().await.unwrap();
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reject_policy_fails_fast_when_queue_full() {
    let db = TestDb::new();
    db.seed_users(1);
    db.seed_community("go", 1);
    let pool = db.rejecting_pool(1, 1);

    // The worker blocks on the write lock, so at most two envelopes fit:
    // one executing and one queued
    let lock = hold_write_lock(&db.path);
    let mut accepted = Vec::new();
    let mut saturated = 0;
    for n in 0..3 {
        match pool.dispatch(user(1), new_post(&format!("p{}", n))).await {
            Ok(pending) => accepted.push(pending),
            Err(err) => {
                assert_eq!(err.kind(), ExErrorKind::PoolSaturated);
                saturated += 1;
            }
        }
    }
    assert!(saturated >= 1);
    drop(lock);

    for pending in accepted {
        pending.wait().await.unwrap();
    }
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_block_policy_waits_for_queue_space() {
    let db = TestDb::new();
    db.seed_users(1);
    db.seed_community("go", 1);
    let pool = db.pool_with(
        PoolConfig {
            worker_count: 1,
            queue_capacity: 1,
            saturation: SaturationPolicy::Block,
        },
        VotePolicy::Ledger,
    );

    // One envelope stalls in the worker on the write lock, one fills the queue
    let lock = hold_write_lock(&db.path);
    let first = pool.dispatch(user(1), new_post("p0")).await.unwrap();
    let second = pool.dispatch(user(1), new_post("p1")).await.unwrap();

    let third = tokio::time::timeout(
        Duration::from_millis(200),
        pool.dispatch(user(1), new_post("p2")),
    )
    .await;
    assert!(third.is_err(), "dispatch should wait while the queue is full");
    drop(lock);

    first.wait().await.unwrap();
    second.wait().await.unwrap();
    pool.submit(user(1), new_post("p3")).await.unwrap();

    assert_eq!(queries::row_count(&db.store(), "posts").unwrap(), 3);
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_drains_queue_then_closes() {
    let db = TestDb::new();
    db.seed_users(1);
    db.seed_community("go", 1);
    let pool = db.pool(2);

    let mut pending = Vec::new();
    for n in 0..6 {
        pending.push(pool.dispatch(user(1), new_post(&format!("p{}", n))).await.unwrap());
    }
    pool.shutdown();
    assert!(pool.is_closed());

    for p in pending {
        p.wait().await.unwrap();
    }
    assert_eq!(queries::row_count(&db.store(), "posts").unwrap(), 6);

    let err = pool.submit(user(1), new_post("late")).await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::PoolClosed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dropped_pending_completion_still_executes() {
    let db = TestDb::new();
    db.seed_users(1);
    db.seed_community("go", 1);
    let pool = db.pool(1);

    let pending = pool.dispatch(user(1), new_post("orphan")).await.unwrap();
    drop(pending);
    pool.shutdown();

    assert_eq!(queries::row_count(&db.store(), "posts").unwrap(), 1);
}
