#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use agora_engine::{DispatchPool, ExecutorSettings, PoolConfig, SaturationPolicy, VotePolicy};
use agora_store::{StoreAdapter, StoreOptions};
use tempfile::TempDir;

pub struct TestDb {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agora.db");
        let mut store = StoreAdapter::open(&path, &StoreOptions::default()).unwrap();
        agora_store::apply_migrations(store.connection_mut()).unwrap();
        Self { dir, path }
    }

    /// A fresh connection for seeding and assertions
    pub fn store(&self) -> StoreAdapter {
        StoreAdapter::open(&self.path, &StoreOptions::default()).unwrap()
    }

    /// Insert `count` users named user1..userN without hashing passwords
    pub fn seed_users(&self, count: usize) {
        let store = self.store();
        for n in 1..=count {
            store
                .connection()
                .execute(
                    "INSERT INTO users (username, password_hash, created_at) VALUES (?, 'x', 0)",
                    [format!("user{}", n)],
                )
                .unwrap();
        }
    }

    pub fn seed_community(&self, name: &str, founder: i64) {
        let store = self.store();
        store
            .connection()
            .execute(
                "INSERT INTO communities (name, created_at) VALUES (?, 0)",
                [name],
            )
            .unwrap();
        let id = store.connection().last_insert_rowid();
        store
            .connection()
            .execute(
                "INSERT INTO community_members (community_id, user_id, joined_at) VALUES (?, ?, 0)",
                [id, founder],
            )
            .unwrap();
    }

    pub fn seed_post(&self, author: i64, community: i64) -> i64 {
        let store = self.store();
        store
            .connection()
            .execute(
                "INSERT INTO posts (title, content, author_id, community_id, created_at)
                 VALUES ('title', 'body', ?, ?, 0)",
                [author, community],
            )
            .unwrap();
        store.connection().last_insert_rowid()
    }

    pub fn seed_comment(&self, author: i64, post: i64) -> i64 {
        let store = self.store();
        store
            .connection()
            .execute(
                "INSERT INTO comments (content, author_id, post_id, created_at) VALUES ('c', ?, ?, 0)",
                [author, post],
            )
            .unwrap();
        store.connection().last_insert_rowid()
    }

    pub fn pool(&self, workers: usize) -> DispatchPool {
        self.pool_with(
            PoolConfig {
                worker_count: workers,
                ..PoolConfig::default()
            },
            VotePolicy::Ledger,
        )
    }

    pub fn pool_with(&self, config: PoolConfig, vote_policy: VotePolicy) -> DispatchPool {
        let path = self.path.clone();
        DispatchPool::start(&config, ExecutorSettings { vote_policy }, move |_| {
            StoreAdapter::open(&path, &StoreOptions::default())
        })
        .unwrap()
    }

    pub fn rejecting_pool(&self, workers: usize, queue_capacity: usize) -> DispatchPool {
        self.pool_with(
            PoolConfig {
                worker_count: workers,
                queue_capacity,
                saturation: SaturationPolicy::Reject,
            },
            VotePolicy::Ledger,
        )
    }
}

/// Install a trigger that aborts the matching statement
pub fn inject_failure(path: &Path, trigger: &str) {
    let store = StoreAdapter::open(path, &StoreOptions::default()).unwrap();
    store.connection().execute_batch(trigger).unwrap();
}

/// Hold the database write lock until the returned connection is dropped
pub fn hold_write_lock(path: &Path) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.busy_timeout(Duration::from_secs(10)).unwrap();
    conn.execute_batch("BEGIN IMMEDIATE").unwrap();
    conn
}
