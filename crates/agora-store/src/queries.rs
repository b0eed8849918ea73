//! Read helpers used by tooling and tests
//!
//! Feeds, leaderboards and other read endpoints live outside this crate.
//! These are the handful of point reads needed to check write invariants.

use crate::adapter::StoreAdapter;
use crate::errors::Result;
use agora_core::model::{CommunityId, UserId};
use rusqlite::params;

/// Current karma of a user, `None` if the user does not exist
pub fn user_karma(store: &StoreAdapter, user: UserId) -> Result<Option<i64>> {
    store.query_one(
        "SELECT karma FROM users WHERE id = ?",
        [user.get()],
        |r| r.get(0),
    )
}

/// Sum of every vote value cast on content the user authored
///
/// Equal to `user_karma` whenever the karma invariant holds.
pub fn ledger_karma(store: &StoreAdapter, user: UserId) -> Result<i64> {
    let sum: Option<i64> = store.query_one(
        "SELECT COALESCE(SUM(v.vote_value), 0)
         FROM votes v
         LEFT JOIN posts p ON v.target_type = 'post' AND p.id = v.target_id
         LEFT JOIN comments c ON v.target_type = 'comment' AND c.id = v.target_id
         WHERE COALESCE(p.author_id, c.author_id) = ?",
        [user.get()],
        |r| r.get(0),
    )?;
    Ok(sum.unwrap_or(0))
}

/// Users whose stored karma disagrees with the vote ledger
///
/// Each entry is `(user, stored karma, ledger sum)`. Empty when the karma
/// invariant holds for every user.
pub fn karma_drift(store: &StoreAdapter) -> Result<Vec<(UserId, i64, i64)>> {
    store.query_many(
        "SELECT id, karma, ledger FROM (
            SELECT u.id AS id, u.karma AS karma, (
                SELECT COALESCE(SUM(v.vote_value), 0) FROM votes v
                WHERE (v.target_type = 'post'
                       AND v.target_id IN (SELECT id FROM posts WHERE author_id = u.id))
                   OR (v.target_type = 'comment'
                       AND v.target_id IN (SELECT id FROM comments WHERE author_id = u.id))
            ) AS ledger
            FROM users u
         )
         WHERE karma != ledger
         ORDER BY id",
        [],
        |r| Ok((UserId::new(r.get(0)?), r.get(1)?, r.get(2)?)),
    )
}

pub fn is_member(store: &StoreAdapter, community: CommunityId, user: UserId) -> Result<bool> {
    let found: Option<i64> = store.query_one(
        "SELECT 1 FROM community_members WHERE community_id = ? AND user_id = ?",
        params![community.get(), user.get()],
        |r| r.get(0),
    )?;
    Ok(found.is_some())
}

/// Member user ids of a community, ascending
pub fn community_members(store: &StoreAdapter, community: CommunityId) -> Result<Vec<UserId>> {
    store.query_many(
        "SELECT user_id FROM community_members WHERE community_id = ? ORDER BY user_id",
        [community.get()],
        |r| Ok(UserId::new(r.get(0)?)),
    )
}

pub fn is_subscribed(store: &StoreAdapter, subscriber: UserId, target: UserId) -> Result<bool> {
    let found: Option<i64> = store.query_one(
        "SELECT 1 FROM user_subscriptions WHERE subscriber_id = ? AND subscribed_user_id = ?",
        params![subscriber.get(), target.get()],
        |r| r.get(0),
    )?;
    Ok(found.is_some())
}

/// Row count of one of the known mutable tables
pub fn row_count(store: &StoreAdapter, table: &str) -> Result<i64> {
    debug_assert!(crate::tables::MUTABLE_TABLES.contains(&table));
    let count: Option<i64> =
        store.query_one(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(count.unwrap_or(0))
}

/// Row counts for every mutable table, in `MUTABLE_TABLES` order
pub fn table_counts(store: &StoreAdapter) -> Result<Vec<(&'static str, i64)>> {
    crate::tables::MUTABLE_TABLES
        .iter()
        .map(|table| Ok((*table, row_count(store, table)?)))
        .collect()
}
