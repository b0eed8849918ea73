//! Joining and leaving communities
//!
//! Both are idempotent: joining twice or leaving when not a member succeeds
//! with `changed: false`.

use agora_core::model::{CommunityId, UserId};
use agora_core::MutationOutcome;
use agora_store::errors::Result;
use agora_store::{Statement, StoreAdapter};

/// # Errors
/// `NotFound` if the community or the user does not exist.
pub fn join_community(
    store: &StoreAdapter,
    user: UserId,
    community_id: CommunityId,
) -> Result<MutationOutcome> {
    // OR IGNORE covers the primary key only; foreign keys still fail
    let step = store.execute(
        "join_community",
        &Statement::new(
            "INSERT OR IGNORE INTO community_members (community_id, user_id, joined_at)
             VALUES (?, ?, ?)",
        )
        .bind(community_id.get())
        .bind(user.get())
        .bind(super::now()),
    )?;

    Ok(MutationOutcome::Joined {
        community_id,
        user_id: user,
        changed: step.rows_changed > 0,
    })
}

pub fn leave_community(
    store: &StoreAdapter,
    user: UserId,
    community_id: CommunityId,
) -> Result<MutationOutcome> {
    let step = store.execute(
        "leave_community",
        &Statement::new("DELETE FROM community_members WHERE community_id = ? AND user_id = ?")
            .bind(community_id.get())
            .bind(user.get()),
    )?;

    Ok(MutationOutcome::Left {
        community_id,
        user_id: user,
        changed: step.rows_changed > 0,
    })
}
