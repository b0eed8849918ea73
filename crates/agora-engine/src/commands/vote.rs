//! Vote casting and karma adjustment
//!
//! The vote row and the author's karma change commit together. Because the
//! unit runs in an IMMEDIATE transaction, two workers voting on the same
//! author serialize on the database write lock and neither update is lost.

use agora_core::commands::NewVote;
use agora_core::errors::{ExError, ExErrorKind};
use agora_core::model::{UserId, VoteId, VoteTarget};
use agora_core::MutationOutcome;
use agora_store::errors::{from_rusqlite_in, Result};
use agora_store::StoreAdapter;
use rusqlite::{params, OptionalExtension, Transaction};
use tracing::debug;

use crate::config::VotePolicy;

const OP: &str = "cast_vote";

/// Record a vote and move the target author's karma by the applied delta
///
/// Under `VotePolicy::Ledger` every cast appends a row and applies its full
/// value. Under `VotePolicy::SingleVote` a repeat cast overwrites the
/// voter's previous row and applies only the difference.
///
/// # Errors
/// `NotFound` if the target or the voter does not exist.
pub fn cast_vote(
    store: &mut StoreAdapter,
    voter: UserId,
    vote: &NewVote,
    policy: VotePolicy,
) -> Result<MutationOutcome> {
    store.atomic(OP, |tx| {
        let author = target_author(tx, vote.target)?;

        let (vote_id, karma_delta) = match policy {
            VotePolicy::Ledger => (append_vote(tx, voter, vote)?, vote.value.delta()),
            VotePolicy::SingleVote => upsert_vote(tx, voter, vote)?,
        };

        if karma_delta != 0 {
            tx.execute(
                "UPDATE users SET karma = karma + ? WHERE id = ?",
                params![karma_delta, author.get()],
            )
            .map_err(|e| from_rusqlite_in(OP, e))?;
        }

        debug!(vote_target = %vote.target, %author, karma_delta, "vote applied");
        Ok(MutationOutcome::VoteRecorded {
            vote_id,
            target: vote.target,
            value: vote.value,
            author_id: author,
            karma_delta,
        })
    })
}

fn target_author(tx: &Transaction<'_>, target: VoteTarget) -> Result<UserId> {
    let sql = format!("SELECT author_id FROM {} WHERE id = ?", target.kind.table());
    let author: Option<i64> = tx
        .query_row(&sql, [target.id], |r| r.get(0))
        .optional()
        .map_err(|e| from_rusqlite_in(OP, e))?;

    author.map(UserId::new).ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op(OP)
            .with_entity_id(target.to_string())
            .with_message("vote target does not exist")
    })
}

fn append_vote(tx: &Transaction<'_>, voter: UserId, vote: &NewVote) -> Result<VoteId> {
    tx.execute(
        "INSERT INTO votes (user_id, target_id, target_type, vote_value, created_at)
         VALUES (?, ?, ?, ?, ?)",
        params![
            voter.get(),
            vote.target.id,
            vote.target.kind.as_str(),
            vote.value.delta(),
            super::now()
        ],
    )
    .map_err(|e| from_rusqlite_in(OP, e))?;
    Ok(VoteId::new(tx.last_insert_rowid()))
}

/// Returns the row id and `new - previous`, zero when the value is unchanged
fn upsert_vote(tx: &Transaction<'_>, voter: UserId, vote: &NewVote) -> Result<(VoteId, i64)> {
    let previous: Option<(i64, i64)> = tx
        .query_row(
            "SELECT id, vote_value FROM votes
             WHERE user_id = ? AND target_id = ? AND target_type = ?
             ORDER BY id DESC LIMIT 1",
            params![voter.get(), vote.target.id, vote.target.kind.as_str()],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(|e| from_rusqlite_in(OP, e))?;

    match previous {
        None => Ok((append_vote(tx, voter, vote)?, vote.value.delta())),
        Some((id, old_value)) => {
            tx.execute(
                "UPDATE votes SET vote_value = ?, created_at = ? WHERE id = ?",
                params![vote.value.delta(), super::now(), id],
            )
            .map_err(|e| from_rusqlite_in(OP, e))?;
            Ok((VoteId::new(id), vote.value.delta() - old_value))
        }
    }
}
