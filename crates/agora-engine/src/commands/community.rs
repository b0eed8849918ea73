//! Community creation

use agora_core::commands::NewCommunity;
use agora_core::model::{CommunityId, UserId};
use agora_core::MutationOutcome;
use agora_store::errors::{from_rusqlite_in, Result};
use agora_store::StoreAdapter;
use rusqlite::params;
use tracing::debug;

const OP: &str = "create_community";

/// Create a community with its creator as the founding member
///
/// Both rows are written in one transaction.
///
/// # Errors
/// - `AlreadyExists`: the name is taken
/// - `NotFound`: the creator is not a registered user
pub fn create_community(
    store: &mut StoreAdapter,
    creator: UserId,
    community: &NewCommunity,
) -> Result<MutationOutcome> {
    store.atomic(OP, |tx| {
        let created_at = super::now();
        tx.execute(
            "INSERT INTO communities (name, description, created_at) VALUES (?, ?, ?)",
            params![community.name, community.description, created_at],
        )
        .map_err(|e| from_rusqlite_in(OP, e))?;
        let community_id = CommunityId::new(tx.last_insert_rowid());

        tx.execute(
            "INSERT INTO community_members (community_id, user_id, joined_at) VALUES (?, ?, ?)",
            params![community_id.get(), creator.get(), created_at],
        )
        .map_err(|e| from_rusqlite_in(OP, e))?;

        debug!(%community_id, founder = %creator, "seeded founding membership");
        Ok(MutationOutcome::CommunityCreated {
            community_id,
            name: community.name.clone(),
        })
    })
}
