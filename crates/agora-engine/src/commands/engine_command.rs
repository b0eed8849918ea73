//! Single entry point from a dispatch worker into the executor.

use agora_core::{Actor, Mutation, MutationOutcome};
use agora_store::errors::Result;
use agora_store::StoreAdapter;

use crate::commands::{community, content, membership, message, reset, users, vote};
use crate::config::{EngineConfig, VotePolicy};

/// Executor knobs fixed for the lifetime of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub vote_policy: VotePolicy,
}

impl From<&EngineConfig> for ExecutorSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            vote_policy: config.vote_policy,
        }
    }
}

/// Apply one mutation as `actor` against the worker's store
///
/// Anonymous actors are accepted only for registration and reset.
///
/// # Errors
/// `Unauthorised` for an anonymous actor on a user operation, otherwise the
/// failure modes of the individual operation.
pub fn apply_mutation(
    store: &mut StoreAdapter,
    actor: Actor,
    mutation: Mutation,
    settings: &ExecutorSettings,
) -> Result<MutationOutcome> {
    let op = mutation.kind().as_str();
    let user = || actor.require_user(op);

    match mutation {
        Mutation::CreatePost(post) => content::create_post(store, user()?, &post),
        Mutation::CreateComment(comment) => content::create_comment(store, user()?, &comment),
        Mutation::SendMessage(msg) => message::send_message(store, user()?, &msg),
        Mutation::CreateCommunity(new) => community::create_community(store, user()?, &new),
        Mutation::JoinCommunity { community_id } => {
            membership::join_community(store, user()?, community_id)
        }
        Mutation::LeaveCommunity { community_id } => {
            membership::leave_community(store, user()?, community_id)
        }
        Mutation::CastVote(cast) => vote::cast_vote(store, user()?, &cast, settings.vote_policy),
        Mutation::RegisterUser(registration) => users::register_user(store, &registration),
        Mutation::SubscribeUser { user_id } => message::subscribe_user(store, user()?, user_id),
        Mutation::UnsubscribeUser { user_id } => {
            message::unsubscribe_user(store, user()?, user_id)
        }
        Mutation::ResetAll => reset::reset_all(store),
    }
}
