//! Input checks run before a mutation is handed to a worker

use crate::commands::{Mutation, NewComment, NewCommunity, NewMessage, NewPost, Registration};
use crate::errors::{AgoraError, Result};
use crate::model::Actor;

pub const MAX_TITLE_LEN: usize = 300;
pub const MAX_BODY_LEN: usize = 40_000;
pub const MAX_COMMUNITY_NAME_LEN: usize = 64;
pub const MAX_USERNAME_LEN: usize = 32;

/// Validate a mutation for the given actor
///
/// Rejects anything that can be ruled out without touching the store:
/// missing actor, empty or oversized text, non-positive ids and
/// self-subscription.
///
/// # Errors
/// Returns the first violated rule.
pub fn validate_mutation(actor: &Actor, mutation: &Mutation) -> Result<()> {
    match mutation {
        Mutation::RegisterUser(reg) => return validate_registration(reg),
        Mutation::ResetAll => return Ok(()),
        _ => {}
    }

    let user = actor.require_user(mutation.kind().as_str())?;
    positive_id("actor", user.get())?;

    match mutation {
        Mutation::CreatePost(post) => validate_post(post),
        Mutation::CreateComment(comment) => validate_comment(comment),
        Mutation::SendMessage(message) => validate_message(message),
        Mutation::CreateCommunity(community) => validate_community(community),
        Mutation::JoinCommunity { community_id } | Mutation::LeaveCommunity { community_id } => {
            positive_id("community_id", community_id.get())
        }
        Mutation::CastVote(vote) => positive_id("target_id", vote.target.id),
        Mutation::SubscribeUser { user_id } => {
            positive_id("user_id", user_id.get())?;
            if *user_id == user {
                return Err(AgoraError::SelfSubscription {
                    user_id: user.get(),
                });
            }
            Ok(())
        }
        Mutation::UnsubscribeUser { user_id } => positive_id("user_id", user_id.get()),
        // Checked before the actor lookup
        Mutation::RegisterUser(_) | Mutation::ResetAll => Ok(()),
    }
}

fn validate_post(post: &NewPost) -> Result<()> {
    text("title", &post.title, MAX_TITLE_LEN)?;
    text("content", &post.content, MAX_BODY_LEN)?;
    positive_id("community_id", post.community_id.get())
}

fn validate_comment(comment: &NewComment) -> Result<()> {
    text("content", &comment.content, MAX_BODY_LEN)?;
    positive_id("post_id", comment.post_id.get())?;
    if let Some(parent) = comment.parent_comment_id {
        positive_id("parent_comment_id", parent.get())?;
    }
    Ok(())
}

fn validate_message(message: &NewMessage) -> Result<()> {
    positive_id("to_user_id", message.to_user_id.get())?;
    text("content", &message.content, MAX_BODY_LEN)
}

fn validate_community(community: &NewCommunity) -> Result<()> {
    text("name", &community.name, MAX_COMMUNITY_NAME_LEN)?;
    if community.description.chars().count() > MAX_BODY_LEN {
        return Err(AgoraError::FieldTooLong {
            field: "description",
            max: MAX_BODY_LEN,
        });
    }
    Ok(())
}

fn validate_registration(reg: &Registration) -> Result<()> {
    text("username", &reg.username, MAX_USERNAME_LEN)?;
    if reg.password.expose().is_empty() {
        return Err(AgoraError::EmptyField { field: "password" });
    }
    Ok(())
}

fn text(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AgoraError::EmptyField { field });
    }
    if value.chars().count() > max {
        return Err(AgoraError::FieldTooLong { field, max });
    }
    Ok(())
}

fn positive_id(field: &'static str, value: i64) -> Result<()> {
    if value <= 0 {
        return Err(AgoraError::NonPositiveId { field, value });
    }
    Ok(())
}
