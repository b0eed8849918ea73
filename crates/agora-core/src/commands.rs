//! Mutation inventory
//!
//! `Mutation` is the closed set of write operations the dispatch pool
//! accepts. Untyped callers go through `Mutation::decode` exactly once at the
//! boundary; everything past that point matches on variants.

use agora_core_types::Sensitive;
use serde::{Deserialize, Serialize};

use crate::errors::{AgoraError, Result};
use crate::model::{
    CommentId, CommunityId, MessageId, PostId, TargetKind, UserId, VoteId, VoteTarget, VoteValue,
};

/// Operation kinds as they appear on the wire and in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreatePost,
    CreateComment,
    SendMessage,
    CreateCommunity,
    JoinCommunity,
    LeaveCommunity,
    CastVote,
    RegisterUser,
    SubscribeUser,
    UnsubscribeUser,
    ResetAll,
}

impl OperationKind {
    pub const ALL: [OperationKind; 11] = [
        OperationKind::CreatePost,
        OperationKind::CreateComment,
        OperationKind::SendMessage,
        OperationKind::CreateCommunity,
        OperationKind::JoinCommunity,
        OperationKind::LeaveCommunity,
        OperationKind::CastVote,
        OperationKind::RegisterUser,
        OperationKind::SubscribeUser,
        OperationKind::UnsubscribeUser,
        OperationKind::ResetAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreatePost => "create_post",
            OperationKind::CreateComment => "create_comment",
            OperationKind::SendMessage => "send_message",
            OperationKind::CreateCommunity => "create_community",
            OperationKind::JoinCommunity => "join_community",
            OperationKind::LeaveCommunity => "leave_community",
            OperationKind::CastVote => "cast_vote",
            OperationKind::RegisterUser => "register_user",
            OperationKind::SubscribeUser => "subscribe_user",
            OperationKind::UnsubscribeUser => "unsubscribe_user",
            OperationKind::ResetAll => "reset_all",
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = AgoraError;

    fn from_str(s: &str) -> Result<Self> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AgoraError::UnknownOperation {
                kind: s.to_string(),
            })
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub community_id: CommunityId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewComment {
    pub content: String,
    pub post_id: PostId,
    /// Reply target; `None` for a top-level comment
    #[serde(default)]
    pub parent_comment_id: Option<CommentId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewMessage {
    pub to_user_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCommunity {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewVote {
    pub target: VoteTarget,
    pub value: VoteValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: Sensitive<String>,
}

/// Wire shape of a vote before target kind and value are checked
#[derive(Debug, Deserialize)]
struct VoteWire {
    target_id: i64,
    target_type: String,
    value: i64,
}

#[derive(Debug, Deserialize)]
struct CommunityRef {
    community_id: CommunityId,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    user_id: UserId,
}

/// One write operation with its payload
#[derive(Debug, Clone)]
pub enum Mutation {
    CreatePost(NewPost),
    CreateComment(NewComment),
    SendMessage(NewMessage),
    CreateCommunity(NewCommunity),
    JoinCommunity { community_id: CommunityId },
    LeaveCommunity { community_id: CommunityId },
    CastVote(NewVote),
    RegisterUser(Registration),
    SubscribeUser { user_id: UserId },
    UnsubscribeUser { user_id: UserId },
    /// Clear every mutable table and restart id sequences
    ResetAll,
}

impl Mutation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Mutation::CreatePost(_) => OperationKind::CreatePost,
            Mutation::CreateComment(_) => OperationKind::CreateComment,
            Mutation::SendMessage(_) => OperationKind::SendMessage,
            Mutation::CreateCommunity(_) => OperationKind::CreateCommunity,
            Mutation::JoinCommunity { .. } => OperationKind::JoinCommunity,
            Mutation::LeaveCommunity { .. } => OperationKind::LeaveCommunity,
            Mutation::CastVote(_) => OperationKind::CastVote,
            Mutation::RegisterUser(_) => OperationKind::RegisterUser,
            Mutation::SubscribeUser { .. } => OperationKind::SubscribeUser,
            Mutation::UnsubscribeUser { .. } => OperationKind::UnsubscribeUser,
            Mutation::ResetAll => OperationKind::ResetAll,
        }
    }

    /// Decode an untyped `(kind, payload)` pair into a typed mutation
    ///
    /// # Errors
    ///
    /// `UnknownOperation` for an unrecognised kind, `MalformedPayload` when the
    /// JSON does not match the kind's shape, and the specific vote errors for
    /// a bad target kind or value.
    pub fn decode(kind: &str, payload: serde_json::Value) -> Result<Mutation> {
        let kind: OperationKind = kind.parse()?;
        let mutation = match kind {
            OperationKind::CreatePost => Mutation::CreatePost(from_payload(kind, payload)?),
            OperationKind::CreateComment => Mutation::CreateComment(from_payload(kind, payload)?),
            OperationKind::SendMessage => Mutation::SendMessage(from_payload(kind, payload)?),
            OperationKind::CreateCommunity => {
                Mutation::CreateCommunity(from_payload(kind, payload)?)
            }
            OperationKind::JoinCommunity => {
                let CommunityRef { community_id } = from_payload(kind, payload)?;
                Mutation::JoinCommunity { community_id }
            }
            OperationKind::LeaveCommunity => {
                let CommunityRef { community_id } = from_payload(kind, payload)?;
                Mutation::LeaveCommunity { community_id }
            }
            OperationKind::CastVote => {
                let wire: VoteWire = from_payload(kind, payload)?;
                Mutation::CastVote(NewVote {
                    target: VoteTarget {
                        id: wire.target_id,
                        kind: wire.target_type.parse()?,
                    },
                    value: VoteValue::try_from(wire.value)?,
                })
            }
            OperationKind::RegisterUser => Mutation::RegisterUser(from_payload(kind, payload)?),
            OperationKind::SubscribeUser => {
                let UserRef { user_id } = from_payload(kind, payload)?;
                Mutation::SubscribeUser { user_id }
            }
            OperationKind::UnsubscribeUser => {
                let UserRef { user_id } = from_payload(kind, payload)?;
                Mutation::UnsubscribeUser { user_id }
            }
            OperationKind::ResetAll => Mutation::ResetAll,
        };
        Ok(mutation)
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(
    kind: OperationKind,
    payload: serde_json::Value,
) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| AgoraError::MalformedPayload {
        kind: kind.as_str().to_string(),
        message: e.to_string(),
    })
}

/// Success payload of a mutation: created id plus echoed key fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    PostCreated {
        post_id: PostId,
        title: String,
    },
    CommentCreated {
        comment_id: CommentId,
        post_id: PostId,
        content: String,
    },
    MessageSent {
        message_id: MessageId,
        to_user_id: UserId,
        content: String,
    },
    CommunityCreated {
        community_id: CommunityId,
        name: String,
    },
    /// `changed` is false when the membership already existed
    Joined {
        community_id: CommunityId,
        user_id: UserId,
        changed: bool,
    },
    /// `changed` is false when there was no membership to remove
    Left {
        community_id: CommunityId,
        user_id: UserId,
        changed: bool,
    },
    VoteRecorded {
        vote_id: VoteId,
        target: VoteTarget,
        value: VoteValue,
        author_id: UserId,
        /// Karma change applied to the author by this cast
        karma_delta: i64,
    },
    UserRegistered {
        user_id: UserId,
        username: String,
    },
    Subscribed {
        user_id: UserId,
        changed: bool,
    },
    Unsubscribed {
        user_id: UserId,
        changed: bool,
    },
    ResetComplete {
        tables_cleared: usize,
    },
}
