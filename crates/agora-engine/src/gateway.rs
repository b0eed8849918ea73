//! Caller-facing gateway
//!
//! Request routing and authentication live upstream; what arrives here is
//! a resolved actor plus either a typed mutation or an untyped
//! `(kind, json)` pair. The gateway decodes once, hands the mutation to the
//! pool and returns the single result.

use agora_core::commands::{
    NewComment, NewCommunity, NewMessage, NewPost, NewVote, Registration,
};
use agora_core::errors::ExError;
use agora_core::model::{CommentId, CommunityId, PostId, UserId, VoteTarget, VoteValue};
use agora_core::{Actor, Mutation};
use agora_core_types::Sensitive;
use agora_store::StoreAdapter;
use tracing::info;

use crate::commands::engine_command::ExecutorSettings;
use crate::config::EngineConfig;
use crate::dispatch::{DispatchPool, Receipt};

type Result<T> = std::result::Result<T, ExError>;

pub struct Gateway {
    pool: DispatchPool,
}

impl Gateway {
    pub fn new(pool: DispatchPool) -> Self {
        Self { pool }
    }

    /// Migrate the database once, then start a pool with one connection per
    /// worker
    ///
    /// # Errors
    /// Invalid configuration, an unreachable database or a failed migration.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let options = config.store_options();

        let mut bootstrap = StoreAdapter::open(&config.db_path, &options)?;
        agora_store::apply_migrations(bootstrap.connection_mut())?;
        drop(bootstrap);

        let pool = DispatchPool::start(&config.pool, ExecutorSettings::from(config), |_| {
            StoreAdapter::open(&config.db_path, &options)
        })?;
        info!(db_path = %config.db_path.display(), vote_policy = ?config.vote_policy, "gateway ready");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DispatchPool {
        &self.pool
    }

    /// # Errors
    /// See `DispatchPool::submit`.
    pub async fn submit(&self, actor: Actor, mutation: Mutation) -> Result<Receipt> {
        self.pool.submit(actor, mutation).await
    }

    /// Decode an untyped operation and submit it
    ///
    /// # Errors
    /// `UnknownOperation` or a validation kind if decoding fails, otherwise
    /// as `submit`.
    pub async fn submit_raw(
        &self,
        actor: Actor,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<Receipt> {
        let mutation = Mutation::decode(kind, payload)?;
        self.submit(actor, mutation).await
    }

    pub async fn register_user(&self, username: &str, password: &str) -> Result<Receipt> {
        let registration = Registration {
            username: username.to_string(),
            password: Sensitive::new(password.to_string()),
        };
        self.submit(Actor::Anonymous, Mutation::RegisterUser(registration))
            .await
    }

    pub async fn create_community(
        &self,
        actor: Actor,
        name: &str,
        description: &str,
    ) -> Result<Receipt> {
        let community = NewCommunity {
            name: name.to_string(),
            description: description.to_string(),
        };
        self.submit(actor, Mutation::CreateCommunity(community)).await
    }

    pub async fn join_community(&self, actor: Actor, community_id: CommunityId) -> Result<Receipt> {
        self.submit(actor, Mutation::JoinCommunity { community_id })
            .await
    }

    pub async fn leave_community(&self, actor: Actor, community_id: CommunityId) -> Result<Receipt> {
        self.submit(actor, Mutation::LeaveCommunity { community_id })
            .await
    }

    pub async fn create_post(
        &self,
        actor: Actor,
        community_id: CommunityId,
        title: &str,
        content: &str,
    ) -> Result<Receipt> {
        let post = NewPost {
            title: title.to_string(),
            content: content.to_string(),
            community_id,
        };
        self.submit(actor, Mutation::CreatePost(post)).await
    }

    pub async fn create_comment(
        &self,
        actor: Actor,
        post_id: PostId,
        parent_comment_id: Option<CommentId>,
        content: &str,
    ) -> Result<Receipt> {
        let comment = NewComment {
            content: content.to_string(),
            post_id,
            parent_comment_id,
        };
        self.submit(actor, Mutation::CreateComment(comment)).await
    }

    pub async fn cast_vote(
        &self,
        actor: Actor,
        target: VoteTarget,
        value: VoteValue,
    ) -> Result<Receipt> {
        self.submit(actor, Mutation::CastVote(NewVote { target, value }))
            .await
    }

    pub async fn send_message(&self, actor: Actor, to: UserId, content: &str) -> Result<Receipt> {
        let message = NewMessage {
            to_user_id: to,
            content: content.to_string(),
        };
        self.submit(actor, Mutation::SendMessage(message)).await
    }

    pub async fn subscribe(&self, actor: Actor, user_id: UserId) -> Result<Receipt> {
        self.submit(actor, Mutation::SubscribeUser { user_id }).await
    }

    pub async fn unsubscribe(&self, actor: Actor, user_id: UserId) -> Result<Receipt> {
        self.submit(actor, Mutation::UnsubscribeUser { user_id })
            .await
    }

    /// Empty every mutable table and restart id sequences
    pub async fn reset_all(&self) -> Result<Receipt> {
        self.submit(Actor::Anonymous, Mutation::ResetAll).await
    }

    /// See `DispatchPool::shutdown`.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
