//! The identity a mutation is performed as
//!
//! Authentication happens upstream; by the time a request reaches the
//! gateway the caller is either a resolved user or anonymous.

use super::ids::UserId;
use crate::errors::{AgoraError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(UserId),
    /// No resolved identity (registration, maintenance tooling)
    Anonymous,
}

impl Actor {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::Anonymous => None,
        }
    }

    /// Resolve the acting user for an operation that needs one
    pub fn require_user(&self, op: &'static str) -> Result<UserId> {
        self.user_id().ok_or(AgoraError::MissingActor { op })
    }
}

impl From<UserId> for Actor {
    fn from(id: UserId) -> Self {
        Actor::User(id)
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(id) => write!(f, "{}", id),
            Actor::Anonymous => write!(f, "anonymous"),
        }
    }
}
