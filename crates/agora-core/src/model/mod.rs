//! Domain model for the mutation layer
//!
//! Only the shapes that writes need: typed row ids, the acting identity, and
//! vote targets/values. Read models belong to the query side.

pub mod actor;
pub mod ids;
pub mod vote;

pub use actor::Actor;
pub use ids::{CommentId, CommunityId, MessageId, PostId, UserId, VoteId};
pub use vote::{TargetKind, VoteTarget, VoteValue};
