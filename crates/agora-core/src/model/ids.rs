//! Typed row identifiers
//!
//! SQLite hands out `INTEGER PRIMARY KEY AUTOINCREMENT` ids starting at 1.
//! Wrapping them keeps a post id from being passed where a user id belongs.

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

row_id!(
    /// Row id in `users`
    UserId,
    "user"
);
row_id!(
    /// Row id in `communities`
    CommunityId,
    "community"
);
row_id!(PostId, "post");
row_id!(CommentId, "comment");
row_id!(MessageId, "message");
row_id!(
    /// Row id in the `votes` ledger
    VoteId,
    "vote"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_prefixed() {
        assert_eq!(PostId::new(7).to_string(), "post:7");
        assert_eq!(UserId::new(1).to_string(), "user:1");
    }

    #[test]
    fn test_ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&CommunityId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: CommentId = serde_json::from_str("12").unwrap();
        assert_eq!(back.get(), 12);
    }
}
