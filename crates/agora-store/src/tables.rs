//! Table inventory

/// Every mutable table, children before parents
///
/// Deleting in this order never trips a foreign key.
pub const MUTABLE_TABLES: [&str; 8] = [
    "direct_messages",
    "user_subscriptions",
    "votes",
    "comments",
    "posts",
    "community_members",
    "communities",
    "users",
];
