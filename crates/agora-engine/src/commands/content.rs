//! Posts and comments

use agora_core::commands::{NewComment, NewPost};
use agora_core::errors::{AgoraError, ExError, ExErrorKind};
use agora_core::model::{CommentId, PostId, UserId};
use agora_core::MutationOutcome;
use agora_store::errors::{from_rusqlite_in, Result};
use agora_store::{Statement, StoreAdapter};
use rusqlite::{params, OptionalExtension};

/// Insert a post; author and community are checked by foreign key
///
/// # Errors
/// `NotFound` if the author or the community does not exist.
pub fn create_post(store: &StoreAdapter, author: UserId, post: &NewPost) -> Result<MutationOutcome> {
    let step = store.execute(
        "create_post",
        &Statement::new(
            "INSERT INTO posts (title, content, author_id, community_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post.title.clone())
        .bind(post.content.clone())
        .bind(author.get())
        .bind(post.community_id.get())
        .bind(super::now()),
    )?;

    Ok(MutationOutcome::PostCreated {
        post_id: PostId::new(step.last_insert_rowid),
        title: post.title.clone(),
    })
}

/// Insert a comment after checking its post and parent
///
/// The parent must already exist on the same post, so a comment can never
/// be its own parent.
///
/// # Errors
/// - `NotFound`: the post, the parent or the author does not exist
/// - `InvalidParent`: the parent belongs to a different post
pub fn create_comment(
    store: &mut StoreAdapter,
    author: UserId,
    comment: &NewComment,
) -> Result<MutationOutcome> {
    const OP: &str = "create_comment";

    store.atomic(OP, |tx| {
        let post_exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM posts WHERE id = ?",
                [comment.post_id.get()],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| from_rusqlite_in(OP, e))?;
        if post_exists.is_none() {
            return Err(ExError::new(ExErrorKind::NotFound)
                .with_op(OP)
                .with_entity_id(comment.post_id.to_string())
                .with_message("post does not exist"));
        }

        if let Some(parent) = comment.parent_comment_id {
            let parent_post: Option<i64> = tx
                .query_row(
                    "SELECT post_id FROM comments WHERE id = ?",
                    [parent.get()],
                    |r| r.get(0),
                )
                .optional()
                .map_err(|e| from_rusqlite_in(OP, e))?;

            match parent_post {
                None => {
                    return Err(ExError::new(ExErrorKind::NotFound)
                        .with_op(OP)
                        .with_entity_id(parent.to_string())
                        .with_message("parent comment does not exist"))
                }
                Some(post_id) if post_id != comment.post_id.get() => {
                    return Err(AgoraError::InvalidParentComment {
                        comment_id: parent.get(),
                        post_id: comment.post_id.get(),
                    }
                    .into())
                }
                Some(_) => {}
            }
        }

        tx.execute(
            "INSERT INTO comments (content, author_id, post_id, parent_comment_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                comment.content,
                author.get(),
                comment.post_id.get(),
                comment.parent_comment_id.map(CommentId::get),
                super::now()
            ],
        )
        .map_err(|e| from_rusqlite_in(OP, e))?;

        Ok(MutationOutcome::CommentCreated {
            comment_id: CommentId::new(tx.last_insert_rowid()),
            post_id: comment.post_id,
            content: comment.content.clone(),
        })
    })
}
