//! Direct messages and user subscriptions

use agora_core::commands::NewMessage;
use agora_core::model::{MessageId, UserId};
use agora_core::MutationOutcome;
use agora_store::errors::Result;
use agora_store::{Statement, StoreAdapter};

/// Insert a direct message
///
/// The recipient is not checked; messages to unknown users are stored.
///
/// # Errors
/// `NotFound` if the sender does not exist.
pub fn send_message(
    store: &StoreAdapter,
    sender: UserId,
    message: &NewMessage,
) -> Result<MutationOutcome> {
    let step = store.execute(
        "send_message",
        &Statement::new(
            "INSERT INTO direct_messages (from_user_id, to_user_id, content, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(sender.get())
        .bind(message.to_user_id.get())
        .bind(message.content.clone())
        .bind(super::now()),
    )?;

    Ok(MutationOutcome::MessageSent {
        message_id: MessageId::new(step.last_insert_rowid),
        to_user_id: message.to_user_id,
        content: message.content.clone(),
    })
}

/// # Errors
/// `NotFound` if either user does not exist.
pub fn subscribe_user(
    store: &StoreAdapter,
    subscriber: UserId,
    target: UserId,
) -> Result<MutationOutcome> {
    let step = store.execute(
        "subscribe_user",
        &Statement::new(
            "INSERT OR IGNORE INTO user_subscriptions
                 (subscriber_id, subscribed_user_id, created_at)
             VALUES (?, ?, ?)",
        )
        .bind(subscriber.get())
        .bind(target.get())
        .bind(super::now()),
    )?;

    Ok(MutationOutcome::Subscribed {
        user_id: target,
        changed: step.rows_changed > 0,
    })
}

pub fn unsubscribe_user(
    store: &StoreAdapter,
    subscriber: UserId,
    target: UserId,
) -> Result<MutationOutcome> {
    let step = store.execute(
        "unsubscribe_user",
        &Statement::new(
            "DELETE FROM user_subscriptions WHERE subscriber_id = ? AND subscribed_user_id = ?",
        )
        .bind(subscriber.get())
        .bind(target.get()),
    )?;

    Ok(MutationOutcome::Unsubscribed {
        user_id: target,
        changed: step.rows_changed > 0,
    })
}
