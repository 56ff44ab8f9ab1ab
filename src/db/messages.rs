use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::messages::{Message, SortOrder};

#[tracing::instrument(name = "Insert message", skip(pool, content, attachments))]
pub async fn insert_message(
    pool: &PgPool,
    sender_id: Uuid,
    recipient_id: Uuid,
    content: &str,
    attachments: &[String],
) -> Result<Message, AppError> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO tbl_messages (id, sender_id, recipient_id, content, attachments)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(sender_id)
    .bind(recipient_id)
    .bind(content)
    .bind(attachments)
    .fetch_one(pool)
    .await?;
    Ok(message)
}

pub async fn get_message(pool: &PgPool, id: Uuid) -> Result<Message, AppError> {
    sqlx::query_as::<_, Message>("SELECT * FROM tbl_messages WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))
}

/// One page of messages plus whether another page follows. Without a
/// counterpart every message the user sent or received is listed.
pub async fn conversation(
    pool: &PgPool,
    user_id: Uuid,
    with_user: Option<Uuid>,
    sort: SortOrder,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Message>, bool), AppError> {
    let direction = match sort {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let query = format!(
        r#"
        SELECT * FROM tbl_messages
        WHERE ($2::UUID IS NULL AND (sender_id = $1 OR recipient_id = $1))
           OR (sender_id = $1 AND recipient_id = $2)
           OR (sender_id = $2 AND recipient_id = $1)
        ORDER BY sent_at {direction}, id {direction}
        LIMIT $3 OFFSET $4
        "#
    );

    let mut messages = sqlx::query_as::<_, Message>(&query)
        .bind(user_id)
        .bind(with_user)
        .bind(limit + 1)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let has_more = messages.len() as i64 > limit;
    messages.truncate(limit.max(0) as usize);
    Ok((messages, has_more))
}

/// Marks the recipient's unread messages among `ids` as read and returns
/// the rows that changed.
pub async fn mark_read(
    pool: &PgPool,
    recipient_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Message>, AppError> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        UPDATE tbl_messages
        SET is_read = TRUE, read_at = NOW()
        WHERE recipient_id = $1 AND id = ANY($2) AND NOT is_read
        RETURNING *
        "#,
    )
    .bind(recipient_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(messages)
}

pub async fn delete_message(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM tbl_messages WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
